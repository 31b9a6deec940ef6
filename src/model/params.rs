//! Structured header values: `Content-Type` and `Content-Disposition`.

use std::collections::BTreeMap;

/// The value of a `Content-Type` or `Content-Disposition` field.
///
/// For `Content-Type` the `kind`/`subtype` pair is the media type; for
/// `Content-Disposition` `kind` is the disposition type and `subtype` is
/// empty. Parameter names are case-insensitive; the spelling of the first
/// definition is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MimeParams {
    /// Media type or disposition type, lowercased.
    pub kind: String,
    /// Media subtype, lowercased. Empty when absent.
    pub subtype: String,
    params: BTreeMap<String, (String, String)>,
}

impl MimeParams {
    pub fn new(kind: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            subtype: subtype.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(&name.to_ascii_lowercase())
    }

    /// Look up a parameter value by case-insensitive name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    /// Add a parameter. A name that is already defined keeps its first
    /// value.
    pub fn add_param(&mut self, name: &str, value: impl Into<String>) {
        self.params
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| (name.to_string(), value.into()));
    }

    /// Parameters as `(name as first written, value)`, ordered by
    /// lowercased name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut p = MimeParams::new("text", "html");
        p.add_param("Charset", "UTF-8");
        assert!(p.has_param("charset"));
        assert_eq!(p.param("CHARSET"), Some("UTF-8"));
        assert_eq!(p.iter().next(), Some(("Charset", "UTF-8")));
    }

    #[test]
    fn test_first_definition_wins() {
        let mut p = MimeParams::default();
        p.add_param("name", "first");
        p.add_param("NAME", "second");
        assert_eq!(p.param("name"), Some("first"));
        assert_eq!(p.len(), 1);
    }
}
