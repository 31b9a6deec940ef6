//! Mailbox and group addresses (RFC 5322 §3.4).

/// A parsed `mailbox` or `group`.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `name = Some("Juan García")`, `addr = Some("juan@ejemplo.com")`
/// - `"user@example.com"` → `name = None`, `addr = Some("user@example.com")`
/// - `"Team: a@x.org, b@x.org;"` → `is_group`, `name = Some("Team")`, two entries in `list`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Mailbox {
    /// Whether this is a group rather than a single mailbox.
    pub is_group: bool,
    /// Display name (mailbox) or group name.
    pub name: Option<String>,
    /// The bare address (`local@domain`). Always `None` for groups.
    pub addr: Option<String>,
    /// Members of a group. `None` for mailboxes and for groups written
    /// without a member list.
    pub list: Option<Vec<Mailbox>>,
}

impl Mailbox {
    /// A mailbox with an optional display name.
    pub fn new(name: Option<String>, addr: impl Into<String>) -> Self {
        Self {
            is_group: false,
            name,
            addr: Some(addr.into()),
            list: None,
        }
    }

    /// A group of mailboxes.
    pub fn group(name: impl Into<String>, list: Option<Vec<Mailbox>>) -> Self {
        Self {
            is_group: true,
            name: Some(name.into()),
            addr: None,
            list,
        }
    }

    /// Format for display: `"Name <address>"`, `"address"`, or
    /// `"Group: member, member;"`.
    pub fn display(&self) -> String {
        if self.is_group {
            let members = self
                .list
                .iter()
                .flatten()
                .map(Mailbox::display)
                .collect::<Vec<_>>()
                .join(", ");
            return format!("{}: {};", self.name.as_deref().unwrap_or(""), members);
        }

        let addr = self.addr.as_deref().unwrap_or("");
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => format!("{name} <{addr}>"),
            _ => addr.to_string(),
        }
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_name() {
        let mb = Mailbox::new(Some("Alice".to_string()), "alice@example.com");
        assert_eq!(mb.display(), "Alice <alice@example.com>");
    }

    #[test]
    fn test_display_without_name() {
        let mb = Mailbox::new(None, "alice@example.com");
        assert_eq!(mb.display(), "alice@example.com");
        let mb = Mailbox::new(Some(String::new()), "alice@example.com");
        assert_eq!(mb.display(), "alice@example.com");
    }

    #[test]
    fn test_display_group() {
        let g = Mailbox::group(
            "Team",
            Some(vec![Mailbox::new(None, "a@x.org"), Mailbox::new(None, "b@x.org")]),
        );
        assert_eq!(g.to_string(), "Team: a@x.org, b@x.org;");
        assert_eq!(Mailbox::group("Empty", None).to_string(), "Empty: ;");
    }
}
