//! Path-like strings from many dialects: URIs, Windows drive and UNC paths,
//! Unix and classic Mac OS paths, relative references and the IE `mhtml:`
//! envelope.
//!
//! None of these are required to be valid URIs. Parsing is a fixed list of
//! patterns tried in order; [`create_path`] turns a [`PathInfo`] back into
//! a string in its own dialect.

mod resolve;

pub use resolve::{get_base_dir, remove_fragment, resolve, unique};

use std::sync::LazyLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;

/// The dialect of a path, with the fields only that dialect carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialect {
    /// `/dir/file`
    Unix,
    /// `C:\dir\file` or `C:/dir/file`
    WindowsDrive { drive: char },
    /// `\\host\dir\file`
    WindowsUnc { host: String },
    /// `file:///C:/dir/file`
    WindowsDriveFileUri { extra_slash: String, drive: char },
    /// `file://///host/dir/file`
    WindowsUncFileUri { extra_slash: String, host: String },
    /// `scheme://host[:port]/path`
    Uri {
        scheme: String,
        host: String,
        port: Option<String>,
    },
    /// `//host[:port]/path`
    SchemeRelative { host: String, port: Option<String> },
    /// `about:` and `data:`, which have no path.
    Opaque { scheme: String, data: String },
    /// `Volume:dir:file`
    MacVolume { volume: String },
    Relative,
}

impl Dialect {
    pub fn is_absolute(&self) -> bool {
        !matches!(self, Dialect::Relative)
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Dialect::Opaque { .. })
    }

    fn scheme(&self) -> Option<&str> {
        match self {
            Dialect::Uri { scheme, .. } | Dialect::Opaque { scheme, .. } => Some(scheme),
            _ => None,
        }
    }
}

/// The `mhtml:<inner>!<filename>#<fragment>` envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mhtml {
    pub filename: Option<String>,
    pub fragment: Option<String>,
}

/// A classified path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    pub dialect: Dialect,
    pub sep: char,
    pub components: Vec<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
    pub mhtml: Option<Mhtml>,
}

impl PathInfo {
    fn new(dialect: Dialect, sep: char, components: &str) -> Self {
        Self {
            dialect,
            sep,
            components: split(components, sep),
            query: None,
            fragment: None,
            mhtml: None,
        }
    }

    /// The last path component, or `""`.
    pub fn leaf(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or_default()
    }
}

fn split(s: &str, sep: char) -> Vec<String> {
    s.split(sep).map(str::to_string).collect()
}

fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid built-in pattern")
}

static MHTML: LazyLock<Regex> = LazyLock::new(|| rx(r"(?s)^mhtml:([^!#]*)(?:!([^#]*))?(#(.*))?$"));
static DRIVE: LazyLock<Regex> = LazyLock::new(|| rx(r"(?s)^([A-Za-z]):([/\\])(.*)$"));
static UNC: LazyLock<Regex> = LazyLock::new(|| rx(r"(?s)^\\\\([^\\]+)\\(.*)$"));
static DRIVE_FILE_URI: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?s)^file://(/?)([A-Za-z]):([/\\])([^#]*)(#(.*))?$"));
static UNC_FILE_URI: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?s)^file://(/{1,3})([^/]+)/([^#]*)(#(.*))?$"));
static URI: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?s)^([A-Za-z0-9\-]+)://([^/]*)/([^?#]*)(\?([^#]*))?(#(.*))?$"));
static OPAQUE: LazyLock<Regex> = LazyLock::new(|| rx(r"(?s)^(about|data):([^#]*)(#(.*))?$"));
static SCHEME_RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?s)^//([^/]*)/([^?#]*)(\?([^#]*))?(#(.*))?$"));
static UNIX: LazyLock<Regex> = LazyLock::new(|| rx(r"(?s)^/(.*)$"));
static MAC_VOLUME: LazyLock<Regex> = LazyLock::new(|| rx(r"(?s)^([^:]+):(.+)$"));
static DOT_RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?s)^(\.\.?([\\/:])[^?#]*)(\?([^#]*))?(#(.*))?$"));
static RELATIVE: LazyLock<Regex> = LazyLock::new(|| rx(r"(?s)^([^?#]*)(\?([^#]*))?(#(.*))?$"));
static HOST_PORT: LazyLock<Regex> = LazyLock::new(|| rx(r"^(.+):([0-9]+)$"));

fn split_host_port(host: &str) -> (String, Option<String>) {
    match HOST_PORT.captures(host) {
        Some(caps) => (caps[1].to_string(), Some(caps[2].to_string())),
        None => (host.to_string(), None),
    }
}

/// Classify `path`.
///
/// An `mhtml:` envelope is peeled first and recorded in
/// [`PathInfo::mhtml`]; the inner path is classified like any other.
pub fn classify(path: &str) -> PathInfo {
    let (inner, mhtml) = match MHTML.captures(path) {
        Some(caps) => {
            let envelope = Mhtml {
                filename: caps.get(2).map(|m| m.as_str().to_string()),
                fragment: caps.get(4).map(|m| m.as_str().to_string()),
            };
            (caps.get(1).map_or("", |m| m.as_str()), Some(envelope))
        }
        None => (path, None),
    };
    let mut info = classify_plain(inner);
    info.mhtml = mhtml;
    info
}

fn group(caps: &regex::Captures<'_>, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().to_string())
}

fn first_char(s: &str) -> char {
    s.chars().next().unwrap_or('C')
}

fn classify_plain(path: &str) -> PathInfo {
    if let Some(caps) = DRIVE.captures(path) {
        let sep = first_char(&caps[2]);
        let drive = first_char(&caps[1]);
        return PathInfo::new(Dialect::WindowsDrive { drive }, sep, &caps[3]);
    }

    if let Some(caps) = UNC.captures(path) {
        let host = caps[1].to_string();
        return PathInfo::new(Dialect::WindowsUnc { host }, '\\', &caps[2]);
    }

    if let Some(caps) = DRIVE_FILE_URI.captures(path) {
        let dialect = Dialect::WindowsDriveFileUri {
            extra_slash: caps[1].to_string(),
            drive: first_char(&caps[2]),
        };
        let mut info = PathInfo::new(dialect, first_char(&caps[3]), &caps[4]);
        info.fragment = group(&caps, 6);
        return info;
    }

    if let Some(caps) = UNC_FILE_URI.captures(path) {
        let dialect = Dialect::WindowsUncFileUri {
            extra_slash: caps[1].to_string(),
            host: caps[2].to_string(),
        };
        let mut info = PathInfo::new(dialect, '/', &caps[3]);
        info.fragment = group(&caps, 5);
        return info;
    }

    if let Some(caps) = URI.captures(path) {
        let (host, port) = split_host_port(&caps[2]);
        let dialect = Dialect::Uri {
            scheme: caps[1].to_string(),
            host,
            port,
        };
        let mut info = PathInfo::new(dialect, '/', &caps[3]);
        info.query = group(&caps, 5);
        info.fragment = group(&caps, 7);
        return info;
    }

    if let Some(caps) = OPAQUE.captures(path) {
        let dialect = Dialect::Opaque {
            scheme: caps[1].to_string(),
            data: caps[2].to_string(),
        };
        let mut info = PathInfo::new(dialect, '/', "");
        info.components.clear();
        info.fragment = group(&caps, 4);
        return info;
    }

    if let Some(caps) = SCHEME_RELATIVE.captures(path) {
        let (host, port) = split_host_port(&caps[1]);
        let mut info = PathInfo::new(Dialect::SchemeRelative { host, port }, '/', &caps[2]);
        info.query = group(&caps, 4);
        info.fragment = group(&caps, 6);
        return info;
    }

    if let Some(caps) = UNIX.captures(path) {
        return PathInfo::new(Dialect::Unix, '/', &caps[1]);
    }

    if let Some(caps) = MAC_VOLUME.captures(path) {
        let volume = caps[1].to_string();
        return PathInfo::new(Dialect::MacVolume { volume }, ':', &caps[2]);
    }

    if let Some(caps) = DOT_RELATIVE.captures(path) {
        let mut info = PathInfo::new(Dialect::Relative, first_char(&caps[2]), &caps[1]);
        info.query = group(&caps, 4);
        info.fragment = group(&caps, 6);
        return info;
    }

    let sep = if path.contains('/') {
        '/'
    } else if path.contains('\\') {
        '\\'
    } else {
        '/'
    };
    match RELATIVE.captures(path) {
        Some(caps) => {
            let mut info = PathInfo::new(Dialect::Relative, sep, &caps[1]);
            info.query = group(&caps, 3);
            info.fragment = group(&caps, 5);
            info
        }
        None => {
            let mut info = PathInfo::new(Dialect::Relative, sep, "");
            info.components = vec![path.to_string()];
            info
        }
    }
}

fn push_suffix(out: &mut String, mark: char, value: Option<&str>) {
    if let Some(v) = value {
        out.push(mark);
        out.push_str(v);
    }
}

fn push_port(out: &mut String, port: Option<&str>) {
    push_suffix(out, ':', port);
}

/// Build the string form of `info` in its own dialect.
///
/// With `ignore_mhtml` the `mhtml:` envelope is left off.
pub fn create_path(info: &PathInfo, ignore_mhtml: bool) -> String {
    if !ignore_mhtml {
        if let Some(envelope) = &info.mhtml {
            let mut out = String::from("mhtml:");
            out.push_str(&create_path(info, true));
            push_suffix(&mut out, '!', envelope.filename.as_deref());
            push_suffix(&mut out, '#', envelope.fragment.as_deref());
            return out;
        }
    }

    let sep = info.sep.to_string();
    let joined = info.components.join(&sep);
    let mut out = String::new();
    match &info.dialect {
        Dialect::WindowsDrive { drive } => {
            out.push(*drive);
            out.push(':');
            out.push(info.sep);
            out.push_str(&joined);
        }
        Dialect::WindowsUnc { host } => {
            out.push_str("\\\\");
            out.push_str(host);
            out.push(info.sep);
            out.push_str(&joined);
        }
        Dialect::WindowsDriveFileUri { extra_slash, drive } => {
            out.push_str("file://");
            out.push_str(extra_slash);
            out.push(*drive);
            out.push(':');
            out.push(info.sep);
            out.push_str(&joined);
            push_suffix(&mut out, '#', info.fragment.as_deref());
        }
        Dialect::WindowsUncFileUri { extra_slash, host } => {
            out.push_str("file://");
            out.push_str(extra_slash);
            out.push_str(host);
            out.push(info.sep);
            out.push_str(&joined);
            push_suffix(&mut out, '#', info.fragment.as_deref());
        }
        Dialect::Uri { scheme, host, port } => {
            out.push_str(scheme);
            out.push_str("://");
            out.push_str(host);
            push_port(&mut out, port.as_deref());
            out.push(info.sep);
            out.push_str(&joined);
            push_suffix(&mut out, '?', info.query.as_deref());
            push_suffix(&mut out, '#', info.fragment.as_deref());
        }
        Dialect::SchemeRelative { host, port } => {
            out.push_str("//");
            out.push_str(host);
            push_port(&mut out, port.as_deref());
            out.push(info.sep);
            out.push_str(&joined);
            push_suffix(&mut out, '?', info.query.as_deref());
            push_suffix(&mut out, '#', info.fragment.as_deref());
        }
        Dialect::Opaque { scheme, data } => {
            out.push_str(scheme);
            out.push(':');
            out.push_str(data);
            push_suffix(&mut out, '#', info.fragment.as_deref());
        }
        Dialect::Unix => {
            out.push(info.sep);
            out.push_str(&joined);
        }
        Dialect::MacVolume { volume } => {
            out.push_str(volume);
            out.push(info.sep);
            out.push_str(&joined);
        }
        Dialect::Relative => {
            out.push_str(&joined);
            push_suffix(&mut out, '?', info.query.as_deref());
            push_suffix(&mut out, '#', info.fragment.as_deref());
        }
    }
    out
}

/// Characters escaped by [`file_uri`].
const FILE_URI_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// The `file:` URI of a local file path.
pub fn file_uri(path: &std::path::Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    let rooted = if text.starts_with('/') {
        text
    } else {
        format!("/{text}")
    };
    format!("file://{}", utf8_percent_encode(&rooted, FILE_URI_ESCAPES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_uri() {
        assert_eq!(
            file_uri(std::path::Path::new("/tmp/my page#1.mht")),
            "file:///tmp/my%20page%231.mht"
        );
        assert_eq!(file_uri(std::path::Path::new("C:\\x\\a.mht")), "file:///C:/x/a.mht");
        assert_eq!(classify(&file_uri(std::path::Path::new("C:\\x\\a.mht"))).leaf(), "a.mht");
    }

    fn kind(path: &str) -> Dialect {
        classify(path).dialect
    }

    #[test]
    fn test_classify_dialects() {
        assert_eq!(kind("C:\\dir\\a.html"), Dialect::WindowsDrive { drive: 'C' });
        assert_eq!(
            kind("\\\\srv\\share\\a.html"),
            Dialect::WindowsUnc {
                host: "srv".into()
            }
        );
        assert!(matches!(kind("file:///C:/a.html"), Dialect::WindowsDriveFileUri { .. }));
        assert!(matches!(kind("file://///srv/a.html"), Dialect::WindowsUncFileUri { .. }));
        assert!(matches!(kind("http://x/a.html"), Dialect::Uri { .. }));
        assert!(matches!(kind("data:text/plain,hi"), Dialect::Opaque { .. }));
        assert!(matches!(kind("//x/a.html"), Dialect::SchemeRelative { .. }));
        assert_eq!(kind("/usr/a.html"), Dialect::Unix);
        assert!(matches!(kind("Macintosh HD:dir:a.html"), Dialect::MacVolume { .. }));
        assert_eq!(kind("a/b.html"), Dialect::Relative);
        assert_eq!(kind("../b.html"), Dialect::Relative);
    }

    #[test]
    fn test_uri_fields() {
        let info = classify("http://example.com:8080/a/b.cgi?x=1#top");
        assert_eq!(
            info.dialect,
            Dialect::Uri {
                scheme: "http".into(),
                host: "example.com".into(),
                port: Some("8080".into()),
            }
        );
        assert_eq!(info.components, vec!["a", "b.cgi"]);
        assert_eq!(info.query.as_deref(), Some("x=1"));
        assert_eq!(info.fragment.as_deref(), Some("top"));
        assert_eq!(info.leaf(), "b.cgi");
    }

    #[test]
    fn test_relative_separator_choice() {
        assert_eq!(classify("a\\b.html").sep, '\\');
        assert_eq!(classify("a/b\\c").sep, '/');
        assert_eq!(classify("..\\b.html").sep, '\\');
        assert_eq!(classify("b.html").components, vec!["b.html"]);
    }

    #[test]
    fn test_mhtml_envelope() {
        let info = classify("mhtml:file:///C:/x.mht!page.html#s2");
        let envelope = info.mhtml.clone().unwrap();
        assert_eq!(envelope.filename.as_deref(), Some("page.html"));
        assert_eq!(envelope.fragment.as_deref(), Some("s2"));
        assert!(matches!(info.dialect, Dialect::WindowsDriveFileUri { .. }));
        assert_eq!(create_path(&info, false), "mhtml:file:///C:/x.mht!page.html#s2");
        assert_eq!(create_path(&info, true), "file:///C:/x.mht");
    }

    #[test]
    fn test_create_path_round_trips() {
        for p in [
            "C:\\dir\\a.html",
            "\\\\srv\\share\\a.html",
            "file:///C:/a.html#f",
            "file://///srv/a.html",
            "https://x:8443/a/b?q#f",
            "about:blank",
            "//x/a",
            "/usr/a",
            "Vol:dir:a",
            "./a/b?q#f",
            "a\\b",
        ] {
            assert_eq!(create_path(&classify(p), false), p, "{p}");
        }
    }

    #[test]
    fn test_host_without_path_is_not_a_uri() {
        assert!(matches!(kind("http://example.com"), Dialect::MacVolume { .. }));
    }
}
