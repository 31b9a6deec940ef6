//! Operations over classified paths.

use super::{classify, create_path, Dialect, PathInfo};

/// Join `sub` onto the directory `base_dir`.
///
/// `base_dir` is a directory even without a trailing separator. An
/// absolute `sub` replaces the base, except a Unix-style `/path`, which
/// keeps the base's scheme and host. `.` and `..` components are folded
/// and the query and fragment are taken from `sub`.
pub fn resolve(base_dir: &str, sub: &str) -> String {
    if base_dir.is_empty() {
        return sub.to_string();
    }

    let mut base = classify(base_dir);
    let sub_info = classify(sub);

    if sub_info.dialect == Dialect::Relative {
        if let Some(envelope) = base.mhtml.as_mut() {
            if sub != "." {
                envelope.filename = Some(sub.to_string());
            }
            return create_path(&base, false);
        }
    }

    if base.dialect.is_data() || sub_info.dialect.is_data() {
        return sub.to_string();
    }

    if let Dialect::SchemeRelative { .. } = sub_info.dialect {
        if let Some(scheme) = base.dialect.scheme() {
            return format!("{scheme}:{sub}");
        }
    }

    if sub_info.dialect.is_absolute() && sub_info.dialect != Dialect::Unix {
        return sub.to_string();
    }

    if sub_info.dialect == Dialect::Unix {
        base.components = sub_info.components;
    } else {
        if base.components.last().is_some_and(String::is_empty) {
            base.components.pop();
        }
        base.components.extend(sub_info.components);
    }
    base.query = sub_info.query;
    base.fragment = sub_info.fragment;

    simplify(&mut base);
    create_path(&base, false)
}

/// Fold `.` and `..` components. `..` at the root is dropped.
///
/// A path that ends in `.` or `..` names a directory, so it keeps a
/// trailing empty component.
fn simplify(info: &mut PathInfo) {
    let ends_in_dot = info
        .components
        .last()
        .is_some_and(|c| c == "." || c == "..");

    let mut out: Vec<String> = Vec::with_capacity(info.components.len());
    for component in info.components.drain(..) {
        match component.as_str() {
            "." => {}
            ".." => {
                out.pop();
            }
            _ => out.push(component),
        }
    }
    if ends_in_dot {
        out.push(String::new());
    }
    info.components = out;
}

/// Canonical form of `path` for equality comparisons.
///
/// Windows paths become `file:` URIs with a lowercase drive letter, the
/// default port of `http` and `https` is dropped and every dialect is
/// joined with its canonical separator.
pub fn unique(path: &str) -> String {
    let mut info = classify(path);

    if let Dialect::Uri { scheme, port, .. } = &mut info.dialect {
        let default_port = match scheme.as_str() {
            "http" => Some("80"),
            "https" => Some("443"),
            _ => None,
        };
        if default_port.is_some() && port.as_deref() == default_port {
            *port = None;
        }
    }

    let slash_joined = info.components.join("/");
    let suffix = |query: bool| {
        let mut s = String::new();
        if query {
            if let Some(q) = &info.query {
                s.push('?');
                s.push_str(q);
            }
        }
        if let Some(f) = &info.fragment {
            s.push('#');
            s.push_str(f);
        }
        s
    };

    let mut out = match &info.dialect {
        Dialect::WindowsDrive { drive } => {
            format!("file:///{}:/{slash_joined}", drive.to_ascii_lowercase())
        }
        Dialect::WindowsUnc { host } => format!("file://///{host}/{slash_joined}"),
        Dialect::WindowsDriveFileUri { drive, .. } => format!(
            "file:///{}:/{slash_joined}{}",
            drive.to_ascii_lowercase(),
            suffix(false)
        ),
        Dialect::WindowsUncFileUri { host, .. } => {
            format!("file://///{host}/{slash_joined}{}", suffix(false))
        }
        Dialect::Uri { scheme, host, port } => format!(
            "{scheme}://{host}{}/{slash_joined}{}",
            port.as_ref().map(|p| format!(":{p}")).unwrap_or_default(),
            suffix(true)
        ),
        Dialect::SchemeRelative { host, port } => format!(
            "//{host}{}/{slash_joined}{}",
            port.as_ref().map(|p| format!(":{p}")).unwrap_or_default(),
            suffix(true)
        ),
        Dialect::Opaque { scheme, data } => format!("{scheme}:{data}{}", suffix(false)),
        Dialect::Unix => format!("/{slash_joined}"),
        Dialect::MacVolume { volume } => format!("{volume}:{}", info.components.join(":")),
        Dialect::Relative => format!("{slash_joined}{}", suffix(true)),
    };

    if let Some(envelope) = &info.mhtml {
        let mut wrapped = format!("mhtml:{out}");
        if let Some(f) = &envelope.filename {
            wrapped.push('!');
            wrapped.push_str(f);
        }
        if let Some(f) = &envelope.fragment {
            wrapped.push('#');
            wrapped.push_str(f);
        }
        out = wrapped;
    }
    out
}

/// `path` without its fragment (and without the `mhtml:` fragment).
pub fn remove_fragment(path: &str) -> String {
    let mut info = classify(path);
    info.fragment = None;
    if let Some(envelope) = info.mhtml.as_mut() {
        envelope.fragment = None;
    }
    create_path(&info, false)
}

/// The directory containing `path`, with a trailing separator.
///
/// Query and fragment are dropped. `data:` and `about:` paths are returned
/// unchanged.
pub fn get_base_dir(path: &str) -> String {
    let mut info = classify(path);
    if info.dialect.is_data() {
        return path.to_string();
    }
    if info.components.pop().is_some() {
        info.components.push(String::new());
    }
    info.fragment = None;
    info.query = None;
    if let Some(envelope) = info.mhtml.as_mut() {
        envelope.fragment = None;
    }
    create_path(&info, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve("http://x/a/", "b.png"), "http://x/a/b.png");
        assert_eq!(resolve("http://x/a/b/", "../c.png"), "http://x/a/c.png");
        assert_eq!(resolve("http://x/a", "b.png"), "http://x/a/b.png");
        assert_eq!(resolve("http://x/", "../../c.png"), "http://x/c.png");
        assert_eq!(resolve("http://x/a/", "b.cgi?q=1#f"), "http://x/a/b.cgi?q=1#f");
        assert_eq!(resolve("", "b.png"), "b.png");
    }

    #[test]
    fn test_resolve_absolute_forms() {
        assert_eq!(resolve("http://x/a/", "https://y/z"), "https://y/z");
        assert_eq!(resolve("http://x/a/", "/root/z.css"), "http://x/root/z.css");
        assert_eq!(resolve("https://x/a/", "//cdn/z.js"), "https://cdn/z.js");
        assert_eq!(resolve("http://x/a/", "data:,hi"), "data:,hi");
        assert_eq!(resolve("C:\\dir\\", "img\\a.png"), "C:\\dir\\img\\a.png");
    }

    #[test]
    fn test_resolve_into_mhtml_envelope() {
        assert_eq!(
            resolve("mhtml:file:///C:/x.mht!page.html", "img.png"),
            "mhtml:file:///C:/x.mht!img.png"
        );
        assert_eq!(
            resolve("mhtml:file:///C:/x.mht!page.html", "."),
            "mhtml:file:///C:/x.mht!page.html"
        );
    }

    #[test]
    fn test_resolve_dot_keeps_directory() {
        assert_eq!(resolve("http://x/a/", "."), "http://x/a/");
        assert_eq!(resolve("http://x/a/b/", ".."), "http://x/a/");
    }

    #[test]
    fn test_unique_forms() {
        assert_eq!(unique("C:\\Dir\\a.html"), "file:///c:/Dir/a.html");
        assert_eq!(unique("file://C:/Dir/a.html#x"), "file:///c:/Dir/a.html#x");
        assert_eq!(unique("\\\\srv\\s\\a"), "file://///srv/s/a");
        assert_eq!(unique("http://x:80/a"), "http://x/a");
        assert_eq!(unique("https://x:443/a"), "https://x/a");
        assert_eq!(unique("http://x:8080/a"), "http://x:8080/a");
        assert_eq!(unique("a\\b.html"), "a/b.html");
    }

    #[test]
    fn test_get_base_dir() {
        assert_eq!(get_base_dir("http://x/a/b.html?q#f"), "http://x/a/");
        assert_eq!(get_base_dir("http://x/a/"), "http://x/a/");
        assert_eq!(get_base_dir("data:text/html,x"), "data:text/html,x");
        assert_eq!(get_base_dir("C:\\dir\\a.html"), "C:\\dir\\");
    }

    #[test]
    fn test_remove_fragment() {
        assert_eq!(remove_fragment("http://x/a.html#top"), "http://x/a.html");
        assert_eq!(
            remove_fragment("mhtml:file:///C:/x.mht!a.html#s"),
            "mhtml:file:///C:/x.mht!a.html"
        );
    }

    fn any_path() -> impl Strategy<Value = String> {
        let segment = "[a-zA-Z0-9_.%-]{0,6}";
        prop_oneof![
            (segment, segment).prop_map(|(a, b)| format!("http://host:80/{a}/{b}")),
            (segment, segment).prop_map(|(a, b)| format!("https://h/{a}?{b}#{a}")),
            (segment, segment).prop_map(|(a, b)| format!("C:\\{a}\\{b}")),
            (segment, segment).prop_map(|(a, b)| format!("\\\\srv\\{a}\\{b}")),
            (segment, segment).prop_map(|(a, b)| format!("file:///D:/{a}/{b}")),
            (segment, segment).prop_map(|(a, b)| format!("/{a}/{b}")),
            (segment, segment).prop_map(|(a, b)| format!("{a}/{b}")),
            (segment, segment).prop_map(|(a, b)| format!("../{a}\\{b}")),
            (segment, segment).prop_map(|(a, b)| format!("mhtml:http://h/{a}!{b}")),
        ]
    }

    fn absolute_path() -> impl Strategy<Value = String> {
        let segment = "[a-zA-Z0-9_-]{1,6}";
        prop_oneof![
            (segment, segment).prop_map(|(a, b)| format!("http://host/{a}/{b}")),
            (segment, segment).prop_map(|(a, b)| format!("C:\\{a}\\{b}")),
            (segment, segment).prop_map(|(a, b)| format!("\\\\srv\\{a}\\{b}")),
            (segment, segment).prop_map(|(a, b)| format!("file:///D:/{a}/{b}")),
            (segment, segment).prop_map(|(a, b)| format!("//h/{a}/{b}")),
            (segment, segment).prop_map(|(a, b)| format!("/{a}/{b}")),
            (segment, segment).prop_map(|(a, b)| format!("Vol:{a}:{b}")),
        ]
    }

    proptest! {
        #[test]
        fn test_unique_is_idempotent(p in any_path()) {
            let once = unique(&p);
            prop_assert_eq!(unique(&once), once);
        }

        #[test]
        fn test_resolving_dot_never_changes_directory(p in absolute_path()) {
            let dir = get_base_dir(&p);
            prop_assert_eq!(resolve(&dir, "."), dir);
        }
    }
}
