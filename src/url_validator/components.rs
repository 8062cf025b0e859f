/// Textual pieces of an absolute `scheme://authority/rest` string, sliced
/// straight from the input so the original port, path, query and fragment can
/// be carried into the normalized form untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawParts<'a> {
    pub scheme: &'a str,
    pub userinfo: Option<&'a str>,
    pub host: &'a str,
    pub port: Option<&'a str>,
    /// Path, query and fragment as written.
    pub tail: &'a str,
}

// Characters that end the authority component for http(s).
const AUTHORITY_END: [char; 4] = ['/', '?', '#', '\\'];

/// Splits `input` into raw parts. Returns `None` unless the scheme is
/// immediately followed by `://`.
pub(crate) fn split(input: &str) -> Option<RawParts<'_>> {
    let colon = input.find(':')?;
    let scheme = &input[..colon];
    if !is_scheme(scheme) {
        return None;
    }
    let rest = input[colon..].strip_prefix("://")?;

    let end = rest.find(AUTHORITY_END).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(end);
    let (userinfo, host_port) = match authority.rfind('@') {
        Some(at) => (Some(&authority[..at]), &authority[at + 1..]),
        None => (None, authority),
    };
    let (host, port) = split_host_port(host_port);

    Some(RawParts {
        scheme,
        userinfo,
        host,
        port,
        tail,
    })
}

/// Returns the scheme of `input` when it starts with a syntactically valid
/// `scheme:` prefix.
pub(crate) fn leading_scheme(input: &str) -> Option<&str> {
    let colon = input.find(':')?;
    let scheme = &input[..colon];
    is_scheme(scheme).then_some(scheme)
}

/// Text sitting where a host would be if `input` had no scheme: everything up
/// to the first path, query or fragment delimiter.
pub(crate) fn host_position(input: &str) -> &str {
    let rest = input.split_once("://").map_or(input, |(_, rest)| rest);
    let end = rest.find(AUTHORITY_END).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host_port = authority.rfind('@').map_or(authority, |at| &authority[at + 1..]);
    split_host_port(host_port).0
}

/// Rebuilds a URL string from its scheme, converted host and the untouched
/// remainder of the original input.
pub(crate) fn reassemble(scheme: &str, host: &str, parts: &RawParts<'_>) -> String {
    let mut out = String::with_capacity(scheme.len() + host.len() + parts.tail.len() + 16);
    out.push_str(scheme);
    out.push_str("://");
    if let Some(userinfo) = parts.userinfo {
        out.push_str(userinfo);
        out.push('@');
    }
    out.push_str(host);
    if let Some(port) = parts.port {
        out.push(':');
        out.push_str(port);
    }
    out.push_str(parts.tail);
    out
}

fn split_host_port(host_port: &str) -> (&str, Option<&str>) {
    if host_port.starts_with('[') {
        return match host_port.find(']') {
            Some(close) => {
                let (host, rest) = host_port.split_at(close + 1);
                (host, rest.strip_prefix(':'))
            }
            None => (host_port, None),
        };
    }
    match host_port.rfind(':') {
        Some(colon) => (&host_port[..colon], Some(&host_port[colon + 1..])),
        None => (host_port, None),
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
