pub mod logger;

/// Turns a host or URL into a short lowercase slug made of `[a-z0-9_]`,
/// suitable for embedding in file names.
pub fn url_to_snake_case(url: &str, max_len: usize) -> String {
    let mut s = url.to_lowercase();
    for prefix in ["https://", "http://"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.to_string();
        }
    }
    s = s.replace(|c: char| !c.is_ascii_alphanumeric(), "_");
    while s.contains("__") {
        s = s.replace("__", "_");
    }
    let mut s = s.trim_matches('_').to_string();
    s.truncate(max_len);
    s.trim_end_matches('_').to_string()
}
