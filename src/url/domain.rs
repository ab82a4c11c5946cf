use url::Url;

/// Extracts the host (with any non-default port) from a URL
///
/// This is the key snapshots are grouped by on disk and in the manifest, so
/// `example.com` and `example.com:8080` are kept apart.
///
/// # Arguments
///
/// * `url` - The URL to extract the host from
///
/// # Returns
///
/// * `Some(String)` - The lowercase host, with `:port` when the port is not the scheme default
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wayback_lite::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.com/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://localhost:8080/").unwrap();
/// assert_eq!(extract_host(&url), Some("localhost:8080".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns true iff both URLs share scheme, host and port
///
/// Default ports are made explicit before comparing, so `https://a.com` and
/// `https://a.com:443` are the same origin.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str().map(str::to_lowercase) == b.host_str().map(str::to_lowercase)
        && a.port_or_known_default() == b.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_extract_simple_host() {
        assert_eq!(
            extract_host(&parse("https://example.com/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_subdomain() {
        assert_eq!(
            extract_host(&parse("https://blog.example.com/post")),
            Some("blog.example.com".to_string())
        );
    }

    #[test]
    fn test_extract_keeps_custom_port() {
        assert_eq!(
            extract_host(&parse("https://example.com:8443/")),
            Some("example.com:8443".to_string())
        );
    }

    #[test]
    fn test_extract_drops_default_port() {
        assert_eq!(
            extract_host(&parse("https://example.com:443/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_no_host() {
        assert_eq!(extract_host(&parse("data:text/plain,hi")), None);
    }

    #[test]
    fn test_same_origin() {
        assert!(same_origin(
            &parse("https://example.com/a"),
            &parse("https://example.com/b?q=1")
        ));
        assert!(same_origin(
            &parse("https://example.com/"),
            &parse("https://example.com:443/")
        ));
    }

    #[test]
    fn test_different_scheme_is_different_origin() {
        assert!(!same_origin(
            &parse("http://example.com/"),
            &parse("https://example.com/")
        ));
    }

    #[test]
    fn test_different_port_is_different_origin() {
        assert!(!same_origin(
            &parse("https://example.com/"),
            &parse("https://example.com:8443/")
        ));
    }

    #[test]
    fn test_subdomain_is_different_origin() {
        assert!(!same_origin(
            &parse("https://example.com/"),
            &parse("https://www.example.com/")
        ));
    }
}
