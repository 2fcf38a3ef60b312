//! URL helpers for joining the backend base URL with endpoint paths.
//!
//! The base URL may be a bare host (`http://localhost:8000`) or a proxy
//! prefix (`http://localhost:3000/api/`); either way endpoints are appended
//! with exactly one slash between them.

/// Strip trailing slashes from a base URL.
///
/// # Examples
///
/// ```
/// use nakshatra::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:3000/api/"), "http://localhost:3000/api");
/// assert_eq!(normalize_base_url("http://localhost:3000/api///"), "http://localhost:3000/api");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path.
///
/// # Examples
///
/// ```
/// use nakshatra::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000", "kundli"),
///     "http://localhost:8000/kundli"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:3000/api/", "/chat"),
///     "http://localhost:3000/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Whether `url` looks like something the HTTP client can reach: an
/// `http://` or `https://` scheme followed by a host.
pub fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    match rest {
        Some(rest) => rest
            .split(['/', '?', '#'])
            .next()
            .is_some_and(|host| !host.is_empty()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://astro.example.com"),
            "https://astro.example.com"
        );

        // Trailing slashes and surrounding whitespace from config files
        assert_eq!(
            normalize_base_url("  https://astro.example.com/api/ "),
            "https://astro.example.com/api"
        );
        assert_eq!(normalize_base_url("///"), "");
        assert_eq!(normalize_base_url(""), "");
    }

    #[test]
    fn test_construct_api_url() {
        assert_eq!(
            construct_api_url("http://127.0.0.1:8000", "ping"),
            "http://127.0.0.1:8000/ping"
        );

        // Proxy prefix with trailing slash, endpoint with leading slashes
        assert_eq!(
            construct_api_url("http://127.0.0.1:3000/api/", "///kundli"),
            "http://127.0.0.1:3000/api/kundli"
        );
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("http://localhost:8000"));
        assert!(is_http_url("https://astro.example.com/api"));
        assert!(!is_http_url("localhost:8000"));
        assert!(!is_http_url("ftp://astro.example.com"));
        assert!(!is_http_url("http://"));
        assert!(!is_http_url("https:///chat"));
    }
}
