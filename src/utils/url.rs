//! Endpoint URL handling.
//!
//! Base URLs are accepted with or without trailing slashes and always carry
//! the API version segment (`http://localhost:8317/v1`); endpoint paths are
//! joined onto them without doubling separators.

use reqwest::Url;

/// Strip trailing slashes from a base URL.
///
/// ```
/// use toolprobe::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8317/v1//"), "http://localhost:8317/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join an endpoint path such as `chat/completions` onto a base URL.
///
/// ```
/// use toolprobe::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8317/v1/", "/models"),
///     "http://localhost:8317/v1/models"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{endpoint}", normalize_base_url(base_url))
}

/// Checks that a base URL is absolute http(s) with a host.
pub fn check_base_url(base_url: &str) -> Result<(), String> {
    let parsed = Url::parse(base_url.trim())
        .map_err(|err| format!("api_url {base_url:?} is not a valid URL: {err}"))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("api_url must use http or https, got {other}")),
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(format!("api_url {base_url:?} has no host"));
    }
    Ok(())
}
