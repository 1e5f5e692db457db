use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;

lazy_static! {
    /// Absolute http/https/ftp URL, or a path rooted at `/`. U+FEFF counts as
    /// whitespace.
    static ref ENDPOINT_PATTERN: Regex =
        Regex::new(r"(?i)^(?:(?:https?|ftp)://[^\s\x{FEFF}/$.?#][^\s\x{FEFF}]*|/[\w\-./]*[^\s\x{FEFF}]*)$")
            .expect("endpoint pattern is a valid regex");
}

/// Why an endpoint string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UrlRejection {
    #[error("incorrect URL format — must start with http:// or https:// or with a / relative path")]
    Format,

    #[error("relative path must not contain consecutive slashes")]
    ConsecutiveSlashes,

    #[error("invalid absolute URL, check the format")]
    InvalidAbsolute,
}

/// Checks that `url` is usable as a conversion endpoint.
///
/// Purely syntactic: no network access happens here.
pub fn validate(url: &str) -> Result<(), UrlRejection> {
    if !ENDPOINT_PATTERN.is_match(url) {
        return Err(UrlRejection::Format);
    }

    if url.starts_with('/') {
        if url.contains("//") {
            return Err(UrlRejection::ConsecutiveSlashes);
        }
        return Ok(());
    }

    Url::parse(url)
        .map(|_| ())
        .map_err(|_| UrlRejection::InvalidAbsolute)
}

/// Returns true for root-relative endpoints that need a base URL to be sent.
pub fn is_relative(url: &str) -> bool {
    url.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accepts_known_good_endpoints() {
        assert_eq!(validate("/convert/tts"), Ok(()));
        assert_eq!(validate("http://localhost:7777/tts"), Ok(()));
        assert_eq!(validate("https://tts.example.com/api/v1/speak?voice=en"), Ok(()));
        assert_eq!(validate("ftp://files.example.com/tts"), Ok(()));
        assert_eq!(validate("HTTP://LOCALHOST:7777/TTS"), Ok(()));
    }

    #[test]
    fn test_rejects_bad_format() {
        assert_eq!(validate("not a url"), Err(UrlRejection::Format));
        assert_eq!(validate("http://"), Err(UrlRejection::Format));
        assert_eq!(validate(""), Err(UrlRejection::Format));
        assert_eq!(validate("convert/tts"), Err(UrlRejection::Format));
        assert_eq!(validate("ws://localhost/tts"), Err(UrlRejection::Format));
        assert_eq!(validate("http:///tts"), Err(UrlRejection::Format));
        assert_eq!(validate("/convert tts"), Err(UrlRejection::Format));
    }

    #[test]
    fn test_rejects_byte_order_mark_as_whitespace() {
        assert_eq!(validate("/a\u{FEFF}b"), Err(UrlRejection::Format));
        assert_eq!(validate("http://a\u{FEFF}b/tts"), Err(UrlRejection::Format));
        assert_eq!(validate("http://\u{FEFF}host/tts"), Err(UrlRejection::Format));
    }

    #[test]
    fn test_rejects_consecutive_slashes_in_relative_path() {
        assert_eq!(validate("/convert//tts"), Err(UrlRejection::ConsecutiveSlashes));
        assert_eq!(validate("//host/tts"), Err(UrlRejection::ConsecutiveSlashes));
    }

    #[test]
    fn test_rejects_unparseable_absolute_url() {
        // Passes the shape check but the port is out of range.
        assert_eq!(
            validate("http://localhost:99999/tts"),
            Err(UrlRejection::InvalidAbsolute)
        );
    }

    #[test]
    fn test_rejection_messages() {
        assert!(UrlRejection::Format.to_string().contains("http://"));
        assert_eq!(
            UrlRejection::ConsecutiveSlashes.to_string(),
            "relative path must not contain consecutive slashes"
        );
    }

    #[test]
    fn test_is_relative() {
        assert!(is_relative("/convert/tts"));
        assert!(!is_relative("http://localhost/convert/tts"));
    }

    proptest! {
        #[test]
        fn prop_accepts_scheme_with_plain_remainder(
            scheme in "(http|https|ftp)",
            host in "[a-z][a-z0-9]{0,15}",
            path in "(/[a-z0-9_-]{1,8}){0,4}",
        ) {
            let url = format!("{}://{}{}", scheme, host, path);
            prop_assert_eq!(validate(&url), Ok(()));
        }

        #[test]
        fn prop_rejects_relative_with_double_slash(
            head in "[a-z0-9]{0,8}",
            tail in "[a-z0-9/]{0,8}",
        ) {
            let url = format!("/{}//{}", head, tail);
            prop_assert_eq!(validate(&url), Err(UrlRejection::ConsecutiveSlashes));
        }

        #[test]
        fn prop_never_panics(input in "\\PC*") {
            let _ = validate(&input);
        }
    }
}
