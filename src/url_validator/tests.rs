use super::*;

fn reason(raw: &str) -> InvalidUrlError {
    validate(raw).expect_err("URL should have been rejected")
}

// Accepted inputs and their canonical forms
#[test]
fn test_plain_https_url_is_unchanged() {
    let url = validate("https://sub.domain.co.uk/another/path").unwrap();
    assert_eq!(url.as_str(), "https://sub.domain.co.uk/another/path");
}

#[test]
fn test_query_and_fragment_preserved() {
    let url = validate("http://www.example.com/path?query=1#fragment").unwrap();
    assert_eq!(url.as_str(), "http://www.example.com/path?query=1#fragment");
}

#[test]
fn test_bare_domain_gets_http_scheme() {
    let url = validate("example.com").unwrap();
    assert_eq!(url.as_str(), "http://example.com");
}

#[test]
fn test_bare_domain_with_path_gets_http_scheme() {
    let url = validate("www.google.com/search?q=qr").unwrap();
    assert_eq!(url.as_str(), "http://www.google.com/search?q=qr");
}

#[test]
fn test_bare_domain_with_port_gets_http_scheme() {
    let url = validate("example.com:8080/app").unwrap();
    assert_eq!(url.as_str(), "http://example.com:8080/app");
}

#[test]
fn test_scheme_and_host_lowercased() {
    let url = validate("HTTPS://Example.COM/CasePath").unwrap();
    assert_eq!(url.as_str(), "https://example.com/CasePath");
}

#[test]
fn test_port_preserved() {
    let url = validate("http://example.com:8080/app").unwrap();
    assert_eq!(url.as_str(), "http://example.com:8080/app");
}

#[test]
fn test_public_ip_allowed() {
    let url = validate("http://1.1.1.1/resource").unwrap();
    assert_eq!(url.as_str(), "http://1.1.1.1/resource");
}

#[test]
fn test_surrounding_whitespace_trimmed() {
    let url = validate("  https://example.com/x  ").unwrap();
    assert_eq!(url.as_str(), "https://example.com/x");
}

#[test]
fn test_idn_host_converted_to_punycode() {
    let url = validate("https://bücher.example.com/katalog").unwrap();
    assert_eq!(url.as_str(), "https://xn--bcher-kva.example.com/katalog");

    let reparsed = Url::parse(url.as_str()).unwrap();
    assert_eq!(reparsed.host_str(), Some("xn--bcher-kva.example.com"));
    assert_eq!(url.host().as_deref(), Some("xn--bcher-kva.example.com"));
}

#[test]
fn test_validation_is_idempotent() {
    for raw in [
        "example.com",
        "HTTP://Example.com:8080/a?b=c#d",
        "https://bücher.example.com",
        "www.google.com/search?q=qr",
        "http://[2606:4700:4700::1111]:8080/dns",
    ] {
        let once = validate(raw).unwrap();
        let twice = validate(once.as_str()).unwrap();
        assert_eq!(once, twice, "validation of {} should be idempotent", raw);
    }
}

// Length boundary
#[test]
fn test_length_exactly_at_limit_passes() {
    let prefix = "http://example.com/";
    let url = format!("{}{}", prefix, "a".repeat(MAX_URL_LENGTH - prefix.len()));
    assert_eq!(url.chars().count(), MAX_URL_LENGTH);
    assert!(validate(&url).is_ok());
}

#[test]
fn test_length_one_over_limit_rejected() {
    let prefix = "http://example.com/";
    let url = format!("{}{}", prefix, "a".repeat(MAX_URL_LENGTH - prefix.len() + 1));
    assert_eq!(
        reason(&url),
        InvalidUrlError::TooLong {
            length: MAX_URL_LENGTH + 1,
            max: MAX_URL_LENGTH
        }
    );
}

#[test]
fn test_long_path_rejected_with_length_reason() {
    let url = format!("http://example.com/{}", "a".repeat(2041));
    let err = reason(&url);
    assert!(matches!(err, InvalidUrlError::TooLong { .. }));
    assert!(err.to_string().contains("maximum allowed length of 2048"));
}

#[test]
fn test_length_counts_characters_not_bytes() {
    let prefix = "http://example.com/";
    let url = format!("{}{}", prefix, "é".repeat(MAX_URL_LENGTH - prefix.len()));
    assert!(url.len() > MAX_URL_LENGTH);
    assert!(validate(&url).is_ok());
}

// Rejections
#[test]
fn test_empty_rejected() {
    assert_eq!(reason(""), InvalidUrlError::Empty);
    assert_eq!(reason("   "), InvalidUrlError::Empty);
}

#[test]
fn test_dangerous_schemes_rejected() {
    for raw in [
        "javascript:alert('XSS')",
        "ftp://fileserver.com/data",
        "file:///etc/passwd",
        "data:text/html,<script>alert(1)</script>",
        "mailto:someone@example.com",
        "JavaScript://example.com/%0Aalert(1)",
        "ws://example.com/socket",
    ] {
        assert!(validate(raw).is_err(), "{} should be rejected", raw);
    }
}

#[test]
fn test_disallowed_scheme_reason_names_scheme() {
    assert_eq!(
        reason("ftp://fileserver.com/data"),
        InvalidUrlError::DisallowedScheme("ftp".to_string())
    );
}

#[test]
fn test_private_and_loopback_literals_rejected() {
    for raw in [
        "http://127.0.0.1/dashboard",
        "http://10.0.0.1/",
        "http://192.168.1.1/admin",
        "https://[::1]/status",
        "http://169.254.169.254/latest/meta-data",
        "http://[fd12::1]/",
        "http://0x7f.1/",
        "http://2130706433/",
        "http://198.18.0.1/",
        "http://192.0.2.1/",
        "http://192.0.0.8/",
        "http://203.0.113.5/",
        "http://240.0.0.1/",
        "http://[2001:db8::1]/",
    ] {
        assert!(
            matches!(reason(raw), InvalidUrlError::PrivateAddress(_)),
            "{} should be rejected as a private address",
            raw
        );
    }
}

#[test]
fn test_private_ip_reason_names_address() {
    let err = reason("http://192.168.1.1/admin");
    assert_eq!(err, InvalidUrlError::PrivateAddress("192.168.1.1".to_string()));
    assert!(err.to_string().contains("private or loopback"));
}

#[test]
fn test_localhost_name_allowed_by_default() {
    let url = validate("http://localhost/test").unwrap();
    assert_eq!(url.as_str(), "http://localhost/test");
}

#[test]
fn test_localhost_name_blocked_when_policy_set() {
    let validator = UrlValidator::new(ValidatorPolicy {
        block_local_hostnames: true,
        ..ValidatorPolicy::default()
    });
    assert_eq!(
        validator.validate("http://localhost/test").unwrap_err(),
        InvalidUrlError::LocalHostname("localhost".to_string())
    );
    assert!(validator.validate("http://api.localhost/").is_err());
    assert!(validator.validate("http://example.com/").is_ok());
}

#[test]
fn test_missing_host_rejected() {
    assert_eq!(reason("http:///path"), InvalidUrlError::MissingHost);
    assert_eq!(reason("https://"), InvalidUrlError::MissingHost);
}

#[test]
fn test_path_or_query_only_rejected() {
    assert!(matches!(reason("/some/path"), InvalidUrlError::Malformed(_)));
    assert!(matches!(reason("?q=test"), InvalidUrlError::Malformed(_)));
    assert!(matches!(reason("not a url"), InvalidUrlError::Malformed(_)));
}

#[test]
fn test_missing_slashes_rejected() {
    assert!(matches!(reason("http:example.com"), InvalidUrlError::Malformed(_)));
}

#[test]
fn test_empty_label_rejected() {
    assert!(matches!(reason("http://.com"), InvalidUrlError::InvalidIdn(_)));
    assert!(matches!(reason("http://a..b.com/"), InvalidUrlError::InvalidIdn(_)));
}

#[test]
fn test_overlong_label_rejected() {
    let url = format!("http://{}.com/", "a".repeat(64));
    assert!(matches!(reason(&url), InvalidUrlError::InvalidIdn(_)));
}

#[test]
fn test_null_byte_in_host_rejected() {
    assert!(matches!(
        reason("https://xn--bcher-kva.com\x00"),
        InvalidUrlError::InvalidIdn(_)
    ));
}

#[test]
fn test_control_character_in_path_rejected() {
    assert!(matches!(
        reason("https://example.com/a\x07b"),
        InvalidUrlError::Malformed(_)
    ));
}

#[test]
fn test_max_length_policy_cannot_exceed_hard_limit() {
    let validator = UrlValidator::new(ValidatorPolicy {
        max_length: 5_000,
        ..ValidatorPolicy::default()
    });
    let url = format!("http://example.com/{}", "a".repeat(3_000));
    assert_eq!(
        validator.validate(&url).unwrap_err(),
        InvalidUrlError::TooLong {
            length: url.chars().count(),
            max: MAX_URL_LENGTH
        }
    );
}

#[test]
fn test_max_length_policy_respected() {
    let validator = UrlValidator::new(ValidatorPolicy {
        max_length: 24,
        ..ValidatorPolicy::default()
    });
    assert!(validator.validate("http://example.com/abcde").is_ok());
    assert!(matches!(
        validator.validate("http://example.com/abcdef"),
        Err(InvalidUrlError::TooLong { length: 25, max: 24 })
    ));
}
