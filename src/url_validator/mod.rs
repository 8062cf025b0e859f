mod components;
mod errors;
mod ip_guard;
#[cfg(test)]
mod tests;

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};
use url::{Host, ParseError, Url};

pub use errors::InvalidUrlError;
pub use ip_guard::is_forbidden_ip;

/// Maximum accepted URL length, in characters, before normalization.
pub const MAX_URL_LENGTH: usize = 2048;

/// Schemes a QR target may use.
pub const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

// DNS limits applied to the ASCII form of a hostname.
const MAX_LABEL_LENGTH: usize = 63;
const MAX_HOST_LENGTH: usize = 253;

/// A URL that passed every validation step.
///
/// The scheme is lowercase, the host is in ASCII-compatible form and is not a
/// private or loopback literal, and the string re-parses as a URL. Only the
/// validator constructs values of this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Host portion of the URL, as stored in the normalized string.
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.0)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned))
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Tunable parts of URL validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorPolicy {
    /// Upper bound on input length in characters. Values above
    /// [`MAX_URL_LENGTH`] are treated as [`MAX_URL_LENGTH`].
    pub max_length: usize,
    /// Also refuse `localhost` and `*.localhost` domain names. Off by default:
    /// only literal addresses are refused unless this is set.
    pub block_local_hostnames: bool,
}

impl Default for ValidatorPolicy {
    fn default() -> Self {
        Self {
            max_length: MAX_URL_LENGTH,
            block_local_hostnames: false,
        }
    }
}

/// Checks and canonicalizes untrusted URL strings.
///
/// Validation is a pure function of the input and the policy: there is no
/// network access, no DNS resolution and no shared state, so one validator can
/// be used from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct UrlValidator {
    policy: ValidatorPolicy,
}

impl UrlValidator {
    pub fn new(policy: ValidatorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidatorPolicy {
        &self.policy
    }

    /// Validates `raw` and returns its canonical form.
    ///
    /// Steps, stopping at the first failure:
    /// 1. Reject empty input and input longer than the policy limit
    /// 2. Parse, prefixing `http://` once when the input has no scheme but
    ///    looks like a host (`example.com/path`)
    /// 3. Require a scheme and a `//` authority
    /// 4. Require the scheme to be http or https
    /// 5. Require a non-empty host
    /// 6. Convert the host to its punycode form and check its labels
    /// 7. Refuse private, loopback and link-local IP literals
    /// 8. Rebuild the string with the lowercase scheme and converted host,
    ///    keeping the original port, path, query and fragment
    /// 9. Confirm the rebuilt string parses again
    pub fn validate(&self, raw: &str) -> Result<NormalizedUrl, InvalidUrlError> {
        trace!("Validating candidate URL ({} bytes)", raw.len());

        // Step 1: emptiness and length, measured on the original input
        if raw.trim().is_empty() {
            debug!("Rejected empty URL");
            return Err(InvalidUrlError::Empty);
        }
        let max = self.policy.max_length.min(MAX_URL_LENGTH);
        let length = raw.chars().count();
        if length > max {
            debug!("Rejected URL exceeding maximum length: {} > {}", length, max);
            return Err(InvalidUrlError::TooLong { length, max });
        }
        let candidate = raw.trim();
        reject_control_characters(candidate)?;

        // Step 2: parse, with the scheme-less convenience
        let (effective, parsed) = parse_candidate(candidate)?;

        // Step 3: scheme and authority must both be present
        let parts = components::split(&effective).ok_or_else(|| {
            debug!("Rejected URL without an authority component: {}", effective);
            InvalidUrlError::Malformed("no '//' authority component".to_string())
        })?;
        if parsed.cannot_be_a_base() {
            return Err(InvalidUrlError::Malformed("opaque URL has no host".to_string()));
        }

        // Step 4: scheme allow-list
        let scheme = parsed.scheme();
        if !ALLOWED_SCHEMES.contains(&scheme) {
            debug!("Rejected disallowed scheme: {}", parts.scheme);
            return Err(InvalidUrlError::DisallowedScheme(parts.scheme.to_string()));
        }

        // Step 5: a host must be written out
        if parts.host.is_empty() {
            debug!("Rejected URL with empty host: {}", effective);
            return Err(InvalidUrlError::MissingHost);
        }
        let host = parsed.host().ok_or(InvalidUrlError::MissingHost)?;

        // Steps 6 and 7: ASCII host form, then the literal address guard
        let ascii_host = self.check_host(&host)?;

        // Step 8: canonical string
        let normalized = components::reassemble(scheme, &ascii_host, &parts);

        // Step 9: the result has to stand on its own
        if normalized.is_empty() || Url::parse(&normalized).is_err() {
            debug!("Normalized URL failed to re-parse: {}", normalized);
            return Err(InvalidUrlError::EmptyNormalized);
        }

        debug!("URL validated: {}", normalized);
        Ok(NormalizedUrl(normalized))
    }

    /// Checks the parsed host and returns the text to place in the normalized URL.
    fn check_host(&self, host: &Host<&str>) -> Result<String, InvalidUrlError> {
        match host {
            Host::Domain(domain) => {
                check_labels(domain)?;
                if self.policy.block_local_hostnames && is_local_hostname(domain) {
                    debug!("Rejected local-only hostname: {}", domain);
                    return Err(InvalidUrlError::LocalHostname(domain.to_string()));
                }
                Ok(domain.to_string())
            }
            Host::Ipv4(addr) => {
                if is_forbidden_ip((*addr).into()) {
                    debug!("Rejected private IPv4 target: {}", addr);
                    return Err(InvalidUrlError::PrivateAddress(addr.to_string()));
                }
                Ok(addr.to_string())
            }
            Host::Ipv6(addr) => {
                if is_forbidden_ip((*addr).into()) {
                    debug!("Rejected private IPv6 target: {}", addr);
                    return Err(InvalidUrlError::PrivateAddress(addr.to_string()));
                }
                Ok(format!("[{}]", addr))
            }
        }
    }
}

/// Validates `raw` with the default policy.
pub fn validate(raw: &str) -> Result<NormalizedUrl, InvalidUrlError> {
    UrlValidator::default().validate(raw)
}

/// Parses the candidate, retrying once with an `http://` prefix when it has no
/// usable scheme but starts with something host-like.
fn parse_candidate(candidate: &str) -> Result<(Cow<'_, str>, Url), InvalidUrlError> {
    match Url::parse(candidate) {
        // "example.com:8080/app" parses with "example.com" as its scheme
        Ok(url) if url.cannot_be_a_base() && url.scheme().contains('.') && looks_like_host(candidate) => {}
        Ok(url) => return Ok((Cow::Borrowed(candidate), url)),
        Err(ParseError::RelativeUrlWithoutBase) if looks_like_host(candidate) => {}
        Err(ParseError::RelativeUrlWithoutBase) => {
            debug!("Rejected URL without scheme or host: {}", candidate);
            return Err(InvalidUrlError::Malformed("missing scheme and domain/IP".to_string()));
        }
        Err(e) => return Err(parse_failure(candidate, e)),
    }

    let prefixed = format!("http://{}", candidate);
    trace!("Retrying parse with default scheme: {}", prefixed);
    match Url::parse(&prefixed) {
        Ok(url) => Ok((Cow::Owned(prefixed), url)),
        Err(e) => Err(parse_failure(&prefixed, e)),
    }
}

/// Maps a parser error to a rejection, reporting a bad scheme first when the
/// input names one.
fn parse_failure(input: &str, error: ParseError) -> InvalidUrlError {
    if let Some(scheme) = components::leading_scheme(input) {
        if !ALLOWED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) && input.contains("://") {
            return InvalidUrlError::DisallowedScheme(scheme.to_string());
        }
    }
    debug!("URL parse failure: {}", error);
    match error {
        ParseError::EmptyHost => InvalidUrlError::MissingHost,
        ParseError::IdnaError | ParseError::InvalidDomainCharacter => {
            InvalidUrlError::InvalidIdn(error.to_string())
        }
        other => InvalidUrlError::Malformed(other.to_string()),
    }
}

fn looks_like_host(candidate: &str) -> bool {
    components::host_position(candidate).contains('.')
}

/// Refuses control characters. Inside the host they are reported as a bad
/// domain name, elsewhere as a malformed URL.
fn reject_control_characters(candidate: &str) -> Result<(), InvalidUrlError> {
    if !candidate.contains(char::is_control) {
        return Ok(());
    }
    if components::host_position(candidate).contains(char::is_control) {
        debug!("Rejected hostname containing control characters");
        return Err(InvalidUrlError::InvalidIdn(
            "hostname contains control characters".to_string(),
        ));
    }
    debug!("Rejected URL containing control characters");
    Err(InvalidUrlError::Malformed("URL contains control characters".to_string()))
}

/// Applies DNS length rules to an already converted domain. A single trailing
/// dot (the root label) is allowed.
fn check_labels(domain: &str) -> Result<(), InvalidUrlError> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.len() > MAX_HOST_LENGTH {
        return Err(InvalidUrlError::InvalidIdn(format!(
            "hostname longer than {} characters",
            MAX_HOST_LENGTH
        )));
    }
    for label in domain.split('.') {
        if label.is_empty() {
            return Err(InvalidUrlError::InvalidIdn("empty label in hostname".to_string()));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(InvalidUrlError::InvalidIdn(format!(
                "label longer than {} characters",
                MAX_LABEL_LENGTH
            )));
        }
    }
    Ok(())
}

fn is_local_hostname(domain: &str) -> bool {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    domain == "localhost" || domain.ends_with(".localhost")
}
