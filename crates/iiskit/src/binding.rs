//! Site binding parsing.
//!
//! appcmd accepts bindings in URL form (`https://*:443/`) and reports them
//! back in its own form (`https/*:443:`, comma-separated when a site has
//! several). Both are parsed here so the certificate step never has to slice
//! strings by position.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// `protocol://host:port` with an optional trailing slash.
static URL_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9.+-]*)://([^:/,\s]+):(\d{1,5})/?$").expect("valid regex")
});

/// `protocol/address:port:hostheader` as listed by appcmd.
static APPCMD_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9.+-]*)/([^:/\s]+):(\d{1,5}):([^,\s]*)$").expect("valid regex")
});

/// Protocol that gets a certificate bound to its port.
pub const SECURE_PROTOCOL: &str = "https";

/// A parsed site binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Protocol, e.g. `http` or `https`
    pub protocol: String,
    /// Host name or address; `*` for all addresses
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Binding {
    /// Parse a binding in URL form or appcmd form.
    pub fn parse(binding: &str) -> Result<Self> {
        let trimmed = binding.trim();

        if let Some(caps) = URL_FORM.captures(trimmed) {
            return Self::from_parts(binding, &caps[1], &caps[2], &caps[3]);
        }

        if let Some(caps) = APPCMD_FORM.captures(trimmed) {
            // The host header wins over the listening address when present
            let host = match &caps[4] {
                "" => &caps[2],
                header => header,
            };
            return Self::from_parts(binding, &caps[1], host, &caps[3]);
        }

        Err(Error::malformed_binding(
            binding,
            "expected protocol://host:port/ or protocol/address:port:host",
        ))
    }

    /// Parse a comma-separated binding list as reported by appcmd.
    ///
    /// Entries that are not http-style bindings (`net.tcp/808:*`) are skipped.
    pub fn parse_list(bindings: &str) -> Vec<Self> {
        bindings
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .filter_map(|b| match Self::parse(b) {
                Ok(binding) => Some(binding),
                Err(e) => {
                    log::debug!("Skipping binding entry: {e}");
                    None
                }
            })
            .collect()
    }

    /// Parse a configured binding that may list several comma-separated
    /// entries. Unlike [`Binding::parse_list`], every entry must parse.
    pub fn parse_all(bindings: &str) -> Result<Vec<Self>> {
        let list = bindings
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(Self::parse)
            .collect::<Result<Vec<_>>>()?;
        if list.is_empty() {
            return Err(Error::malformed_binding(bindings, "no bindings listed"));
        }
        Ok(list)
    }

    /// Format a binding in URL form.
    pub fn format_url(protocol: &str, host: &str, port: u16) -> String {
        format!("{protocol}://{host}:{port}")
    }

    /// Whether a certificate should be bound for this binding.
    pub fn is_secure(&self) -> bool {
        self.protocol.eq_ignore_ascii_case(SECURE_PROTOCOL)
    }

    fn from_parts(original: &str, protocol: &str, host: &str, port: &str) -> Result<Self> {
        let port: u16 = port
            .parse()
            .map_err(|_| Error::malformed_binding(original, format!("port {port} out of range")))?;
        if port == 0 {
            return Err(Error::malformed_binding(original, "port must not be 0"));
        }
        Ok(Self {
            protocol: protocol.to_lowercase(),
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::format_url(&self.protocol, &self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_form() {
        let b = Binding::parse("https://*:443/").unwrap();
        assert_eq!(b.protocol, "https");
        assert_eq!(b.host, "*");
        assert_eq!(b.port, 443);
        assert!(b.is_secure());

        let b = Binding::parse("http://example.com:8080").unwrap();
        assert_eq!(b.host, "example.com");
        assert_eq!(b.port, 8080);
        assert!(!b.is_secure());
    }

    #[test]
    fn test_parse_appcmd_form() {
        let b = Binding::parse("https/*:443:").unwrap();
        assert_eq!(b.protocol, "https");
        assert_eq!(b.host, "*");
        assert_eq!(b.port, 443);

        let b = Binding::parse("http/10.0.0.5:80:shop.example.com").unwrap();
        assert_eq!(b.host, "shop.example.com");
        assert_eq!(b.port, 80);
    }

    #[test]
    fn test_protocol_is_case_insensitive() {
        let b = Binding::parse("HTTPS://*:443/").unwrap();
        assert_eq!(b.protocol, "https");
        assert!(b.is_secure());
    }

    #[test]
    fn test_malformed() {
        for bad in [
            "",
            "https",
            "https:443",
            "https://*",
            "https://*:/",
            "https://*:99999/",
            "https://*:0/",
            "https:// *:443/",
            "https/*:443",
        ] {
            let err = Binding::parse(bad).unwrap_err();
            assert!(
                matches!(err, Error::MalformedBinding { .. }),
                "expected malformed for {bad:?}"
            );
        }
    }

    #[test]
    fn test_parse_list_skips_non_http_entries() {
        let list = Binding::parse_list("http/*:80:,net.tcp/808:*,https/*:443:");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].port, 80);
        assert!(list[1].is_secure());
        assert_eq!(list[1].port, 443);
    }

    #[test]
    fn test_appcmd_host_header_stops_at_comma() {
        let listed = "http/*:80:,https/*:443:";
        let err = Binding::parse(listed).unwrap_err();
        assert!(matches!(err, Error::MalformedBinding { .. }));

        let list = Binding::parse_list(listed);
        assert_eq!(list.len(), 2);
        assert!(!list[0].is_secure());
        assert!(list[1].is_secure());
    }

    #[test]
    fn test_parse_all_requires_every_entry() {
        let list = Binding::parse_all("http://*:80/, https://*:443/").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].port, 443);

        assert!(Binding::parse("https://a,b:443/").is_err());
        assert!(Binding::parse_all("https://*:443/,bogus").is_err());
        assert!(Binding::parse_all(",").is_err());
    }

    #[test]
    fn test_display_uses_url_form() {
        let b = Binding::parse("https/*:443:").unwrap();
        assert_eq!(b.to_string(), "https://*:443");
    }
}
