//! Tool address derivation
//!
//! Tool names end up as part of a hostname, so they are validated as
//! hostname labels before substitution into the configured address
//! template. A name that fails validation never produces an outbound
//! request.

use crate::config::{BridgeConfig, NAME_PLACEHOLDER};
use crate::error::{ClientError, ClientResult};
use url::Url;

/// Hostname labels cap at 63 octets.
const MAX_NAME_LEN: usize = 63;

/// Check that `name` is usable as a hostname label.
pub fn validate_tool_name(name: &str) -> ClientResult<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(ClientError::InvalidToolName(name.to_string()))
    }
}

/// Derive the invocation address for `name` from the configured template.
pub fn tool_endpoint(config: &BridgeConfig, name: &str) -> ClientResult<Url> {
    validate_tool_name(name)?;

    let address = config.tool_url_template.replace(NAME_PLACEHOLDER, name);
    Url::parse(&address).map_err(|e| {
        ClientError::InvalidConfig(format!(
            "derived tool address '{}' is not a valid URL: {}",
            address, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_default_address_for_echo() {
        let config = BridgeConfig::default();
        let url = tool_endpoint(&config, "echo").unwrap();
        assert_eq!(url, Url::parse("https://ajax-echo.web.val.run").unwrap());
        assert_eq!(url.host_str(), Some("ajax-echo.web.val.run"));
    }

    #[test]
    fn substitutes_into_custom_templates() {
        let config =
            BridgeConfig::new("https://example.com", "http://localhost:3000/run/{name}").unwrap();
        let url = tool_endpoint(&config, "weather-v2").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/run/weather-v2");
    }

    #[test]
    fn accepts_hostname_label_names() {
        for name in ["echo", "weather-v2", "a", "UPPER", "x123"] {
            assert!(validate_tool_name(name).is_ok(), "expected '{}' to validate", name);
        }
    }

    #[test]
    fn rejects_names_unsafe_in_a_hostname() {
        let too_long = "a".repeat(64);
        for name in ["", "not a host", "dots.are.out", "-edge", "edge-", "semi;colon", &too_long] {
            let err = validate_tool_name(name).unwrap_err();
            assert!(matches!(err, ClientError::InvalidToolName(_)), "expected '{}' rejected", name);
        }
    }

    #[test]
    fn invalid_name_never_reaches_url_construction() {
        let config = BridgeConfig::default();
        assert!(tool_endpoint(&config, "evil.example.com/x?").is_err());
    }
}
