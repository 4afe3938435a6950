use crate::routes::Upstream;
use crate::GatewayError;

pub const DEFAULT_AUTH_URL: &str = "http://localhost:3001";
pub const DEFAULT_CLINIC_URL: &str = "http://localhost:3002";

/// Base URLs of the downstream services.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    auth_url: String,
    clinic_url: String,
}

impl GatewayConfig {
    /// `None` falls back to the local default for that service. Trailing slashes are dropped.
    pub fn new(auth_url: Option<String>, clinic_url: Option<String>) -> Result<Self, GatewayError> {
        Ok(Self {
            auth_url: base_url(auth_url, DEFAULT_AUTH_URL)?,
            clinic_url: base_url(clinic_url, DEFAULT_CLINIC_URL)?,
        })
    }

    pub fn base_url(&self, upstream: Upstream) -> &str {
        match upstream {
            Upstream::Auth => &self.auth_url,
            Upstream::Clinic => &self.clinic_url,
        }
    }
}

fn base_url(value: Option<String>, default: &str) -> Result<String, GatewayError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string());
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(GatewayError::InvalidUpstreamUrl(value));
    }
    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_trimming() {
        let cfg = GatewayConfig::new(None, Some("http://clinic:3002/ ".into())).unwrap();
        assert_eq!(cfg.base_url(Upstream::Auth), DEFAULT_AUTH_URL);
        assert_eq!(cfg.base_url(Upstream::Clinic), "http://clinic:3002");
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(matches!(
            GatewayConfig::new(Some("auth:3001".into()), None),
            Err(GatewayError::InvalidUpstreamUrl(_))
        ));
    }
}
