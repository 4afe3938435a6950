//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services as
//! `Arc<CoreConfig>`. Request handling never reads process-wide environment variables.

use crate::constants::{AUTH_DIR_NAME, CLINIC_DIR_NAME, DEFAULT_TOKEN_TTL_HOURS};
use crate::{CoreError, CoreResult};
use chrono::Duration;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: Option<PathBuf>,
    jwt_secret: String,
    token_ttl: Duration,
    trust_forwarded_identity: bool,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `data_dir` of `None` keeps every store in memory.
    pub fn new(
        data_dir: Option<PathBuf>,
        jwt_secret: String,
        token_ttl: Duration,
        trust_forwarded_identity: bool,
    ) -> CoreResult<Self> {
        if jwt_secret.trim().is_empty() {
            return Err(CoreError::invalid("jwt_secret cannot be empty"));
        }
        if token_ttl <= Duration::zero() {
            return Err(CoreError::invalid("token lifetime must be positive"));
        }

        Ok(Self {
            data_dir,
            jwt_secret,
            token_ttl,
            trust_forwarded_identity,
        })
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Directory holding the auth service's collections, if persistent.
    pub fn auth_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(AUTH_DIR_NAME))
    }

    /// Directory holding the clinic service's collections, if persistent.
    pub fn clinic_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(CLINIC_DIR_NAME))
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Whether an `x-user-info` header set by the gateway is accepted as the caller identity.
    pub fn trust_forwarded_identity(&self) -> bool {
        self.trust_forwarded_identity
    }
}

/// Parse a token lifetime such as `24h`, `30m`, `7d` or `3600s`.
///
/// A bare number is read as seconds. `None` or blank falls back to the default of 24 hours.
pub fn token_ttl_from_env_value(value: Option<String>) -> CoreResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let Some(value) = value else {
        return Ok(Duration::hours(DEFAULT_TOKEN_TTL_HOURS));
    };

    let invalid = || CoreError::invalid(format!("invalid token lifetime: '{}'", value));

    let (digits, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], Some(c)),
        _ => (value.as_str(), None),
    };
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    match unit {
        None | Some('s') => Ok(Duration::seconds(amount)),
        Some('m') => Ok(Duration::minutes(amount)),
        Some('h') => Ok(Duration::hours(amount)),
        Some('d') => Ok(Duration::days(amount)),
        Some(_) => Err(invalid()),
    }
}

/// Parse a boolean flag (`true/false/1/0/yes/no`), falling back to `default` when unset.
pub fn flag_from_env_value(value: Option<String>, default: bool) -> CoreResult<bool> {
    match value.as_deref().map(str::trim).map(str::to_ascii_lowercase) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(CoreError::invalid(format!("invalid boolean flag: '{}'", v))),
        },
    }
}

/// Interpret the data directory setting: unset or blank means in-memory storage.
pub fn data_dir_from_env_value(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_ttl_defaults_to_24_hours() {
        assert_eq!(token_ttl_from_env_value(None).unwrap(), Duration::hours(24));
        assert_eq!(
            token_ttl_from_env_value(Some("  ".into())).unwrap(),
            Duration::hours(24)
        );
    }

    #[test]
    fn test_token_ttl_units() {
        assert_eq!(
            token_ttl_from_env_value(Some("30m".into())).unwrap(),
            Duration::minutes(30)
        );
        assert_eq!(
            token_ttl_from_env_value(Some("7d".into())).unwrap(),
            Duration::days(7)
        );
        assert_eq!(
            token_ttl_from_env_value(Some("90".into())).unwrap(),
            Duration::seconds(90)
        );
    }

    #[test]
    fn test_token_ttl_rejects_garbage() {
        assert!(token_ttl_from_env_value(Some("soon".into())).is_err());
        assert!(token_ttl_from_env_value(Some("0h".into())).is_err());
        assert!(token_ttl_from_env_value(Some("5w".into())).is_err());
    }

    #[test]
    fn test_flag_parsing() {
        assert!(flag_from_env_value(None, true).unwrap());
        assert!(!flag_from_env_value(Some("no".into()), true).unwrap());
        assert!(flag_from_env_value(Some("1".into()), false).unwrap());
        assert!(flag_from_env_value(Some("maybe".into()), false).is_err());
    }

    #[test]
    fn test_config_rejects_empty_secret() {
        let result = CoreConfig::new(None, " ".into(), Duration::hours(1), true);
        assert!(result.is_err());
    }

    #[test]
    fn test_service_dirs_follow_data_dir() {
        let cfg = CoreConfig::new(
            Some(PathBuf::from("/srv/healthcure")),
            "secret".into(),
            Duration::hours(1),
            false,
        )
        .unwrap();

        assert_eq!(cfg.auth_dir(), Some(PathBuf::from("/srv/healthcure/auth")));
        assert_eq!(cfg.clinic_dir(), Some(PathBuf::from("/srv/healthcure/clinic")));
        assert!(!cfg.trust_forwarded_identity());
    }
}
