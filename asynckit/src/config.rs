//! Environment-driven configuration.
//!
//! Empty variables count as unset. A variable that is set but cannot be
//! parsed is a [`UsageError::InvalidEnvVar`].

use crate::errors::UsageError;
use crate::pipeline::{RetryConfig, RetryType};
use std::str::FromStr;

/// Reads a process environment variable, treating empty values as unset.
pub(crate) fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T, L>(lookup: &L, name: &str) -> Result<Option<T>, UsageError>
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    value
        .parse()
        .map(Some)
        .map_err(|_| UsageError::InvalidEnvVar {
            name: name.to_string(),
            value,
        })
}

impl RetryConfig {
    /// Builds a retry config from `RETRY_*` variables on top of the defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `RETRY_BACKOFF_BASE_MS` | `backoff_base_ms` |
    /// | `RETRY_RETRIES` | `retries` |
    /// | `RETRY_TIMEOUT_MS` | `timeout_operation_ms` |
    /// | `RETRY_JITTER_FACTOR` | `jitter_factor` |
    /// | `RETRY_TYPE` | `retry_type` (`linear` or `exponential`) |
    pub fn from_env() -> Result<Self, UsageError> {
        Self::from_lookup(env_lookup)
    }

    /// Same as [`RetryConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, UsageError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base) = parse_var(&lookup, "RETRY_BACKOFF_BASE_MS")? {
            config.backoff_base_ms = base;
        }
        if let Some(retries) = parse_var(&lookup, "RETRY_RETRIES")? {
            config.retries = retries;
        }
        if let Some(timeout) = parse_var(&lookup, "RETRY_TIMEOUT_MS")? {
            config.timeout_operation_ms = Some(timeout);
        }
        if let Some(jitter) = parse_var(&lookup, "RETRY_JITTER_FACTOR")? {
            config.jitter_factor = jitter;
        }
        if let Some(value) = lookup("RETRY_TYPE") {
            config.retry_type = RetryType::from_str(&value).map_err(|_| UsageError::InvalidEnvVar {
                name: "RETRY_TYPE".to_string(),
                value,
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = RetryConfig::from_lookup(lookup_from(&[])).expect("defaults are valid");
        assert_eq!(config, RetryConfig::default());
    }

    #[test]
    fn test_reads_all_fields() {
        let config = RetryConfig::from_lookup(lookup_from(&[
            ("RETRY_BACKOFF_BASE_MS", "250"),
            ("RETRY_RETRIES", "5"),
            ("RETRY_TIMEOUT_MS", "2000"),
            ("RETRY_JITTER_FACTOR", "0"),
            ("RETRY_TYPE", "Linear"),
        ]))
        .expect("valid config");

        assert_eq!(
            config,
            RetryConfig::new()
                .with_backoff_base_ms(250)
                .with_retries(5)
                .with_timeout_ms(2000)
                .with_jitter_factor(0.0)
                .with_retry_type(RetryType::Linear)
        );
    }

    #[test]
    fn test_unparsable_value() {
        let err = RetryConfig::from_lookup(lookup_from(&[("RETRY_RETRIES", "three")])).unwrap_err();
        assert_eq!(
            err,
            UsageError::InvalidEnvVar {
                name: "RETRY_RETRIES".to_string(),
                value: "three".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_retry_type() {
        let err = RetryConfig::from_lookup(lookup_from(&[("RETRY_TYPE", "fibonacci")])).unwrap_err();
        assert!(matches!(err, UsageError::InvalidEnvVar { name, .. } if name == "RETRY_TYPE"));
    }

    #[test]
    fn test_parsed_values_are_validated() {
        let err = RetryConfig::from_lookup(lookup_from(&[("RETRY_RETRIES", "0")])).unwrap_err();
        assert!(matches!(err, UsageError::InvalidRetryConfig(_)));
    }
}
