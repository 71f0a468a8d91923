use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};

/// Where bureau documents come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SourceKind {
    /// Live report service over HTTP.
    #[default]
    Http,
    /// Built-in sample documents.
    Fixture,
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "fixture" => Ok(Self::Fixture),
            other => bail!("unknown bureau source `{other}` (expected `http` or `fixture`)"),
        }
    }
}

impl TryFrom<String> for SourceKind {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SourceKind> for String {
    fn from(kind: SourceKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Fixture => f.write_str("fixture"),
        }
    }
}

/// Configuration for reaching the bureau report service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BureauSettings {
    #[serde(default)]
    pub source: SourceKind,
    /// Base URL of the report service; required for [`SourceKind::Http`].
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Client-side request timeout. Unset means the transport default (none).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl BureauSettings {
    pub(crate) const SOURCE_ENV: &'static str = "CREDIT_LENS_SOURCE";
    pub(crate) const ENDPOINT_ENV: &'static str = "CREDIT_LENS_ENDPOINT";
    pub(crate) const API_KEY_ENV: &'static str = "CREDIT_LENS_API_KEY";
    pub(crate) const TIMEOUT_ENV: &'static str = "CREDIT_LENS_TIMEOUT_SECS";

    /// Load settings from environment variables.
    ///
    /// * `CREDIT_LENS_SOURCE`      : `http` (default) or `fixture`.
    /// * `CREDIT_LENS_ENDPOINT`    : Report service base URL.
    /// * `CREDIT_LENS_API_KEY`     : Optional bearer token.
    /// * `CREDIT_LENS_TIMEOUT_SECS`: Optional request timeout in seconds.
    pub fn from_env() -> Result<Self> {
        Self::from_map(std::env::vars().collect())
    }

    fn from_map(vars: HashMap<String, String>) -> Result<Self> {
        let non_blank = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let source = match non_blank(Self::SOURCE_ENV) {
            Some(raw) => raw
                .parse::<SourceKind>()
                .with_context(|| format!("invalid value for {}", Self::SOURCE_ENV))?,
            None => SourceKind::default(),
        };
        let timeout_secs = match non_blank(Self::TIMEOUT_ENV) {
            Some(raw) => Some(raw.parse::<u64>().with_context(|| {
                format!("{} must be a whole number of seconds", Self::TIMEOUT_ENV)
            })?),
            None => None,
        };

        Ok(Self {
            source,
            endpoint: non_blank(Self::ENDPOINT_ENV),
            api_key: non_blank(Self::API_KEY_ENV),
            timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn with_env_lock<F: FnOnce()>(func: F) {
        let _guard = ENV_LOCK.lock().unwrap();
        func();
    }

    fn clear_env() {
        env::remove_var(BureauSettings::SOURCE_ENV);
        env::remove_var(BureauSettings::ENDPOINT_ENV);
        env::remove_var(BureauSettings::API_KEY_ENV);
        env::remove_var(BureauSettings::TIMEOUT_ENV);
    }

    #[test]
    fn defaults_to_http_without_timeout() {
        with_env_lock(|| {
            clear_env();
            env::set_var(BureauSettings::ENDPOINT_ENV, "https://bureaus.example.com");
            let settings = BureauSettings::from_env().expect("should load settings");
            assert_eq!(settings.source, SourceKind::Http);
            assert_eq!(
                settings.endpoint.as_deref(),
                Some("https://bureaus.example.com")
            );
            assert!(settings.api_key.is_none());
            assert!(settings.timeout_secs.is_none());
            clear_env();
        });
    }

    #[test]
    fn parses_source_key_and_timeout() {
        with_env_lock(|| {
            clear_env();
            env::set_var(BureauSettings::SOURCE_ENV, " Fixture ");
            env::set_var(BureauSettings::API_KEY_ENV, "secret");
            env::set_var(BureauSettings::TIMEOUT_ENV, "45");
            let settings = BureauSettings::from_env().expect("should parse settings");
            assert_eq!(settings.source, SourceKind::Fixture);
            assert_eq!(settings.api_key.as_deref(), Some("secret"));
            assert_eq!(settings.timeout_secs, Some(45));
            clear_env();
        });
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let vars = HashMap::from([
            (BureauSettings::ENDPOINT_ENV.to_string(), "   ".to_string()),
            (BureauSettings::API_KEY_ENV.to_string(), String::new()),
        ]);
        let settings = BureauSettings::from_map(vars).unwrap();
        assert!(settings.endpoint.is_none());
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn rejects_unknown_source() {
        let vars = HashMap::from([(BureauSettings::SOURCE_ENV.to_string(), "ftp".to_string())]);
        let err = BureauSettings::from_map(vars).expect_err("ftp is not a source");
        assert!(format!("{err:#}").contains("unknown bureau source `ftp`"));
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let vars = HashMap::from([(BureauSettings::TIMEOUT_ENV.to_string(), "soon".to_string())]);
        let err = BureauSettings::from_map(vars).expect_err("timeout must be numeric");
        assert!(err.to_string().contains(BureauSettings::TIMEOUT_ENV));
    }

    #[test]
    fn deserializes_source_from_string() {
        let settings: BureauSettings =
            serde_json::from_str(r#"{"source":"fixture","timeout_secs":10}"#).unwrap();
        assert_eq!(settings.source, SourceKind::Fixture);
        assert_eq!(settings.timeout_secs, Some(10));
    }
}
