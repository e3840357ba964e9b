use std::{env, path::PathBuf, str::FromStr};

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_MODEL_PATH: &str = "AQI_Forecasting.safetensors";
pub const DEFAULT_COLUMNS_PATH: &str = "model_columns.json";

/// Process configuration, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    host: String,
    port: u16,
    model_path: PathBuf,
    columns_path: PathBuf,
    fail_fast: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            columns_path: PathBuf::from(DEFAULT_COLUMNS_PATH),
            fail_fast: false,
        }
    }
}

impl ServiceConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Returns
    /// The configuration or an error if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// # Args
    /// * `lookup` - Returns the value of a variable, or `None` if unset.
    ///
    /// # Returns
    /// The configuration, unset variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let fail_fast = match lookup("AQI_FAIL_FAST") {
            None => defaults.fail_fast,
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidVar {
                key: "AQI_FAIL_FAST",
                value: raw,
            })?,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            model_path: lookup("AQI_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            columns_path: lookup("AQI_COLUMNS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.columns_path),
            fail_fast,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Location of the safetensors estimator artifact.
    pub fn model_path(&self) -> &PathBuf {
        &self.model_path
    }

    /// Location of the JSON feature-name list.
    pub fn columns_path(&self) -> &PathBuf {
        &self.columns_path
    }

    /// Whether a load failure should abort startup instead of serving in an unavailable state.
    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVar { key, value: raw }),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.port(), 10000);
        assert_eq!(config.host(), "0.0.0.0");
        assert!(!config.fail_fast());
    }

    #[test]
    fn reads_every_variable() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("AQI_MODEL_PATH", "/models/aqi.safetensors"),
            ("AQI_COLUMNS_PATH", "/models/columns.json"),
            ("AQI_FAIL_FAST", "true"),
        ]))
        .unwrap();

        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.port(), 8080);
        assert_eq!(config.model_path(), &PathBuf::from("/models/aqi.safetensors"));
        assert_eq!(config.columns_path(), &PathBuf::from("/models/columns.json"));
        assert!(config.fail_fast());
    }

    #[test]
    fn rejects_non_numeric_port() {
        let err = ServiceConfig::from_lookup(lookup(&[("PORT", "ten thousand")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { key: "PORT", .. }));
    }

    #[test]
    fn rejects_unknown_flag() {
        let err = ServiceConfig::from_lookup(lookup(&[("AQI_FAIL_FAST", "maybe")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                key: "AQI_FAIL_FAST",
                ..
            }
        ));
    }
}
