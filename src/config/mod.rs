use crate::common::SerializerSettings;
use crate::error::{FilterError, Result};
use dashmap::DashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// Key holding the deployment environment name.
pub const ENVIRONMENT_KEY: &str = "APP_ENVIRONMENT";

/// Key toggling indented JSON in diagnostics and error bodies.
pub const JSON_PRETTY_KEY: &str = "APP_JSON_PRETTY";

/// Deployment posture controlling how much diagnostic detail reaches a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum EnvironmentMode {
    Development,
    Staging,
    #[default]
    Production,
}

impl EnvironmentMode {
    /// Development and Staging expose exception internals; Production never does.
    pub fn exposes_exception_detail(self) -> bool {
        matches!(self, EnvironmentMode::Development | EnvironmentMode::Staging)
    }
}

/// Answers "is this a diagnostic-friendly environment".
///
/// Queried once per failed request.
pub trait EnvironmentClassifier: Send + Sync + 'static {
    fn environment_mode(&self) -> EnvironmentMode;
}

impl EnvironmentClassifier for EnvironmentMode {
    fn environment_mode(&self) -> EnvironmentMode {
        *self
    }
}

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Create a service preloaded with the process environment.
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Parse [`ENVIRONMENT_KEY`]. A missing key means Production.
    pub fn try_environment_mode(&self) -> Result<EnvironmentMode> {
        match self.get(ENVIRONMENT_KEY) {
            None => Ok(EnvironmentMode::Production),
            Some(value) => EnvironmentMode::from_str(value.trim())
                .map_err(|_| FilterError::InvalidEnvironment { value }),
        }
    }

    /// Serializer settings derived from [`JSON_PRETTY_KEY`].
    pub fn serializer_settings(&self) -> Result<SerializerSettings> {
        let pretty = match self.get(JSON_PRETTY_KEY) {
            None => false,
            Some(value) => value
                .trim()
                .parse::<bool>()
                .map_err(|_| FilterError::InvalidConfig {
                    key: JSON_PRETTY_KEY.to_string(),
                    value,
                })?,
        };
        Ok(SerializerSettings { pretty })
    }
}

impl EnvironmentClassifier for ConfigService {
    fn environment_mode(&self) -> EnvironmentMode {
        // Validated at startup; a value changed afterwards to garbage degrades to Production.
        self.try_environment_mode().unwrap_or_default()
    }
}
