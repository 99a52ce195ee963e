//! Loading and validation of settings.
//!
//! Values defined in the configuration file can be overridden by environment variables. An example
//! configuration file can be found in the `configs/` directory located in the repository root.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use config::{Config, ConfigError, Environment};
use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize,
};
use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Error, Debug)]
/// An error related to loading and validation of settings.
pub enum SettingsError {
    #[error("configuration loading failed: {0}")]
    Loading(#[from] ConfigError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Validate, Deserialize)]
/// The combined settings.
///
/// Each section in the configuration file corresponds to the identically named settings field.
pub struct Settings {
    #[serde(default)]
    #[validate]
    pub registry: RegistrySettings,
    pub log: LoggingSettings,
}

impl Settings {
    /// Loads and validates the settings via a configuration file.
    ///
    /// # Errors
    /// Fails when the loading of the configuration file or its validation failed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let settings: Settings = Self::load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("worker_registry")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Validate, Deserialize, Clone)]
#[validate(schema(function = "validate_registry"))]
/// Worker registry settings.
pub struct RegistrySettings {
    /// Whether workers have to authenticate with a signed challenge. In unsafe mode every worker
    /// is accepted and gets a new identity on every request.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [registry]
    /// safe_mode = true
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// WORKER_REGISTRY_REGISTRY__SAFE_MODE=true
    /// ```
    #[serde(default = "default_safe_mode")]
    pub safe_mode: bool,

    /// The path to a file with the public keys of the workers that are allowed from the start, one
    /// hex encoded key per line. Must be left out in unsafe mode.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [registry]
    /// key_list = "configs/workers.keys"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// WORKER_REGISTRY_REGISTRY__KEY_LIST=configs/workers.keys
    /// ```
    #[serde(default)]
    pub key_list: Option<PathBuf>,
}

fn default_safe_mode() -> bool {
    true
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            safe_mode: default_safe_mode(),
            key_list: None,
        }
    }
}

impl RegistrySettings {
    /// Checks that no key list is given in unsafe mode.
    fn validate_registry(&self) -> Result<(), ValidationError> {
        if !self.safe_mode && self.key_list.is_some() {
            Err(ValidationError::new("key list provided in unsafe mode"))
        } else {
            Ok(())
        }
    }
}

/// A wrapper for validate derive.
fn validate_registry(s: &RegistrySettings) -> Result<(), ValidationError> {
    s.validate_registry()
}

#[derive(Debug, Deserialize)]
/// Logging settings.
pub struct LoggingSettings {
    /// A comma-separated list of logging directives. More information about logging directives
    /// can be found [here].
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [log]
    /// filter = "info"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// WORKER_REGISTRY_LOG__FILTER=info
    /// ```
    ///
    /// [here]: https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/filter/struct.EnvFilter.html#directives
    #[serde(deserialize_with = "deserialize_env_filter")]
    pub filter: EnvFilter,
}

fn deserialize_env_filter<'de, D>(deserializer: D) -> Result<EnvFilter, D::Error>
where
    D: Deserializer<'de>,
{
    struct EnvFilterVisitor;

    impl<'de> Visitor<'de> for EnvFilterVisitor {
        type Value = EnvFilter;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a valid tracing filter directive: https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/filter/struct.EnvFilter.html#directives")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            EnvFilter::try_new(value)
                .map_err(|_| de::Error::invalid_value(serde::de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_str(EnvFilterVisitor)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_settings_new() {
        assert!(Settings::new("configs/config.toml").is_ok());
        assert!(Settings::new("").is_err());
    }

    #[test]
    fn test_settings_sections() {
        let file = config_file(
            r#"
            [registry]
            safe_mode = true
            key_list = "workers.keys"

            [log]
            filter = "debug"
            "#,
        );
        let settings = Settings::new(file.path()).unwrap();
        assert!(settings.registry.safe_mode);
        assert_eq!(
            settings.registry.key_list,
            Some(PathBuf::from("workers.keys"))
        );
    }

    #[test]
    fn test_registry_defaults_to_safe_mode() {
        let file = config_file(
            r#"
            [log]
            filter = "info"
            "#,
        );
        let settings = Settings::new(file.path()).unwrap();
        assert!(settings.registry.safe_mode);
        assert!(settings.registry.key_list.is_none());
    }

    #[test]
    fn test_unsafe_mode_with_key_list_is_rejected() {
        let file = config_file(
            r#"
            [registry]
            safe_mode = false
            key_list = "workers.keys"

            [log]
            filter = "info"
            "#,
        );
        assert!(matches!(
            Settings::new(file.path()),
            Err(SettingsError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_log_filter_is_rejected() {
        let file = config_file(
            r#"
            [registry]
            safe_mode = false

            [log]
            filter = "worker_registry=notalevel"
            "#,
        );
        assert!(matches!(
            Settings::new(file.path()),
            Err(SettingsError::Loading(_))
        ));
    }

    #[test]
    fn test_validate_registry() {
        let settings = |safe_mode, key_list: Option<&str>| RegistrySettings {
            safe_mode,
            key_list: key_list.map(PathBuf::from),
        };
        assert!(settings(true, None).validate().is_ok());
        assert!(settings(true, Some("workers.keys")).validate().is_ok());
        assert!(settings(false, None).validate().is_ok());
        assert!(settings(false, Some("workers.keys")).validate().is_err());
    }
}
