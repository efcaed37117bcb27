//! Configuration management
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `MAKECONSOLE_` prefix, `__` for nesting)
//! 2. `./config.toml` (development)
//! 3. `~/.config/makeconsole/config.toml` (user config, XDG)
//! 4. `/etc/makeconsole/config.toml` (system config)
//! 5. Hardcoded defaults (fallback)
//!
//! Command line flags are applied on top by the binary.
//!
//! The listening port follows the hosting convention instead: `PORT`, then
//! `HTTP_PLATFORM_PORT`, then `service.port`.
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! [service]
//! url = "https://console.example.com"
//! bind_address = "0.0.0.0"
//! port = 8080
//!
//! [templates]
//! template_dir = "./templates"
//! cache_enabled = true
//! fallback = "terminal"
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::binding::DEFAULT_TEMPLATE;
use crate::error::StartupError;

/// Service name used for configuration paths
pub const SERVICE_NAME: &str = "makeconsole";

/// Prefix of configuration environment variables
const ENV_PREFIX: &str = "MAKECONSOLE_";

/// Environment variables consulted for the listening port, in order
const PORT_VARIABLES: [&str; 2] = ["PORT", "HTTP_PLATFORM_PORT"];

/// HTTP service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Public base URL, shown in the help image
    pub url: String,

    /// Address to bind the listener to
    pub bind_address: String,

    /// Port used when neither `PORT` nor `HTTP_PLATFORM_PORT` is set
    pub port: Option<u16>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            bind_address: "0.0.0.0".to_string(),
            port: None,
        }
    }
}

impl ServiceSettings {
    /// Resolve the listening port from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if no port is configured anywhere or the configured
    /// value is not a port number.
    pub fn listen_port(&self) -> Result<u16, StartupError> {
        self.listen_port_from(|name| std::env::var(name).ok())
    }

    /// Resolve the listening port using `lookup` to read variables
    ///
    /// Empty variables count as unset.
    ///
    /// # Errors
    ///
    /// See [`Self::listen_port`].
    pub fn listen_port_from<F>(&self, lookup: F) -> Result<u16, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = PORT_VARIABLES
            .iter()
            .find_map(|name| lookup(name).filter(|value| !value.is_empty()));

        match from_env {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| StartupError::InvalidPort { value, source }),
            None => self.port.ok_or(StartupError::PortNotSet),
        }
    }
}

/// Template store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directory containing `*.svg` templates
    pub template_dir: PathBuf,

    /// Load all templates once at startup
    ///
    /// When disabled, every request reads its template from disk and a
    /// missing template is an error instead of falling back.
    pub cache_enabled: bool,

    /// Template rendered when the requested one does not exist
    pub fallback: String,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("."),
            cache_enabled: true,
            fallback: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Complete makeconsole configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MakeconsoleConfig {
    /// HTTP service settings
    #[serde(default)]
    pub service: ServiceSettings,

    /// Template settings
    #[serde(default)]
    pub templates: TemplateSettings,
}

impl MakeconsoleConfig {
    /// Load configuration for a specific service
    ///
    /// Searches for configuration in XDG-compliant locations with precedence:
    /// 1. Environment variables (`MAKECONSOLE_*`, use `__` for nesting)
    /// 2. `./config.toml`
    /// 3. `~/.config/{service_name}/config.toml`
    /// 4. `/etc/{service_name}/config.toml`
    /// 5. Defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file cannot be parsed or a value
    /// has the wrong type.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use makeconsole::config::MakeconsoleConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = MakeconsoleConfig::load_for_service("makeconsole")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_for_service(service_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new()
            // 5. Defaults (lowest priority)
            .merge(Toml::string(&toml::to_string(&Self::default())?));

        // 4. System config
        let system_config = PathBuf::from("/etc").join(service_name).join("config.toml");
        if system_config.exists() {
            figment = figment.merge(Toml::file(&system_config));
        }

        // 3. User config
        let user_config = Self::recommended_path(service_name);
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        // 2. Local config
        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        // 1. Environment variables (highest priority)
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        Ok(figment.extract()?)
    }

    /// Load configuration from a specific file
    ///
    /// Environment variables still override values from the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, contains invalid TOML or
    /// a value has the wrong type.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StartupError::ConfigNotFound(path.to_path_buf()).into());
        }

        let config = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .extract()?;

        Ok(config)
    }

    /// Get the recommended XDG config path for a service
    ///
    /// Returns `~/.config/{service_name}/config.toml`, or `./config.toml` if
    /// the platform has no config directory.
    #[must_use]
    pub fn recommended_path(service_name: &str) -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./config.toml"),
            |config_dir| config_dir.join(service_name).join("config.toml"),
        )
    }
}
