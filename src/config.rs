//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/racktopo/racktopo.toml`
//! 3. Cluster file: passed via `--config`
//! 4. Environment variables: `RACKTOPO_*` prefix

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::NetworkLocation;

/// Rack for nodes that have no explicit mapping.
pub const DEFAULT_RACK: &str = "/default-rack";

/// One statically registered storage node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeEntry {
    /// Bookie id, e.g. `bookie-1:3181`
    pub id: String,
    /// Network location; `default_rack` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack: Option<String>,
}

/// Unified configuration for racktopo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Rack used for nodes without an explicit rack
    pub default_rack: String,
    /// Static cluster membership
    pub nodes: Vec<NodeEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_rack: DEFAULT_RACK.to_string(),
            nodes: Vec::new(),
        }
    }
}

/// Get the XDG config directory for racktopo.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "racktopo").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("racktopo.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    shellexpand::full(path)
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| PathBuf::from(path))
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `cluster_file` - Optional cluster file; it must exist when given
    pub fn load(cluster_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut builder = defaults_builder()?;

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }
        if let Some(path) = cluster_file {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("RACKTOPO")
                .prefix_separator("_")
                .separator("__"),
        );

        Self::build(builder)
    }

    /// Load ONLY defaults plus the given file (no global config, no env vars).
    pub fn load_file_only(cluster_file: &Path) -> Result<Self, ApplicationError> {
        let builder = defaults_builder()?.add_source(File::from(cluster_file).required(true));
        Self::build(builder)
    }

    /// Parse settings from TOML text layered over the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ApplicationError> {
        let builder = defaults_builder()?.add_source(File::from_str(content, FileFormat::Toml));
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ApplicationError> {
        let config = builder.build().map_err(config_err)?;
        let settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.validate()?;
        Ok(settings)
    }

    /// The default rack must itself be a usable leaf location.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        NetworkLocation::parse(Some(&self.default_rack)).map_err(|e| ApplicationError::Config {
            message: format!("default_rack: {e}"),
        })?;
        Ok(())
    }

    /// Rack configured for `id`, falling back to the default rack.
    pub fn rack_for(&self, id: &str) -> &str {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .and_then(|n| n.rack.as_deref())
            .unwrap_or(&self.default_rack)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# racktopo configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/racktopo/racktopo.toml
#   Cluster: file passed with --config
#   Env:     RACKTOPO_* environment variables (e.g. RACKTOPO_DEFAULT_RACK)

# Rack for nodes listed without a rack
# default_rack = "/default-rack"

# Static cluster membership. Every node needs a bookie id; all racks must
# have the same depth ("/rack1" and "/dc1/rack1" cannot be mixed).
# [[nodes]]
# id = "bookie-1:3181"
# rack = "/rack1"
#
# [[nodes]]
# id = "bookie-2:3181"
"#
        .to_string()
    }
}

fn defaults_builder() -> Result<ConfigBuilder<DefaultState>, ApplicationError> {
    let defaults = Settings::default();
    Config::builder()
        .set_default("default_rack", defaults.default_rack)
        .map_err(config_err)
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
