//! Configuration management for role-rectifier
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (RECTIFIER_* prefix, highest precedence)
//! 2. rectifier.local.toml (gitignored, local overrides)
//! 3. rectifier.toml (git-tracked, project config)
//! 4. ~/.config/role-rectifier/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! The loaded [`RectifierConfig`] is handed to the audit pipeline
//! explicitly; nothing here is process-global.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::{FileSource, LOCAL_FILE, PROJECT_FILE, Paths, SourceKind, USER_FILE};

/// Main role-rectifier configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifierConfig {
    pub cluster: ClusterConfig,
    pub audit: AuditConfig,
}

/// Where the audited cluster lives.
///
/// Nothing in this workspace dials the cluster. The URI is carried for a
/// driver-backed connector built outside it, and is not parsed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub uri: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
        }
    }
}

/// Knobs for role discovery, classification and privilege resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Principal audited when the caller does not name one.
    pub principal: Option<String>,

    /// Database that role definitions are read from.
    pub admin_database: String,

    /// Vendor-reserved role name prefix.
    pub reserved_prefix: String,

    /// Ask the server to include built-in roles when describing a role.
    pub show_builtin_roles: bool,

    /// Extra role names to treat as built-in.
    pub additional_builtin_roles: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            principal: None,
            admin_database: "admin".to_string(),
            reserved_prefix: "xgen".to_string(),
            show_builtin_roles: false,
            additional_builtin_roles: Vec::new(),
        }
    }
}

impl AuditConfig {
    /// Sets the default principal.
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Returns the configured principal, ignoring blank values.
    pub fn default_principal(&self) -> Option<&str> {
        self.principal
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

impl RectifierConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, without merging any other source.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RectifierConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the audit pipeline relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audit.admin_database.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "audit.admin_database must not be empty".to_string(),
            ));
        }

        if self.audit.reserved_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "audit.reserved_prefix must not be empty".to_string(),
            ));
        }

        if let Some(principal) = &self.audit.principal {
            if principal.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "audit.principal must not be blank when set".to_string(),
                ));
            }
        }

        if self
            .audit
            .additional_builtin_roles
            .iter()
            .any(|role| role.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "audit.additional_builtin_roles must not contain blank names".to_string(),
            ));
        }

        Ok(())
    }
}
