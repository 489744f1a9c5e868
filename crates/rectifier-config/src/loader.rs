//! Configuration loader with multi-source merging

use crate::{Paths, RectifierConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    paths: Paths,
    env_prefix: String,

    /// Replaces the process environment when set.
    environment: Option<config::Map<String, String>>,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            paths: Paths::new(),
            env_prefix: "RECTIFIER".to_string(),
            environment: None,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "RECTIFIER")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/role-rectifier/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.paths = Paths::without_user_dir();
        self
    }

    /// Read user defaults from `dir` instead of the platform config directory
    pub fn with_user_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths = Paths::with_user_dir(dir);
        self
    }

    /// Read `PREFIX_*` overrides from `vars` instead of the process environment
    pub fn with_environment<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<RectifierConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = RectifierConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2-4. User, project and local files, lowest precedence first
        for source in self.paths.sources(&self.project_dir) {
            if source.path.exists() {
                builder = builder.add_source(
                    config::File::from(source.path)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 5. Environment variables: RECTIFIER_AUDIT__ADMIN_DATABASE=...
        // Double underscore separates sections because keys contain '_'.
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("audit.additional_builtin_roles")
                .try_parsing(true)
                .source(self.environment),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let rectifier_config: RectifierConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        rectifier_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(rectifier_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> RectifierConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn loader(project_dir: &Path) -> ConfigLoader {
        // A prefix no developer machine sets, so ambient env never leaks in
        ConfigLoader::new()
            .with_project_dir(project_dir)
            .with_env_prefix("RECTIFIER_TEST_UNSET")
            .without_user_config()
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert_eq!(config, RectifierConfig::default());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[cluster]
uri = "mongodb+srv://cluster0.example.net"

[audit]
principal = "powersync"
admin_database = "auth"
additional_builtin_roles = ["backupOperator", "searchCoordinator"]
"#;
        fs::write(project_dir.join("rectifier.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.cluster.uri, "mongodb+srv://cluster0.example.net");
        assert_eq!(config.audit.principal.as_deref(), Some("powersync"));
        assert_eq!(config.audit.admin_database, "auth");
        assert_eq!(config.audit.reserved_prefix, "xgen");
        assert_eq!(
            config.audit.additional_builtin_roles,
            vec!["backupOperator", "searchCoordinator"]
        );
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("rectifier.toml"),
            r#"
[audit]
principal = "alice"
show_builtin_roles = false
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("rectifier.local.toml"),
            r#"
[audit]
principal = "bob"
"#,
        )
        .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        // Local config overrides project config, untouched keys survive
        assert_eq!(config.audit.principal.as_deref(), Some("bob"));
        assert!(!config.audit.show_builtin_roles);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("rectifier.toml"),
            r#"
[audit]
admin_database = ""
"#,
        )
        .expect("Failed to write config");

        assert!(loader(project_dir).load().is_err());
        assert_eq!(
            loader(project_dir).load_or_default(),
            RectifierConfig::default()
        );
    }

    fn write_project_config(project_dir: &Path) {
        fs::write(
            project_dir.join("rectifier.toml"),
            r#"
[audit]
principal = "alice"
admin_database = "auth"
show_builtin_roles = false
additional_builtin_roles = ["fromFile"]
"#,
        )
        .expect("Failed to write config");
    }

    #[test]
    fn test_environment_overrides_files() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        write_project_config(project_dir);

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .without_user_config()
            .with_environment([
                ("RECTIFIER_AUDIT__PRINCIPAL", "bob"),
                ("RECTIFIER_AUDIT__SHOW_BUILTIN_ROLES", "true"),
                (
                    "RECTIFIER_AUDIT__ADDITIONAL_BUILTIN_ROLES",
                    "backupOperator,searchCoordinator",
                ),
                ("RECTIFIER_CLUSTER__URI", "mongodb://replica:27017"),
            ])
            .load()
            .expect("Failed to load config");

        assert_eq!(config.audit.principal.as_deref(), Some("bob"));
        assert!(config.audit.show_builtin_roles);
        assert_eq!(
            config.audit.additional_builtin_roles,
            vec!["backupOperator", "searchCoordinator"]
        );
        assert_eq!(config.cluster.uri, "mongodb://replica:27017");
        // Keys the environment leaves alone keep their file value
        assert_eq!(config.audit.admin_database, "auth");
    }

    #[test]
    fn test_environment_respects_prefix_and_separator() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        write_project_config(project_dir);

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .with_env_prefix("RECTIFIER_ENVTEST")
            .without_user_config()
            .with_environment([
                // Wrong prefix
                ("RECTIFIER_AUDIT__PRINCIPAL", "mallory"),
                // Single underscore does not open a section
                ("RECTIFIER_ENVTEST_AUDIT_PRINCIPAL", "mallory"),
                ("RECTIFIER_ENVTEST_AUDIT__RESERVED_PREFIX", "acme_"),
            ])
            .load()
            .expect("Failed to load config");

        assert_eq!(config.audit.principal.as_deref(), Some("alice"));
        assert_eq!(config.audit.reserved_prefix, "acme_");
    }

    #[test]
    fn test_user_config_is_lowest_file_layer() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let user_dir = temp_dir.path().join("user");
        let project_dir = temp_dir.path().join("project");
        fs::create_dir_all(&user_dir).expect("Failed to create user dir");
        fs::create_dir_all(&project_dir).expect("Failed to create project dir");

        fs::write(
            user_dir.join("config.toml"),
            r#"
[cluster]
uri = "mongodb://user-default:27017"

[audit]
principal = "carol"
"#,
        )
        .expect("Failed to write user config");
        write_project_config(&project_dir);

        let config = ConfigLoader::new()
            .with_project_dir(&project_dir)
            .with_env_prefix("RECTIFIER_TEST_UNSET")
            .with_user_config_dir(&user_dir)
            .load()
            .expect("Failed to load config");

        assert_eq!(config.cluster.uri, "mongodb://user-default:27017");
        assert_eq!(config.audit.principal.as_deref(), Some("alice"));
    }
}
