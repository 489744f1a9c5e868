//! Configuration file lookup, in precedence order

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Project config file, git-tracked.
pub const PROJECT_FILE: &str = "rectifier.toml";

/// Local overrides, gitignored.
pub const LOCAL_FILE: &str = "rectifier.local.toml";

/// Per-user defaults inside the platform config directory.
pub const USER_FILE: &str = "config.toml";

/// Which layer a configuration file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceKind {
    User,
    Project,
    Local,
}

/// A configuration file the loader may merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    pub kind: SourceKind,
    pub path: PathBuf,
}

/// Resolves where role-rectifier looks for configuration files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// `None` when the platform has no config directory or user config is
    /// disabled.
    user_dir: Option<PathBuf>,
}

impl Paths {
    /// Uses the platform config directory (`~/.config/role-rectifier/` on Linux).
    pub fn new() -> Self {
        Self {
            user_dir: ProjectDirs::from("com", "RoleRectifier", "role-rectifier")
                .map(|dirs| dirs.config_dir().to_path_buf()),
        }
    }

    /// Reads user defaults from `dir` instead of the platform directory.
    pub fn with_user_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            user_dir: Some(dir.into()),
        }
    }

    /// Skips user defaults entirely.
    pub fn without_user_dir() -> Self {
        Self { user_dir: None }
    }

    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        self.user_dir
            .as_ref()
            .map(|dir| dir.join(USER_FILE))
            .ok_or_else(|| {
                ConfigError::XdgError("no user config directory available".to_string())
            })
    }

    /// Candidate files for `project_dir`, lowest precedence first.
    ///
    /// Files are listed whether or not they exist; the loader skips the
    /// missing ones. The environment layer sits above all of them.
    pub fn sources(&self, project_dir: impl AsRef<Path>) -> Vec<FileSource> {
        let project_dir = project_dir.as_ref();
        let mut sources = Vec::with_capacity(3);

        if let Ok(path) = self.user_config_file() {
            sources.push(FileSource {
                kind: SourceKind::User,
                path,
            });
        }
        sources.push(FileSource {
            kind: SourceKind::Project,
            path: project_dir.join(PROJECT_FILE),
        });
        sources.push(FileSource {
            kind: SourceKind::Local,
            path: project_dir.join(LOCAL_FILE),
        });

        sources
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
