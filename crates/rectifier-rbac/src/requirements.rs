//! Required-permission baselines and the three-way diff.
//!
//! A baseline is compared in one of two modes, chosen by its shape:
//! - **Structural**: full privilege documents, compared with
//!   [`PrivilegeSet`] algebra.
//! - **Action**: bare action names, compared against every action the
//!   resolved privileges grant on any resource.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::privileges::{Privilege, PrivilegeSet};

/// Error type for building a requirement baseline.
#[derive(Debug, Error)]
pub enum RequirementError {
    /// Action names and privilege documents in the same baseline.
    #[error("Required permissions mix action names and privilege documents")]
    MixedShapes,

    /// Input that is neither an action name nor a privilege document.
    #[error("Malformed required permissions: {0}")]
    Malformed(String),
}

/// Result type for requirement operations.
pub type Result<T> = std::result::Result<T, RequirementError>;

/// One entry of a baseline or a diff.
///
/// Decodes from either a JSON string (an action name) or a privilege
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Permission {
    Action(String),
    Privilege(Privilege),
}

impl Permission {
    pub fn action(name: impl Into<String>) -> Self {
        Permission::Action(name.into())
    }

    pub fn as_action(&self) -> Option<&str> {
        match self {
            Permission::Action(name) => Some(name),
            Permission::Privilege(_) => None,
        }
    }

    pub fn as_privilege(&self) -> Option<&Privilege> {
        match self {
            Permission::Action(_) => None,
            Permission::Privilege(privilege) => Some(privilege),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Action(name) => f.write_str(name),
            Permission::Privilege(privilege) => fmt::Display::fmt(privilege, f),
        }
    }
}

impl From<Privilege> for Permission {
    fn from(privilege: Privilege) -> Self {
        Permission::Privilege(privilege)
    }
}

/// Granularity a baseline is compared at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonMode {
    Structural,
    Action,
}

/// The permissions a principal is expected to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirements {
    Privileges(PrivilegeSet),
    Actions(BTreeSet<String>),
}

impl Requirements {
    /// Builds an action-name baseline.
    pub fn actions<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirements::Actions(names.into_iter().map(Into::into).collect())
    }

    /// Builds a structural baseline.
    pub fn privileges(privileges: impl IntoIterator<Item = Privilege>) -> Self {
        Requirements::Privileges(privileges.into_iter().collect())
    }

    /// Builds a baseline from loosely-typed entries, inferring the mode.
    ///
    /// All entries must share one shape. An empty input yields an empty
    /// action-name baseline. Blank action names are rejected.
    pub fn from_items(items: impl IntoIterator<Item = Permission>) -> Result<Self> {
        let mut actions = BTreeSet::new();
        let mut privileges = PrivilegeSet::new();

        for item in items {
            match item {
                Permission::Action(name) => {
                    if name.trim().is_empty() {
                        return Err(RequirementError::Malformed(
                            "blank action name".to_string(),
                        ));
                    }
                    actions.insert(name);
                }
                Permission::Privilege(privilege) => {
                    privileges.insert(privilege);
                }
            }
            if !actions.is_empty() && !privileges.is_empty() {
                return Err(RequirementError::MixedShapes);
            }
        }

        if privileges.is_empty() {
            Ok(Requirements::Actions(actions))
        } else {
            Ok(Requirements::Privileges(privileges))
        }
    }

    /// Builds a baseline from a JSON array of action names or privilege
    /// documents.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        if !value.is_array() {
            return Err(RequirementError::Malformed(
                "expected an array of required permissions".to_string(),
            ));
        }
        let items: Vec<Permission> = serde_json::from_value(value.clone())
            .map_err(|e| RequirementError::Malformed(e.to_string()))?;
        Self::from_items(items)
    }

    pub fn mode(&self) -> ComparisonMode {
        match self {
            Requirements::Privileges(_) => ComparisonMode::Structural,
            Requirements::Actions(_) => ComparisonMode::Action,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Requirements::Privileges(set) => set.len(),
            Requirements::Actions(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compares `resolved` against this baseline.
    ///
    /// - `missing` = required − resolved
    /// - `extra` = resolved − required
    /// - `present` = required ∩ resolved
    pub fn diff(&self, resolved: &PrivilegeSet) -> PermissionDiff {
        match self {
            Requirements::Privileges(required) => PermissionDiff {
                mode: ComparisonMode::Structural,
                missing: into_permissions(required.difference(resolved)),
                extra: into_permissions(resolved.difference(required)),
                present: into_permissions(required.intersection(resolved)),
            },
            Requirements::Actions(required) => {
                let granted = resolved.actions();
                PermissionDiff {
                    mode: ComparisonMode::Action,
                    missing: action_permissions(required.difference(&granted)),
                    extra: action_permissions(granted.difference(required)),
                    present: action_permissions(required.intersection(&granted)),
                }
            }
        }
    }
}

fn into_permissions(set: PrivilegeSet) -> Vec<Permission> {
    set.into_ordered_vec()
        .into_iter()
        .map(Permission::Privilege)
        .collect()
}

fn action_permissions<'a>(names: impl Iterator<Item = &'a String>) -> Vec<Permission> {
    // BTreeSet iteration is already sorted.
    names.cloned().map(Permission::Action).collect()
}

/// Outcome of comparing resolved privileges against a baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDiff {
    pub mode: ComparisonMode,
    pub missing: Vec<Permission>,
    pub extra: Vec<Permission>,
    pub present: Vec<Permission>,
}

impl PermissionDiff {
    /// Returns whether the resolved privileges match the baseline exactly.
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}
