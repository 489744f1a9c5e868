//! # rectifier-rbac: Role and privilege model
//!
//! Pure, I/O-free building blocks of a role audit:
//! - **Privilege set algebra** (structural union / difference / intersection)
//! - **Custom-role classification** (built-in catalog + vendor prefix)
//! - **Requirement baselines** and the missing / extra / present diff
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   classify   ┌───────────────┐
//! │  RoleMap     │ ───────────▶ │ CustomRoleSet │
//! └──────────────┘              └───────┬───────┘
//!                                       │ resolved elsewhere
//!                                       ▼
//! ┌──────────────┐     diff     ┌───────────────┐
//! │ Requirements │ ◀─────────── │ PrivilegeSet  │
//! └──────┬───────┘              └───────────────┘
//!        ▼
//! ┌──────────────────────────────┐
//! │ PermissionDiff               │
//! │  missing / extra / present   │
//! └──────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ### Classifying grants
//!
//! ```
//! use rectifier_rbac::roles::{RoleAssignment, RoleClassifier, RoleMap};
//!
//! let mut roles = RoleMap::new();
//! roles.insert(
//!     "admin",
//!     vec![
//!         RoleAssignment::new("admin", "PowerSyncCustomRole"),
//!         RoleAssignment::new("admin", "read"),
//!         RoleAssignment::new("admin", "xgen-readWriteAtopsmanager.bigdata"),
//!     ],
//! );
//!
//! let custom = RoleClassifier::new().classify(&roles);
//! assert_eq!(custom.len(), 1);
//! assert!(custom.contains("PowerSyncCustomRole"));
//! ```
//!
//! ### Diffing against a baseline
//!
//! ```
//! use rectifier_rbac::privileges::{Privilege, PrivilegeSet, Resource};
//! use rectifier_rbac::requirements::{Permission, Requirements};
//!
//! let resolved: PrivilegeSet = vec![Privilege::new(
//!     Resource::namespace("test", ""),
//!     ["find", "insert"],
//! )]
//! .into();
//!
//! let diff = Requirements::actions(["find", "remove"]).diff(&resolved);
//! assert_eq!(diff.missing, vec![Permission::action("remove")]);
//! assert_eq!(diff.present, vec![Permission::action("find")]);
//! assert_eq!(diff.extra, vec![Permission::action("insert")]);
//! ```

pub mod privileges;
pub mod requirements;
pub mod roles;

// Re-export commonly used types
pub use privileges::{Privilege, PrivilegeSet, Resource};
pub use requirements::{ComparisonMode, Permission, PermissionDiff, RequirementError, Requirements};
pub use roles::{
    BUILTIN_ROLES, CustomRoleSet, Principal, RESERVED_PREFIX, RoleAssignment, RoleClassifier,
    RoleMap,
};
