//! # rectifier: Role audit pipeline
//!
//! Given a principal, `rectifier`:
//! 1. discovers the roles granted to it in every database,
//! 2. keeps the custom ones (not built-in, not vendor-reserved),
//! 3. resolves the privileges of each custom role, and
//! 4. reports what is missing, extra, or present against a required
//!    baseline.
//!
//! It only observes. Nothing here grants, revokes or rewrites a role.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │  Reconciler                                    │
//! │  ├─ RoleDiscoverer     usersInfo per database  │
//! │  ├─ RoleClassifier     built-in / vendor / own │
//! │  ├─ PrivilegeResolver  rolesInfo per role      │
//! │  └─ Requirements       missing/extra/present   │
//! └───────────────────┬────────────────────────────┘
//!                     │ one session per logical call
//!                     ▼
//! ┌────────────────────────────────────────────────┐
//! │  AdminConnector / AdminSession                 │
//! │  (driver, or memory::MemoryCluster)            │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure model
//!
//! | Failure                                   | Outcome                         |
//! |-------------------------------------------|---------------------------------|
//! | No principal given or configured          | [`AuditError::InvalidInput`]    |
//! | Baseline mixes action names and documents | [`AuditError::InvalidInput`]    |
//! | Cannot connect                            | [`AuditError::Connection`]      |
//! | Cannot list databases                     | [`AuditError::Listing`]         |
//! | "describe user" fails for one database    | database skipped                |
//! | "describe role" fails for one role        | role contributes no privileges  |

pub mod admin;
mod discovery;
mod error;
pub mod memory;
mod reconciler;
mod resolver;

pub use admin::{AdminCommand, AdminConnector, AdminSession, CommandError, ConnectionError};
pub use discovery::RoleDiscoverer;
pub use error::{AuditError, Result};
pub use reconciler::{ReconciliationResult, Reconciler};
pub use resolver::PrivilegeResolver;

pub use rectifier_rbac::{
    ComparisonMode, CustomRoleSet, Permission, Principal, Privilege, PrivilegeSet, Requirements,
    Resource, RoleAssignment, RoleClassifier, RoleMap,
};
