//! Administrative command seam.
//!
//! The audit pipeline never speaks the wire protocol itself. It talks to
//! an [`AdminConnector`], which hands out one [`AdminSession`] per logical
//! call. Dropping the session releases the connection, so every exit path
//! (including early returns via `?`) closes it.
//!
//! Replies are decoded into [`UsersInfoReply`] / [`RolesInfoReply`] right
//! here at the boundary; the rest of the crate only sees typed values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use rectifier_rbac::{Privilege, RoleAssignment};

/// Server error code for an unauthorized command.
pub const UNAUTHORIZED: i32 = 13;

/// Server error code for an unknown user.
pub const USER_NOT_FOUND: i32 = 11;

/// No connection to the cluster could be established.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to connect to cluster: {message}")]
pub struct ConnectionError {
    pub message: String,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The server rejected one administrative command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Command failed{}: {message}", code_suffix(.code))]
pub struct CommandError {
    pub code: Option<i32>,
    pub message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Rejection for missing privileges on `database`.
    pub fn unauthorized(database: &str) -> Self {
        Self::with_code(
            UNAUTHORIZED,
            format!("not authorized on {database} to execute command"),
        )
    }
}

fn code_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (code {c})")).unwrap_or_default()
}

/// An administrative request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// "Describe user": the named user's record in the target database.
    UsersInfo { user: String },

    /// "Describe role": the named role's record in the target database.
    RolesInfo {
        role: String,
        show_privileges: bool,
        show_builtin_roles: bool,
    },
}

impl AdminCommand {
    pub fn users_info(user: impl Into<String>) -> Self {
        AdminCommand::UsersInfo { user: user.into() }
    }

    /// "Describe role" with privileges expanded.
    pub fn roles_info(role: impl Into<String>, show_builtin_roles: bool) -> Self {
        AdminCommand::RolesInfo {
            role: role.into(),
            show_privileges: true,
            show_builtin_roles,
        }
    }

    /// Server-side command name.
    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::UsersInfo { .. } => "usersInfo",
            AdminCommand::RolesInfo { .. } => "rolesInfo",
        }
    }

    /// Renders the command document sent to the server.
    pub fn to_document(&self) -> Value {
        match self {
            AdminCommand::UsersInfo { user } => json!({ "usersInfo": user }),
            AdminCommand::RolesInfo {
                role,
                show_privileges,
                show_builtin_roles,
            } => json!({
                "rolesInfo": role,
                "showPrivileges": show_privileges,
                "showBuiltinRoles": show_builtin_roles
            }),
        }
    }
}

/// Reply to [`AdminCommand::UsersInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersInfoReply {
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

/// One user document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub db: String,

    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

/// Reply to [`AdminCommand::RolesInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolesInfoReply {
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
}

/// One role document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    #[serde(default)]
    pub role: String,

    #[serde(default)]
    pub db: String,

    #[serde(default)]
    pub is_builtin: bool,

    #[serde(default)]
    pub privileges: Vec<Privilege>,
}

/// Decodes a raw reply document into a typed reply.
pub fn decode_reply<T: DeserializeOwned>(reply: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(reply)
}

/// Source of sessions against one cluster.
pub trait AdminConnector {
    type Session: AdminSession;

    /// Opens a session. Failure here is fatal for the calling operation.
    fn connect(&self) -> Result<Self::Session, ConnectionError>;
}

/// An open connection. Dropping it releases the connection.
pub trait AdminSession {
    /// Enumerates every database visible to the session's credentials.
    fn list_database_names(&mut self) -> Result<Vec<String>, CommandError>;

    /// Runs `command` against `database` and returns the raw reply.
    fn run_command(&mut self, database: &str, command: &AdminCommand)
    -> Result<Value, CommandError>;
}
