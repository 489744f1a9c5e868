//! In-memory cluster implementing the administrative command seam.
//!
//! Holds databases, user documents and role definitions, and answers
//! `usersInfo` / `rolesInfo` the way a server would. Failures can be
//! injected per database, per role, for the database listing, or for the
//! whole connection. Session open/close counters let callers check that
//! every session was released.
//!
//! Single-threaded: counters use [`Cell`].

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::admin::{
    AdminCommand, AdminConnector, AdminSession, CommandError, ConnectionError, RoleRecord,
    RolesInfoReply, UserRecord, UsersInfoReply,
};
use rectifier_rbac::{Privilege, RoleAssignment};

#[derive(Debug, Default)]
pub struct MemoryCluster {
    /// Listing order.
    databases: Vec<String>,
    users: HashMap<String, Vec<UserRecord>>,
    roles: HashMap<String, Vec<RoleRecord>>,
    raw_replies: HashMap<String, Value>,
    failing_databases: HashSet<String>,
    failing_roles: HashSet<String>,
    unreachable: bool,
    listing_fails: bool,

    opened: Cell<usize>,
    closed: Cell<usize>,
    commands: RefCell<Vec<(String, AdminCommand)>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a database; databases are listed in the order they are added.
    pub fn with_database(mut self, name: impl Into<String>) -> Self {
        self.add_database(name.into());
        self
    }

    /// Defines `user` in `database` with the given grants.
    pub fn with_user(
        mut self,
        database: impl Into<String>,
        user: impl Into<String>,
        roles: impl IntoIterator<Item = RoleAssignment>,
    ) -> Self {
        let database = database.into();
        self.add_database(database.clone());
        self.users
            .entry(database.clone())
            .or_default()
            .push(UserRecord {
                user: user.into(),
                db: database,
                roles: roles.into_iter().collect(),
            });
        self
    }

    /// Defines a custom role in `database`.
    pub fn with_role(
        self,
        database: impl Into<String>,
        role: impl Into<String>,
        privileges: impl IntoIterator<Item = Privilege>,
    ) -> Self {
        self.define_role(database.into(), role.into(), privileges, false)
    }

    /// Defines a built-in role, only returned when built-ins are requested.
    pub fn with_builtin_role(
        self,
        database: impl Into<String>,
        role: impl Into<String>,
        privileges: impl IntoIterator<Item = Privilege>,
    ) -> Self {
        self.define_role(database.into(), role.into(), privileges, true)
    }

    /// Every command against `database` is rejected as unauthorized.
    pub fn with_failing_database(mut self, database: impl Into<String>) -> Self {
        let database = database.into();
        self.add_database(database.clone());
        self.failing_databases.insert(database);
        self
    }

    /// "Describe role" for `role` is rejected as unauthorized.
    pub fn with_failing_role(mut self, role: impl Into<String>) -> Self {
        self.failing_roles.insert(role.into());
        self
    }

    /// Every command against `database` returns `reply` verbatim.
    pub fn with_raw_reply(mut self, database: impl Into<String>, reply: Value) -> Self {
        let database = database.into();
        self.add_database(database.clone());
        self.raw_replies.insert(database, reply);
        self
    }

    /// Database listing is rejected.
    pub fn with_listing_failure(mut self) -> Self {
        self.listing_fails = true;
        self
    }

    /// No session can be opened.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.get()
    }

    pub fn sessions_closed(&self) -> usize {
        self.closed.get()
    }

    /// Sessions opened but not yet dropped.
    pub fn open_sessions(&self) -> usize {
        self.opened.get() - self.closed.get()
    }

    /// Every `(database, command)` run so far, in order.
    pub fn commands(&self) -> Vec<(String, AdminCommand)> {
        self.commands.borrow().clone()
    }

    fn add_database(&mut self, name: String) {
        if !self.databases.contains(&name) {
            self.databases.push(name);
        }
    }

    fn define_role(
        mut self,
        database: String,
        role: String,
        privileges: impl IntoIterator<Item = Privilege>,
        is_builtin: bool,
    ) -> Self {
        self.add_database(database.clone());
        self.roles
            .entry(database.clone())
            .or_default()
            .push(RoleRecord {
                role,
                db: database,
                is_builtin,
                privileges: privileges.into_iter().collect(),
            });
        self
    }

    fn users_info(&self, database: &str, user: &str) -> UsersInfoReply {
        let users = self
            .users
            .get(database)
            .into_iter()
            .flatten()
            .filter(|record| record.user == user)
            .cloned()
            .collect();
        UsersInfoReply { users }
    }

    fn roles_info(
        &self,
        database: &str,
        role: &str,
        show_privileges: bool,
        show_builtin_roles: bool,
    ) -> RolesInfoReply {
        let roles = self
            .roles
            .get(database)
            .into_iter()
            .flatten()
            .filter(|record| record.role == role && (show_builtin_roles || !record.is_builtin))
            .map(|record| {
                let mut record = record.clone();
                if !show_privileges {
                    record.privileges.clear();
                }
                record
            })
            .collect();
        RolesInfoReply { roles }
    }
}

/// Session handed out by [`MemoryCluster`].
#[derive(Debug)]
pub struct MemorySession<'a> {
    cluster: &'a MemoryCluster,
}

impl<'a> AdminConnector for &'a MemoryCluster {
    type Session = MemorySession<'a>;

    fn connect(&self) -> Result<Self::Session, ConnectionError> {
        if self.unreachable {
            return Err(ConnectionError::new("cluster unreachable"));
        }
        self.opened.set(self.opened.get() + 1);
        Ok(MemorySession { cluster: *self })
    }
}

impl AdminSession for MemorySession<'_> {
    fn list_database_names(&mut self) -> Result<Vec<String>, CommandError> {
        if self.cluster.listing_fails {
            return Err(CommandError::unauthorized("admin"));
        }
        Ok(self.cluster.databases.clone())
    }

    fn run_command(
        &mut self,
        database: &str,
        command: &AdminCommand,
    ) -> Result<Value, CommandError> {
        let cluster = self.cluster;
        cluster
            .commands
            .borrow_mut()
            .push((database.to_string(), command.clone()));

        if let Some(reply) = cluster.raw_replies.get(database) {
            return Ok(reply.clone());
        }
        if cluster.failing_databases.contains(database) {
            return Err(CommandError::unauthorized(database));
        }

        match command {
            AdminCommand::UsersInfo { user } => to_reply(&cluster.users_info(database, user)),
            AdminCommand::RolesInfo {
                role,
                show_privileges,
                show_builtin_roles,
            } => {
                if cluster.failing_roles.contains(role) {
                    return Err(CommandError::unauthorized(database));
                }
                to_reply(&cluster.roles_info(
                    database,
                    role,
                    *show_privileges,
                    *show_builtin_roles,
                ))
            }
        }
    }
}

impl Drop for MemorySession<'_> {
    fn drop(&mut self) {
        self.cluster.closed.set(self.cluster.closed.get() + 1);
    }
}

fn to_reply<T: Serialize>(reply: &T) -> Result<Value, CommandError> {
    serde_json::to_value(reply).map_err(|e| CommandError::new(e.to_string()))
}
