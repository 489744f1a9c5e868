//! Role name to privilege resolution.

use tracing::{debug, warn};

use crate::admin::{AdminCommand, AdminConnector, AdminSession, RolesInfoReply, decode_reply};
use crate::error::Result;
use rectifier_rbac::{Privilege, PrivilegeSet};

/// Looks up the privileges a role grants.
pub struct PrivilegeResolver<'a, C> {
    connector: &'a C,

    /// Database role definitions are read from.
    admin_database: &'a str,

    show_builtin_roles: bool,
}

impl<'a, C: AdminConnector> PrivilegeResolver<'a, C> {
    pub fn new(connector: &'a C, admin_database: &'a str) -> Self {
        Self {
            connector,
            admin_database,
            show_builtin_roles: false,
        }
    }

    /// Ask the server to include built-in roles in "describe role".
    pub fn with_builtin_roles(mut self, show: bool) -> Self {
        self.show_builtin_roles = show;
        self
    }

    /// Returns the privileges of `role_name`, flattened across every role
    /// record the server returns.
    ///
    /// A role that cannot be described (unknown, vanished, or the command
    /// was refused) resolves to no privileges. Only a failure to connect
    /// is an error.
    pub fn resolve_privileges(&self, role_name: &str) -> Result<Vec<Privilege>> {
        let mut session = self.connector.connect()?;
        let command = AdminCommand::roles_info(role_name, self.show_builtin_roles);

        let privileges = describe_role(&mut session, self.admin_database, &command)
            .map(|reply| {
                reply
                    .roles
                    .into_iter()
                    .flat_map(|role| role.privileges)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        debug!(
            role = %role_name,
            privileges = privileges.len(),
            "Resolved role privileges"
        );

        Ok(privileges)
    }

    /// Unions the privileges of every named role.
    ///
    /// Each role is resolved with its own session.
    pub fn resolve_all<I, S>(&self, role_names: I) -> Result<PrivilegeSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolved = PrivilegeSet::new();
        for role_name in role_names {
            resolved.extend(self.resolve_privileges(role_name.as_ref())?);
        }
        Ok(resolved)
    }
}

fn describe_role<S: AdminSession>(
    session: &mut S,
    database: &str,
    command: &AdminCommand,
) -> Option<RolesInfoReply> {
    let reply = match session.run_command(database, command) {
        Ok(reply) => reply,
        Err(err) => {
            debug!(
                database = %database,
                command = ?command,
                error = %err,
                "rolesInfo failed; role contributes no privileges"
            );
            return None;
        }
    };

    match decode_reply(reply) {
        Ok(reply) => Some(reply),
        Err(err) => {
            warn!(
                database = %database,
                command = ?command,
                error = %err,
                "Unreadable rolesInfo reply; role contributes no privileges"
            );
            None
        }
    }
}
