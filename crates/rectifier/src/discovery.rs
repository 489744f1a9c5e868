//! Cross-database role discovery.
//!
//! A principal may be defined in some databases and not others, and the
//! audit credentials may not be allowed to query every database. Both are
//! expected: a database whose "describe user" fails simply contributes no
//! grants.

use tracing::{debug, info, warn};

use crate::admin::{AdminCommand, AdminConnector, AdminSession, UsersInfoReply, decode_reply};
use crate::error::{AuditError, Result};
use rectifier_rbac::{Principal, RoleAssignment, RoleMap};

/// Enumerates the roles granted to a principal across all databases.
pub struct RoleDiscoverer<'a, C> {
    connector: &'a C,

    /// Principal used when the caller does not name one.
    default_principal: Option<&'a str>,
}

impl<'a, C: AdminConnector> RoleDiscoverer<'a, C> {
    pub fn new(connector: &'a C) -> Self {
        Self {
            connector,
            default_principal: None,
        }
    }

    /// Sets the principal to fall back on.
    pub fn with_default_principal(mut self, principal: Option<&'a str>) -> Self {
        self.default_principal = principal;
        self
    }

    /// Picks the principal to audit.
    ///
    /// An explicit principal wins; a blank explicit principal is an error
    /// rather than a reason to fall back. Surrounding whitespace is trimmed
    /// from either source.
    pub fn resolve_principal(&self, principal: Option<&Principal>) -> Result<Principal> {
        match principal {
            Some(p) if p.is_blank() => Err(AuditError::InvalidInput(
                "principal name must not be blank".to_string(),
            )),
            Some(p) => Ok(Principal::from(p.as_str().trim())),
            None => self
                .default_principal
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(Principal::from)
                .ok_or_else(|| {
                    AuditError::InvalidInput(
                        "a principal must be supplied or configured".to_string(),
                    )
                }),
        }
    }

    /// Collects `database -> grants` for the principal.
    ///
    /// Databases are visited in the order the cluster lists them. The
    /// session is held for the whole traversal and released on return.
    pub fn discover_roles(&self, principal: Option<&Principal>) -> Result<RoleMap> {
        let principal = self.resolve_principal(principal)?;

        let mut session = self.connector.connect()?;
        let databases = session
            .list_database_names()
            .map_err(AuditError::Listing)?;

        let command = AdminCommand::users_info(principal.as_str());
        let mut roles = RoleMap::new();

        for database in &databases {
            if let Some(grants) = describe_user(&mut session, database, &command) {
                if roles.insert(database.as_str(), grants) {
                    debug!(
                        principal = %principal,
                        database = %database,
                        "Recorded role grants"
                    );
                }
            }
        }

        info!(
            principal = %principal,
            databases_visited = databases.len(),
            databases_with_grants = roles.len(),
            "Role discovery complete"
        );

        Ok(roles)
    }
}

/// Runs "describe user" against one database.
///
/// Returns `None` when the command fails, the reply is unreadable, or the
/// principal is unknown there.
fn describe_user<S: AdminSession>(
    session: &mut S,
    database: &str,
    command: &AdminCommand,
) -> Option<Vec<RoleAssignment>> {
    let reply = match session.run_command(database, command) {
        Ok(reply) => reply,
        Err(err) => {
            debug!(
                database = %database,
                error = %err,
                "usersInfo failed; skipping database"
            );
            return None;
        }
    };

    let reply: UsersInfoReply = match decode_reply(reply) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(
                database = %database,
                error = %err,
                "Unreadable usersInfo reply; skipping database"
            );
            return None;
        }
    };

    reply.users.into_iter().next().map(|user| user.roles)
}
