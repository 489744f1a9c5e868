//! Discovery → classification → resolution → diff.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::admin::AdminConnector;
use crate::discovery::RoleDiscoverer;
use crate::error::Result;
use crate::resolver::PrivilegeResolver;
use rectifier_config::AuditConfig;
use rectifier_rbac::{
    ComparisonMode, CustomRoleSet, Permission, PermissionDiff, Principal, PrivilegeSet,
    Requirements, RoleClassifier, RoleMap,
};

/// Outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Granularity the baseline was compared at.
    pub mode: ComparisonMode,

    /// Roles whose privileges were compared, sorted.
    pub custom_roles: Vec<String>,

    /// Required but not granted.
    pub missing: Vec<Permission>,

    /// Granted but not required.
    pub extra: Vec<Permission>,

    /// Required and granted.
    pub present: Vec<Permission>,
}

impl ReconciliationResult {
    fn new(custom_roles: Vec<String>, diff: PermissionDiff) -> Self {
        Self {
            mode: diff.mode,
            custom_roles,
            missing: diff.missing,
            extra: diff.extra,
            present: diff.present,
        }
    }

    /// Returns whether granted privileges match the baseline exactly.
    pub fn is_compliant(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Audits a principal's custom roles against a required baseline.
///
/// Owns the connector and the audit configuration; each stage borrows the
/// connector and opens its own session.
///
/// # Examples
///
/// ```
/// use rectifier::memory::MemoryCluster;
/// use rectifier::{Reconciler, Requirements};
/// use rectifier_config::AuditConfig;
/// use rectifier_rbac::{Permission, Principal, Privilege, Resource, RoleAssignment};
///
/// let cluster = MemoryCluster::new()
///     .with_database("admin")
///     .with_user("admin", "alice", [RoleAssignment::new("admin", "reportViewer")])
///     .with_role(
///         "admin",
///         "reportViewer",
///         [Privilege::new(Resource::namespace("reports", ""), ["find"])],
///     );
///
/// let reconciler = Reconciler::new(&cluster, AuditConfig::default());
/// let result = reconciler.reconcile(
///     Some(&Principal::new("alice")),
///     &Requirements::actions(["find", "insert"]),
/// )?;
///
/// assert_eq!(result.custom_roles, vec!["reportViewer"]);
/// assert_eq!(result.missing, vec![Permission::action("insert")]);
/// assert_eq!(result.present, vec![Permission::action("find")]);
/// # Ok::<(), rectifier::AuditError>(())
/// ```
pub struct Reconciler<C> {
    connector: C,
    config: AuditConfig,
    classifier: RoleClassifier,
}

impl<C: AdminConnector> Reconciler<C> {
    pub fn new(connector: C, config: AuditConfig) -> Self {
        let classifier = config.additional_builtin_roles.iter().fold(
            RoleClassifier::new().with_reserved_prefix(config.reserved_prefix.as_str()),
            |classifier, name| classifier.with_builtin_role(name.as_str()),
        );

        Self {
            connector,
            config,
            classifier,
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn classifier(&self) -> &RoleClassifier {
        &self.classifier
    }

    pub fn discoverer(&self) -> RoleDiscoverer<'_, C> {
        RoleDiscoverer::new(&self.connector)
            .with_default_principal(self.config.default_principal())
    }

    pub fn resolver(&self) -> PrivilegeResolver<'_, C> {
        PrivilegeResolver::new(&self.connector, &self.config.admin_database)
            .with_builtin_roles(self.config.show_builtin_roles)
    }

    /// Every role granted to the principal, by database.
    pub fn discover_roles(&self, principal: Option<&Principal>) -> Result<RoleMap> {
        self.discoverer().discover_roles(principal)
    }

    /// The principal's custom roles.
    pub fn custom_roles(&self, principal: Option<&Principal>) -> Result<CustomRoleSet> {
        let roles = self.discover_roles(principal)?;
        Ok(self.classifier.classify(&roles))
    }

    /// Runs the full pipeline for `principal`.
    ///
    /// With no custom roles the resolved set is empty, so every
    /// requirement is reported missing.
    pub fn reconcile(
        &self,
        principal: Option<&Principal>,
        requirements: &Requirements,
    ) -> Result<ReconciliationResult> {
        info!(
            principal = ?principal.map(Principal::as_str).or(self.config.default_principal()),
            mode = ?requirements.mode(),
            required = requirements.len(),
            "Starting reconciliation"
        );

        let custom_roles = self.custom_roles(principal)?;
        let resolved = self.resolver().resolve_all(&custom_roles)?;

        let result = compare(custom_roles, &resolved, requirements);
        info!(
            principal = ?principal.map(Principal::as_str).or(self.config.default_principal()),
            mode = ?result.mode,
            custom_roles = result.custom_roles.len(),
            missing = result.missing.len(),
            extra = result.extra.len(),
            present = result.present.len(),
            "Reconciliation complete"
        );

        Ok(result)
    }

    /// Runs the full pipeline with a loosely-typed JSON baseline.
    ///
    /// The comparison mode follows the shape of `required`: an array of
    /// action names or an array of privilege documents. Anything else,
    /// including a mix of both, is [`AuditError::InvalidInput`].
    ///
    /// [`AuditError::InvalidInput`]: crate::AuditError::InvalidInput
    pub fn reconcile_json(
        &self,
        principal: Option<&Principal>,
        required: &serde_json::Value,
    ) -> Result<ReconciliationResult> {
        let requirements = Requirements::from_json(required)?;
        self.reconcile(principal, &requirements)
    }

    /// Diffs the named roles directly, skipping discovery and
    /// classification.
    pub fn verify_roles<I, S>(
        &self,
        role_names: I,
        requirements: &Requirements,
    ) -> Result<ReconciliationResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: CustomRoleSet = role_names.into_iter().map(Into::into).collect();
        let resolved = self.resolver().resolve_all(&roles)?;

        let result = compare(roles, &resolved, requirements);
        info!(
            roles = ?result.custom_roles,
            mode = ?result.mode,
            missing = result.missing.len(),
            extra = result.extra.len(),
            "Role verification complete"
        );

        Ok(result)
    }
}

fn compare(
    roles: CustomRoleSet,
    resolved: &PrivilegeSet,
    requirements: &Requirements,
) -> ReconciliationResult {
    ReconciliationResult::new(roles.into_iter().collect(), requirements.diff(resolved))
}
