//! Role grants and custom-role classification.
//!
//! The server reserves a fixed catalog of built-in roles, and the hosting
//! vendor reserves every role whose name starts with [`RESERVED_PREFIX`].
//! Anything else granted to a principal is a custom role whose privileges
//! need review.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Built-in role names predefined by the database engine.
pub const BUILTIN_ROLES: &[&str] = &[
    "read",
    "readWrite",
    "dbAdmin",
    "dbOwner",
    "userAdmin",
    "clusterAdmin",
    "clusterManager",
    "clusterMonitor",
    "hostManager",
    "backup",
    "restore",
    "readAnyDatabase",
    "readWriteAnyDatabase",
    "userAdminAnyDatabase",
    "dbAdminAnyDatabase",
    "root",
];

/// Name prefix reserved for roles managed by the hosting vendor.
pub const RESERVED_PREFIX: &str = "xgen";

/// The database user being audited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the name is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Principal {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A role granted to a principal, as listed by "describe user".
///
/// Wire shape: `{ "role": "readWrite", "db": "sales", "minFcv": "" }`.
/// A missing `role` decodes to an empty name, which classification skips.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Database the role is defined in.
    #[serde(rename = "db", default)]
    pub database: String,

    #[serde(rename = "role", default)]
    pub role_name: String,

    #[serde(rename = "minFcv", default, skip_serializing_if = "Option::is_none")]
    pub min_fcv: Option<String>,
}

impl RoleAssignment {
    pub fn new(database: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            role_name: role_name.into(),
            min_fcv: None,
        }
    }
}

/// Roles granted to a principal, keyed by the database that reported them.
///
/// Only databases that reported at least one grant are present. Keys are
/// kept in name order so iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMap {
    entries: BTreeMap<String, Vec<RoleAssignment>>,
}

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the grants reported by one database.
    ///
    /// Returns `false` and records nothing when `roles` is empty.
    pub fn insert(&mut self, database: impl Into<String>, roles: Vec<RoleAssignment>) -> bool {
        if roles.is_empty() {
            return false;
        }
        self.entries.insert(database.into(), roles);
        true
    }

    pub fn get(&self, database: &str) -> Option<&[RoleAssignment]> {
        self.entries.get(database).map(Vec::as_slice)
    }

    pub fn contains_database(&self, database: &str) -> bool {
        self.entries.contains_key(database)
    }

    pub fn databases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RoleAssignment])> {
        self.entries
            .iter()
            .map(|(db, roles)| (db.as_str(), roles.as_slice()))
    }

    /// Every grant across every database.
    pub fn assignments(&self) -> impl Iterator<Item = &RoleAssignment> {
        self.entries.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<D: Into<String>> FromIterator<(D, Vec<RoleAssignment>)> for RoleMap {
    fn from_iter<I: IntoIterator<Item = (D, Vec<RoleAssignment>)>>(iter: I) -> Self {
        let mut map = RoleMap::new();
        for (db, roles) in iter {
            map.insert(db, roles);
        }
        map
    }
}

/// Deduplicated custom role names.
pub type CustomRoleSet = BTreeSet<String>;

/// Separates custom roles from built-in and vendor-reserved ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleClassifier {
    reserved_prefix: String,

    /// Operator-registered names treated exactly like built-ins.
    additional_builtins: BTreeSet<String>,
}

impl RoleClassifier {
    /// Creates a classifier with the engine's built-in catalog and the
    /// default vendor prefix.
    pub fn new() -> Self {
        Self {
            reserved_prefix: RESERVED_PREFIX.to_string(),
            additional_builtins: BTreeSet::new(),
        }
    }

    /// Overrides the vendor-reserved name prefix.
    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = prefix.into();
        self
    }

    /// Registers an extra name to treat as built-in.
    pub fn with_builtin_role(mut self, name: impl Into<String>) -> Self {
        self.additional_builtins.insert(name.into());
        self
    }

    pub fn reserved_prefix(&self) -> &str {
        &self.reserved_prefix
    }

    pub fn is_builtin(&self, role_name: &str) -> bool {
        BUILTIN_ROLES.iter().any(|builtin| *builtin == role_name)
            || self.additional_builtins.contains(role_name)
    }

    /// Returns whether the name carries the vendor prefix.
    ///
    /// An empty prefix reserves nothing.
    pub fn is_reserved(&self, role_name: &str) -> bool {
        !self.reserved_prefix.is_empty() && role_name.starts_with(&self.reserved_prefix)
    }

    pub fn is_custom(&self, role_name: &str) -> bool {
        !role_name.is_empty() && !self.is_builtin(role_name) && !self.is_reserved(role_name)
    }

    /// Collects the distinct custom role names granted anywhere in `roles`.
    pub fn classify(&self, roles: &RoleMap) -> CustomRoleSet {
        let mut sources: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for assignment in roles.assignments() {
            if self.is_custom(&assignment.role_name) {
                sources
                    .entry(assignment.role_name.as_str())
                    .or_default()
                    .insert(assignment.database.as_str());
            }
        }

        for (role, databases) in &sources {
            if databases.len() > 1 {
                debug!(
                    role = %role,
                    databases = ?databases,
                    "Custom role name granted from several databases; treating as one role"
                );
            }
        }

        sources.into_keys().map(str::to_string).collect()
    }
}

impl Default for RoleClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    fn grants(db: &str, roles: &[(&str, &str)]) -> (String, Vec<RoleAssignment>) {
        let roles = roles
            .iter()
            .map(|(role_db, name)| RoleAssignment::new(*role_db, *name))
            .collect();
        (db.to_string(), roles)
    }

    #[test_case("read" => false; "builtin read")]
    #[test_case("dbAdminAnyDatabase" => false; "builtin any database")]
    #[test_case("root" => false; "builtin root")]
    #[test_case("xgen-readWriteAtopsmanager.bigdata" => false; "vendor prefixed")]
    #[test_case("xgenAnything" => false; "vendor prefix without dash")]
    #[test_case("" => false; "empty name")]
    #[test_case("PowerSyncCustomRole" => true; "custom")]
    #[test_case("Read" => true; "case sensitive")]
    #[test_case("myxgen" => true; "prefix must lead")]
    fn test_is_custom(name: &str) -> bool {
        RoleClassifier::new().is_custom(name)
    }

    #[test]
    fn test_classify_sample_grants() {
        let roles: RoleMap = [grants(
            "admin",
            &[
                ("admin", "PowerSyncCustomRole"),
                ("admin", "read"),
                ("admin", "xgen-readWriteAtopsmanager.bigdata"),
                ("opsmanager", "dbAdmin"),
                ("sample_mflix", "dbAdmin"),
                ("sample_mflix", "readWrite"),
            ],
        )]
        .into_iter()
        .collect();

        let custom = RoleClassifier::new().classify(&roles);

        assert_eq!(custom.len(), 1);
        assert!(custom.contains("PowerSyncCustomRole"));
    }

    #[test]
    fn test_classify_only_builtin_is_empty() {
        let roles: RoleMap = [grants("admin", &[("admin", "read")])].into_iter().collect();
        assert!(RoleClassifier::new().classify(&roles).is_empty());
    }

    #[test]
    fn test_classify_deduplicates_across_databases() {
        let roles: RoleMap = [
            grants("admin", &[("admin", "auditRole"), ("admin", "read")]),
            grants("sales", &[("admin", "auditRole"), ("sales", "salesWriter")]),
        ]
        .into_iter()
        .collect();

        let custom: Vec<String> = RoleClassifier::new().classify(&roles).into_iter().collect();

        assert_eq!(custom, vec!["auditRole", "salesWriter"]);
    }

    #[test]
    fn test_classify_skips_missing_role_name() {
        let assignments: Vec<RoleAssignment> = serde_json::from_value(json!([
            { "db": "admin" },
            { "db": "admin", "role": "" },
            { "db": "admin", "role": "reportViewer", "minFcv": "" }
        ]))
        .unwrap();

        let mut roles = RoleMap::new();
        roles.insert("admin", assignments);

        let custom = RoleClassifier::new().classify(&roles);
        assert_eq!(custom.into_iter().collect::<Vec<_>>(), vec!["reportViewer"]);
    }

    #[test]
    fn test_additional_builtins_and_prefix() {
        let classifier = RoleClassifier::new()
            .with_reserved_prefix("acme_")
            .with_builtin_role("backupOperator");

        assert!(!classifier.is_custom("backupOperator"));
        assert!(!classifier.is_custom("acme_monitor"));
        assert!(!classifier.is_custom("read"));
        assert!(classifier.is_custom("xgenLegacy"));
    }

    #[test]
    fn test_empty_prefix_reserves_nothing() {
        let classifier = RoleClassifier::new().with_reserved_prefix("");
        assert!(!classifier.is_reserved("anything"));
        assert!(classifier.is_custom("anything"));
    }

    #[test]
    fn test_role_map_skips_empty_grants() {
        let mut roles = RoleMap::new();
        assert!(!roles.insert("empty", Vec::new()));
        assert!(roles.insert("admin", vec![RoleAssignment::new("admin", "read")]));

        assert_eq!(roles.len(), 1);
        assert!(!roles.contains_database("empty"));
        assert_eq!(roles.get("admin").map(<[_]>::len), Some(1));
    }

    fn arb_role_name() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(BUILTIN_ROLES).prop_map(str::to_string),
            "xgen[a-zA-Z]{0,6}",
            "[a-zA-Z]{0,8}",
        ]
    }

    fn arb_role_map() -> impl Strategy<Value = RoleMap> {
        prop::collection::btree_map(
            "[a-d]{1,3}",
            prop::collection::vec(
                ("[a-d]{1,3}", arb_role_name())
                    .prop_map(|(db, name)| RoleAssignment::new(db, name)),
                0..6,
            ),
            0..5,
        )
        .prop_map(|entries| entries.into_iter().collect())
    }

    proptest! {
        #[test]
        fn classify_excludes_builtin_and_reserved(roles in arb_role_map()) {
            let custom = RoleClassifier::new().classify(&roles);
            for name in &custom {
                prop_assert!(!name.is_empty());
                prop_assert!(!BUILTIN_ROLES.iter().any(|builtin| builtin == name));
                prop_assert!(!name.starts_with(RESERVED_PREFIX));
            }
        }

        #[test]
        fn classify_includes_every_other_name(roles in arb_role_map()) {
            let classifier = RoleClassifier::new();
            let custom = classifier.classify(&roles);
            for assignment in roles.assignments() {
                let name = &assignment.role_name;
                prop_assert_eq!(custom.contains(name), classifier.is_custom(name));
            }
        }
    }
}
