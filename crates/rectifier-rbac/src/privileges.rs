//! Privilege types and set algebra.
//!
//! A [`Privilege`] grants a set of actions over a [`Resource`]. Two
//! privileges are the same privilege iff both the resource and the action
//! set are equal; action order and duplicates in the wire form do not
//! matter because actions are held in a [`BTreeSet`].

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Resource scope a privilege applies to.
///
/// Decoded from the server's resource document:
/// - `{ "db": "sales", "collection": "orders" }` - a namespace
/// - `{ "cluster": true }` - cluster-wide operations
/// - `{ "anyResource": true }` - every resource in the deployment
///
/// An empty `db` or `collection` means "any" for that component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "ResourceDocument", into = "ResourceDocument")]
pub enum Resource {
    /// A database/collection pair.
    Namespace { db: String, collection: String },

    /// The cluster resource.
    Cluster,

    /// Every resource, including system collections.
    AnyResource,
}

impl Resource {
    /// Creates a namespace resource.
    pub fn namespace(db: impl Into<String>, collection: impl Into<String>) -> Self {
        Resource::Namespace {
            db: db.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Namespace { db, collection } => {
                let db = if db.is_empty() { "*" } else { db };
                let collection = if collection.is_empty() {
                    "*"
                } else {
                    collection
                };
                write!(f, "{db}.{collection}")
            }
            Resource::Cluster => f.write_str("cluster"),
            Resource::AnyResource => f.write_str("anyResource"),
        }
    }
}

/// Wire shape of a resource descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ResourceDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    db: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    collection: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    cluster: Option<bool>,

    #[serde(
        default,
        rename = "anyResource",
        skip_serializing_if = "Option::is_none"
    )]
    any_resource: Option<bool>,
}

impl TryFrom<ResourceDocument> for Resource {
    type Error = String;

    fn try_from(doc: ResourceDocument) -> Result<Self, Self::Error> {
        if doc.any_resource == Some(true) {
            return Ok(Resource::AnyResource);
        }
        if doc.cluster == Some(true) {
            return Ok(Resource::Cluster);
        }
        if doc.db.is_some() || doc.collection.is_some() {
            return Ok(Resource::Namespace {
                db: doc.db.unwrap_or_default(),
                collection: doc.collection.unwrap_or_default(),
            });
        }
        Err("resource document names no db, collection, cluster or anyResource".to_string())
    }
}

impl From<Resource> for ResourceDocument {
    fn from(resource: Resource) -> Self {
        match resource {
            Resource::Namespace { db, collection } => ResourceDocument {
                db: Some(db),
                collection: Some(collection),
                ..Default::default()
            },
            Resource::Cluster => ResourceDocument {
                cluster: Some(true),
                ..Default::default()
            },
            Resource::AnyResource => ResourceDocument {
                any_resource: Some(true),
                ..Default::default()
            },
        }
    }
}

/// A set of actions granted over one resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Privilege {
    pub resource: Resource,

    #[serde(default)]
    pub actions: BTreeSet<String>,
}

impl Privilege {
    /// Creates a privilege from a resource and its action names.
    pub fn new<I, S>(resource: Resource, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource,
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns whether this privilege grants the named action.
    pub fn allows(&self, action: &str) -> bool {
        self.actions.contains(action)
    }
}

impl fmt::Display for Privilege {
    /// Canonical form: `resource:[action,action,...]` with sorted actions.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:[", self.resource)?;
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(action)?;
        }
        f.write_str("]")
    }
}

/// Deduplicated set of privileges.
///
/// Backed by a hash set, so the content of the set never depends on the
/// order privileges were added in. Use [`to_ordered_vec`](Self::to_ordered_vec)
/// when a reproducible sequence is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeSet {
    privileges: HashSet<Privilege>,
}

impl PrivilegeSet {
    /// Creates an empty privilege set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a privilege. Returns `false` if it was already present.
    pub fn insert(&mut self, privilege: Privilege) -> bool {
        self.privileges.insert(privilege)
    }

    /// Returns whether the set contains a structurally equal privilege.
    pub fn contains(&self, privilege: &Privilege) -> bool {
        self.privileges.contains(privilege)
    }

    pub fn len(&self) -> usize {
        self.privileges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.privileges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Privilege> {
        self.privileges.iter()
    }

    /// Returns every privilege in either set.
    pub fn union(&self, other: &PrivilegeSet) -> PrivilegeSet {
        self.privileges
            .union(&other.privileges)
            .cloned()
            .collect()
    }

    /// Returns the privileges in `self` that are not in `other`.
    pub fn difference(&self, other: &PrivilegeSet) -> PrivilegeSet {
        self.privileges
            .difference(&other.privileges)
            .cloned()
            .collect()
    }

    /// Returns the privileges present in both sets.
    pub fn intersection(&self, other: &PrivilegeSet) -> PrivilegeSet {
        self.privileges
            .intersection(&other.privileges)
            .cloned()
            .collect()
    }

    /// Flattens the set into the distinct action names it grants.
    pub fn actions(&self) -> BTreeSet<String> {
        self.privileges
            .iter()
            .flat_map(|p| p.actions.iter().cloned())
            .collect()
    }

    /// Returns the privileges sorted by canonical string form.
    pub fn to_ordered_vec(&self) -> Vec<Privilege> {
        let mut ordered: Vec<Privilege> = self.privileges.iter().cloned().collect();
        sort_canonical(&mut ordered);
        ordered
    }

    /// Consumes the set, returning the privileges in canonical order.
    pub fn into_ordered_vec(self) -> Vec<Privilege> {
        let mut ordered: Vec<Privilege> = self.privileges.into_iter().collect();
        sort_canonical(&mut ordered);
        ordered
    }
}

fn sort_canonical(privileges: &mut [Privilege]) {
    // Structural order breaks ties between distinct privileges that render
    // identically (e.g. a db name containing '.').
    privileges.sort_by_cached_key(|p| (p.to_string(), p.clone()));
}

impl FromIterator<Privilege> for PrivilegeSet {
    fn from_iter<I: IntoIterator<Item = Privilege>>(iter: I) -> Self {
        Self {
            privileges: iter.into_iter().collect(),
        }
    }
}

impl Extend<Privilege> for PrivilegeSet {
    fn extend<I: IntoIterator<Item = Privilege>>(&mut self, iter: I) {
        self.privileges.extend(iter);
    }
}

impl From<Vec<Privilege>> for PrivilegeSet {
    fn from(privileges: Vec<Privilege>) -> Self {
        privileges.into_iter().collect()
    }
}

impl IntoIterator for PrivilegeSet {
    type Item = Privilege;
    type IntoIter = std::collections::hash_set::IntoIter<Privilege>;

    fn into_iter(self) -> Self::IntoIter {
        self.privileges.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn find_on(db: &str) -> Privilege {
        Privilege::new(Resource::namespace(db, ""), ["find"])
    }

    #[test]
    fn test_privilege_equality_ignores_action_order() {
        let a = Privilege::new(Resource::namespace("test", "orders"), ["insert", "find"]);
        let b = Privilege::new(
            Resource::namespace("test", "orders"),
            ["find", "insert", "find"],
        );
        assert_eq!(a, b);

        let mut set = PrivilegeSet::new();
        assert!(set.insert(a));
        assert!(!set.insert(b));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_privilege_differs_by_action_set() {
        let a = Privilege::new(Resource::namespace("test", ""), ["find"]);
        let b = Privilege::new(Resource::namespace("test", ""), ["find", "insert"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_decode_namespace_privilege() {
        let doc = json!({
            "resource": { "db": "test", "collection": "" },
            "actions": ["update", "find", "insert"]
        });

        let privilege: Privilege = serde_json::from_value(doc).unwrap();

        assert_eq!(privilege.resource, Resource::namespace("test", ""));
        assert!(privilege.allows("find"));
        assert!(privilege.allows("update"));
        assert!(!privilege.allows("remove"));
        assert_eq!(privilege.to_string(), "test.*:[find,insert,update]");
    }

    #[test]
    fn test_decode_cluster_and_any_resource() {
        let cluster: Privilege = serde_json::from_value(json!({
            "resource": { "cluster": true },
            "actions": ["serverStatus"]
        }))
        .unwrap();
        assert_eq!(cluster.resource, Resource::Cluster);

        let any: Privilege = serde_json::from_value(json!({
            "resource": { "anyResource": true },
            "actions": ["anyAction"]
        }))
        .unwrap();
        assert_eq!(any.resource, Resource::AnyResource);
        assert_eq!(any.to_string(), "anyResource:[anyAction]");
    }

    #[test]
    fn test_decode_rejects_empty_resource() {
        let result: Result<Privilege, _> = serde_json::from_value(json!({
            "resource": {},
            "actions": ["find"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_resource_serializes_to_wire_shape() {
        let value = serde_json::to_value(Resource::Cluster).unwrap();
        assert_eq!(value, json!({ "cluster": true }));

        let value = serde_json::to_value(Resource::namespace("sales", "orders")).unwrap();
        assert_eq!(value, json!({ "db": "sales", "collection": "orders" }));
    }

    #[test]
    fn test_set_operations() {
        let a: PrivilegeSet = vec![find_on("a"), find_on("b")].into();
        let b: PrivilegeSet = vec![find_on("b"), find_on("c")].into();

        assert_eq!(a.union(&b).len(), 3);
        assert_eq!(a.difference(&b).to_ordered_vec(), vec![find_on("a")]);
        assert_eq!(a.intersection(&b).to_ordered_vec(), vec![find_on("b")]);
    }

    #[test]
    fn test_actions_flatten_distinct() {
        let set: PrivilegeSet = vec![
            Privilege::new(Resource::namespace("a", ""), ["find", "insert"]),
            Privilege::new(Resource::namespace("b", ""), ["find", "remove"]),
            Privilege::new(Resource::Cluster, ["serverStatus"]),
        ]
        .into();

        let actions: Vec<String> = set.actions().into_iter().collect();
        assert_eq!(actions, vec!["find", "insert", "remove", "serverStatus"]);
    }

    #[test]
    fn test_ordered_vec_is_sorted_by_canonical_form() {
        let set: PrivilegeSet = vec![
            Privilege::new(Resource::Cluster, ["serverStatus"]),
            find_on("zeta"),
            Privilege::new(Resource::AnyResource, ["anyAction"]),
            find_on("alpha"),
        ]
        .into();

        let rendered: Vec<String> = set
            .to_ordered_vec()
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            rendered,
            vec![
                "alpha.*:[find]",
                "anyResource:[anyAction]",
                "cluster:[serverStatus]",
                "zeta.*:[find]",
            ]
        );
    }

    fn arb_privilege() -> impl Strategy<Value = Privilege> {
        let resource = prop_oneof![
            ("[a-c]{0,2}", "[x-z]{0,2}").prop_map(|(db, coll)| Resource::namespace(db, coll)),
            Just(Resource::Cluster),
            Just(Resource::AnyResource),
        ];
        let actions = prop::collection::btree_set(
            prop_oneof![
                Just("find".to_string()),
                Just("insert".to_string()),
                Just("update".to_string()),
                Just("remove".to_string()),
            ],
            0..4,
        );
        (resource, actions).prop_map(|(resource, actions)| Privilege { resource, actions })
    }

    fn arb_set() -> impl Strategy<Value = PrivilegeSet> {
        prop::collection::vec(arb_privilege(), 0..12).prop_map(PrivilegeSet::from)
    }

    proptest! {
        #[test]
        fn union_is_commutative(a in arb_set(), b in arb_set()) {
            prop_assert_eq!(a.union(&b), b.union(&a));
        }

        #[test]
        fn union_is_idempotent(a in arb_set()) {
            prop_assert_eq!(a.union(&a), a);
        }

        #[test]
        fn difference_with_self_is_empty(a in arb_set()) {
            prop_assert!(a.difference(&a).is_empty());
        }

        #[test]
        fn difference_and_intersection_partition(a in arb_set(), b in arb_set()) {
            let diff = a.difference(&b);
            let common = a.intersection(&b);
            prop_assert!(diff.intersection(&common).is_empty());
            prop_assert_eq!(diff.union(&common), a);
        }

        #[test]
        fn ordering_ignores_insertion_order(mut privileges in prop::collection::vec(arb_privilege(), 0..12)) {
            let forward = PrivilegeSet::from(privileges.clone()).to_ordered_vec();
            privileges.reverse();
            let backward = PrivilegeSet::from(privileges).to_ordered_vec();
            prop_assert_eq!(forward, backward);
        }
    }
}
