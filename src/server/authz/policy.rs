use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};

use crate::server::authn::Identity;

use super::{Method, Role};

/// Grants every read-only method on every resource when present in a role's
/// GET list.
pub const WILDCARD: &str = "*";

/// Permissions of a single role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePolicy {
    pub allow_all: bool,
    permissions: BTreeMap<Method, Vec<String>>,
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            permissions: BTreeMap::new(),
        }
    }

    /// Grants `method` on every resource in `resources`. Order is kept and
    /// duplicates are dropped.
    pub fn allow<S: AsRef<str>>(mut self, method: Method, resources: &[S]) -> Self {
        let list = self.permissions.entry(method).or_default();
        for resource in resources {
            let resource = resource.as_ref();
            if !list.iter().any(|r| r == resource) {
                list.push(resource.to_string());
            }
        }
        self
    }

    pub fn resources(&self, method: Method) -> &[String] {
        match self.permissions.get(&method) {
            Some(list) => list,
            None => &[],
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = (&Method, &Vec<String>)> {
        self.permissions.iter()
    }
}

/// Role -> permissions mapping. Built once at startup and shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTable {
    roles: HashMap<Role, RolePolicy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: Role, policy: RolePolicy) -> Result<()> {
        if !role.is_known() {
            bail!("unknown role '{role}' cannot have a policy");
        }
        if self.roles.contains_key(&role) {
            bail!("duplicate policy for role '{role}'");
        }
        self.roles.insert(role, policy);
        Ok(())
    }

    pub fn get(&self, role: &Role) -> Option<&RolePolicy> {
        self.roles.get(role)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// The table shipped with the server, used unless the configuration
    /// provides its own.
    pub fn builtin() -> Self {
        const CLINICAL: [&str; 2] = ["medical_records", "prescriptions"];

        let mut roles = HashMap::new();

        roles.insert(Role::Administrator, RolePolicy::allow_all());

        roles.insert(
            Role::Physician,
            RolePolicy::new()
                .allow(
                    Method::Get,
                    &["patients", "appointments", "medical_records", "prescriptions"],
                )
                .allow(Method::Post, &CLINICAL)
                .allow(Method::Put, &CLINICAL)
                .allow(Method::Patch, &CLINICAL),
        );

        roles.insert(
            Role::Nurse,
            RolePolicy::new()
                .allow(Method::Get, &["patients", "appointments", "equipment"])
                .allow(Method::Patch, &["appointments", "equipment"]),
        );

        roles.insert(
            Role::Clerk,
            RolePolicy::new()
                .allow(Method::Get, &[WILDCARD])
                .allow(
                    Method::Post,
                    &["appointments", "patients", "persons", "employees", "equipment"],
                )
                .allow(
                    Method::Put,
                    &["appointments", "patients", "persons", "employees"],
                )
                .allow(Method::Patch, &["appointments", "patients", "employees"])
                .allow(Method::Delete, &["employees", "equipment"]),
        );

        roles.insert(Role::Auditor, RolePolicy::new().allow(Method::Get, &[WILDCARD]));

        Self { roles }
    }
}

/// Decides whether `identity` may perform `method` on `resource`.
///
/// Evaluation order:
/// 1. No identity: deny.
/// 2. Role without an entry in the table: deny.
/// 3. `allow_all`: allow.
/// 4. Read-only method and `*` in the role's GET list: allow.
/// 5. Allow iff the list for exactly `method` contains exactly `resource`.
pub fn is_authorized(
    table: &PolicyTable,
    identity: Option<&Identity>,
    method: Method,
    resource: &str,
) -> bool {
    let identity = match identity {
        Some(identity) => identity,
        None => return false,
    };

    let policy = match table.get(&identity.role) {
        Some(policy) => policy,
        None => return false,
    };

    if policy.allow_all {
        return true;
    }

    if method.is_read_only() && policy.resources(Method::Get).iter().any(|r| r == WILDCARD) {
        return true;
    }

    policy.resources(method).iter().any(|r| r == resource)
}
