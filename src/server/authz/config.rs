use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

use super::{Method, PolicyTable, Role, RolePolicy};

/// Authorization related configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthzConfig {
    /// Replaces the builtin policy table when set. Keys are role names, each
    /// value holds `allow_all` and a resource list per method, e.g.
    ///
    /// ```toml
    /// [authz.roles.nurse]
    /// GET = ["patients", "appointments"]
    /// PATCH = ["appointments"]
    /// ```
    #[serde(default = "AuthzConfig::default_roles")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<BTreeMap<String, RolePolicyConfig>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RolePolicyConfig {
    #[serde(default)]
    pub allow_all: bool,

    #[serde(flatten)]
    pub methods: BTreeMap<String, Vec<String>>,
}

impl CommonConfig for AuthzConfig {
    fn default() -> Self {
        Self {
            roles: Self::default_roles(),
        }
    }

    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        if self.roles.is_some() {
            self.build_table().context("policy table")?;
        }
        Ok(())
    }
}

impl AuthzConfig {
    pub fn default_roles() -> Option<BTreeMap<String, RolePolicyConfig>> {
        None
    }

    /// Builds the policy table described by this config, or the builtin one
    /// when no roles are configured.
    pub fn build_table(&self) -> Result<PolicyTable> {
        let roles = match self.roles {
            Some(ref roles) => roles,
            None => return Ok(PolicyTable::builtin()),
        };

        let mut table = PolicyTable::new();
        for (name, role_cfg) in roles {
            let role = Role::from_name(name);
            if !role.is_known() {
                bail!("unknown role '{name}'");
            }

            let mut policy = if role_cfg.allow_all {
                RolePolicy::allow_all()
            } else {
                RolePolicy::new()
            };

            for (method, resources) in role_cfg.methods.iter() {
                let method = match Method::parse(method) {
                    Some(method) => method,
                    None => bail!("unsupported method '{method}' for role '{name}'"),
                };
                if resources.iter().any(|r| r.trim().is_empty()) {
                    bail!("empty resource name in {method} list for role '{name}'");
                }
                policy = policy.allow(method, resources);
            }

            table
                .insert(role, policy)
                .with_context(|| format!("role '{name}'"))?;
        }

        Ok(table)
    }
}
