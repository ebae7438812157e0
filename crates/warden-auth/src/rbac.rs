// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Role-Based Access Control (RBAC).
//!
//! Roles map to ordered lists of permission strings. The built-in roles
//! `admin`, `editor` and `viewer` are always present unless a configured role
//! of the same name replaces them wholesale.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::IdentityContext;
use crate::error::{AuthError, AuthResult};
use crate::permission::{is_valid_permission, Action, Permission, PermissionSet};

// =============================================================================
// BuiltinRole
// =============================================================================

/// Roles available without any configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinRole {
    /// `*:*`
    Admin,
    /// `read:*`, `write:*`
    Editor,
    /// `read:*`
    Viewer,
}

impl BuiltinRole {
    /// All built-in roles.
    pub const ALL: [BuiltinRole; 3] = [BuiltinRole::Admin, BuiltinRole::Editor, BuiltinRole::Viewer];

    /// Returns the role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinRole::Admin => "admin",
            BuiltinRole::Editor => "editor",
            BuiltinRole::Viewer => "viewer",
        }
    }

    /// Returns the permissions the role grants.
    pub fn default_permissions(&self) -> &'static [&'static str] {
        match self {
            BuiltinRole::Admin => &["*:*"],
            BuiltinRole::Editor => &["read:*", "write:*"],
            BuiltinRole::Viewer => &["read:*"],
        }
    }

    /// Returns the role as a definition.
    pub fn definition(&self) -> RoleDefinition {
        let description = match self {
            BuiltinRole::Admin => "Full access to every domain",
            BuiltinRole::Editor => "Read and write access to every domain",
            BuiltinRole::Viewer => "Read-only access to every domain",
        };
        RoleDefinition::new(self.default_permissions().iter().copied())
            .with_description(description)
    }
}

impl std::fmt::Display for BuiltinRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// RoleDefinition
// =============================================================================

/// A named role's permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleDefinition {
    /// Permission strings, in declaration order.
    pub permissions: Vec<String>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RoleDefinition {
    /// Creates a definition from permission strings.
    pub fn new<S: Into<String>>(permissions: impl IntoIterator<Item = S>) -> Self {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            description: None,
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// =============================================================================
// RbacConfig
// =============================================================================

/// Declarative RBAC configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RbacConfig {
    /// Whether role permissions are merged into identities.
    pub enabled: bool,
    /// Custom roles. A name shared with a built-in replaces it.
    pub roles: BTreeMap<String, RoleDefinition>,
    /// Role assumed for identities whose token carries no roles.
    pub default_role: Option<String>,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            roles: BTreeMap::new(),
            default_role: None,
        }
    }
}

impl RbacConfig {
    /// Adds a custom role.
    pub fn with_role(mut self, name: impl Into<String>, role: RoleDefinition) -> Self {
        self.roles.insert(name.into(), role);
        self
    }

    /// Sets the default role.
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = Some(role.into());
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> AuthResult<()> {
        for (name, role) in &self.roles {
            if name.trim().is_empty() {
                return Err(AuthError::invalid_config("rbac: role name must not be blank"));
            }
            if let Some(bad) = role.permissions.iter().find(|p| !is_valid_permission(p)) {
                return Err(AuthError::invalid_config(format!(
                    "rbac.roles.{name}: malformed permission '{bad}'"
                )));
            }
        }

        if let Some(default_role) = &self.default_role {
            let known = self.roles.contains_key(default_role)
                || BuiltinRole::ALL.iter().any(|r| r.as_str() == default_role);
            if !known {
                return Err(AuthError::invalid_config(format!(
                    "rbac.default_role: unknown role '{default_role}'"
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// RbacPolicy
// =============================================================================

/// Resolves roles to permissions and checks access.
///
/// Created once at startup and shared by reference; cloning is cheap.
#[derive(Debug, Clone)]
pub struct RbacPolicy {
    role_permissions: Arc<HashMap<String, Vec<String>>>,
    enabled: bool,
    default_role: Option<String>,
}

impl RbacPolicy {
    /// Creates a policy from configuration.
    pub fn new(config: &RbacConfig) -> Self {
        let mut role_permissions: HashMap<String, Vec<String>> = BuiltinRole::ALL
            .iter()
            .map(|role| {
                let perms = role.default_permissions().iter().map(|p| p.to_string());
                (role.as_str().to_string(), perms.collect())
            })
            .collect();

        for (name, role) in &config.roles {
            role_permissions.insert(name.clone(), role.permissions.clone());
        }

        Self {
            role_permissions: Arc::new(role_permissions),
            enabled: config.enabled,
            default_role: config.default_role.clone(),
        }
    }

    /// Creates a policy builder.
    pub fn builder() -> RbacPolicyBuilder {
        RbacPolicyBuilder::new()
    }

    /// Returns whether role enrichment is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the default role, if configured.
    pub fn default_role(&self) -> Option<&str> {
        self.default_role.as_deref()
    }

    /// Returns all known role names, sorted.
    pub fn roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.role_permissions.keys().map(String::as_str).collect();
        roles.sort_unstable();
        roles
    }

    /// Returns the permissions of a single role.
    pub fn role_permissions(&self, role: &str) -> Option<&[String]> {
        self.role_permissions.get(role).map(Vec::as_slice)
    }

    /// Returns the union of the permissions granted by `roles`.
    ///
    /// Unknown role names contribute nothing.
    pub fn permissions_for_roles<S: AsRef<str>>(
        &self,
        roles: impl IntoIterator<Item = S>,
    ) -> PermissionSet {
        let mut combined = PermissionSet::new();
        for role in roles {
            if let Some(perms) = self.role_permissions.get(role.as_ref()) {
                combined.extend(perms.iter().cloned());
            }
        }
        combined
    }

    /// Returns true if any of `permissions` covers `action` on `domain[.entity]`.
    pub fn is_allowed(
        &self,
        permissions: &PermissionSet,
        action: Action,
        domain: &str,
        entity: Option<&str>,
    ) -> bool {
        let scope = describe_scope(domain, entity);
        let allowed = Permission::required(action, domain, entity)
            .is_some_and(|required| permissions.grants(&required));

        if allowed {
            tracing::debug!(action = %action, scope = %scope, "Permission granted");
        } else {
            tracing::warn!(action = %action, scope = %scope, "Permission denied");
        }
        allowed
    }

    /// Like [`is_allowed`](Self::is_allowed) but returns the denied `action:scope` as an error.
    pub fn check(
        &self,
        permissions: &PermissionSet,
        action: Action,
        domain: &str,
        entity: Option<&str>,
    ) -> AuthResult<()> {
        if self.is_allowed(permissions, action, domain, entity) {
            Ok(())
        } else {
            Err(AuthError::permission_denied(
                action.as_str(),
                describe_scope(domain, entity),
            ))
        }
    }

    /// Checks an identity: anonymous callers are refused before any permission lookup.
    pub fn authorize(
        &self,
        identity: &IdentityContext,
        action: Action,
        domain: &str,
        entity: Option<&str>,
    ) -> AuthResult<()> {
        if !identity.is_authenticated() {
            return Err(AuthError::Unauthenticated);
        }
        self.check(identity.permissions(), action, domain, entity)
    }
}

impl Default for RbacPolicy {
    fn default() -> Self {
        Self::new(&RbacConfig::default())
    }
}

fn describe_scope(domain: &str, entity: Option<&str>) -> String {
    match entity {
        Some(entity) => format!("{domain}.{entity}"),
        None => domain.to_string(),
    }
}

// =============================================================================
// RbacPolicyBuilder
// =============================================================================

/// Builder for constructing RBAC policies in code.
#[derive(Debug, Default)]
pub struct RbacPolicyBuilder {
    config: RbacConfig,
}

impl RbacPolicyBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role, replacing any role of the same name.
    pub fn role<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        permissions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.config
            .roles
            .insert(name.into(), RoleDefinition::new(permissions));
        self
    }

    /// Sets the default role.
    pub fn default_role(mut self, role: impl Into<String>) -> Self {
        self.config.default_role = Some(role.into());
        self
    }

    /// Enables or disables role enrichment.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Builds the policy.
    pub fn build(self) -> AuthResult<RbacPolicy> {
        self.config.validate()?;
        Ok(RbacPolicy::new(&self.config))
    }
}

// =============================================================================
// Tests
// =============================================================================
