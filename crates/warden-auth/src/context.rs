// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Identity context.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::permission::{Action, Permission, PermissionSet};

/// Issuer tag for identities produced by bearer-token validation.
pub const ISSUER_BEARER: &str = "bearer";
/// Issuer tag for identities produced by local password login.
pub const ISSUER_IDENTITY: &str = "identity";
/// Issuer tag for the anonymous identity.
pub const ISSUER_ANONYMOUS: &str = "anonymous";

/// Subject id of the anonymous identity.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// Who is calling and what they may do.
///
/// Immutable once built. Enrichment (adding role permissions) consumes the
/// value and returns a new one, so a shared context is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityContext {
    subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    roles: BTreeSet<String>,
    permissions: PermissionSet,
    issuer_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    issued_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_id: Option<String>,
    metadata: BTreeMap<String, Value>,
}

impl IdentityContext {
    /// Starts building a context for `subject_id`.
    pub fn builder(subject_id: impl Into<String>) -> IdentityContextBuilder {
        IdentityContextBuilder::new(subject_id)
    }

    /// The identity attached to public paths.
    pub fn anonymous() -> Self {
        IdentityContextBuilder::new(ANONYMOUS_SUBJECT)
            .issuer_tag(ISSUER_ANONYMOUS)
            .build()
    }

    /// Returns the subject id.
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Returns the sanitized email, if any.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the roles.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Returns the permissions.
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns which strategy produced this identity.
    pub fn issuer_tag(&self) -> &str {
        &self.issuer_tag
    }

    /// Returns when the underlying credential was issued.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    /// Returns the token id (`jti`).
    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }

    /// Returns the allow-listed token metadata.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Returns false only for the anonymous identity.
    pub fn is_authenticated(&self) -> bool {
        self.issuer_tag != ISSUER_ANONYMOUS
    }

    /// Returns `true` if the context has the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns `true` if the context has any of the given roles.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Returns `true` if any held permission covers `action` on `domain[.entity]`.
    pub fn can(&self, action: Action, domain: &str, entity: Option<&str>) -> bool {
        Permission::required(action, domain, entity)
            .is_some_and(|required| self.permissions.grants(&required))
    }

    /// Returns a copy whose permissions include `extra`.
    pub fn with_additional_permissions(mut self, extra: &PermissionSet) -> Self {
        self.permissions.merge(extra);
        self
    }

    /// Returns a copy with `roles` when it currently has none.
    pub fn with_fallback_role(mut self, role: &str) -> Self {
        if self.roles.is_empty() {
            self.roles.insert(role.to_string());
        }
        self
    }
}

// =============================================================================
// IdentityContextBuilder
// =============================================================================

/// Builder for [`IdentityContext`].
#[derive(Debug, Clone)]
pub struct IdentityContextBuilder {
    context: IdentityContext,
}

impl IdentityContextBuilder {
    /// Creates a builder for `subject_id` tagged as a bearer identity.
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            context: IdentityContext {
                subject_id: subject_id.into(),
                email: None,
                roles: BTreeSet::new(),
                permissions: PermissionSet::new(),
                issuer_tag: ISSUER_BEARER.to_string(),
                issued_at: None,
                token_id: None,
                metadata: BTreeMap::new(),
            },
        }
    }

    /// Sets the email.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.context.email = Some(email.into());
        self
    }

    /// Adds a role.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.context.roles.insert(role.into());
        self
    }

    /// Adds several roles.
    pub fn roles<S: Into<String>>(mut self, roles: impl IntoIterator<Item = S>) -> Self {
        self.context.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Adds a permission.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.context.permissions.insert(permission);
        self
    }

    /// Adds several permissions.
    pub fn permissions<S: Into<String>>(mut self, permissions: impl IntoIterator<Item = S>) -> Self {
        self.context.permissions.extend(permissions);
        self
    }

    /// Sets the issuer tag.
    pub fn issuer_tag(mut self, tag: impl Into<String>) -> Self {
        self.context.issuer_tag = tag.into();
        self
    }

    /// Sets the issue time.
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.context.issued_at = Some(at);
        self
    }

    /// Sets the token id.
    pub fn token_id(mut self, jti: impl Into<String>) -> Self {
        self.context.token_id = Some(jti.into());
        self
    }

    /// Adds a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.metadata.insert(key.into(), value);
        self
    }

    /// Builds the context.
    pub fn build(self) -> IdentityContext {
        self.context
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous() {
        let anon = IdentityContext::anonymous();
        assert!(!anon.is_authenticated());
        assert_eq!(anon.subject_id(), ANONYMOUS_SUBJECT);
        assert!(anon.permissions().is_empty());
    }

    #[test]
    fn test_builder() {
        let ctx = IdentityContext::builder("user-1")
            .email("alice@example.com")
            .roles(["editor", "editor"])
            .permission("read:Billing")
            .token_id("jti-1")
            .build();

        assert!(ctx.is_authenticated());
        assert_eq!(ctx.issuer_tag(), ISSUER_BEARER);
        assert_eq!(ctx.roles().len(), 1);
        assert!(ctx.has_role("editor"));
        assert!(ctx.has_any_role(&["viewer", "editor"]));
        assert!(ctx.can(Action::Read, "Billing", Some("Invoice")));
        assert!(!ctx.can(Action::Write, "Billing", None));
        assert_eq!(ctx.token_id(), Some("jti-1"));
    }

    #[test]
    fn test_enrichment_returns_new_value() {
        let original = IdentityContext::builder("user-1").permission("read:A").build();
        let extra: PermissionSet = ["write:B"].into_iter().collect();

        let enriched = original.clone().with_additional_permissions(&extra);
        assert_eq!(original.permissions().len(), 1);
        assert_eq!(enriched.permissions().len(), 2);

        let with_role = original.clone().with_fallback_role("viewer");
        assert!(with_role.has_role("viewer"));
        let keeps = with_role.with_fallback_role("admin");
        assert!(!keeps.has_role("admin"));
    }
}
