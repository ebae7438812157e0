// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Permission strings and matching.
//!
//! A permission is `action ":" scope`:
//!
//! - `action` is one of `read`, `write`, `delete` or `*`
//! - `scope` is `Domain`, `Domain.Entity` or `*`
//!
//! Identifiers are ASCII `[A-Za-z0-9_-]+` and case-sensitive. A grant at bare
//! `Domain` scope covers every `Domain.Entity`; an entity grant never covers
//! its domain.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Action
// =============================================================================

/// The action half of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// `read`
    Read,
    /// `write`
    Write,
    /// `delete`
    Delete,
    /// `*`, any action.
    Any,
}

impl Action {
    /// Returns the wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
            Action::Any => "*",
        }
    }

    /// Parses the wire form. Case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Action::Read),
            "write" => Some(Action::Write),
            "delete" => Some(Action::Delete),
            "*" => Some(Action::Any),
            _ => None,
        }
    }

    /// Returns true if a grant of `self` covers `required`.
    pub fn covers(&self, required: Action) -> bool {
        *self == Action::Any || *self == required
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Scope
// =============================================================================

/// The scope half of a permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// `*`, every domain.
    Any,
    /// A bare domain such as `Billing`.
    Domain(String),
    /// A single entity such as `Billing.Invoice`.
    Entity {
        /// Owning domain.
        domain: String,
        /// Entity name.
        entity: String,
    },
}

impl Scope {
    /// Creates a scope for `domain`, narrowed to `entity` when given.
    ///
    /// Returns `None` if either identifier is malformed.
    pub fn new(domain: &str, entity: Option<&str>) -> Option<Self> {
        if !is_identifier(domain) {
            return None;
        }
        match entity {
            None => Some(Scope::Domain(domain.to_string())),
            Some(entity) if is_identifier(entity) => Some(Scope::Entity {
                domain: domain.to_string(),
                entity: entity.to_string(),
            }),
            Some(_) => None,
        }
    }

    /// Parses `*`, `Domain` or `Domain.Entity`.
    pub fn parse(s: &str) -> Option<Self> {
        if s == "*" {
            return Some(Scope::Any);
        }
        match s.split_once('.') {
            None => Scope::new(s, None),
            Some((domain, entity)) => Scope::new(domain, Some(entity)),
        }
    }

    /// Returns true if a grant of `self` covers `required`.
    pub fn covers(&self, required: &Scope) -> bool {
        match (self, required) {
            (Scope::Any, _) => true,
            (granted, required) if granted == required => true,
            (Scope::Domain(granted), Scope::Entity { domain, .. }) => granted == domain,
            _ => false,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Any => f.write_str("*"),
            Scope::Domain(domain) => f.write_str(domain),
            Scope::Entity { domain, entity } => write!(f, "{domain}.{entity}"),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

// =============================================================================
// Permission
// =============================================================================

/// A parsed `action:scope` permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Permission {
    action: Action,
    scope: Scope,
}

impl Permission {
    /// Creates a permission from its parts.
    pub fn new(action: Action, scope: Scope) -> Self {
        Self { action, scope }
    }

    /// Builds the permission a caller needs for `action` on `domain[.entity]`.
    pub fn required(action: Action, domain: &str, entity: Option<&str>) -> Option<Self> {
        Scope::new(domain, entity).map(|scope| Self::new(action, scope))
    }

    /// Parses the wire form. Whitespace anywhere makes the string malformed.
    pub fn parse(s: &str) -> Option<Self> {
        let (action, scope) = s.split_once(':')?;
        Some(Self {
            action: Action::parse(action)?,
            scope: Scope::parse(scope)?,
        })
    }

    /// Returns the action.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Returns the scope.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns true if this grant satisfies `required`.
    pub fn covers(&self, required: &Permission) -> bool {
        self.action.covers(required.action) && self.scope.covers(&required.scope)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.scope)
    }
}

/// Returns true if the `granted` permission string satisfies `required`.
///
/// Malformed strings on either side never match.
pub fn permission_matches(granted: &str, required: &str) -> bool {
    match (Permission::parse(granted), Permission::parse(required)) {
        (Some(granted), Some(required)) => granted.covers(&required),
        _ => false,
    }
}

/// Returns true if `s` follows the permission grammar.
pub fn is_valid_permission(s: &str) -> bool {
    Permission::parse(s).is_some()
}

// =============================================================================
// PermissionSet
// =============================================================================

/// An ordered, deduplicated set of permission strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    permissions: BTreeSet<String>,
}

impl PermissionSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a permission string.
    pub fn insert(&mut self, permission: impl Into<String>) -> bool {
        self.permissions.insert(permission.into())
    }

    /// Returns true if the exact string is present.
    pub fn contains(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Returns true if any member satisfies `required`.
    pub fn grants(&self, required: &Permission) -> bool {
        self.permissions
            .iter()
            .filter_map(|p| Permission::parse(p))
            .any(|granted| granted.covers(required))
    }

    /// Adds every member of `other`.
    pub fn merge(&mut self, other: &PermissionSet) {
        self.permissions.extend(other.permissions.iter().cloned());
    }

    /// Returns the union of two sets.
    pub fn union(&self, other: &PermissionSet) -> PermissionSet {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Returns the number of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Iterates in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            permissions: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for PermissionSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.permissions.extend(iter.into_iter().map(Into::into));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_covers_entity_but_not_reverse() {
        assert!(permission_matches("read:Billing", "read:Billing.Invoice"));
        assert!(!permission_matches("read:Billing.Invoice", "read:Billing"));
        assert!(!permission_matches("read:Billing", "read:Billingx.Invoice"));
    }

    #[test]
    fn test_wildcard_grant_matches_everything() {
        for required in [
            "read:Billing",
            "write:Billing.Invoice",
            "delete:*",
            "*:*",
            "*:Users",
        ] {
            assert!(permission_matches("*:*", required), "{required}");
        }
    }

    #[test]
    fn test_action_and_scope_mismatches() {
        assert!(!permission_matches("read:Billing", "write:Billing"));
        assert!(!permission_matches("read:Billing", "read:Users"));
        assert!(!permission_matches("read:Billing.Invoice", "read:Billing.Payment"));
        assert!(!permission_matches("read:Billing", "read:*"));
        assert!(permission_matches("*:Billing", "delete:Billing.Invoice"));
        assert!(permission_matches("write:*", "write:Users.Profile"));
    }

    #[test]
    fn test_malformed_never_matches() {
        for bad in [
            "",
            "read",
            "read:",
            ":Billing",
            "Read:Billing",
            "read: Billing",
            "read:Billing.",
            "read:.Invoice",
            "read:Billing.Invoice.Line",
            "admin:Billing",
            "read:Bill ing",
            "read:Billing.*",
        ] {
            assert!(!permission_matches(bad, "read:Billing"), "granted {bad:?}");
            assert!(!permission_matches("*:*", bad), "required {bad:?}");
            assert!(!is_valid_permission(bad), "{bad:?}");
        }
    }

    #[test]
    fn test_parse_and_display() {
        let perm = Permission::parse("delete:Billing.Invoice").unwrap();
        assert_eq!(perm.action(), Action::Delete);
        assert_eq!(
            perm.scope(),
            &Scope::Entity {
                domain: "Billing".into(),
                entity: "Invoice".into()
            }
        );
        assert_eq!(perm.to_string(), "delete:Billing.Invoice");
        assert_eq!(Permission::parse("*:*").unwrap().to_string(), "*:*");
    }

    #[test]
    fn test_required_rejects_bad_identifiers() {
        assert!(Permission::required(Action::Read, "Billing", None).is_some());
        assert!(Permission::required(Action::Read, "Billing", Some("Invoice")).is_some());
        assert!(Permission::required(Action::Read, "", None).is_none());
        assert!(Permission::required(Action::Read, "Billing", Some("a.b")).is_none());
    }

    #[test]
    fn test_permission_set() {
        let mut set: PermissionSet = ["read:Billing", "read:Billing"].into_iter().collect();
        assert_eq!(set.len(), 1);
        set.insert("write:Users.Profile");

        let required = Permission::required(Action::Read, "Billing", Some("Invoice")).unwrap();
        assert!(set.grants(&required));
        let required = Permission::required(Action::Write, "Users", None).unwrap();
        assert!(!set.grants(&required));

        let other: PermissionSet = ["delete:*"].into_iter().collect();
        let merged = set.union(&other);
        assert_eq!(merged.len(), 3);
        assert!(merged.contains("delete:*"));
    }
}
