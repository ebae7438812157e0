// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Local accounts: registration, password hashing and credential checks.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::{IdentityContext, ISSUER_IDENTITY};
use crate::error::{AuthError, AuthResult};
use crate::login::{login_key, CredentialCheck};
use crate::token::is_valid_email;

// =============================================================================
// UserRecord / UserStore
// =============================================================================

/// A stored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable subject id.
    pub user_id: String,
    /// Email as registered.
    pub email: String,
    /// PHC-format password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Assigned roles.
    pub roles: Vec<String>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// Account storage keyed by normalized email.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug {
    /// Looks up an account.
    async fn get(&self, email: &str) -> AuthResult<Option<UserRecord>>;

    /// Inserts an account. Fails with [`AuthError::UserExists`] on a duplicate.
    async fn insert(&self, record: UserRecord) -> AuthResult<()>;

    /// Returns true if an account exists.
    async fn exists(&self, email: &str) -> AuthResult<bool> {
        Ok(self.get(email).await?.is_some())
    }
}

/// Non-persistent account store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        tracing::warn!("Using the in-memory user store; accounts are lost on restart");
        Self::default()
    }

    /// Returns the number of accounts.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        Ok(self.users.get(&login_key(email)).map(|r| r.clone()))
    }

    async fn insert(&self, record: UserRecord) -> AuthResult<()> {
        match self.users.entry(login_key(&record.email)) {
            Entry::Occupied(_) => Err(AuthError::UserExists),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }
}

// =============================================================================
// PasswordPolicy
// =============================================================================

/// Password strength requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordPolicy {
    /// Minimum length in characters.
    pub min_length: usize,
    /// Require an ASCII uppercase letter.
    pub require_uppercase: bool,
    /// Require an ASCII lowercase letter.
    pub require_lowercase: bool,
    /// Require a digit.
    pub require_digit: bool,
    /// Require a character that is not an ASCII letter or digit.
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
        }
    }
}

impl PasswordPolicy {
    /// A policy accepting any non-empty password.
    pub fn permissive() -> Self {
        Self {
            min_length: 1,
            require_uppercase: false,
            require_lowercase: false,
            require_digit: false,
            require_special: false,
        }
    }

    /// Checks `password`, listing every unmet requirement.
    pub fn check(&self, password: &str) -> AuthResult<()> {
        let mut missing = Vec::new();
        if password.chars().count() < self.min_length {
            missing.push(format!("at least {} characters", self.min_length));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            missing.push("an uppercase letter".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            missing.push("a lowercase letter".to_string());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            missing.push("a digit".to_string());
        }
        if self.require_special && password.chars().all(|c| c.is_ascii_alphanumeric()) {
            missing.push("a special character".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AuthError::WeakPassword(format!("must contain {}", missing.join(", "))))
        }
    }
}

// =============================================================================
// Password hashing
// =============================================================================

/// Hashes a password into a PHC string with a random salt.
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::internal(format!("Password hashing failed: {e}")))
}

/// Verifies a password against a PHC string. Unparseable hashes never match.
pub fn verify_password(password: &str, phc: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

async fn hash_blocking(password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::internal(format!("Hashing task failed: {e}")))?
}

async fn verify_blocking(password: String, phc: String) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &phc))
        .await
        .map_err(|e| AuthError::internal(format!("Verification task failed: {e}")))
}

// =============================================================================
// IdentityProvider
// =============================================================================

/// Registers local accounts and checks their credentials.
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    store: Arc<dyn UserStore>,
    policy: PasswordPolicy,
    dummy_hash: Arc<str>,
}

impl IdentityProvider {
    /// Creates a provider over `store`.
    pub fn new(store: Arc<dyn UserStore>, policy: PasswordPolicy) -> AuthResult<Self> {
        let dummy_hash = hash_password(&Uuid::new_v4().to_string())?;
        Ok(Self {
            store,
            policy,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    /// Returns the password policy.
    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Registers an account and returns its identity.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        roles: &[String],
    ) -> AuthResult<IdentityContext> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AuthError::InvalidInput("email is not a valid address".into()));
        }
        self.policy.check(password)?;
        if self.store.exists(email).await? {
            return Err(AuthError::UserExists);
        }

        let record = UserRecord {
            user_id: Uuid::now_v7().simple().to_string(),
            email: email.to_string(),
            password_hash: hash_blocking(password.to_string()).await?,
            roles: roles.to_vec(),
            created_at: Utc::now(),
        };
        let identity = identity_for(&record);
        self.store.insert(record).await?;

        tracing::info!(
            subject = identity.subject_id(),
            roles = ?identity.roles(),
            "User registered"
        );
        Ok(identity)
    }
}

fn identity_for(record: &UserRecord) -> IdentityContext {
    IdentityContext::builder(&record.user_id)
        .email(&record.email)
        .roles(record.roles.iter().cloned())
        .issuer_tag(ISSUER_IDENTITY)
        .build()
}

#[async_trait]
impl CredentialCheck for IdentityProvider {
    async fn verify(&self, email: &str, password: &str) -> AuthResult<Option<IdentityContext>> {
        let record = self.store.get(email).await?;

        // Unknown accounts still pay for a hash comparison.
        let phc = record
            .as_ref()
            .map(|r| r.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.to_string());
        let matches = verify_blocking(password.to_string(), phc).await?;

        match record {
            None => {
                tracing::warn!(reason = "unknown_email", "Login failed");
                Ok(None)
            }
            Some(_) if !matches => {
                tracing::warn!(reason = "bad_password", "Login failed");
                Ok(None)
            }
            Some(record) => Ok(Some(identity_for(&record))),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> IdentityProvider {
        IdentityProvider::new(Arc::new(InMemoryUserStore::new()), PasswordPolicy::default()).unwrap()
    }

    #[test]
    fn test_password_policy() {
        let policy = PasswordPolicy::default();
        assert!(policy.check("Str0ngPass").is_ok());
        let err = policy.check("short").unwrap_err().to_string();
        assert!(err.contains("at least 8 characters"));
        assert!(err.contains("an uppercase letter"));
        assert!(err.contains("a digit"));

        let special = PasswordPolicy {
            require_special: true,
            ..PasswordPolicy::default()
        };
        assert!(special.check("Str0ngPass").is_err());
        assert!(special.check("Str0ng!Pass").is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Secret123", &hash));
        assert!(!verify_password("secret123", &hash));
        assert!(!verify_password("Secret123", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_register_and_verify() {
        let provider = provider();
        let registered = provider
            .register("alice@example.com", "Str0ngPass", &["editor".to_string()])
            .await
            .unwrap();
        assert_eq!(registered.issuer_tag(), ISSUER_IDENTITY);
        assert!(registered.has_role("editor"));

        let verified = provider
            .verify("ALICE@example.com", "Str0ngPass")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(verified.subject_id(), registered.subject_id());

        assert!(provider.verify("alice@example.com", "wrong").await.unwrap().is_none());
        assert!(provider.verify("nobody@example.com", "Str0ngPass").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let provider = provider();
        provider.register("a@example.com", "Str0ngPass", &[]).await.unwrap();

        let dup = provider.register("A@example.com", "Str0ngPass", &[]).await;
        assert!(matches!(dup, Err(AuthError::UserExists)));

        let weak = provider.register("b@example.com", "weak", &[]).await;
        assert!(matches!(weak, Err(AuthError::WeakPassword(_))));

        let bad_email = provider.register("not-an-email", "Str0ngPass", &[]).await;
        assert!(matches!(bad_email, Err(AuthError::InvalidInput(_))));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let record = UserRecord {
            user_id: "u".into(),
            email: "a@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            roles: vec![],
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("argon2"));
    }
}
