// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! # User Storage
//!
//! Local mirror of Clerk users, kept in sync by webhooks, plus the onboarding
//! starter packs attached to them.
//!
//! ## Reconciliation Rules
//!
//! - Users are keyed by the Clerk user id; there is at most one record per id
//! - `email` and `github_connected` are always overwritten
//! - `username`, `display_name`, `avatar_url` and `github_username` are only
//!   overwritten by a non-empty incoming value
//! - Updating or deleting an unknown user affects zero rows and is not an error
//!
//! ## Backends
//!
//! - [`RedbUserStore`]: embedded ACID database under `DATA_DIR`
//! - [`InMemoryUserStore`]: process-local, used when no `DATA_DIR` is set
//!
//! Both are synchronous. Async callers go through [`run_bounded`], which moves
//! the call to the blocking pool and bounds it with a timeout.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod memory;
pub mod redb_store;

pub use memory::InMemoryUserStore;
pub use redb_store::RedbUserStore;

// =============================================================================
// Records
// =============================================================================

/// Profile fields carried by a `user.created` / `user.updated` event.
///
/// `None` means "no value supplied", never "clear the field".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub clerk_user_id: String,
    pub email: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub github_username: Option<String>,
}

/// Local user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    pub id: String,
    pub clerk_user_id: String,
    pub email: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub github_username: Option<String>,
    pub github_connected: bool,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(profile: &UserProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            clerk_user_id: profile.clerk_user_id.clone(),
            email: profile.email.clone(),
            username: profile.username.clone(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            github_connected: profile.github_username.is_some(),
            github_username: profile.github_username.clone(),
            onboarding_completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an incoming profile without regressing populated fields.
    pub fn merge_profile(&mut self, profile: &UserProfile, now: DateTime<Utc>) {
        self.email = profile.email.clone();
        merge_field(&mut self.username, &profile.username);
        merge_field(&mut self.display_name, &profile.display_name);
        merge_field(&mut self.avatar_url, &profile.avatar_url);
        merge_field(&mut self.github_username, &profile.github_username);
        self.github_connected = profile.github_username.is_some();
        self.updated_at = now;
    }
}

fn merge_field(current: &mut Option<String>, incoming: &Option<String>) {
    if let Some(value) = incoming.as_ref().filter(|v| !v.is_empty()) {
        *current = Some(value.clone());
    }
}

/// Answers submitted on the onboarding screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OnboardingData {
    /// beginner, intermediate, advanced or expert
    pub experience: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

/// Personalised learning pack, one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StarterPack {
    pub id: String,
    /// Internal [`UserRecord::id`]
    pub user_id: String,
    pub experience: String,
    pub paths: Vec<String>,
    pub technologies: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StarterPack {
    pub fn new(user_id: &str, data: &OnboardingData, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            experience: data.experience.clone(),
            paths: data.paths.clone(),
            technologies: data.technologies.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the answers, keeping id and creation time.
    pub fn apply(&mut self, data: &OnboardingData, now: DateTime<Utc>) {
        self.experience = data.experience.clone();
        self.paths = data.paths.clone();
        self.technologies = data.technologies.clone();
        self.updated_at = now;
    }
}

/// Result of [`UserRepository::upsert_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A repository call that did not complete.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("persistence call timed out after {0:?}")]
    TimedOut(Duration),

    #[error("persistence task aborted: {0}")]
    Aborted(String),
}

// =============================================================================
// Repository
// =============================================================================

/// Synchronous user persistence.
pub trait UserRepository: Send + Sync {
    /// Insert by Clerk id, or merge into the existing record.
    fn upsert_user(&self, profile: &UserProfile) -> StoreResult<UpsertOutcome>;

    /// Merge into an existing record. Returns the number of records touched.
    fn update_user(&self, profile: &UserProfile) -> StoreResult<u64>;

    /// Remove a user and its starter pack. Returns the number of users removed.
    fn delete_user(&self, clerk_user_id: &str) -> StoreResult<u64>;

    fn find_by_clerk_id(&self, clerk_user_id: &str) -> StoreResult<Option<UserRecord>>;

    /// Upsert the user's starter pack and mark onboarding complete.
    ///
    /// Returns `None` when the user is not known locally.
    fn save_onboarding(
        &self,
        clerk_user_id: &str,
        data: &OnboardingData,
    ) -> StoreResult<Option<StarterPack>>;

    /// Cheap probe used by readiness checks.
    fn health(&self) -> StoreResult<()>;
}

/// Run a blocking repository call off the async runtime, bounded by `timeout`.
///
/// On timeout the blocking call keeps running to completion in the
/// background; only the caller stops waiting for it.
pub async fn run_bounded<T, F>(timeout: Duration, call: F) -> Result<T, PersistenceError>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(call);
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result.map_err(PersistenceError::from),
        Ok(Err(join_error)) => Err(PersistenceError::Aborted(join_error.to_string())),
        Err(_) => Err(PersistenceError::TimedOut(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            clerk_user_id: "c1".into(),
            email: "a@b.com".into(),
            username: Some("ada".into()),
            display_name: Some("Ada Lovelace".into()),
            avatar_url: Some("https://img.example/ada.png".into()),
            github_username: Some("ada-gh".into()),
        }
    }

    #[test]
    fn new_record_derives_github_connected() {
        let record = UserRecord::new(&profile(), Utc::now());
        assert!(record.github_connected);
        assert!(!record.onboarding_completed);
        assert!(Uuid::parse_str(&record.id).is_ok());

        let record = UserRecord::new(
            &UserProfile {
                github_username: None,
                ..profile()
            },
            Utc::now(),
        );
        assert!(!record.github_connected);
    }

    #[test]
    fn merge_never_regresses_populated_fields() {
        let mut record = UserRecord::new(&profile(), Utc::now());
        let sparse = UserProfile {
            clerk_user_id: "c1".into(),
            email: "new@b.com".into(),
            ..Default::default()
        };

        record.merge_profile(&sparse, Utc::now());

        assert_eq!(record.email, "new@b.com");
        assert_eq!(record.username.as_deref(), Some("ada"));
        assert_eq!(record.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(record.avatar_url.as_deref(), Some("https://img.example/ada.png"));
        assert_eq!(record.github_username.as_deref(), Some("ada-gh"));
        // connection state follows the latest event
        assert!(!record.github_connected);
    }

    #[test]
    fn merge_ignores_empty_strings() {
        let mut record = UserRecord::new(&profile(), Utc::now());
        let blank = UserProfile {
            username: Some(String::new()),
            ..profile()
        };
        record.merge_profile(&blank, Utc::now());
        assert_eq!(record.username.as_deref(), Some("ada"));
    }

    #[test]
    fn merge_overwrites_with_new_values() {
        let mut record = UserRecord::new(&profile(), Utc::now());
        let created_at = record.created_at;
        let renamed = UserProfile {
            username: Some("countess".into()),
            ..profile()
        };
        record.merge_profile(&renamed, Utc::now());
        assert_eq!(record.username.as_deref(), Some("countess"));
        assert_eq!(record.created_at, created_at);
    }

    #[tokio::test]
    async fn run_bounded_returns_result() {
        let value = run_bounded(Duration::from_secs(1), || Ok(7)).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn run_bounded_propagates_store_errors() {
        let err = run_bounded::<(), _>(Duration::from_secs(1), || Err(StoreError::Poisoned))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Store(StoreError::Poisoned)));
    }

    #[tokio::test]
    async fn run_bounded_times_out() {
        let err = run_bounded(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, PersistenceError::TimedOut(_)));
    }
}
