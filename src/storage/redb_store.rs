// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Embedded user database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: clerk_user_id → serialized UserRecord
//! - `starter_packs`: internal user id → serialized StarterPack
//!
//! Every mutation is a single write transaction, so a redelivered
//! `user.created` can never produce a second record for the same Clerk id.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;

use super::{
    OnboardingData, StarterPack, StoreResult, UpsertOutcome, UserProfile, UserRecord,
    UserRepository,
};

/// Primary table: clerk_user_id → UserRecord (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// One starter pack per user: internal user id → StarterPack (JSON bytes).
const STARTER_PACKS: TableDefinition<&str, &[u8]> = TableDefinition::new("starter_packs");

/// Database file name under `DATA_DIR`.
pub const USERS_DB_FILE: &str = "users.redb";

pub struct RedbUserStore {
    db: Database,
}

impl RedbUserStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(STARTER_PACKS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Read-modify-write of one user record inside a write transaction.
    ///
    /// `apply` gets the current record (if any) and returns the record to
    /// store, or `None` to leave the table untouched.
    fn modify_user<R>(
        &self,
        clerk_user_id: &str,
        apply: impl FnOnce(Option<UserRecord>) -> (Option<UserRecord>, R),
    ) -> StoreResult<R> {
        let write_txn = self.db.begin_write()?;
        let result = {
            let mut table = write_txn.open_table(USERS)?;
            let existing = match table.get(clerk_user_id)? {
                Some(value) => Some(decode::<UserRecord>(value.value())?),
                None => None,
            };

            let (updated, result) = apply(existing);
            if let Some(record) = updated {
                let json = serde_json::to_vec(&record)?;
                table.insert(clerk_user_id, json.as_slice())?;
            }
            result
        };
        write_txn.commit()?;
        Ok(result)
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

impl UserRepository for RedbUserStore {
    fn upsert_user(&self, profile: &UserProfile) -> StoreResult<UpsertOutcome> {
        let now = Utc::now();
        self.modify_user(&profile.clerk_user_id, |existing| match existing {
            Some(mut record) => {
                record.merge_profile(profile, now);
                (Some(record), UpsertOutcome::Updated)
            }
            None => (Some(UserRecord::new(profile, now)), UpsertOutcome::Created),
        })
    }

    fn update_user(&self, profile: &UserProfile) -> StoreResult<u64> {
        let now = Utc::now();
        self.modify_user(&profile.clerk_user_id, |existing| match existing {
            Some(mut record) => {
                record.merge_profile(profile, now);
                (Some(record), 1)
            }
            None => (None, 0),
        })
    }

    fn delete_user(&self, clerk_user_id: &str) -> StoreResult<u64> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut users = write_txn.open_table(USERS)?;
            let removed = match users.remove(clerk_user_id)? {
                Some(value) => Some(decode::<UserRecord>(value.value())?),
                None => None,
            };

            if let Some(record) = &removed {
                let mut packs = write_txn.open_table(STARTER_PACKS)?;
                packs.remove(record.id.as_str())?;
            }
            removed
        };
        write_txn.commit()?;
        Ok(u64::from(removed.is_some()))
    }

    fn find_by_clerk_id(&self, clerk_user_id: &str) -> StoreResult<Option<UserRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(clerk_user_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn save_onboarding(
        &self,
        clerk_user_id: &str,
        data: &OnboardingData,
    ) -> StoreResult<Option<StarterPack>> {
        let now = Utc::now();
        let write_txn = self.db.begin_write()?;
        let pack = {
            let mut users = write_txn.open_table(USERS)?;
            let existing = match users.get(clerk_user_id)? {
                Some(value) => Some(decode::<UserRecord>(value.value())?),
                None => None,
            };
            let Some(mut user) = existing else {
                return Ok(None);
            };

            let mut packs = write_txn.open_table(STARTER_PACKS)?;
            let current = match packs.get(user.id.as_str())? {
                Some(value) => Some(decode::<StarterPack>(value.value())?),
                None => None,
            };
            let pack = match current {
                Some(mut pack) => {
                    pack.apply(data, now);
                    pack
                }
                None => StarterPack::new(&user.id, data, now),
            };
            let json = serde_json::to_vec(&pack)?;
            packs.insert(user.id.as_str(), json.as_slice())?;

            user.onboarding_completed = true;
            user.updated_at = now;
            let json = serde_json::to_vec(&user)?;
            users.insert(clerk_user_id, json.as_slice())?;
            pack
        };
        write_txn.commit()?;
        Ok(Some(pack))
    }

    fn health(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}
