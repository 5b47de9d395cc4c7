// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! In-memory user store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::{
    OnboardingData, StarterPack, StoreError, StoreResult, UpsertOutcome, UserProfile, UserRecord,
    UserRepository,
};

#[derive(Debug, Default)]
struct Tables {
    /// clerk_user_id → record
    users: HashMap<String, UserRecord>,
    /// internal user id → starter pack
    starter_packs: HashMap<String, StarterPack>,
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Tables>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl UserRepository for InMemoryUserStore {
    fn upsert_user(&self, profile: &UserProfile) -> StoreResult<UpsertOutcome> {
        let now = Utc::now();
        let mut tables = self.write()?;
        match tables.users.get_mut(&profile.clerk_user_id) {
            Some(existing) => {
                existing.merge_profile(profile, now);
                Ok(UpsertOutcome::Updated)
            }
            None => {
                tables
                    .users
                    .insert(profile.clerk_user_id.clone(), UserRecord::new(profile, now));
                Ok(UpsertOutcome::Created)
            }
        }
    }

    fn update_user(&self, profile: &UserProfile) -> StoreResult<u64> {
        let mut tables = self.write()?;
        match tables.users.get_mut(&profile.clerk_user_id) {
            Some(existing) => {
                existing.merge_profile(profile, Utc::now());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_user(&self, clerk_user_id: &str) -> StoreResult<u64> {
        let mut tables = self.write()?;
        match tables.users.remove(clerk_user_id) {
            Some(removed) => {
                tables.starter_packs.remove(&removed.id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn find_by_clerk_id(&self, clerk_user_id: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.read()?.users.get(clerk_user_id).cloned())
    }

    fn save_onboarding(
        &self,
        clerk_user_id: &str,
        data: &OnboardingData,
    ) -> StoreResult<Option<StarterPack>> {
        let now = Utc::now();
        let mut tables = self.write()?;
        let Tables {
            users,
            starter_packs,
        } = &mut *tables;

        let Some(user) = users.get_mut(clerk_user_id) else {
            return Ok(None);
        };

        let pack = starter_packs
            .entry(user.id.clone())
            .and_modify(|pack| pack.apply(data, now))
            .or_insert_with(|| StarterPack::new(&user.id, data, now))
            .clone();

        user.onboarding_completed = true;
        user.updated_at = now;
        Ok(Some(pack))
    }

    fn health(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}
