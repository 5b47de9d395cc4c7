// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Routes decoded Clerk events to the user repository.
//!
//! Each persistence call runs on the blocking pool under a timeout. Nothing
//! here retries: a failed call surfaces as a non-2xx response and Clerk
//! redelivers the event later. Retrying locally could apply one event twice.

use std::{sync::Arc, time::Duration};

use super::{ClerkEvent, DispatchError};
use crate::storage::{run_bounded, UpsertOutcome, UserRepository};

/// What a dispatched event did to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Created,
    Updated { rows: u64 },
    Deleted { rows: u64 },
    /// Event type this service does not handle.
    Ignored(String),
}

impl DispatchOutcome {
    /// Acknowledgement message returned to the sender.
    pub fn message(&self) -> &'static str {
        match self {
            DispatchOutcome::Created => "User created successfully",
            DispatchOutcome::Updated { .. } => "User updated successfully",
            DispatchOutcome::Deleted { .. } => "User deleted successfully",
            DispatchOutcome::Ignored(_) => "Event type not handled",
        }
    }
}

#[derive(Clone)]
pub struct EventDispatcher {
    users: Arc<dyn UserRepository>,
    timeout: Duration,
}

impl EventDispatcher {
    pub fn new(users: Arc<dyn UserRepository>, timeout: Duration) -> Self {
        Self { users, timeout }
    }

    pub async fn dispatch(&self, event: ClerkEvent) -> Result<DispatchOutcome, DispatchError> {
        match event {
            ClerkEvent::UserCreated(user) => {
                let profile = user.to_profile(true);
                let users = Arc::clone(&self.users);
                let outcome = run_bounded(self.timeout, move || users.upsert_user(&profile)).await?;

                tracing::info!(
                    clerk_user_id = %user.id,
                    outcome = ?outcome,
                    "user.created applied"
                );
                Ok(match outcome {
                    UpsertOutcome::Created => DispatchOutcome::Created,
                    UpsertOutcome::Updated => DispatchOutcome::Updated { rows: 1 },
                })
            }
            ClerkEvent::UserUpdated(user) => {
                let profile = user.to_profile(false);
                let users = Arc::clone(&self.users);
                let rows = run_bounded(self.timeout, move || users.update_user(&profile)).await?;

                tracing::info!(clerk_user_id = %user.id, rows, "user.updated applied");
                Ok(DispatchOutcome::Updated { rows })
            }
            ClerkEvent::UserDeleted(deleted) => {
                let id = deleted.id.clone();
                let users = Arc::clone(&self.users);
                let rows = run_bounded(self.timeout, move || users.delete_user(&id)).await?;

                tracing::info!(clerk_user_id = %deleted.id, rows, "user.deleted applied");
                Ok(DispatchOutcome::Deleted { rows })
            }
            ClerkEvent::Other(kind) => {
                tracing::info!(event_type = %kind, "webhook event type ignored");
                Ok(DispatchOutcome::Ignored(kind))
            }
        }
    }
}
