// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! # Clerk Webhooks
//!
//! `POST /api/webhooks` receives Svix-signed deliveries.
//!
//! 1. [`WebhookVerifier`] checks the header triple, the replay window and
//!    the HMAC. The only way to get a [`VerifiedPayload`] is through it.
//! 2. [`ClerkEvent::decode`] parses the envelope, then the typed data.
//! 3. [`EventDispatcher`] applies the event to the user repository.
//!
//! Every rejection is safe because Clerk redelivers on non-2xx responses.

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod signature;

pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use error::{DispatchError, WebhookError};
pub use events::{ClerkEvent, ClerkUserData, DeletedUser, WebhookEnvelope};
pub use signature::{VerifiedPayload, WebhookSecret, WebhookVerifier};
