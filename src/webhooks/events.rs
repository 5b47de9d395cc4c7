// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Clerk webhook event decoding.
//!
//! Decoding happens in two stages. The envelope is parsed first, keeping
//! `data` as raw JSON. Only a recognised `type` has its `data` decoded into a
//! typed record, so new Clerk event types never fail a delivery.

use serde::Deserialize;
use serde_json::value::RawValue;

use super::{signature::VerifiedPayload, DispatchError};
use crate::storage::UserProfile;

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

const GITHUB_PROVIDER: &str = "oauth_github";

/// Stage one: the discriminant plus the undecoded data segment.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    /// Informational, always `"event"` today.
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExternalAccount {
    pub provider: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// The `data` object of `user.created` and `user.updated`.
///
/// Clerk sends `null` for unset strings, so every optional field tolerates
/// both absence and `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClerkUserData {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub external_accounts: Vec<ExternalAccount>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl ClerkUserData {
    /// Address whose id matches `primary_email_address_id`, or `""`.
    pub fn primary_email(&self) -> &str {
        let Some(primary_id) = self.primary_email_address_id.as_deref() else {
            return "";
        };
        self.email_addresses
            .iter()
            .find(|email| email.id == primary_id)
            .map(|email| email.email_address.as_str())
            .unwrap_or("")
    }

    /// Username of the first linked GitHub account, or `""`.
    pub fn github_username(&self) -> &str {
        self.external_accounts
            .iter()
            .find(|account| account.provider == GITHUB_PROVIDER)
            .and_then(|account| account.username.as_deref())
            .unwrap_or("")
    }

    /// `"{first} {last}"` trimmed, possibly empty.
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    /// Profile fields to reconcile into the local user record.
    ///
    /// With `email_fallback` an empty display name is replaced by the primary
    /// email. Only `user.created` asks for that.
    pub fn to_profile(&self, email_fallback: bool) -> UserProfile {
        let email = self.primary_email().to_string();
        let mut display_name = self.display_name();
        if display_name.is_empty() && email_fallback {
            display_name = email.clone();
        }

        UserProfile {
            clerk_user_id: self.id.clone(),
            email,
            username: non_empty(self.username.as_deref()),
            display_name: non_empty(Some(&display_name)),
            avatar_url: non_empty(self.image_url.as_deref()),
            github_username: non_empty(Some(self.github_username())),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// The `data` object of `user.deleted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeletedUser {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

/// A verified, decoded Clerk event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClerkEvent {
    UserCreated(ClerkUserData),
    UserUpdated(ClerkUserData),
    UserDeleted(DeletedUser),
    /// Any type this service does not handle. Accepted and ignored.
    Other(String),
}

impl ClerkEvent {
    /// Decode an authenticated payload.
    pub fn decode(payload: VerifiedPayload<'_>) -> Result<Self, DispatchError> {
        let envelope: WebhookEnvelope = serde_json::from_slice(payload.as_bytes())
            .map_err(|e| DispatchError::malformed("envelope", e))?;
        Self::from_envelope(envelope)
    }

    fn from_envelope(envelope: WebhookEnvelope) -> Result<Self, DispatchError> {
        let data = envelope.data.as_deref().map_or("null", RawValue::get);
        let event = match envelope.event_type.as_str() {
            USER_CREATED => Self::UserCreated(decode_data(USER_CREATED, data)?),
            USER_UPDATED => Self::UserUpdated(decode_data(USER_UPDATED, data)?),
            USER_DELETED => Self::UserDeleted(decode_data(USER_DELETED, data)?),
            _ => Self::Other(envelope.event_type),
        };
        Ok(event)
    }

    /// Event type string as Clerk names it.
    pub fn kind(&self) -> &str {
        match self {
            Self::UserCreated(_) => USER_CREATED,
            Self::UserUpdated(_) => USER_UPDATED,
            Self::UserDeleted(_) => USER_DELETED,
            Self::Other(kind) => kind,
        }
    }

    /// Provider user id for the known variants.
    pub fn clerk_user_id(&self) -> Option<&str> {
        match self {
            Self::UserCreated(user) | Self::UserUpdated(user) => Some(&user.id),
            Self::UserDeleted(user) => Some(&user.id),
            Self::Other(_) => None,
        }
    }
}

fn decode_data<T: for<'de> Deserialize<'de>>(
    context: &str,
    data: &str,
) -> Result<T, DispatchError> {
    serde_json::from_str(data).map_err(|e| DispatchError::malformed(context, e))
}
