// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

use std::{sync::Arc, time::Duration};

use crate::auth::{AuthorizedParties, KeyError, SigningKey, TokenVerifier};
use crate::config::{Config, KeySource};
use crate::storage::{
    redb_store::USERS_DB_FILE, InMemoryUserStore, RedbUserStore, StoreError, UserRepository,
};
use crate::webhooks::{EventDispatcher, WebhookVerifier};

/// Token verification settings shared by the middleware and extractors.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub verifier: Arc<TokenVerifier>,
    pub session_cookie: String,
}

impl AuthConfig {
    pub fn new(verifier: TokenVerifier, session_cookie: impl Into<String>) -> Self {
        Self {
            verifier: Arc::new(verifier),
            session_cookie: session_cookie.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to load Clerk public key: {0}")]
    Key(#[from] KeyError),

    #[error("failed to open user database: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct AppState {
    pub auth_config: AuthConfig,
    pub webhooks: Arc<WebhookVerifier>,
    pub dispatcher: EventDispatcher,
    pub users: Arc<dyn UserRepository>,
    /// Bound on each persistence call made from a request.
    pub persistence_timeout: Duration,
}

impl AppState {
    pub fn new(
        auth_config: AuthConfig,
        webhooks: WebhookVerifier,
        users: Arc<dyn UserRepository>,
        persistence_timeout: Duration,
    ) -> Self {
        Self {
            auth_config,
            webhooks: Arc::new(webhooks),
            dispatcher: EventDispatcher::new(Arc::clone(&users), persistence_timeout),
            users,
            persistence_timeout,
        }
    }

    /// Build the verifiers and open the user store.
    pub fn from_config(config: &Config) -> Result<Self, StateError> {
        let key = match &config.key_source {
            KeySource::Pem(pem) => SigningKey::from_pem(pem)?,
            KeySource::File(path) => SigningKey::from_pem_file(path)?,
        };
        let verifier = TokenVerifier::new(
            key,
            AuthorizedParties::new(config.authorized_parties.iter().cloned()),
        )
        .with_leeway(config.clock_skew_secs);

        let users: Arc<dyn UserRepository> = match &config.data_dir {
            Some(dir) => {
                let path = dir.join(USERS_DB_FILE);
                tracing::info!(path = %path.display(), "opening user database");
                Arc::new(RedbUserStore::open(&path)?)
            }
            None => {
                tracing::warn!("DATA_DIR not set; users are kept in memory only");
                Arc::new(InMemoryUserStore::new())
            }
        };

        Ok(Self::new(
            AuthConfig::new(verifier, config.session_cookie.clone()),
            WebhookVerifier::from_secret(&config.webhook_secret),
            users,
            config.persistence_timeout,
        ))
    }
}
