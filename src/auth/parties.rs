// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Authorized party (`azp`) allow-list.

/// Ordered list of origins allowed to present Clerk tokens.
///
/// An empty list disables the check entirely, as does a token that carries
/// no `azp` claim. Both are deliberate "unrestricted" cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedParties(Vec<String>);

impl AuthorizedParties {
    /// Build the allow-list from configured origins.
    pub fn new<I, S>(parties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parties.into_iter().map(Into::into).collect())
    }

    /// Whether no restriction is configured.
    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    /// Check a token's `azp` claim against the list (exact match).
    pub fn permits(&self, azp: Option<&str>) -> bool {
        match azp {
            None | Some("") => true,
            Some(_) if self.is_unrestricted() => true,
            Some(party) => self.0.iter().any(|allowed| allowed == party),
        }
    }
}
