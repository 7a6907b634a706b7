//! Credential provider seam.
//!
//! Tokens are owned by the authentication collaborator, not by the session
//! core. The core asks a [`CredentialProvider`] for the current pair every
//! time it encodes a command and never keeps a copy between calls, so a token
//! rotated mid-session is used by the very next send.

use std::sync::{Arc, PoisonError, RwLock};

pub use parley_proto::Credentials;

/// Read-only source of the current bearer and CSRF tokens.
pub trait CredentialProvider {
    /// Current credentials. `None` if either token is unavailable.
    fn credentials(&self) -> Option<Credentials>;
}

impl CredentialProvider for Credentials {
    fn credentials(&self) -> Option<Credentials> {
        self.is_complete().then(|| self.clone())
    }
}

impl<P: CredentialProvider + ?Sized> CredentialProvider for Arc<P> {
    fn credentials(&self) -> Option<Credentials> {
        (**self).credentials()
    }
}

/// In-memory token slot shared between the login flow and the session core.
///
/// Cloning shares the slot; [`SharedCredentials::set`] is visible to every
/// clone on its next read.
#[derive(Debug, Clone, Default)]
pub struct SharedCredentials {
    slot: Arc<RwLock<Option<Credentials>>>,
}

impl SharedCredentials {
    /// Empty slot (every read reports missing credentials).
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled with `credentials`.
    pub fn with(credentials: Credentials) -> Self {
        let shared = Self::new();
        shared.set(credentials);
        shared
    }

    /// Store (or rotate) the token pair.
    pub fn set(&self, credentials: Credentials) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }

    /// Forget the tokens (logout).
    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl CredentialProvider for SharedCredentials {
    fn credentials(&self) -> Option<Credentials> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|c| c.is_complete())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_credentials_read_as_missing() {
        assert!(Credentials::new("", "csrf").credentials().is_none());
        assert!(Credentials::new("bearer", "").credentials().is_none());
        assert!(Credentials::new("bearer", "csrf").credentials().is_some());
    }

    #[test]
    fn shared_slot_rotation_is_visible_to_clones() {
        let shared = SharedCredentials::new();
        let reader = shared.clone();
        assert!(reader.credentials().is_none());

        shared.set(Credentials::new("a1", "c1"));
        assert_eq!(reader.credentials(), Some(Credentials::new("a1", "c1")));

        shared.set(Credentials::new("a2", "c2"));
        assert_eq!(reader.credentials(), Some(Credentials::new("a2", "c2")));

        shared.clear();
        assert!(reader.credentials().is_none());
    }
}
