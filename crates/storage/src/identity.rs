//! Fixed viewer identity.

use ticktrack_core::{TrackedEntry, UserId};
use ticktrack_timer::IdentityResolver;

/// Resolves ownership against one known user.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    viewer: UserId,
}

impl StaticIdentity {
    /// Identity for `viewer`.
    pub fn new(viewer: UserId) -> Self {
        Self { viewer }
    }

    /// The viewing user.
    pub fn viewer(&self) -> &UserId {
        &self.viewer
    }
}

impl IdentityResolver for StaticIdentity {
    fn owns_entry(&self, entry: &TrackedEntry) -> bool {
        entry.owner == self.viewer
    }
}
