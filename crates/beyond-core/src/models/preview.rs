//! Local preview references
//!
//! A preview is a revocable, process-local reference to the bytes of a selected
//! file (the equivalent of a `blob:` object URL). All previews are registered in a
//! [`PreviewRegistry`]; an [`AssetHandle`](super::AssetHandle) owns at most one
//! live entry and revokes it whenever the selection is replaced or discarded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use uuid::Uuid;

/// Reference to a registered preview. Resolves to nothing once revoked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewRef {
    id: Uuid,
}

impl PreviewRef {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> String {
        format!("blob:beyond/{}", self.id)
    }
}

/// Arena of live previews shared by every handle of a composition session.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashMap<Uuid, Bytes>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, Bytes>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn create(&self, data: Bytes) -> PreviewRef {
        let id = Uuid::new_v4();
        self.entries().insert(id, data);
        PreviewRef { id }
    }

    /// Revoke a preview. Returns false if it was already revoked.
    pub(crate) fn revoke(&self, preview: &PreviewRef) -> bool {
        self.entries().remove(&preview.id).is_some()
    }

    /// Bytes behind a live preview.
    pub fn resolve(&self, preview: &PreviewRef) -> Option<Bytes> {
        self.entries().get(&preview.id).cloned()
    }

    /// Number of previews not yet revoked.
    pub fn live_count(&self) -> usize {
        self.entries().len()
    }
}

impl std::fmt::Debug for PreviewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}
