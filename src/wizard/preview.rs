//! Local preview handles for selected images.

use std::collections::HashMap;

use bytes::Bytes;
use uuid::Uuid;

/// Handle to a preview held by a [`PreviewRegistry`].
///
/// Only the owning [`super::UploadedImage`] holds one, the registry drops the
/// preview data when it is released.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PreviewRef(Uuid);

impl std::fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "blob:adforge/{}", self.0)
    }
}

/// Previews that are currently alive.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    live: HashMap<Uuid, Bytes>,
}

impl PreviewRegistry {
    /// Registers preview data and hands out its reference.
    pub fn create(&mut self, data: Bytes) -> PreviewRef {
        let id = Uuid::new_v4();
        self.live.insert(id, data);
        PreviewRef(id)
    }

    /// Frees a preview. Returns false if it was already gone.
    pub fn release(&mut self, preview: &PreviewRef) -> bool {
        self.live.remove(&preview.0).is_some()
    }

    /// Looks up preview data.
    pub fn resolve(&self, preview: &PreviewRef) -> Option<&Bytes> {
        self.live.get(&preview.0)
    }

    /// Number of previews not yet released.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_resolve_release() {
        let mut registry = PreviewRegistry::default();
        let preview = registry.create(Bytes::from_static(b"pixels"));
        assert!(preview.to_string().starts_with("blob:adforge/"));
        assert_eq!(
            registry.resolve(&preview).map(|b| b.as_ref()),
            Some(&b"pixels"[..])
        );
        assert_eq!(registry.live_count(), 1);

        assert!(registry.release(&preview));
        assert!(!registry.release(&preview));
        assert!(registry.resolve(&preview).is_none());
        assert_eq!(registry.live_count(), 0);
    }
}
