//! Live request tracking for bulk cancellation.

use crate::urlrequest::handle::RequestHandle;
use dashmap::DashMap;
use std::sync::Arc;

/// Handles of every request a client has submitted and not yet finished.
///
/// Entries are added at submission and removed right after `on_finish`.
#[derive(Debug, Clone, Default)]
pub struct RequestRegistry {
    handles: Arc<DashMap<u64, RequestHandle>>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, handle: RequestHandle) {
        self.handles.insert(handle.id(), handle);
    }

    pub(crate) fn remove(&self, id: u64) {
        self.handles.remove(&id);
    }

    /// Cancel, with interrupt, every request registered under `tag`.
    /// Returns how many were cancelled by this call.
    pub fn cancel_all(&self, tag: &str) -> usize {
        self.cancel_all_with(tag, true)
    }

    pub fn cancel_all_with(&self, tag: &str, interrupt: bool) -> usize {
        // Collect first so no shard lock is held while cancelling.
        let cancelled = self
            .handles(tag)
            .into_iter()
            .filter(|handle| handle.cancel(interrupt))
            .count();
        tracing::debug!(tag, cancelled, "cancelled requests by tag");
        cancelled
    }

    /// Cancel every live request regardless of tag.
    pub fn cancel_everything(&self, interrupt: bool) -> usize {
        let all: Vec<RequestHandle> = self
            .handles
            .iter()
            .map(|e| e.value().clone())
            .collect();
        all.into_iter()
            .filter(|handle| handle.cancel(interrupt))
            .count()
    }

    /// Live handles registered under `tag`.
    pub fn handles(&self, tag: &str) -> Vec<RequestHandle> {
        self.handles
            .iter()
            .filter(|e| e.value().tag() == Some(tag))
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn get(&self, id: u64) -> Option<RequestHandle> {
        self.handles.get(&id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::loadstate::RequestState;

    fn registry_with(tags: &[Option<&str>]) -> (RequestRegistry, Vec<RequestHandle>) {
        let registry = RequestRegistry::new();
        let handles: Vec<_> = tags
            .iter()
            .enumerate()
            .map(|(i, tag)| {
                let handle = RequestHandle::new(i as u64, tag.map(str::to_owned));
                registry.register(handle.clone());
                handle
            })
            .collect();
        (registry, handles)
    }

    #[test]
    fn test_cancel_all_by_tag() {
        let (registry, handles) = registry_with(&[Some("A"), Some("A"), Some("B"), None]);

        assert_eq!(registry.cancel_all("A"), 2);

        assert!(handles[0].is_cancelled());
        assert!(handles[1].is_cancelled());
        assert_eq!(handles[2].state(), RequestState::Queued);
        assert_eq!(handles[3].state(), RequestState::Queued);
    }

    #[test]
    fn test_cancel_all_skips_completed() {
        let (registry, handles) = registry_with(&[Some("A"), Some("A")]);
        handles[0].claim();
        handles[0].complete();

        assert_eq!(registry.cancel_all("A"), 1);
        assert_eq!(handles[0].state(), RequestState::Completed);
    }

    #[test]
    fn test_remove_and_len() {
        let (registry, handles) = registry_with(&[Some("A"), None]);
        assert_eq!(registry.len(), 2);

        registry.remove(handles[0].id());

        assert_eq!(registry.len(), 1);
        assert!(registry.handles("A").is_empty());
        assert!(registry.get(handles[1].id()).is_some());
    }

    #[test]
    fn test_cancel_everything() {
        let (registry, handles) = registry_with(&[Some("A"), Some("B"), None]);
        assert_eq!(registry.cancel_everything(false), 3);
        assert!(handles.iter().all(RequestHandle::is_cancelled));
    }
}
