use std::collections::HashMap;

use log::{debug, trace};

use super::{ClassificationOutcome, ShaderRole};
use crate::device::PipelineHandle;

/// Correlates a pipeline's create and init events. The host passes the same
/// subobject array to both, so its address is a natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CreationRequestId(pub u64);

/// Live pipelines with a known role, plus classification results waiting for
/// their init event.
#[derive(Debug, Default)]
pub struct PipelineRegistry {
    roles: HashMap<PipelineHandle, ShaderRole>,
    pending: HashMap<CreationRequestId, ClassificationOutcome>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember how a creation request was classified.
    pub fn record_creation(&mut self, request: CreationRequestId, outcome: ClassificationOutcome) {
        if outcome == ClassificationOutcome::Unclassified {
            self.pending.remove(&request);
        } else {
            self.pending.insert(request, outcome);
        }
    }

    /// Consume the classification of `request` and register `handle` with it.
    pub fn complete_creation(&mut self, request: CreationRequestId, handle: PipelineHandle) -> Option<ShaderRole> {
        let role = self.pending.remove(&request)?.role()?;
        self.register(handle, role);
        Some(role)
    }

    pub fn register(&mut self, handle: PipelineHandle, role: ShaderRole) {
        debug!("Registered pipeline {:#x} as {:?}", handle.raw(), role);
        // A single map keeps roles mutually exclusive
        self.roles.insert(handle, role);
    }

    pub fn unregister(&mut self, handle: PipelineHandle) -> Option<ShaderRole> {
        let removed = self.roles.remove(&handle);
        if let Some(role) = removed {
            debug!("Unregistered {:?} pipeline {:#x}", role, handle.raw());
        }
        removed
    }

    pub fn lookup(&self, handle: PipelineHandle) -> Option<ShaderRole> {
        self.roles.get(&handle).copied()
    }

    /// Drop classifications whose init event never came (creation failed).
    pub fn purge_pending(&mut self) {
        if !self.pending.is_empty() {
            trace!("Dropping {} stale pipeline classifications", self.pending.len());
            self.pending.clear();
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn clear(&mut self) {
        self.roles.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQ_A: CreationRequestId = CreationRequestId(0x1000);
    const REQ_B: CreationRequestId = CreationRequestId(0x2000);

    #[test]
    fn init_registers_the_matching_creation() {
        let mut registry = PipelineRegistry::new();
        registry.record_creation(REQ_A, ClassificationOutcome::RecognizedAsTaa);
        registry.record_creation(REQ_B, ClassificationOutcome::ReplacedAsSharpen);

        // Init events arrive in the opposite order; each still gets its own role
        assert_eq!(registry.complete_creation(REQ_B, PipelineHandle(2)), Some(ShaderRole::Sharpen));
        assert_eq!(registry.complete_creation(REQ_A, PipelineHandle(1)), Some(ShaderRole::Taa));
        assert_eq!(registry.lookup(PipelineHandle(1)), Some(ShaderRole::Taa));
        assert_eq!(registry.lookup(PipelineHandle(2)), Some(ShaderRole::Sharpen));
        assert_eq!(registry.pending_len(), 0);
    }

    #[test]
    fn unclassified_creation_never_registers() {
        let mut registry = PipelineRegistry::new();
        registry.record_creation(REQ_A, ClassificationOutcome::Unclassified);
        assert_eq!(registry.complete_creation(REQ_A, PipelineHandle(1)), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn roles_are_mutually_exclusive() {
        let mut registry = PipelineRegistry::new();
        let handle = PipelineHandle(7);
        registry.register(handle, ShaderRole::Taa);
        registry.register(handle, ShaderRole::Sharpen);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(handle), Some(ShaderRole::Sharpen));
    }

    #[test]
    fn unregister_unknown_handle_is_noop() {
        let mut registry = PipelineRegistry::new();
        registry.register(PipelineHandle(1), ShaderRole::Taa);
        assert_eq!(registry.unregister(PipelineHandle(99)), None);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.unregister(PipelineHandle(1)), Some(ShaderRole::Taa));
        assert_eq!(registry.unregister(PipelineHandle(1)), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn purge_drops_only_pending() {
        let mut registry = PipelineRegistry::new();
        registry.register(PipelineHandle(1), ShaderRole::Taa);
        registry.record_creation(REQ_A, ClassificationOutcome::RecognizedAsTaa);
        registry.purge_pending();
        assert_eq!(registry.pending_len(), 0);
        assert_eq!(registry.complete_creation(REQ_A, PipelineHandle(2)), None);
        assert_eq!(registry.len(), 1);
    }
}
