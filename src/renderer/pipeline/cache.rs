//! Pipeline State Cache Entry
//!
//! One [`PipelineStateCache`] exists per requested signature. It holds the
//! pipeline state object the renderer should draw with, which is either the
//! real compiled object or, while a background compile is pending, a handle
//! borrowed from a less detailed permutation.
//!
//! # Write Access
//!
//! The handle is written from two places:
//!
//! - the cache manager, when it installs a fallback on a fresh entry;
//! - the compiler, through a [`CompilationResultSink`] obtained from
//!   [`PipelineStateCache::result_sink`].
//!
//! The sink may be sent to a worker thread. Delivery stores the handle under
//! a lock and then clears the fallback flag with release ordering; readers
//! load the flag with acquire ordering, so a reader that sees
//! `is_using_fallback() == false` also sees the compiled handle.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::signature::PipelineStateSignature;
use crate::utils::PipelineStateSignatureId;

/// A compiled graphics pipeline state object owned by the RHI.
pub trait GraphicsPipelineState: Send + Sync + fmt::Debug {
    /// Signature this object was compiled for.
    fn pipeline_state_signature_id(&self) -> PipelineStateSignatureId;
}

/// Shared, reference counted pipeline state object.
pub type GraphicsPipelineStateHandle = Arc<dyn GraphicsPipelineState>;

#[derive(Debug, Default)]
struct PipelineStateSlot {
    handle: RwLock<Option<GraphicsPipelineStateHandle>>,
    using_fallback: AtomicBool,
}

/// Cache entry for one pipeline state signature.
#[derive(Debug)]
pub struct PipelineStateCache {
    signature: PipelineStateSignature,
    slot: Arc<PipelineStateSlot>,
}

impl PipelineStateCache {
    #[must_use]
    pub fn new(signature: PipelineStateSignature) -> Self {
        Self {
            signature,
            slot: Arc::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn pipeline_state_signature(&self) -> &PipelineStateSignature {
        &self.signature
    }

    #[inline]
    #[must_use]
    pub fn pipeline_state_signature_id(&self) -> PipelineStateSignatureId {
        self.signature.pipeline_state_signature_id()
    }

    /// The handle to draw with, `None` until a fallback or a compile result arrives.
    #[must_use]
    pub fn graphics_pipeline_state(&self) -> Option<GraphicsPipelineStateHandle> {
        self.slot.handle.read().clone()
    }

    #[inline]
    #[must_use]
    pub fn has_graphics_pipeline_state(&self) -> bool {
        self.slot.handle.read().is_some()
    }

    /// Whether the current handle belongs to another signature.
    #[inline]
    #[must_use]
    pub fn is_using_fallback(&self) -> bool {
        self.slot.using_fallback.load(Ordering::Acquire)
    }

    /// Write access for the compiler.
    #[must_use]
    pub fn result_sink(&self) -> CompilationResultSink {
        CompilationResultSink {
            signature_id: self.pipeline_state_signature_id(),
            slot: Arc::clone(&self.slot),
        }
    }

    pub(crate) fn use_fallback(&self, handle: GraphicsPipelineStateHandle) {
        *self.slot.handle.write() = Some(handle);
        self.slot.using_fallback.store(true, Ordering::Release);
    }
}

/// Publishes a compiled pipeline state into its cache entry.
///
/// Cheap to clone and `Send`. Delivering to an entry that was dropped by
/// [`PipelineStateCacheManager::clear_cache`] is a no-op for the renderer.
///
/// [`PipelineStateCacheManager::clear_cache`]: super::cache_manager::PipelineStateCacheManager::clear_cache
#[derive(Debug, Clone)]
pub struct CompilationResultSink {
    signature_id: PipelineStateSignatureId,
    slot: Arc<PipelineStateSlot>,
}

impl CompilationResultSink {
    #[inline]
    #[must_use]
    pub fn pipeline_state_signature_id(&self) -> PipelineStateSignatureId {
        self.signature_id
    }

    /// Stores the compiled handle and clears the fallback flag.
    pub fn deliver(&self, handle: GraphicsPipelineStateHandle) {
        *self.slot.handle.write() = Some(handle);
        self.slot.using_fallback.store(false, Ordering::Release);
    }

    /// True when the cache entry no longer exists.
    #[must_use]
    pub fn is_orphaned(&self) -> bool {
        Arc::strong_count(&self.slot) == 1
    }
}
