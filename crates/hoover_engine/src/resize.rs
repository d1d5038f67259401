//! Size policy for static items.
//!
//! Static items whose declared dimensions exceed the side limit are
//! downloaded, shrunk by a [`Resizer`] and uploaded in place of the original
//! file. Every failure on this path is soft: the item is reported as failed
//! and the ledger is not touched.

use crate::config::LoadShedding;
use crate::error::{EngineError, EngineResult};
use bytes::Bytes;
use hoover_core::{Item, MediaKind, PackDirectory, PackEntry};
use std::sync::Arc;
use tracing::debug;

/// Image resampling.
///
/// Implementations are synchronous and CPU bound; the pipeline runs them on
/// the blocking pool.
pub trait Resizer: Send + Sync {
    /// Scales `payload` so that neither side exceeds `max_side`.
    ///
    /// # Errors
    ///
    /// `ResizeUnavailable` if resampling is not supported, `ResizeFailed`
    /// if the payload cannot be decoded or encoded.
    fn shrink(&self, payload: &[u8], max_side: u32) -> EngineResult<Bytes>;
}

/// A resizer for deployments without image support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResizer;

impl Resizer for NoResizer {
    fn shrink(&self, _payload: &[u8], _max_side: u32) -> EngineResult<Bytes> {
        Err(EngineError::ResizeUnavailable(
            "no image resizer configured".into(),
        ))
    }
}

/// Outcome of applying the size policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    /// Entry to submit.
    pub entry: PackEntry,
    /// Longest side before shrinking, if the item was shrunk.
    pub shrunk_from: Option<u32>,
}

/// Decides whether an item needs shrinking and performs it.
#[derive(Clone)]
pub struct SizePolicy {
    max_side: u32,
    shedding: LoadShedding,
    resizer: Arc<dyn Resizer>,
}

impl SizePolicy {
    /// Creates a policy shrinking static items to `max_side`.
    pub fn new(max_side: u32, shedding: LoadShedding, resizer: Arc<dyn Resizer>) -> Self {
        Self {
            max_side,
            shedding,
            resizer,
        }
    }

    /// Side limit.
    pub fn max_side(&self) -> u32 {
        self.max_side
    }

    /// Returns true if `item` must be shrunk before submission.
    pub fn needs_resize(&self, item: &Item) -> bool {
        item.kind == MediaKind::Static && item.dimensions.exceeds(self.max_side)
    }

    /// Applies the policy to `entry`, built from `item`.
    ///
    /// `depth` and `capacity` describe the intake queue and drive load
    /// shedding.
    ///
    /// # Errors
    ///
    /// `ResizeUnavailable` when shedding load or when no resizer exists,
    /// `ResizeFailed` when the download or the resize fails.
    pub async fn apply<D>(
        &self,
        directory: &D,
        item: &Item,
        entry: PackEntry,
        depth: usize,
        capacity: usize,
    ) -> EngineResult<Prepared>
    where
        D: PackDirectory + ?Sized,
    {
        if !self.needs_resize(item) {
            return Ok(Prepared {
                entry,
                shrunk_from: None,
            });
        }

        let side = item.dimensions.max_side();
        if self.shedding.sheds_side(depth, capacity, side) {
            return Err(EngineError::ResizeUnavailable(format!(
                "{} too large to resize under load (queue {depth}/{capacity})",
                item.dimensions
            )));
        }

        let payload = directory
            .download(&item.file_ref)
            .await
            .map_err(|err| EngineError::ResizeFailed(format!("download failed: {err}")))?;
        if self.shedding.sheds_payload(depth, capacity, payload.len()) {
            return Err(EngineError::ResizeUnavailable(format!(
                "{} byte payload too large to resize under load (queue {depth}/{capacity})",
                payload.len()
            )));
        }

        debug!(id = %item.id, dimensions = %item.dimensions, bytes = payload.len(), "shrinking");
        let resizer = Arc::clone(&self.resizer);
        let max_side = self.max_side;
        let shrunk = tokio::task::spawn_blocking(move || resizer.shrink(&payload, max_side))
            .await
            .map_err(|err| EngineError::ResizeFailed(format!("resize task failed: {err}")))??;

        Ok(Prepared {
            entry: entry.with_upload(shrunk),
            shrunk_from: Some(side),
        })
    }
}

impl std::fmt::Debug for SizePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizePolicy")
            .field("max_side", &self.max_side)
            .field("shedding", &self.shedding)
            .finish_non_exhaustive()
    }
}
