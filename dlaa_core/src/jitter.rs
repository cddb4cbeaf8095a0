//! Passive capture of the host's sub-pixel jitter.
//!
//! The host rewrites a 256-byte constant buffer every frame with write-discard;
//! floats 8 and 9 hold the jitter in normalized units. Any buffer of that size
//! is taken to be it, so unrelated same-sized buffers can be misread.

use std::ptr::NonNull;

use log::trace;

use crate::device::{FrameDimensions, MapAccess, ResourceHandle};

/// Byte width of the host's per-view constant buffer.
pub const JITTER_BUFFER_BYTE_WIDTH: u32 = 256;
/// Float index of the X offset; Y follows it.
pub const JITTER_FLOAT_INDEX: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JitterOffset {
    pub x: f32,
    pub y: f32,
}

impl JitterOffset {
    /// Scale to pixels for a frame of `dimensions`.
    pub fn to_pixels(self, dimensions: FrameDimensions) -> [f32; 2] {
        [self.x * dimensions.width as f32, self.y * dimensions.height as f32]
    }
}

#[derive(Debug)]
struct MappedBuffer {
    resource: ResourceHandle,
    data: NonNull<u8>,
}

#[derive(Debug, Default)]
pub struct JitterTracker {
    mapped: Option<MappedBuffer>,
    offset: JitterOffset,
}

// SAFETY: the mapped pointer is only read inside `on_unmap`, while the host
// still holds the mapping; it carries no thread affinity.
unsafe impl Send for JitterTracker {}

impl JitterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest captured jitter.
    pub fn offset(&self) -> JitterOffset {
        self.offset
    }

    /// Observe a buffer map. Returns whether the mapping is being tracked.
    ///
    /// # Safety
    ///
    /// When `access` is write-discard and `byte_width` is
    /// [`JITTER_BUFFER_BYTE_WIDTH`], `data` must point to at least that many
    /// readable bytes that stay mapped until [`JitterTracker::on_unmap`] is
    /// called for `resource`.
    pub unsafe fn on_map(
        &mut self,
        resource: ResourceHandle,
        byte_width: Option<u32>,
        access: MapAccess,
        data: *mut u8,
    ) -> bool {
        if access != MapAccess::WriteDiscard || byte_width != Some(JITTER_BUFFER_BYTE_WIDTH) {
            return false;
        }
        match NonNull::new(data) {
            Some(data) => {
                self.mapped = Some(MappedBuffer { resource, data });
                true
            }
            None => false,
        }
    }

    /// Observe an unmap; reads the jitter if `resource` is the tracked mapping.
    pub fn on_unmap(&mut self, resource: ResourceHandle) {
        if !matches!(&self.mapped, Some(m) if m.resource == resource) {
            return;
        }
        let Some(mapped) = self.mapped.take() else {
            return;
        };

        let start = JITTER_FLOAT_INDEX * std::mem::size_of::<f32>();
        // SAFETY: on_map's contract keeps JITTER_BUFFER_BYTE_WIDTH bytes readable
        // until this unmap, and start + 8 is well inside that.
        let bytes = unsafe {
            std::slice::from_raw_parts(mapped.data.as_ptr().add(start), 2 * std::mem::size_of::<f32>())
        };
        self.offset = JitterOffset {
            x: bytemuck::pod_read_unaligned(&bytes[0..4]),
            y: bytemuck::pod_read_unaligned(&bytes[4..8]),
        };
        trace!("Captured jitter ({}, {})", self.offset.x, self.offset.y);
    }

    /// Forget any tracked mapping, e.g. when the device goes away.
    pub fn reset(&mut self) {
        self.mapped = None;
    }
}
