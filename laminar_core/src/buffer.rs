// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buffer handles, device mappings, and the buffer-manager contract.
//!
//! The scheduler never touches pixel memory. It deals in opaque
//! [`BufferHandle`]s minted by the platform's allocator and asks the
//! consumed [`BufferManager`] to resolve a handle into a [`DeviceBuffer`]
//! (a display-engine-visible mapping with a device address) when a plane
//! needs to scan the buffer out. Mappings are cached in small per-plane
//! rings (see [`plane`](crate::plane)) and every mapping taken is
//! eventually returned through [`BufferManager::unmap`] — the manager must
//! tolerate a map/unmap pair on every frame without leaking device memory.
//!
//! Video-decoder buffers additionally carry a shared metadata payload
//! ([`VideoMetadata`]) written by the video pipeline from its own execution
//! context. The scheduler reads it to learn the decoder's output policy and
//! rotation state; all values are compared by value, never by identity.

use core::fmt;

/// An opaque handle to a pixel buffer.
///
/// Handles are stable for the lifetime of the underlying allocation, so
/// equality of handles is equality of buffer identity — the smart
/// composition cache and the per-plane rings rely on this.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferHandle(pub u64);

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferHandle({})", self.0)
    }
}

/// A display-engine-visible mapping of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceBuffer {
    /// The handle this mapping was created from.
    pub handle: BufferHandle,
    /// Device address of the mapping, in pages.
    pub page_offset: u32,
    /// Size of the mapping in bytes.
    pub len: u32,
}

/// The video pipeline's output policy for a decoded stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ForceOutput {
    /// No preference; normal classification applies.
    #[default]
    None,
    /// The stream must go to a hardware plane (e.g. protected playback).
    Hardware,
    /// The stream must go through the fallback renderer.
    Renderer,
}

/// Shared metadata carried by video-decoder buffers.
///
/// Written by the video pipeline on its own thread; read here through a
/// transient mapping. The `client_transform` stamp records the rotation
/// the pipeline has already produced a rotated copy for — when it matches
/// a layer's requested transform by value, the rotated copy can be scanned
/// out with zero extra latency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VideoMetadata {
    /// Rotation the client has already produced a rotated buffer for.
    pub client_transform: crate::stack::LayerTransform,
    /// The rotated copy, once produced.
    pub rotated_buffer: Option<BufferHandle>,
    /// Width of the rotated copy in pixels.
    pub rotated_width: u32,
    /// Height of the rotated copy in pixels.
    pub rotated_height: u32,
    /// The stream is protected content.
    pub protected: bool,
    /// Output policy requested by the pipeline.
    pub force_output: ForceOutput,
}

/// Consumed interface to the platform buffer allocator.
///
/// Implementations create and release display-engine mappings. `map` may
/// fail for stale or foreign handles; the scheduler treats that as "skip
/// this layer this frame", never as a fatal condition.
pub trait BufferManager {
    /// Maps a buffer for display-engine access.
    fn map(&mut self, handle: BufferHandle) -> Option<DeviceBuffer>;

    /// Releases a mapping created by [`map`](Self::map).
    fn unmap(&mut self, buffer: DeviceBuffer);

    /// Reads the shared video metadata of a decoder buffer through a
    /// transient mapping, released before this call returns.
    ///
    /// Returns `None` for buffers that carry no payload (software decoders,
    /// plain color buffers).
    fn video_metadata(&mut self, handle: BufferHandle) -> Option<VideoMetadata>;
}

/// Rounds `value` up to a multiple of `align`.
///
/// `align` must be a power of two.
#[inline]
#[must_use]
pub(crate) const fn align_to(value: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
    (value + align - 1) & !(align - 1)
}
