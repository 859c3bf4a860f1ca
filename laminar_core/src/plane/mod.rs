// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hardware plane abstraction.
//!
//! A *plane* is a fixed-function scanout resource that composites one
//! image onto the display without GPU work. Four kinds exist:
//!
//! - **Primary** — the per-pipe base plane; also scans out the fallback
//!   render target when no layer owns it.
//! - **Sprite** — a general RGB plane.
//! - **Overlay** — a video engine with scaling and YUV conversion.
//! - **RGB overlay** — the overlay engine fed small RGB content, used as a
//!   secondary offload when sprite capacity does not apply.
//!
//! [`Plane`] is the behavioral interface: position, data-buffer binding,
//! flip, disable. [`Plane::kind`] exists for inventory bookkeeping only —
//! classification decisions dispatch on layer properties, never on the
//! plane type.
//!
//! Flips and disables are submitted to a [`FlipSink`], the boundary to the
//! display driver. The sink may reject an operation; the pipeline degrades
//! the affected layer to the fallback path and carries on.

mod overlay;
mod ring;
mod sprite;

pub use overlay::OverlayPlane;
pub use sprite::SpritePlane;

pub(crate) use ring::BufferRing;

use core::fmt;

use kurbo::Rect;

use crate::buffer::{BufferHandle, BufferManager};
use crate::output::OutputId;
use crate::stack::{LayerTransform, PixelFormat};

/// The kind of a hardware plane. Inventory bookkeeping only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlaneKind {
    /// Per-pipe base plane.
    Primary,
    /// General RGB plane.
    Sprite,
    /// Video overlay engine.
    Overlay,
    /// Overlay engine fed RGB content.
    RgbOverlay,
}

/// Handle to a plane owned by the [`PlaneInventory`](crate::inventory::PlaneInventory).
///
/// Layers hold these instead of plane references; the inventory guarantees
/// at most one holder per plane at a time.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneId {
    /// Which pool the plane lives in.
    pub kind: PlaneKind,
    /// Index within the pool.
    pub index: u32,
}

impl fmt::Debug for PlaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaneId({:?}:{})", self.kind, self.index)
    }
}

/// Everything a plane needs to scan a buffer out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataBinding {
    /// The buffer to scan out.
    pub buffer: BufferHandle,
    /// Pixel format of the buffer.
    pub format: PixelFormat,
    /// Buffer width in pixels.
    pub width: u32,
    /// Buffer height in pixels.
    pub height: u32,
    /// Row stride in pixels.
    pub stride: u32,
    /// Source crop within the buffer.
    pub crop: Rect,
    /// Content rotation already baked into the buffer.
    pub transform: LayerTransform,
}

/// A flip submitted to the display driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlipEntry {
    /// Plane kind.
    pub kind: PlaneKind,
    /// Plane index within its pool.
    pub index: u32,
    /// Pipe the plane is bound to.
    pub pipe: OutputId,
    /// The buffer being scanned out.
    pub buffer: BufferHandle,
    /// Device page offset of the mapping.
    pub page_offset: u32,
    /// Destination rectangle on the output.
    pub frame: Rect,
    /// Source crop within the buffer.
    pub crop: Rect,
    /// Pixel format.
    pub format: PixelFormat,
    /// Row stride in pixels.
    pub stride: u32,
    /// Content rotation baked into the buffer.
    pub transform: LayerTransform,
    /// The plane is forced below all others in z-order.
    pub force_bottom: bool,
}

/// Rejection from the display driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FlipError {
    /// The engine is busy and cannot accept the operation this frame.
    #[error("display engine busy")]
    Busy,
    /// The driver rejected the programmed state.
    #[error("invalid plane state")]
    InvalidState,
}

/// Failure to bind or flip a plane. Never fatal — every variant degrades
/// the affected layer to the fallback path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlaneError {
    /// No data buffer is bound; nothing to flip.
    #[error("no data buffer bound")]
    NoBuffer,
    /// The buffer manager could not map the handle.
    #[error("failed to map {0:?}")]
    MapFailed(BufferHandle),
    /// The binding is inconsistent (empty or out-of-bounds crop).
    #[error("invalid data binding")]
    InvalidBinding,
    /// The display driver rejected the operation.
    #[error("driver rejected operation: {0}")]
    Rejected(#[from] FlipError),
}

/// The display-driver boundary planes submit their state to.
pub trait FlipSink {
    /// Programs a plane's scanout state for the next vblank.
    fn flip(&mut self, entry: &FlipEntry) -> Result<(), FlipError>;

    /// Turns a plane off.
    fn disable(&mut self, kind: PlaneKind, index: u32) -> Result<(), FlipError>;
}

/// Behavioral interface of a hardware plane.
pub trait Plane: fmt::Debug {
    /// The plane's kind. Inventory bookkeeping only.
    fn kind(&self) -> PlaneKind;

    /// Index within the kind's pool.
    fn index(&self) -> u32;

    /// Pipe the plane is currently bound to.
    fn pipe(&self) -> OutputId;

    /// Binds the plane to a pipe.
    fn set_pipe(&mut self, pipe: OutputId);

    /// Sets the destination rectangle on the output.
    fn set_position(&mut self, frame: Rect);

    /// Binds a data buffer for the next flip, mapping it through the
    /// plane's buffer ring.
    fn set_data_buffer(
        &mut self,
        buffers: &mut dyn BufferManager,
        binding: &DataBinding,
    ) -> Result<(), PlaneError>;

    /// The currently bound buffer, if any.
    fn data_buffer(&self) -> Option<BufferHandle>;

    /// Drops the bound buffer and releases all ring mappings.
    fn invalidate_data_buffer(&mut self, buffers: &mut dyn BufferManager);

    /// Submits the bound state to the driver.
    fn flip(&mut self, sink: &mut dyn FlipSink) -> Result<(), PlaneError>;

    /// Turns the plane off.
    fn disable(&mut self, sink: &mut dyn FlipSink) -> Result<(), PlaneError>;

    /// Whether the plane is currently scanning out.
    fn enabled(&self) -> bool;

    /// Forces the plane below all others in z-order.
    fn force_bottom(&mut self, bottom: bool);
}
