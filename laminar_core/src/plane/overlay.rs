// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlay and RGB-overlay planes.
//!
//! The overlay engine scales and color-converts on scanout, which is what
//! makes it worth routing video to. Fed RGB content it doubles as the
//! "mini overlay" secondary offload; both kinds share this type and the
//! inventory keeps them in separate pools.
//!
//! Video decoders cycle more buffers than display clients, so the overlay
//! mapping ring is one deeper than the sprite ring. Holding more would
//! pressure the device address space for no hit-rate gain.

use kurbo::Rect;

use crate::buffer::{BufferHandle, BufferManager, DeviceBuffer};
use crate::output::OutputId;

use super::ring::BufferRing;
use super::{DataBinding, FlipEntry, FlipSink, Plane, PlaneError, PlaneKind};

/// Mappings kept per overlay plane.
const OVERLAY_RING: usize = 4;

#[derive(Clone, Copy, Debug)]
struct Scanout {
    device: DeviceBuffer,
    binding: DataBinding,
}

/// An overlay-class plane (kind [`Overlay`](PlaneKind::Overlay) or
/// [`RgbOverlay`](PlaneKind::RgbOverlay)).
#[derive(Debug)]
pub struct OverlayPlane {
    kind: PlaneKind,
    index: u32,
    pipe: OutputId,
    frame: Rect,
    ring: BufferRing<OVERLAY_RING>,
    scanout: Option<Scanout>,
    enabled: bool,
    force_bottom: bool,
}

impl OverlayPlane {
    /// Creates an overlay-class plane.
    ///
    /// # Panics
    ///
    /// Panics unless `kind` is `Overlay` or `RgbOverlay`.
    #[must_use]
    pub fn new(kind: PlaneKind, index: u32) -> Self {
        assert!(
            matches!(kind, PlaneKind::Overlay | PlaneKind::RgbOverlay),
            "overlay-class plane cannot be {kind:?}"
        );
        Self {
            kind,
            index,
            pipe: OutputId(0),
            frame: Rect::ZERO,
            ring: BufferRing::default(),
            scanout: None,
            enabled: false,
            force_bottom: false,
        }
    }
}

impl Plane for OverlayPlane {
    fn kind(&self) -> PlaneKind {
        self.kind
    }

    fn index(&self) -> u32 {
        self.index
    }

    fn pipe(&self) -> OutputId {
        self.pipe
    }

    fn set_pipe(&mut self, pipe: OutputId) {
        self.pipe = pipe;
    }

    fn set_position(&mut self, frame: Rect) {
        self.frame = frame;
    }

    fn set_data_buffer(
        &mut self,
        buffers: &mut dyn BufferManager,
        binding: &DataBinding,
    ) -> Result<(), PlaneError> {
        let crop = binding.crop;
        if crop.width() <= 0.0
            || crop.height() <= 0.0
            || crop.x1 > f64::from(binding.stride.max(binding.width))
            || crop.y1 > f64::from(crate::buffer::align_to(binding.height, 2))
        {
            return Err(PlaneError::InvalidBinding);
        }
        let device = self
            .ring
            .acquire(buffers, binding.buffer)
            .ok_or(PlaneError::MapFailed(binding.buffer))?;
        self.scanout = Some(Scanout {
            device,
            binding: *binding,
        });
        Ok(())
    }

    fn data_buffer(&self) -> Option<BufferHandle> {
        self.scanout.map(|s| s.binding.buffer)
    }

    fn invalidate_data_buffer(&mut self, buffers: &mut dyn BufferManager) {
        self.scanout = None;
        self.ring.invalidate(buffers);
    }

    fn flip(&mut self, sink: &mut dyn FlipSink) -> Result<(), PlaneError> {
        let scanout = self.scanout.as_ref().ok_or(PlaneError::NoBuffer)?;
        let entry = FlipEntry {
            kind: self.kind,
            index: self.index,
            pipe: self.pipe,
            buffer: scanout.binding.buffer,
            page_offset: scanout.device.page_offset,
            frame: self.frame,
            crop: scanout.binding.crop,
            format: scanout.binding.format,
            stride: scanout.binding.stride,
            transform: scanout.binding.transform,
            force_bottom: self.force_bottom,
        };
        sink.flip(&entry)?;
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self, sink: &mut dyn FlipSink) -> Result<(), PlaneError> {
        if self.enabled {
            sink.disable(self.kind, self.index)?;
            self.enabled = false;
        }
        Ok(())
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn force_bottom(&mut self, bottom: bool) {
        self.force_bottom = bottom;
    }
}
