// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sprite and primary planes.
//!
//! Primary planes are the same engine as sprites with a fixed per-pipe
//! binding, so one type serves both kinds; the inventory decides which
//! pool an instance lives in.

use kurbo::Rect;

use crate::buffer::{BufferHandle, BufferManager, DeviceBuffer};
use crate::output::OutputId;
use crate::stack::LayerTransform;

use super::ring::BufferRing;
use super::{DataBinding, FlipEntry, FlipSink, Plane, PlaneError, PlaneKind};

/// Mappings kept per sprite plane. Display clients triple-buffer.
const SPRITE_RING: usize = 3;

#[derive(Clone, Copy, Debug)]
struct Scanout {
    device: DeviceBuffer,
    binding: DataBinding,
}

/// A sprite-class plane (kind [`Sprite`](PlaneKind::Sprite) or
/// [`Primary`](PlaneKind::Primary)).
#[derive(Debug)]
pub struct SpritePlane {
    kind: PlaneKind,
    index: u32,
    pipe: OutputId,
    frame: Rect,
    ring: BufferRing<SPRITE_RING>,
    scanout: Option<Scanout>,
    enabled: bool,
    force_bottom: bool,
}

impl SpritePlane {
    /// Creates a sprite-class plane.
    ///
    /// # Panics
    ///
    /// Panics unless `kind` is `Sprite` or `Primary`.
    #[must_use]
    pub fn new(kind: PlaneKind, index: u32) -> Self {
        assert!(
            matches!(kind, PlaneKind::Sprite | PlaneKind::Primary),
            "sprite-class plane cannot be {kind:?}"
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

impl Plane for SpritePlane {
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
        if binding.crop.width() <= 0.0 || binding.crop.height() <= 0.0 {
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
            transform: LayerTransform::Identity,
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
