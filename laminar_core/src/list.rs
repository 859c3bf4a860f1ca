// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The composition layer list.
//!
//! A per-frame, order-preserving projection of the incoming layer stack.
//! For every stack layer it records what the scheduler decided: the derived
//! content class, the attached plane (if any), and the transient flag bits.
//! The list is rebuilt wholesale on topology change and mutated in place on
//! every other frame (buffer identity and flag updates only).
//!
//! Buffer-identity changes are marked on the [`CONTENT`](crate::dirty::CONTENT)
//! dirty channel and rebuilds on [`TOPOLOGY`](crate::dirty::TOPOLOGY); the
//! smart composition cache drains both once per frame.

use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker};

use crate::buffer::BufferHandle;
use crate::dirty;
use crate::inventory::PlaneInventory;
use crate::plane::{PlaneId, PlaneKind};
use crate::stack::{ContentClass, LayerStack, PixelFormat};

/// Per-layer transient flag bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerFlags {
    /// The layer must stay on a hardware path (protected or pipeline-forced
    /// content); rotation stalls block instead of falling back.
    pub force_hardware: bool,
    /// The fallback renderer must clear this layer's destination region
    /// (nothing else will erase stale pixels there).
    pub needs_clear: bool,
    /// The layer's plane must be disabled on the next buffer update (its
    /// scanout is stale but hardware still displays the previous frame).
    pub delay_disable: bool,
}

/// Scheduler-private state for one stack layer.
#[derive(Clone, Copy, Debug)]
struct CompositionLayer {
    class: ContentClass,
    format: PixelFormat,
    protected: bool,
    plane: Option<PlaneId>,
    flags: LayerFlags,
    last_buffer: Option<BufferHandle>,
    desync_frames: u32,
}

/// Changes drained from the list's dirty channels, once per frame.
#[derive(Clone, Debug, Default)]
pub struct ListChanges {
    /// Indices whose buffer identity changed since the previous frame.
    pub content: Vec<u32>,
    /// The list was rebuilt since the last drain.
    pub topology_changed: bool,
}

/// Order-preserving projection of the current frame's layer stack.
#[derive(Debug)]
pub struct CompositionLayerList {
    layers: Vec<CompositionLayer>,
    attached_sprites: usize,
    attached_overlays: usize,
    attached_total: usize,
    video_count: usize,
    dirty: DirtyTracker<u32>,
}

impl Default for CompositionLayerList {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositionLayerList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            attached_sprites: 0,
            attached_overlays: 0,
            attached_total: 0,
            video_count: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
        }
    }

    /// Rebuilds the list from a new stack.
    ///
    /// All scheduler state (planes, flags, buffer memory) is discarded —
    /// the caller must have released attached planes via
    /// [`invalidate_planes`](Self::invalidate_planes) first. Marks the
    /// TOPOLOGY channel.
    pub fn rebuild(&mut self, stack: &LayerStack) {
        assert!(
            self.attached_total == 0,
            "rebuilding a list with {} attached planes",
            self.attached_total
        );

        self.layers.clear();
        self.video_count = 0;
        self.dirty = DirtyTracker::with_cycle_handling(CycleHandling::Error);

        for (i, layer) in stack.layers.iter().enumerate() {
            let class = layer.format.content_class();
            if class == ContentClass::Video {
                self.video_count += 1;
            }
            self.layers.push(CompositionLayer {
                class,
                format: layer.format,
                protected: layer.protected,
                plane: None,
                flags: LayerFlags::default(),
                last_buffer: None,
                desync_frames: 0,
            });
            #[expect(
                clippy::cast_possible_truncation,
                reason = "layer stacks are far smaller than u32"
            )]
            self.dirty.mark(i as u32, dirty::TOPOLOGY);
        }
    }

    /// Releases every attached plane back to the inventory (reclaimed, not
    /// disabled) ahead of a reclassification.
    pub fn invalidate_planes(&mut self, inventory: &mut PlaneInventory) {
        for layer in &mut self.layers {
            if let Some(id) = layer.plane.take() {
                inventory.release(id);
            }
            layer.flags = LayerFlags::default();
        }
        self.attached_sprites = 0;
        self.attached_overlays = 0;
        self.attached_total = 0;
    }

    /// Attaches an acquired plane to the layer at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the layer already has a plane (a plane is attached to at
    /// most one layer, and a layer holds at most one plane).
    pub fn attach(&mut self, index: usize, id: PlaneId) {
        let layer = &mut self.layers[index];
        assert!(
            layer.plane.is_none(),
            "layer {index} already attached to {:?}",
            layer.plane
        );
        layer.plane = Some(id);
        match id.kind {
            PlaneKind::Sprite => self.attached_sprites += 1,
            PlaneKind::Overlay | PlaneKind::RgbOverlay => self.attached_overlays += 1,
            PlaneKind::Primary => {}
        }
        self.attached_total += 1;
    }

    /// Detaches the layer's plane and releases it to the inventory.
    ///
    /// # Panics
    ///
    /// Panics if the layer has no plane.
    pub fn detach(&mut self, index: usize, inventory: &mut PlaneInventory) {
        let layer = &mut self.layers[index];
        let id = layer
            .plane
            .take()
            .unwrap_or_else(|| panic!("layer {index} has no plane to detach"));
        layer.flags = LayerFlags::default();
        inventory.release(id);
        match id.kind {
            PlaneKind::Sprite => self.attached_sprites -= 1,
            PlaneKind::Overlay | PlaneKind::RgbOverlay => self.attached_overlays -= 1,
            PlaneKind::Primary => {}
        }
        self.attached_total -= 1;
    }

    /// Records the layer's buffer for this frame, marking the CONTENT
    /// channel when the identity changed.
    pub fn note_buffer(&mut self, index: usize, buffer: Option<BufferHandle>) {
        let layer = &mut self.layers[index];
        if layer.last_buffer != buffer {
            layer.last_buffer = buffer;
            #[expect(
                clippy::cast_possible_truncation,
                reason = "layer stacks are far smaller than u32"
            )]
            self.dirty.mark(index as u32, dirty::CONTENT);
        }
    }

    /// Drains the dirty channels accumulated since the previous call.
    pub fn drain_changes(&mut self) -> ListChanges {
        let content: Vec<u32> = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();
        let topology: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
        ListChanges {
            content,
            topology_changed: !topology.is_empty(),
        }
    }

    // -- Per-layer accessors --

    /// The plane attached to the layer, if any.
    #[must_use]
    pub fn plane(&self, index: usize) -> Option<PlaneId> {
        self.layers[index].plane
    }

    /// The layer's derived content class.
    #[must_use]
    pub fn class(&self, index: usize) -> ContentClass {
        self.layers[index].class
    }

    /// The layer's pixel format as captured at rebuild.
    #[must_use]
    pub fn format(&self, index: usize) -> PixelFormat {
        self.layers[index].format
    }

    /// Whether the layer holds protected content.
    #[must_use]
    pub fn is_protected(&self, index: usize) -> bool {
        self.layers[index].protected
    }

    /// The layer's flag bits.
    #[must_use]
    pub fn flags(&self, index: usize) -> LayerFlags {
        self.layers[index].flags
    }

    /// Mutable access to the layer's flag bits.
    pub fn flags_mut(&mut self, index: usize) -> &mut LayerFlags {
        &mut self.layers[index].flags
    }

    /// The layer's consecutive rotation-stall count.
    #[must_use]
    pub fn desync(&self, index: usize) -> u32 {
        self.layers[index].desync_frames
    }

    /// Bumps and returns the layer's consecutive rotation-stall counter.
    pub fn bump_desync(&mut self, index: usize) -> u32 {
        self.layers[index].desync_frames += 1;
        self.layers[index].desync_frames
    }

    /// Clears the layer's rotation-stall counter.
    pub fn reset_desync(&mut self, index: usize) {
        self.layers[index].desync_frames = 0;
    }

    // -- Aggregates --

    /// Number of layers in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of layers with an attached plane.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.attached_total
    }

    /// Number of layers attached to overlay-class planes.
    #[must_use]
    pub fn attached_overlay_count(&self) -> usize {
        self.attached_overlays
    }

    /// Number of video-class layers in the list.
    #[must_use]
    pub fn video_count(&self) -> usize {
        self.video_count
    }

    /// Index of the single video-class layer, when exactly one exists.
    ///
    /// The smart composition cache keys its bookkeeping on this layer.
    #[must_use]
    pub fn sole_video_index(&self) -> Option<usize> {
        if self.video_count != 1 {
            return None;
        }
        self.layers
            .iter()
            .position(|l| l.class == ContentClass::Video)
    }
}
