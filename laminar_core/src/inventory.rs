// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The plane inventory: admission control over the fixed plane set.
//!
//! Each plane kind has its own pool with per-slot state:
//!
//! ```text
//!   Free ──acquire──► Attached ──release──► Reclaimed
//!    ▲                   ▲                     │
//!    │                   └──────acquire────────┤
//!    └───────────disable_reclaimed─────────────┘
//! ```
//!
//! Release is *logical*: a reclaimed plane is immediately grantable again
//! (re-acquiring it needs no disable and avoids a one-frame flicker), but
//! it keeps scanning out the previous frame's content until
//! [`disable_reclaimed`](PlaneInventory::disable_reclaimed) physically
//! turns it off. That call is driven by the buffers-committed event at the
//! end of a commit — never from the classification pass that did the
//! releasing, because the hardware may still be displaying the old frame.
//!
//! Acquisition failure is a normal outcome, not an error: the caller falls
//! back to render-target compositing for that layer.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::buffer::BufferManager;
use crate::config::InventoryConfig;
use crate::output::OutputId;
use crate::plane::{FlipSink, OverlayPlane, Plane, PlaneId, PlaneKind, SpritePlane};

/// Per-slot lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Free,
    Attached,
    Reclaimed,
}

#[derive(Debug)]
struct Pool {
    planes: Vec<Box<dyn Plane>>,
    state: Vec<SlotState>,
}

impl Pool {
    fn new(planes: Vec<Box<dyn Plane>>) -> Self {
        let state = planes.iter().map(|_| SlotState::Free).collect();
        Self { planes, state }
    }

    fn acquire_slot(&mut self, slot: Option<usize>) -> Option<usize> {
        let pick = |states: &[SlotState], want: SlotState| match slot {
            Some(i) => (i < states.len() && states[i] == want).then_some(i),
            None => states.iter().position(|s| *s == want),
        };

        // Reclaimed planes first: reusing one needs no disable.
        let found = pick(&self.state, SlotState::Reclaimed)
            .or_else(|| pick(&self.state, SlotState::Free))?;
        self.state[found] = SlotState::Attached;
        Some(found)
    }

    fn has_grantable(&self, slot: Option<usize>) -> bool {
        match slot {
            Some(i) => self
                .state
                .get(i)
                .is_some_and(|s| matches!(s, SlotState::Free | SlotState::Reclaimed)),
            None => self
                .state
                .iter()
                .any(|s| matches!(s, SlotState::Free | SlotState::Reclaimed)),
        }
    }

    fn count(&self, want: SlotState) -> usize {
        self.state.iter().filter(|s| **s == want).count()
    }
}

/// Owns every hardware plane and tracks which are grantable.
#[derive(Debug)]
pub struct PlaneInventory {
    sprites: Pool,
    primaries: Pool,
    overlays: Pool,
    rgb_overlays: Pool,
}

impl PlaneInventory {
    /// Builds the inventory for the configured plane counts.
    #[must_use]
    pub fn new(config: &InventoryConfig) -> Self {
        let build = |kind: PlaneKind, count: u32| -> Pool {
            let planes = (0..count)
                .map(|i| -> Box<dyn Plane> {
                    match kind {
                        PlaneKind::Sprite | PlaneKind::Primary => {
                            Box::new(SpritePlane::new(kind, i))
                        }
                        PlaneKind::Overlay | PlaneKind::RgbOverlay => {
                            Box::new(OverlayPlane::new(kind, i))
                        }
                    }
                })
                .collect();
            Pool::new(planes)
        };

        Self {
            sprites: build(PlaneKind::Sprite, config.sprite_planes),
            primaries: build(PlaneKind::Primary, config.primary_planes),
            overlays: build(PlaneKind::Overlay, config.overlay_planes),
            rgb_overlays: build(PlaneKind::RgbOverlay, config.rgb_overlay_planes),
        }
    }

    fn pool(&self, kind: PlaneKind) -> &Pool {
        match kind {
            PlaneKind::Sprite => &self.sprites,
            PlaneKind::Primary => &self.primaries,
            PlaneKind::Overlay => &self.overlays,
            PlaneKind::RgbOverlay => &self.rgb_overlays,
        }
    }

    fn pool_mut(&mut self, kind: PlaneKind) -> &mut Pool {
        match kind {
            PlaneKind::Sprite => &mut self.sprites,
            PlaneKind::Primary => &mut self.primaries,
            PlaneKind::Overlay => &mut self.overlays,
            PlaneKind::RgbOverlay => &mut self.rgb_overlays,
        }
    }

    /// Grants an unused plane of `kind`, or `None` when the pool is
    /// exhausted. Never blocks.
    pub fn acquire(&mut self, kind: PlaneKind) -> Option<PlaneId> {
        let slot = self.pool_mut(kind).acquire_slot(None)?;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "plane pools hold a handful of slots"
        )]
        let index = slot as u32;
        Some(PlaneId { kind, index })
    }

    /// Grants the primary plane of the given pipe, or `None` if it is
    /// attached elsewhere.
    pub fn acquire_primary(&mut self, pipe: OutputId) -> Option<PlaneId> {
        let slot = self.primaries.acquire_slot(Some(pipe.0 as usize))?;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "plane pools hold a handful of slots"
        )]
        let index = slot as u32;
        Some(PlaneId {
            kind: PlaneKind::Primary,
            index,
        })
    }

    /// Returns a plane to its pool, marking it reclaimed.
    ///
    /// The plane stays physically enabled until
    /// [`disable_reclaimed`](Self::disable_reclaimed).
    ///
    /// # Panics
    ///
    /// Panics if the plane is not currently attached.
    pub fn release(&mut self, id: PlaneId) {
        let pool = self.pool_mut(id.kind);
        let slot = id.index as usize;
        assert!(
            pool.state[slot] == SlotState::Attached,
            "releasing {id:?} which is not attached"
        );
        pool.state[slot] = SlotState::Reclaimed;
    }

    /// Physically disables every reclaimed plane of `kind`, invalidates its
    /// mappings, and returns it to the free set.
    ///
    /// Must only be called after the frame that stopped using the planes
    /// has been committed (the composer drives this from the
    /// buffers-committed event). Driver rejections are swallowed — a plane
    /// that refuses to turn off this frame is retried on the next event.
    pub fn disable_reclaimed(
        &mut self,
        kind: PlaneKind,
        sink: &mut dyn FlipSink,
        buffers: &mut dyn BufferManager,
    ) {
        let pool = self.pool_mut(kind);
        for slot in 0..pool.state.len() {
            if pool.state[slot] != SlotState::Reclaimed {
                continue;
            }
            let plane = &mut pool.planes[slot];
            if plane.disable(sink).is_err() {
                continue;
            }
            plane.invalidate_data_buffer(buffers);
            pool.state[slot] = SlotState::Free;
        }
    }

    /// The buffers-committed event: disables reclaimed planes of every
    /// kind.
    pub fn on_frame_committed(&mut self, sink: &mut dyn FlipSink, buffers: &mut dyn BufferManager) {
        for kind in [
            PlaneKind::Sprite,
            PlaneKind::Primary,
            PlaneKind::Overlay,
            PlaneKind::RgbOverlay,
        ] {
            self.disable_reclaimed(kind, sink, buffers);
        }
    }

    /// Whether a plane of `kind` could currently be acquired.
    #[must_use]
    pub fn has_grantable(&self, kind: PlaneKind) -> bool {
        self.pool(kind).has_grantable(None)
    }

    /// Whether the primary plane of `pipe` could currently be acquired.
    #[must_use]
    pub fn primary_available(&self, pipe: OutputId) -> bool {
        self.primaries.has_grantable(Some(pipe.0 as usize))
    }

    /// Number of attached planes of `kind`.
    #[must_use]
    pub fn attached_count(&self, kind: PlaneKind) -> usize {
        self.pool(kind).count(SlotState::Attached)
    }

    /// Number of reclaimed (logically free, physically live) planes of
    /// `kind`.
    #[must_use]
    pub fn reclaimed_count(&self, kind: PlaneKind) -> usize {
        self.pool(kind).count(SlotState::Reclaimed)
    }

    /// Borrows the plane behind a handle.
    ///
    /// # Panics
    ///
    /// Panics for an out-of-range handle.
    #[must_use]
    pub fn plane(&self, id: PlaneId) -> &dyn Plane {
        self.pool(id.kind).planes[id.index as usize].as_ref()
    }

    /// Mutably borrows the plane behind a handle.
    ///
    /// # Panics
    ///
    /// Panics for an out-of-range handle.
    pub fn plane_mut(&mut self, id: PlaneId) -> &mut dyn Plane {
        self.pool_mut(id.kind).planes[id.index as usize].as_mut()
    }
}
