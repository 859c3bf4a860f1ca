// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Policy configuration.
//!
//! The classification thresholds and inventory sizes are tuning values
//! inherited from specific display silicon. They are data, not constants:
//! callers construct the scheduler with the values matching their hardware.
//! The defaults document the generation the defaults were calibrated on.

use core::ops::RangeInclusive;

/// Plane counts detected for (or configured for) one display engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InventoryConfig {
    /// Number of general sprite planes.
    pub sprite_planes: u32,
    /// Number of primary planes (one per pipe).
    pub primary_planes: u32,
    /// Number of video overlay engines.
    pub overlay_planes: u32,
    /// Number of RGB mini-overlay engines.
    pub rgb_overlay_planes: u32,
}

impl Default for InventoryConfig {
    /// A mid-2010s phone display engine: no free-standing sprites, one
    /// primary per pipe, two overlay engines doubling as RGB mini-overlays.
    fn default() -> Self {
        Self {
            sprite_planes: 0,
            primary_planes: 1,
            overlay_planes: 2,
            rgb_overlay_planes: 2,
        }
    }
}

/// Classification and caching policy knobs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyConfig {
    /// A mini-overlay candidate must cover at most `output_area >>
    /// mini_overlay_area_shift` pixels. The default (3) admits layers up to
    /// one eighth of the screen — anything larger is cheaper to leave to
    /// the renderer than to burn an overlay engine on.
    pub mini_overlay_area_shift: u32,
    /// Layer counts (render target excluded) for which the smart
    /// composition cache may engage. Outside this range the bookkeeping
    /// outweighs the saved render work.
    pub smart_layers: RangeInclusive<usize>,
    /// Consecutive frames a layer may wait on an unready rotation buffer
    /// before it is treated as permanently renderer-bound until the next
    /// topology change.
    pub rotation_desync_limit: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mini_overlay_area_shift: 3,
            smart_layers: 3..=6,
            rotation_desync_limit: 3,
        }
    }
}
