// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display output identification and mode queries.
//!
//! [`OutputId`] is a lightweight handle identifying a physical display
//! output (pipe). The platform assigns these; core treats the value as an
//! index into its device table. [`ModeQuery`] is the consumed interface to
//! the platform's mode-setting layer.

use core::fmt;

/// Identifies a physical display output (pipe).
///
/// Output 0 is the primary on-panel output. The value doubles as the pipe
/// index for primary-plane binding.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OutputId(pub u32);

impl OutputId {
    /// The primary on-panel output.
    pub const PANEL: Self = Self(0);
    /// The external (hotpluggable) output.
    pub const EXTERNAL: Self = Self(1);
}

impl fmt::Debug for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputId({})", self.0)
    }
}

/// Active mode geometry of an output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputGeometry {
    /// Active horizontal resolution in pixels.
    pub width: u32,
    /// Active vertical resolution in pixels.
    pub height: u32,
    /// Vertical refresh rate in Hz.
    pub refresh_hz: u32,
}

impl OutputGeometry {
    /// Output area in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Consumed interface to the platform mode-setting layer.
///
/// The scheduler only ever asks two questions: whether an output is
/// connected, and what its active mode looks like. Everything else about
/// mode management stays on the platform side.
pub trait ModeQuery {
    /// Returns whether the given output currently has a connected display.
    fn is_connected(&self, output: OutputId) -> bool;

    /// Returns the active mode geometry, or `None` while disconnected.
    fn geometry(&self, output: OutputId) -> Option<OutputGeometry>;
}
