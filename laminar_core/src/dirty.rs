// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The composition layer list tracks per-frame change categories with
//! [`understory_dirty`] channels. The list is flat (no parent/child
//! inheritance), so no channel propagates; marks are per-layer and each
//! channel is drained exactly once per frame by the smart composition
//! cache.

use understory_dirty::Channel;

/// A layer's buffer identity changed since the previous frame.
pub const CONTENT: Channel = Channel::new(0);

/// The list was rebuilt — layer count, order, or mode changed.
pub const TOPOLOGY: Channel = Channel::new(1);
