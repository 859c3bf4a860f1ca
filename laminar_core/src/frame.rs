// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame submission record returned by commit.

use alloc::vec::Vec;

use crate::buffer::BufferHandle;
use crate::output::OutputId;
use crate::stack::Fence;

/// Which release-fence slot a submitted buffer maps back to.
///
/// The caller signals the slot's release fence once the display stops
/// reading the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReleaseSlot {
    /// The stack layer at this index.
    Layer(usize),
    /// The fallback render target.
    Target,
}

/// One buffer consumed by this frame's flip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmittedBuffer {
    /// The buffer scanned out.
    pub buffer: BufferHandle,
    /// Fence the display must wait on before reading.
    pub acquire: Option<Fence>,
    /// Where the caller delivers the release fence.
    pub release: ReleaseSlot,
}

/// Everything the flip of one frame consumed, render target first.
#[derive(Clone, Debug, Default)]
pub struct FrameSubmission {
    /// Output the frame was committed to.
    pub output: OutputId,
    /// Submitted buffers in flip order.
    pub buffers: Vec<SubmittedBuffer>,
}

impl FrameSubmission {
    /// Creates an empty submission for `output`.
    #[must_use]
    pub fn new(output: OutputId) -> Self {
        Self {
            output,
            buffers: Vec::new(),
        }
    }

    /// Whether the frame submitted nothing (blanked or hotplug-pending).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
