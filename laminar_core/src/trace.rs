// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the scheduling pipeline.
//!
//! [`TraceSink`] is a trait with per-event methods the pipeline calls at
//! each decision point. All method bodies default to no-ops, so a sink
//! implements only the events it cares about.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. With the `trace`
//! feature **off**, every `Tracer` method compiles to nothing; with it
//! **on**, each method performs a single `Option` branch before
//! dispatching.

use crate::output::OutputId;
use crate::plane::PlaneId;

/// Why a classification pass ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassifyReason {
    /// The stack signalled a layer count/order or mode change.
    Topology,
    /// A hotplug event was pending.
    Hotplug,
    /// The set of protected layers changed.
    Protection,
}

/// Why a layer lost its plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetachReason {
    /// Reclassification found the plane no longer fits.
    Reclassified,
    /// The layer's crop degenerated below scanout size.
    DegenerateCrop,
    /// The data-buffer update was rejected.
    UpdateRejected,
    /// The driver rejected the flip.
    FlipRejected,
}

/// Emitted when a classification pass runs.
#[derive(Clone, Copy, Debug)]
pub struct ClassifyEvent {
    /// Output being classified.
    pub output: OutputId,
    /// Number of layers in the new stack.
    pub layers: usize,
    /// What triggered the pass.
    pub reason: ClassifyReason,
}

/// Emitted when a plane is attached to a layer.
#[derive(Clone, Copy, Debug)]
pub struct AttachEvent {
    /// Output the layer belongs to.
    pub output: OutputId,
    /// Stack index of the layer.
    pub layer: usize,
    /// The granted plane.
    pub plane: PlaneId,
}

/// Emitted when a layer loses its plane.
#[derive(Clone, Copy, Debug)]
pub struct DetachEvent {
    /// Output the layer belongs to.
    pub output: OutputId,
    /// Stack index of the layer.
    pub layer: usize,
    /// The released plane.
    pub plane: PlaneId,
    /// Why the plane was taken away.
    pub reason: DetachReason,
}

/// Emitted when a rotated buffer is not ready and the layer stays on the
/// fallback path.
#[derive(Clone, Copy, Debug)]
pub struct RotationStallEvent {
    /// Output the layer belongs to.
    pub output: OutputId,
    /// Stack index of the layer.
    pub layer: usize,
    /// Consecutive frames the layer has waited.
    pub pending_frames: u32,
    /// The desync limit was hit; the layer is renderer-bound until the
    /// next topology change.
    pub exhausted: bool,
}

/// Emitted when the smart composition cache changes state.
#[derive(Clone, Copy, Debug)]
pub struct SmartEvent {
    /// Output the cache belongs to.
    pub output: OutputId,
    /// `true` on enter, `false` on leave.
    pub entered: bool,
}

/// Emitted after a commit pass.
#[derive(Clone, Copy, Debug)]
pub struct CommitEvent {
    /// Output that was committed.
    pub output: OutputId,
    /// Number of buffers submitted (planes plus render target).
    pub submitted: usize,
    /// Whether the render target was flipped.
    pub target_flipped: bool,
}

/// Receives trace events from the pipeline.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called when a classification pass runs.
    fn on_classify(&mut self, e: &ClassifyEvent) {
        _ = e;
    }

    /// Called when a plane is attached.
    fn on_attach(&mut self, e: &AttachEvent) {
        _ = e;
    }

    /// Called when a plane is detached.
    fn on_detach(&mut self, e: &DetachEvent) {
        _ = e;
    }

    /// Called when a rotation buffer is not ready.
    fn on_rotation_stall(&mut self, e: &RotationStallEvent) {
        _ = e;
    }

    /// Called when the smart composition cache enters or leaves.
    fn on_smart(&mut self, e: &SmartEvent) {
        _ = e;
    }

    /// Called after each commit.
    fn on_commit(&mut self, e: &CommitEvent) {
        _ = e;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Thin wrapper around an optional [`TraceSink`].
///
/// With the `trace` feature off, every method compiles to nothing.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`ClassifyEvent`].
    #[inline]
    pub fn classify(&mut self, e: &ClassifyEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_classify(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`AttachEvent`].
    #[inline]
    pub fn attach(&mut self, e: &AttachEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_attach(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DetachEvent`].
    #[inline]
    pub fn detach(&mut self, e: &DetachEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_detach(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RotationStallEvent`].
    #[inline]
    pub fn rotation_stall(&mut self, e: &RotationStallEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_rotation_stall(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SmartEvent`].
    #[inline]
    pub fn smart(&mut self, e: &SmartEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_smart(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CommitEvent`].
    #[inline]
    pub fn commit(&mut self, e: &CommitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_commit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        sink.on_classify(&ClassifyEvent {
            output: OutputId(0),
            layers: 3,
            reason: ClassifyReason::Topology,
        });
        sink.on_smart(&SmartEvent {
            output: OutputId(0),
            entered: true,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.commit(&CommitEvent {
            output: OutputId(0),
            submitted: 2,
            target_flipped: true,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        #[derive(Default)]
        struct Recording {
            commits: Vec<usize>,
        }
        impl TraceSink for Recording {
            fn on_commit(&mut self, e: &CommitEvent) {
                self.commits.push(e.submitted);
            }
        }

        let mut sink = Recording::default();
        let mut tracer = Tracer::new(&mut sink);
        tracer.commit(&CommitEvent {
            output: OutputId(0),
            submitted: 5,
            target_flipped: false,
        });
        drop(tracer);
        assert_eq!(sink.commits, &[5]);
    }
}
