// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each prefixed with a
//! per-sink sequence number. [`decode`] reads them back as an iterator of
//! [`RecordedEvent`].

use laminar_core::output::OutputId;
use laminar_core::plane::{PlaneId, PlaneKind};
use laminar_core::trace::{
    AttachEvent, ClassifyEvent, ClassifyReason, CommitEvent, DetachEvent, DetachReason,
    RotationStallEvent, SmartEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_CLASSIFY: u8 = 1;
const TAG_ATTACH: u8 = 2;
const TAG_DETACH: u8 = 3;
const TAG_ROTATION_STALL: u8 = 4;
const TAG_SMART: u8 = 5;
const TAG_COMMIT: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
    sequence: u64,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn begin(&mut self, tag: u8) {
        self.buf.push(tag);
        self.buf.extend_from_slice(&self.sequence.to_le_bytes());
        self.sequence += 1;
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_kind(&mut self, kind: PlaneKind) {
        self.write_u8(match kind {
            PlaneKind::Primary => 0,
            PlaneKind::Sprite => 1,
            PlaneKind::Overlay => 2,
            PlaneKind::RgbOverlay => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_classify(&mut self, e: &ClassifyEvent) {
        self.begin(TAG_CLASSIFY);
        self.write_u32(e.output.0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "layer count capped at u32::MAX for recording"
        )]
        self.write_u32(e.layers.min(u32::MAX as usize) as u32);
        self.write_u8(match e.reason {
            ClassifyReason::Topology => 0,
            ClassifyReason::Hotplug => 1,
            ClassifyReason::Protection => 2,
        });
    }

    fn on_attach(&mut self, e: &AttachEvent) {
        self.begin(TAG_ATTACH);
        self.write_u32(e.output.0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "layer index capped at u32::MAX for recording"
        )]
        self.write_u32(e.layer.min(u32::MAX as usize) as u32);
        self.write_kind(e.plane.kind);
        self.write_u32(e.plane.index);
    }

    fn on_detach(&mut self, e: &DetachEvent) {
        self.begin(TAG_DETACH);
        self.write_u32(e.output.0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "layer index capped at u32::MAX for recording"
        )]
        self.write_u32(e.layer.min(u32::MAX as usize) as u32);
        self.write_kind(e.plane.kind);
        self.write_u32(e.plane.index);
        self.write_u8(match e.reason {
            DetachReason::Reclassified => 0,
            DetachReason::DegenerateCrop => 1,
            DetachReason::UpdateRejected => 2,
            DetachReason::FlipRejected => 3,
        });
    }

    fn on_rotation_stall(&mut self, e: &RotationStallEvent) {
        self.begin(TAG_ROTATION_STALL);
        self.write_u32(e.output.0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "layer index capped at u32::MAX for recording"
        )]
        self.write_u32(e.layer.min(u32::MAX as usize) as u32);
        self.write_u32(e.pending_frames);
        self.write_u8(u8::from(e.exhausted));
    }

    fn on_smart(&mut self, e: &SmartEvent) {
        self.begin(TAG_SMART);
        self.write_u32(e.output.0);
        self.write_u8(u8::from(e.entered));
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.begin(TAG_COMMIT);
        self.write_u32(e.output.0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "buffer count capped at u32::MAX for recording"
        )]
        self.write_u32(e.submitted.min(u32::MAX as usize) as u32);
        self.write_u8(u8::from(e.target_flipped));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording, with its sequence number.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`ClassifyEvent`].
    Classify {
        /// Recording order.
        sequence: u64,
        /// The event.
        event: ClassifyEvent,
    },
    /// An [`AttachEvent`].
    Attach {
        /// Recording order.
        sequence: u64,
        /// The event.
        event: AttachEvent,
    },
    /// A [`DetachEvent`].
    Detach {
        /// Recording order.
        sequence: u64,
        /// The event.
        event: DetachEvent,
    },
    /// A [`RotationStallEvent`].
    RotationStall {
        /// Recording order.
        sequence: u64,
        /// The event.
        event: RotationStallEvent,
    },
    /// A [`SmartEvent`].
    Smart {
        /// Recording order.
        sequence: u64,
        /// The event.
        event: SmartEvent,
    },
    /// A [`CommitEvent`].
    Commit {
        /// Recording order.
        sequence: u64,
        /// The event.
        event: CommitEvent,
    },
}

impl RecordedEvent {
    /// The event's recording order.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        match self {
            Self::Classify { sequence, .. }
            | Self::Attach { sequence, .. }
            | Self::Detach { sequence, .. }
            | Self::RotationStall { sequence, .. }
            | Self::Smart { sequence, .. }
            | Self::Commit { sequence, .. } => *sequence,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_kind(&mut self) -> Option<PlaneKind> {
        Some(match self.read_u8()? {
            0 => PlaneKind::Primary,
            1 => PlaneKind::Sprite,
            2 => PlaneKind::Overlay,
            _ => PlaneKind::RgbOverlay,
        })
    }

    fn decode_classify(&mut self, sequence: u64) -> Option<RecordedEvent> {
        Some(RecordedEvent::Classify {
            sequence,
            event: ClassifyEvent {
                output: OutputId(self.read_u32()?),
                layers: self.read_u32()? as usize,
                reason: match self.read_u8()? {
                    0 => ClassifyReason::Topology,
                    1 => ClassifyReason::Hotplug,
                    _ => ClassifyReason::Protection,
                },
            },
        })
    }

    fn decode_attach(&mut self, sequence: u64) -> Option<RecordedEvent> {
        Some(RecordedEvent::Attach {
            sequence,
            event: AttachEvent {
                output: OutputId(self.read_u32()?),
                layer: self.read_u32()? as usize,
                plane: PlaneId {
                    kind: self.read_kind()?,
                    index: self.read_u32()?,
                },
            },
        })
    }

    fn decode_detach(&mut self, sequence: u64) -> Option<RecordedEvent> {
        Some(RecordedEvent::Detach {
            sequence,
            event: DetachEvent {
                output: OutputId(self.read_u32()?),
                layer: self.read_u32()? as usize,
                plane: PlaneId {
                    kind: self.read_kind()?,
                    index: self.read_u32()?,
                },
                reason: match self.read_u8()? {
                    0 => DetachReason::Reclassified,
                    1 => DetachReason::DegenerateCrop,
                    2 => DetachReason::UpdateRejected,
                    _ => DetachReason::FlipRejected,
                },
            },
        })
    }

    fn decode_rotation_stall(&mut self, sequence: u64) -> Option<RecordedEvent> {
        Some(RecordedEvent::RotationStall {
            sequence,
            event: RotationStallEvent {
                output: OutputId(self.read_u32()?),
                layer: self.read_u32()? as usize,
                pending_frames: self.read_u32()?,
                exhausted: self.read_u8()? != 0,
            },
        })
    }

    fn decode_smart(&mut self, sequence: u64) -> Option<RecordedEvent> {
        Some(RecordedEvent::Smart {
            sequence,
            event: SmartEvent {
                output: OutputId(self.read_u32()?),
                entered: self.read_u8()? != 0,
            },
        })
    }

    fn decode_commit(&mut self, sequence: u64) -> Option<RecordedEvent> {
        Some(RecordedEvent::Commit {
            sequence,
            event: CommitEvent {
                output: OutputId(self.read_u32()?),
                submitted: self.read_u32()? as usize,
                target_flipped: self.read_u8()? != 0,
            },
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let sequence = self.read_u64()?;
        match tag {
            TAG_CLASSIFY => self.decode_classify(sequence),
            TAG_ATTACH => self.decode_attach(sequence),
            TAG_DETACH => self.decode_detach(sequence),
            TAG_ROTATION_STALL => self.decode_rotation_stall(sequence),
            TAG_SMART => self.decode_smart(sequence),
            TAG_COMMIT => self.decode_commit(sequence),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
