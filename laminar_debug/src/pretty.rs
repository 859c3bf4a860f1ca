// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use laminar_core::trace::{
    AttachEvent, ClassifyEvent, CommitEvent, DetachEvent, RotationStallEvent, SmartEvent,
    TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write)
/// destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_classify(&mut self, e: &ClassifyEvent) {
        let _ = writeln!(
            self.writer,
            "[classify] output={} layers={} reason={:?}",
            e.output.0, e.layers, e.reason
        );
    }

    fn on_attach(&mut self, e: &AttachEvent) {
        let _ = writeln!(
            self.writer,
            "[attach] output={} layer={} plane={:?}",
            e.output.0, e.layer, e.plane
        );
    }

    fn on_detach(&mut self, e: &DetachEvent) {
        let _ = writeln!(
            self.writer,
            "[detach] output={} layer={} plane={:?} reason={:?}",
            e.output.0, e.layer, e.plane, e.reason
        );
    }

    fn on_rotation_stall(&mut self, e: &RotationStallEvent) {
        let _ = writeln!(
            self.writer,
            "[rotation] output={} layer={} pending={} exhausted={}",
            e.output.0, e.layer, e.pending_frames, e.exhausted
        );
    }

    fn on_smart(&mut self, e: &SmartEvent) {
        let _ = writeln!(
            self.writer,
            "[smart] output={} {}",
            e.output.0,
            if e.entered { "enter" } else { "leave" }
        );
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        let _ = writeln!(
            self.writer,
            "[commit] output={} submitted={} target_flipped={}",
            e.output.0, e.submitted, e.target_flipped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laminar_core::output::OutputId;
    use laminar_core::plane::{PlaneId, PlaneKind};

    #[test]
    fn writes_one_line_per_event() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        sink.on_attach(&AttachEvent {
            output: OutputId(0),
            layer: 1,
            plane: PlaneId {
                kind: PlaneKind::Overlay,
                index: 0,
            },
        });
        sink.on_smart(&SmartEvent {
            output: OutputId(0),
            entered: true,
        });

        let text = String::from_utf8(sink.writer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[attach]"));
        assert!(lines[1].contains("enter"));
    }
}
