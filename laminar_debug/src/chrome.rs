// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a
//! [`RecorderSink`](super::recorder::RecorderSink) and writes
//! [Chrome Trace Event Format][spec] JSON to the given writer. The
//! scheduler's events carry no timestamps, so the recording sequence
//! number stands in for the timeline (one microsecond per event).
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable
/// for loading into `chrome://tracing` or
/// [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        let ts = recorded.sequence();
        match recorded {
            RecordedEvent::Classify { event, .. } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Classify",
                    "cat": "Scheduler",
                    "ts": ts,
                    "pid": event.output.0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "layers": event.layers,
                        "reason": format!("{:?}", event.reason),
                    }
                }));
            }
            RecordedEvent::Attach { event, .. } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Attach",
                    "cat": "Planes",
                    "ts": ts,
                    "pid": event.output.0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "layer": event.layer,
                        "plane": format!("{:?}", event.plane),
                    }
                }));
            }
            RecordedEvent::Detach { event, .. } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Detach",
                    "cat": "Planes",
                    "ts": ts,
                    "pid": event.output.0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "layer": event.layer,
                        "plane": format!("{:?}", event.plane),
                        "reason": format!("{:?}", event.reason),
                    }
                }));
            }
            RecordedEvent::RotationStall { event, .. } => {
                events.push(json!({
                    "ph": "i",
                    "name": "RotationStall",
                    "cat": "Rotation",
                    "ts": ts,
                    "pid": event.output.0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "layer": event.layer,
                        "pending_frames": event.pending_frames,
                        "exhausted": event.exhausted,
                    }
                }));
            }
            RecordedEvent::Smart { event, .. } => {
                let name = if event.entered { "SmartEnter" } else { "SmartLeave" };
                events.push(json!({
                    "ph": "i",
                    "name": name,
                    "cat": "Cache",
                    "ts": ts,
                    "pid": event.output.0,
                    "tid": 0,
                    "s": "g",
                    "args": {}
                }));
            }
            RecordedEvent::Commit { event, .. } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Commit",
                    "cat": "Scheduler",
                    "ts": ts,
                    "pid": event.output.0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "submitted": event.submitted,
                        "target_flipped": event.target_flipped,
                    }
                }));
            }
        }
    }

    let doc = Value::Array(events);
    serde_json::to_writer(&mut *writer, &doc)?;
    writer.flush()
}
