// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for laminar
//! diagnostics.
//!
//! This crate provides [`TraceSink`](laminar_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`] — compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`] — writes Chrome Trace Event Format JSON from
//!   recorded bytes.
//!
//! The scheduler is externally clocked and its events carry no timestamps;
//! recordings order events by a per-sink sequence number instead.

pub mod chrome;
pub mod pretty;
pub mod recorder;
