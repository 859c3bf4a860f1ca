// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hardware composition plane scheduling.
//!
//! `laminar_core` decides, once per display refresh, which layers of the
//! on-screen stack can be handed directly to fixed-function display planes
//! instead of being merged by the GPU fallback compositor, and then drives
//! the buffer hand-off and flip sequencing for the planes it assigned. It
//! is `no_std` compatible (with `alloc`) and owns no threads: the platform
//! calls it once per vsync-aligned cycle.
//!
//! # Architecture
//!
//! ```text
//!   Composer::prepare(output, stack)
//!       │
//!       ├─ topology change? ──► classification pass
//!       │        (reclaim planes, rebuild list, attach greedily:
//!       │         overlay → mini-overlay → sprite → primary)
//!       │
//!       ├─ buffer update  (per attached plane: handle/format/crop,
//!       │                  rotated-buffer substitution)
//!       │
//!       └─ smart composition cache (skip static fallback rendering)
//!
//!   Composer::commit(output, stack) ──► FrameSubmission
//!       (render-target flip if still needed, then plane flips in
//!        ascending layer order, then the buffers-committed event that
//!        physically disables reclaimed planes)
//! ```
//!
//! **[`inventory`]** — Admission control over the fixed plane set, with
//! the two-phase `Reclaimed → Disabled` lifecycle.
//!
//! **[`list`]** — The per-frame composition layer list: classification
//! results, attached planes, transient flags, dirty channels.
//!
//! **[`classify`]** — The eligibility rules for each hardware path.
//!
//! **[`device`]** — The per-output pipeline (base device plus the panel
//! variant carrying classification policy and the smart cache).
//!
//! **[`plane`]** — The [`Plane`](plane::Plane) trait, concrete
//! sprite/overlay types, and the [`FlipSink`](plane::FlipSink) driver
//! boundary.
//!
//! **[`rotation`]** — Coordination with the external rotated-buffer
//! service.
//!
//! **[`smart`]** — The smart composition cache.
//!
//! **[`buffer`]**, **[`output`]** — The consumed buffer-manager and
//! mode-query contracts.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) events for pipeline
//! diagnostics, with the zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod buffer;
pub mod classify;
pub mod composer;
pub mod config;
pub mod device;
pub mod dirty;
pub mod frame;
pub mod inventory;
pub mod list;
pub mod output;
pub mod plane;
pub mod rotation;
pub mod smart;
pub mod stack;
pub mod trace;
