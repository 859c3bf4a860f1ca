// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic fake collaborators and stack builders for laminar tests
//! and demos.
//!
//! The scheduler consumes four platform interfaces (buffer manager,
//! rotation provider, mode query, flip sink). This crate provides scripted
//! in-memory implementations of each, plus builders for common layer-stack
//! shapes, so scenario tests can drive whole frame cycles without any
//! platform behind them.
//!
//! [`TestRig`] bundles the four fakes and hands out a
//! [`Services`](laminar_core::device::Services) view over them.

#![no_std]

extern crate alloc;

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use kurbo::Rect;

use laminar_core::buffer::{BufferHandle, BufferManager, DeviceBuffer, VideoMetadata};
use laminar_core::device::Services;
use laminar_core::output::{ModeQuery, OutputGeometry, OutputId};
use laminar_core::plane::{FlipEntry, FlipError, FlipSink, PlaneKind};
use laminar_core::rotation::{RotatedBuffer, RotationPoll, RotationProvider, RotationRequest};
use laminar_core::stack::{
    BlendMode, Composition, Fence, LayerStack, LayerTransform, PixelFormat, RenderTarget,
    StackLayer,
};
use laminar_core::trace::Tracer;

// ---------------------------------------------------------------------------
// Buffer manager
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
struct Registered {
    len: u32,
    metadata: Option<VideoMetadata>,
}

/// In-memory buffer manager with leak accounting.
///
/// Every handle must be [`register`](Self::register)ed before the
/// scheduler can map it; mapping an unknown or failed handle returns
/// `None`, which is exactly how a stale handle behaves on a real
/// allocator.
#[derive(Debug, Default)]
pub struct TestBufferManager {
    registered: BTreeMap<u64, Registered>,
    failing: BTreeSet<u64>,
    outstanding: i64,
    total_maps: u64,
}

impl TestBufferManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plain buffer.
    pub fn register(&mut self, handle: BufferHandle, len: u32) {
        self.registered.insert(handle.0, Registered { len, metadata: None });
    }

    /// Registers a video buffer carrying shared metadata.
    pub fn register_video(&mut self, handle: BufferHandle, len: u32, metadata: VideoMetadata) {
        self.registered.insert(
            handle.0,
            Registered {
                len,
                metadata: Some(metadata),
            },
        );
    }

    /// Updates a video buffer's shared metadata (simulating the video
    /// pipeline writing from its own context).
    pub fn set_metadata(&mut self, handle: BufferHandle, metadata: VideoMetadata) {
        let entry = self
            .registered
            .get_mut(&handle.0)
            .expect("set_metadata on unregistered buffer");
        entry.metadata = Some(metadata);
    }

    /// Makes future maps of `handle` fail.
    pub fn fail_mapping(&mut self, handle: BufferHandle) {
        self.failing.insert(handle.0);
    }

    /// Mappings currently held by the scheduler.
    #[must_use]
    pub fn outstanding_mappings(&self) -> i64 {
        self.outstanding
    }

    /// Total maps performed (cache-hit accounting).
    #[must_use]
    pub fn total_maps(&self) -> u64 {
        self.total_maps
    }
}

impl BufferManager for TestBufferManager {
    fn map(&mut self, handle: BufferHandle) -> Option<DeviceBuffer> {
        if self.failing.contains(&handle.0) {
            return None;
        }
        let info = self.registered.get(&handle.0)?;
        self.outstanding += 1;
        self.total_maps += 1;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "harness handles are small integers"
        )]
        let page_offset = (handle.0 as u32) << 4;
        Some(DeviceBuffer {
            handle,
            page_offset,
            len: info.len,
        })
    }

    fn unmap(&mut self, _buffer: DeviceBuffer) {
        self.outstanding -= 1;
    }

    fn video_metadata(&mut self, handle: BufferHandle) -> Option<VideoMetadata> {
        self.registered.get(&handle.0)?.metadata
    }
}

// ---------------------------------------------------------------------------
// Rotation provider
// ---------------------------------------------------------------------------

/// Scripted rotation provider.
///
/// Completions are staged by the test via [`stage`](Self::stage) (the
/// asynchronous path) or produced on demand by
/// [`complete`](RotationProvider::complete) (the bounded-blocking path for
/// protected content, enabled by default).
#[derive(Debug, Default)]
pub struct ScriptedRotationProvider {
    ready: BTreeMap<(u64, u8), RotatedBuffer>,
    submissions: Vec<RotationRequest>,
    completions: Vec<RotationRequest>,
    refuse_complete: bool,
}

fn transform_key(transform: LayerTransform) -> u8 {
    match transform {
        LayerTransform::Identity => 0,
        LayerTransform::Rotate90 => 1,
        LayerTransform::Rotate180 => 2,
        LayerTransform::Rotate270 => 3,
    }
}

/// The rotated copy the provider would produce for `request`, with the
/// handle offset by a fixed amount so tests can register it up front.
#[must_use]
pub fn rotated_for(request: &RotationRequest) -> RotatedBuffer {
    let (width, height) = if request.transform.swaps_axes() {
        (request.height, request.width)
    } else {
        (request.width, request.height)
    };
    RotatedBuffer {
        buffer: BufferHandle(request.source.0 + 0x1000),
        width,
        height,
    }
}

impl ScriptedRotationProvider {
    /// Creates a provider with nothing staged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a completed rotation, as if the service (or the video
    /// pipeline itself) finished it and stamped the shared metadata.
    pub fn stage(&mut self, request: &RotationRequest, rotated: RotatedBuffer) {
        self.ready
            .insert((request.source.0, transform_key(request.transform)), rotated);
    }

    /// Makes the bounded-blocking path fail (provider overloaded).
    pub fn refuse_complete(&mut self) {
        self.refuse_complete = true;
    }

    /// Requests submitted through the asynchronous path.
    #[must_use]
    pub fn submissions(&self) -> &[RotationRequest] {
        &self.submissions
    }

    /// Requests resolved through the bounded-blocking path.
    #[must_use]
    pub fn completions(&self) -> &[RotationRequest] {
        &self.completions
    }
}

impl RotationProvider for ScriptedRotationProvider {
    fn poll(&mut self, request: &RotationRequest) -> RotationPoll {
        match self
            .ready
            .get(&(request.source.0, transform_key(request.transform)))
        {
            Some(rb) => RotationPoll::Ready(*rb),
            None => RotationPoll::Pending,
        }
    }

    fn submit(&mut self, request: &RotationRequest) {
        self.submissions.push(*request);
    }

    fn complete(&mut self, request: &RotationRequest) -> Option<RotatedBuffer> {
        self.completions.push(*request);
        if self.refuse_complete {
            return None;
        }
        let rotated = rotated_for(request);
        self.stage(request, rotated);
        Some(rotated)
    }
}

// ---------------------------------------------------------------------------
// Mode query
// ---------------------------------------------------------------------------

/// Fixed-mode query with a connectable external output.
#[derive(Debug, Clone)]
pub struct StaticModeQuery {
    geometry: OutputGeometry,
    connected: Vec<OutputId>,
}

impl StaticModeQuery {
    /// A connected panel with the given mode.
    #[must_use]
    pub fn panel(width: u32, height: u32, refresh_hz: u32) -> Self {
        let mut connected = Vec::new();
        connected.push(OutputId::PANEL);
        Self {
            geometry: OutputGeometry {
                width,
                height,
                refresh_hz,
            },
            connected,
        }
    }

    /// Marks the external output connected too.
    #[must_use]
    pub fn with_external(mut self) -> Self {
        self.connected.push(OutputId::EXTERNAL);
        self
    }
}

impl ModeQuery for StaticModeQuery {
    fn is_connected(&self, output: OutputId) -> bool {
        self.connected.contains(&output)
    }

    fn geometry(&self, output: OutputId) -> Option<OutputGeometry> {
        self.is_connected(output).then_some(self.geometry)
    }
}

// ---------------------------------------------------------------------------
// Flip sink
// ---------------------------------------------------------------------------

/// Records every flip and disable; can reject on request.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Flips in submission order.
    pub flips: Vec<FlipEntry>,
    /// Disables in submission order.
    pub disables: Vec<(PlaneKind, u32)>,
    reject_kinds: Vec<PlaneKind>,
}

impl RecordingSink {
    /// Creates an accepting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes flips of `kind` fail with [`FlipError::Busy`].
    pub fn reject_kind(&mut self, kind: PlaneKind) {
        self.reject_kinds.push(kind);
    }

    /// Flips recorded for the given plane kind.
    #[must_use]
    pub fn flips_of(&self, kind: PlaneKind) -> Vec<&FlipEntry> {
        self.flips.iter().filter(|e| e.kind == kind).collect()
    }

    /// Drops the recorded history (not the rejection script).
    pub fn clear(&mut self) {
        self.flips.clear();
        self.disables.clear();
    }
}

impl FlipSink for RecordingSink {
    fn flip(&mut self, entry: &FlipEntry) -> Result<(), FlipError> {
        if self.reject_kinds.contains(&entry.kind) {
            return Err(FlipError::Busy);
        }
        self.flips.push(*entry);
        Ok(())
    }

    fn disable(&mut self, kind: PlaneKind, index: u32) -> Result<(), FlipError> {
        self.disables.push((kind, index));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rig
// ---------------------------------------------------------------------------

/// The four fakes bundled, with a [`Services`] view for driving frames.
#[derive(Debug)]
pub struct TestRig {
    /// Buffer manager fake.
    pub buffers: TestBufferManager,
    /// Rotation provider fake.
    pub rotation: ScriptedRotationProvider,
    /// Mode query fake.
    pub modes: StaticModeQuery,
    /// Flip sink fake.
    pub sink: RecordingSink,
}

impl TestRig {
    /// A rig with a connected panel of the given mode.
    #[must_use]
    pub fn panel(width: u32, height: u32) -> Self {
        Self {
            buffers: TestBufferManager::new(),
            rotation: ScriptedRotationProvider::new(),
            modes: StaticModeQuery::panel(width, height, 60),
            sink: RecordingSink::new(),
        }
    }

    /// A `Services` view over the fakes (tracing disabled).
    pub fn services(&mut self) -> Services<'_> {
        Services {
            buffers: &mut self.buffers,
            rotation: &mut self.rotation,
            modes: &self.modes,
            sink: &mut self.sink,
            tracer: Tracer::none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stack builders
// ---------------------------------------------------------------------------

/// An opaque color layer, unrotated and unscaled.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "harness geometry and handles are small integers"
)]
pub fn opaque_layer(buffer: u64, frame: Rect) -> StackLayer {
    StackLayer {
        buffer: Some(BufferHandle(buffer)),
        buffer_width: frame.width() as u32,
        buffer_height: frame.height() as u32,
        stride: frame.width() as u32,
        format: PixelFormat::Bgrx8888,
        source_crop: Rect::new(0.0, 0.0, frame.width(), frame.height()),
        frame,
        blending: BlendMode::None,
        transform: LayerTransform::Identity,
        visible_regions: 1,
        skip: false,
        protected: false,
        acquire_fence: Some(Fence(buffer as i32)),
        composition: Composition::Render,
        clear_hint: false,
    }
}

/// A premultiplied-alpha color layer.
#[must_use]
pub fn alpha_layer(buffer: u64, frame: Rect) -> StackLayer {
    let mut layer = opaque_layer(buffer, frame);
    layer.format = PixelFormat::Bgra8888;
    layer.blending = BlendMode::Premultiplied;
    layer
}

/// A video layer in a decoder format that carries metadata.
#[must_use]
pub fn video_layer(buffer: u64, frame: Rect) -> StackLayer {
    let mut layer = opaque_layer(buffer, frame);
    layer.format = PixelFormat::Nv12;
    layer
}

/// Builds a stack with a render target of the given size.
///
/// The first frame of any scene is a topology change; builders default to
/// `topology_changed: true` and tests clear it for steady-state frames.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "harness handles are small integers"
)]
pub fn stack_of(layers: Vec<StackLayer>, target_buffer: u64, width: u32, height: u32) -> LayerStack {
    LayerStack {
        layers,
        target: RenderTarget {
            buffer: Some(BufferHandle(target_buffer)),
            width,
            height,
            acquire_fence: Some(Fence(target_buffer as i32)),
        },
        topology_changed: true,
    }
}

/// Registers every layer buffer and the render target with the rig's
/// buffer manager.
pub fn register_stack(rig: &mut TestRig, stack: &LayerStack) {
    for layer in &stack.layers {
        if let Some(handle) = layer.buffer {
            if layer.format.has_video_metadata() {
                rig.buffers
                    .register_video(handle, 4096, VideoMetadata::default());
            } else {
                rig.buffers.register(handle, 4096);
            }
        }
    }
    if let Some(handle) = stack.target.buffer {
        rig.buffers.register(handle, 4096);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_manager_accounts_for_mappings() {
        let mut mgr = TestBufferManager::new();
        mgr.register(BufferHandle(1), 4096);

        let mapped = mgr.map(BufferHandle(1)).unwrap();
        assert_eq!(mgr.outstanding_mappings(), 1);
        mgr.unmap(mapped);
        assert_eq!(mgr.outstanding_mappings(), 0);

        assert!(mgr.map(BufferHandle(2)).is_none(), "unregistered handle");
    }

    #[test]
    fn scripted_provider_round_trips() {
        let mut provider = ScriptedRotationProvider::new();
        let request = RotationRequest {
            source: BufferHandle(7),
            transform: LayerTransform::Rotate90,
            width: 640,
            height: 480,
        };

        assert_eq!(provider.poll(&request), RotationPoll::Pending);
        provider.submit(&request);
        assert_eq!(provider.submissions().len(), 1);

        let rotated = rotated_for(&request);
        assert_eq!(rotated.width, 480, "axes swap for a quarter turn");
        provider.stage(&request, rotated);
        assert_eq!(provider.poll(&request), RotationPoll::Ready(rotated));
    }

    #[test]
    fn refused_completion_returns_none() {
        let mut provider = ScriptedRotationProvider::new();
        provider.refuse_complete();
        let request = RotationRequest {
            source: BufferHandle(7),
            transform: LayerTransform::Rotate180,
            width: 64,
            height: 64,
        };
        assert!(provider.complete(&request).is_none());
        assert_eq!(provider.completions().len(), 1);
    }

    #[test]
    fn sink_rejection_is_scriptable() {
        let mut sink = RecordingSink::new();
        sink.reject_kind(PlaneKind::Sprite);

        let entry = FlipEntry {
            kind: PlaneKind::Sprite,
            index: 0,
            pipe: OutputId::PANEL,
            buffer: BufferHandle(1),
            page_offset: 0,
            frame: Rect::new(0.0, 0.0, 10.0, 10.0),
            crop: Rect::new(0.0, 0.0, 10.0, 10.0),
            format: PixelFormat::Bgrx8888,
            stride: 10,
            transform: LayerTransform::Identity,
            force_bottom: false,
        };
        assert_eq!(sink.flip(&entry), Err(FlipError::Busy));
        assert!(sink.flips.is_empty());
    }

    #[test]
    fn mode_query_reports_external() {
        let modes = StaticModeQuery::panel(1024, 768, 60);
        assert!(modes.is_connected(OutputId::PANEL));
        assert!(!modes.is_connected(OutputId::EXTERNAL));

        let modes = modes.with_external();
        assert!(modes.is_connected(OutputId::EXTERNAL));
        assert_eq!(modes.geometry(OutputId::PANEL).unwrap().width, 1024);
    }
}
