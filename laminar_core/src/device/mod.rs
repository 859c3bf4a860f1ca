// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-output scheduling pipeline.
//!
//! Each physical output owns a [`DisplayDevice`] running the same frame
//! cycle:
//!
//! ```text
//!   Idle ──topology change──► Classify ──► BufferUpdate ──► Flip ──► Idle
//!        └──────otherwise──────────────────┘
//! ```
//!
//! `DisplayDevice` is the shared base: buffer updates (including rotated
//! buffer substitution), the commit/flip sequence, blank and hotplug
//! handling, and teardown. The classification policy and the smart
//! composition cache live in the panel variant, [`PanelDevice`].
//!
//! The device is single-threaded and externally driven: the composer calls
//! `prepare` then `commit` once per vsync-aligned cycle, passing the
//! platform collaborators in as [`Services`].

mod panel;

pub use panel::PanelDevice;

use kurbo::Rect;

use crate::buffer::{BufferHandle, BufferManager, ForceOutput, align_to};
use crate::config::PolicyConfig;
use crate::frame::{FrameSubmission, ReleaseSlot, SubmittedBuffer};
use crate::inventory::PlaneInventory;
use crate::list::CompositionLayerList;
use crate::output::{ModeQuery, OutputGeometry, OutputId};
use crate::plane::{BufferRing, DataBinding, FlipEntry, FlipSink, PlaneError, PlaneId, PlaneKind};
use crate::rotation::{RotationPoll, RotationProvider, RotationRequest, rotated_crop};
use crate::stack::{
    BlendMode, Composition, LayerStack, LayerTransform, PixelFormat, StackLayer,
};
use crate::trace::{CommitEvent, DetachEvent, DetachReason, RotationStallEvent, Tracer};

/// Mappings kept for the render target's back buffers.
const TARGET_RING: usize = 3;

/// The platform collaborators, passed in per call.
///
/// The scheduler owns none of these: the allocator, rotation service,
/// mode-setting layer, and display driver all live on the platform side,
/// and the diagnostics tracer belongs to whoever is watching.
pub struct Services<'a> {
    /// Buffer allocator and mapper.
    pub buffers: &'a mut dyn BufferManager,
    /// Asynchronous rotation service.
    pub rotation: &'a mut dyn RotationProvider,
    /// Mode-setting queries.
    pub modes: &'a dyn ModeQuery,
    /// Display driver boundary.
    pub sink: &'a mut dyn FlipSink,
    /// Diagnostics.
    pub tracer: Tracer<'a>,
}

impl core::fmt::Debug for Services<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// Relative z-order of overlay engines and the primary/render plane.
///
/// Switching z-order mid-scene flickers, so the order is recomputed only
/// on classification passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ZOrder {
    /// Overlays scan out beneath the primary (video under blended UI).
    #[default]
    OverlayBottom,
    /// Overlays sit above the primary; the render target is forced to the
    /// bottom.
    OverlayTop,
}

/// What `prepare` did this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrepareSummary {
    /// A full classification pass ran.
    pub classified: bool,
    /// Layers holding a plane after the pass.
    pub attached: usize,
    /// Layers left to the fallback renderer.
    pub fallback: usize,
    /// The smart composition cache is suppressing fallback rendering.
    pub smart_active: bool,
}

/// Outcome of resolving a layer's rotation state for this frame.
enum RotationOutcome {
    /// Scan out this buffer (the original, or a ready rotated copy).
    Use(Substitute),
    /// Not ready; stay on the fallback path this frame and retry.
    Defer,
    /// The desync limit was hit; renderer-bound until topology change.
    Exhausted,
}

/// A buffer substitution produced by rotation resolution.
struct Substitute {
    buffer: BufferHandle,
    width: u32,
    height: u32,
    crop: Rect,
    baked: LayerTransform,
}

/// Per-output base pipeline state.
#[derive(Debug)]
pub struct DisplayDevice {
    output: OutputId,
    pub(crate) list: CompositionLayerList,
    target_ring: BufferRing<TARGET_RING>,
    pub(crate) smart_active: bool,
    pub(crate) hotplug_pending: bool,
    blanked: bool,
    pub(crate) had_protected: bool,
    pub(crate) zorder: ZOrder,
}

impl DisplayDevice {
    /// Creates the pipeline state for `output`.
    #[must_use]
    pub fn new(output: OutputId) -> Self {
        Self {
            output,
            list: CompositionLayerList::new(),
            target_ring: BufferRing::default(),
            smart_active: false,
            hotplug_pending: false,
            blanked: false,
            had_protected: false,
            zorder: ZOrder::default(),
        }
    }

    /// The output this device drives.
    #[must_use]
    pub fn output(&self) -> OutputId {
        self.output
    }

    /// Current z-order policy.
    #[must_use]
    pub fn zorder(&self) -> ZOrder {
        self.zorder
    }

    /// Enters or leaves the blanked state. While blanked, prepare and
    /// commit are no-ops.
    pub fn blank(&mut self, blank: bool) -> bool {
        self.blanked = blank;
        true
    }

    /// Whether the device is blanked.
    #[must_use]
    pub fn is_blanked(&self) -> bool {
        self.blanked
    }

    /// Notes a hotplug/mode event. The next `prepare` runs a full
    /// classification pass; commits are skipped until then.
    pub fn on_hotplug(&mut self, _connected: bool) {
        self.hotplug_pending = true;
    }

    /// Whether a layer is something the scheduler can work with at all.
    pub(crate) fn is_hwc_layer(layer: &StackLayer) -> bool {
        layer.buffer.is_some()
    }

    /// Whether the stack is a screenshot in progress: a skip-flagged top
    /// layer covering the whole output, with no protected content. The
    /// classification pass attaches nothing so the reader sees the full
    /// composed frame.
    pub(crate) fn is_screenshot_active(stack: &LayerStack, geometry: OutputGeometry) -> bool {
        if stack.layers.is_empty() || stack.any_protected() {
            return false;
        }
        let top = &stack.layers[stack.layers.len() - 1];
        top.skip
            && top.frame.x0 == 0.0
            && top.frame.y0 == 0.0
            && top.frame.width() == f64::from(geometry.width)
            && top.frame.height() == f64::from(geometry.height)
    }

    /// Recomputes the z-order policy from the current attachment set.
    pub(crate) fn update_zorder(&mut self, inventory: &mut PlaneInventory) {
        self.zorder = if self.list.attached_overlay_count() > 0 {
            let bottom_is_overlay = self.list.plane(0).is_some_and(|id| {
                matches!(id.kind, PlaneKind::Overlay | PlaneKind::RgbOverlay)
            });
            if bottom_is_overlay {
                ZOrder::OverlayBottom
            } else {
                ZOrder::OverlayTop
            }
        } else {
            ZOrder::OverlayBottom
        };

        // Blending above the bottom-most overlay only works if that overlay
        // stays under everything the render plane holds.
        if let Some(id) = self.list.plane(0) {
            if matches!(id.kind, PlaneKind::Overlay | PlaneKind::RgbOverlay) {
                inventory
                    .plane_mut(id)
                    .force_bottom(self.zorder == ZOrder::OverlayBottom);
            }
        }
    }

    /// BufferUpdate: pushes the current frame's buffer into every attached
    /// plane, substituting rotated copies where a transform is requested.
    ///
    /// Returns `false` when any layer had to be degraded to the fallback
    /// path (the caller then revisits the list).
    pub(crate) fn update_layers_data(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        policy: &PolicyConfig,
        stack: &mut LayerStack,
    ) -> bool {
        let mut handled = true;

        for i in 0..self.list.len().min(stack.layers.len()) {
            if !Self::is_hwc_layer(&stack.layers[i]) {
                continue;
            }
            let Some(plane_id) = self.list.plane(i) else {
                continue;
            };

            // A degenerate crop cannot be scanned out by any engine.
            if stack.layers[i].crop_width() <= 1.0 || stack.layers[i].crop_height() <= 1.0 {
                self.detach(services, inventory, i, plane_id, DetachReason::DegenerateCrop);
                stack.layers[i].composition = Composition::Render;
                handled = false;
                continue;
            }

            match plane_id.kind {
                PlaneKind::Overlay => {
                    if !self.update_overlay_layer(services, inventory, policy, stack, i, plane_id) {
                        handled = false;
                    }
                }
                PlaneKind::RgbOverlay | PlaneKind::Sprite | PlaneKind::Primary => {
                    if !self.update_color_layer(services, inventory, stack, i, plane_id) {
                        handled = false;
                    }
                }
            }

            // The renderer only reaches the screen through the primary
            // plane; a clear hint is useless while something owns it.
            if self.list.flags(i).needs_clear && inventory.primary_available(self.output) {
                stack.layers[i].clear_hint = true;
            }
        }

        handled
    }

    /// Buffer update for a video overlay layer. Returns `false` when the
    /// layer fell off the hardware path.
    fn update_overlay_layer(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        policy: &PolicyConfig,
        stack: &mut LayerStack,
        i: usize,
        plane_id: PlaneId,
    ) -> bool {
        // A stale scanout scheduled for disable is flushed before the
        // plane is reprogrammed.
        if self.list.flags(i).delay_disable {
            self.list.flags_mut(i).delay_disable = false;
            let _ = inventory.plane_mut(plane_id).disable(services.sink);
        }

        // Skip-flagged video keeps its previous frame on the plane rather
        // than scanning out content the compositor disowned mid-stream.
        if stack.layers[i].skip {
            stack.layers[i].composition = Composition::Plane;
            return true;
        }

        let forced = self.list.flags(i).force_hardware;
        let format = self.list.format(i);
        let stack_stride = stack.layers[i].stride;

        match self.resolve_rotation(services, policy, stack, i, forced) {
            RotationOutcome::Use(sub) => {
                let stride = if sub.baked.is_identity() {
                    stack_stride
                } else {
                    // Rotated copies come from the rotation engine, not the
                    // allocator; their pitch is the aligned width.
                    align_to(sub.width, 32)
                };
                let binding = DataBinding {
                    buffer: sub.buffer,
                    format,
                    width: sub.width,
                    height: sub.height,
                    stride,
                    crop: sub.crop,
                    transform: sub.baked,
                };
                match inventory
                    .plane_mut(plane_id)
                    .set_data_buffer(services.buffers, &binding)
                {
                    Ok(()) => {
                        self.list.reset_desync(i);
                        stack.layers[i].composition = Composition::Plane;
                        true
                    }
                    Err(PlaneError::MapFailed(_)) => {
                        // Invalid handle: leave the plane showing its
                        // previous content and try again next frame.
                        stack.layers[i].composition = Composition::Plane;
                        true
                    }
                    Err(_) => {
                        self.detach(services, inventory, i, plane_id, DetachReason::UpdateRejected);
                        stack.layers[i].composition = Composition::Render;
                        false
                    }
                }
            }
            RotationOutcome::Defer => {
                services.tracer.rotation_stall(&RotationStallEvent {
                    output: self.output,
                    layer: i,
                    pending_frames: self.list.desync(i),
                    exhausted: false,
                });
                self.list.flags_mut(i).delay_disable = true;
                if forced {
                    // Forced content has no fallback; the plane keeps its
                    // previous frame.
                    stack.layers[i].composition = Composition::Plane;
                    true
                } else {
                    stack.layers[i].composition = Composition::Render;
                    false
                }
            }
            RotationOutcome::Exhausted => {
                services.tracer.rotation_stall(&RotationStallEvent {
                    output: self.output,
                    layer: i,
                    pending_frames: policy.rotation_desync_limit,
                    exhausted: true,
                });
                self.detach(services, inventory, i, plane_id, DetachReason::UpdateRejected);
                stack.layers[i].composition = Composition::Render;
                false
            }
        }
    }

    /// Buffer update for a sprite, primary, or RGB-overlay layer.
    fn update_color_layer(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        stack: &mut LayerStack,
        i: usize,
        plane_id: PlaneId,
    ) -> bool {
        let layer = &stack.layers[i];
        let buffer = layer.buffer.expect("checked by is_hwc_layer");

        // Scanning an alpha format through a non-blending plane shows
        // garbage in the alpha channel on some engines.
        let format = if layer.blending == BlendMode::None {
            self.list.format(i).opaque_equivalent()
        } else {
            self.list.format(i)
        };

        let binding = DataBinding {
            buffer,
            format,
            width: layer.buffer_width,
            height: layer.buffer_height,
            stride: layer.stride,
            crop: layer.source_crop,
            transform: LayerTransform::Identity,
        };

        match inventory
            .plane_mut(plane_id)
            .set_data_buffer(services.buffers, &binding)
        {
            Ok(()) => {
                stack.layers[i].composition = Composition::Plane;
                true
            }
            Err(PlaneError::MapFailed(_)) => {
                stack.layers[i].composition = Composition::Plane;
                true
            }
            Err(_) => {
                self.detach(services, inventory, i, plane_id, DetachReason::UpdateRejected);
                stack.layers[i].composition = Composition::Render;
                false
            }
        }
    }

    /// Resolves which buffer a transformed video layer scans out this
    /// frame.
    fn resolve_rotation(
        &mut self,
        services: &mut Services<'_>,
        policy: &PolicyConfig,
        stack: &LayerStack,
        i: usize,
        forced: bool,
    ) -> RotationOutcome {
        let layer = &stack.layers[i];
        let buffer = layer.buffer.expect("checked by is_hwc_layer");

        let passthrough = Substitute {
            buffer,
            width: layer.buffer_width,
            height: layer.buffer_height,
            crop: layer.source_crop,
            baked: LayerTransform::Identity,
        };

        let Some(meta) = layer
            .format
            .has_video_metadata()
            .then(|| services.buffers.video_metadata(buffer))
            .flatten()
        else {
            // Software decoder: no metadata, nobody to rotate for us.
            return if layer.transform.is_identity() {
                RotationOutcome::Use(passthrough)
            } else {
                self.defer_or_exhaust(i, policy)
            };
        };

        if meta.force_output == ForceOutput::Renderer && !forced {
            return self.defer_or_exhaust(i, policy);
        }

        if layer.transform.is_identity() {
            return RotationOutcome::Use(passthrough);
        }

        let request = RotationRequest {
            source: buffer,
            transform: layer.transform,
            width: layer.buffer_width,
            height: layer.buffer_height,
        };

        let ready = match services.rotation.poll(&request) {
            RotationPoll::Ready(rb) => Some(rb),
            RotationPoll::Pending => {
                if forced {
                    services.rotation.complete(&request)
                } else {
                    services.rotation.submit(&request);
                    None
                }
            }
        };

        match ready {
            Some(rb) => RotationOutcome::Use(Substitute {
                buffer: rb.buffer,
                width: rb.width,
                height: rb.height,
                crop: rotated_crop(layer.source_crop, layer.transform),
                baked: layer.transform,
            }),
            None if forced => RotationOutcome::Defer,
            None => self.defer_or_exhaust(i, policy),
        }
    }

    fn defer_or_exhaust(&mut self, i: usize, policy: &PolicyConfig) -> RotationOutcome {
        if self.list.bump_desync(i) >= policy.rotation_desync_limit {
            RotationOutcome::Exhausted
        } else {
            RotationOutcome::Defer
        }
    }

    /// Flip: submits the render target (when still needed) and every
    /// attached plane in ascending layer order.
    pub(crate) fn commit(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        stack: &mut LayerStack,
    ) -> FrameSubmission {
        let mut submission = FrameSubmission::new(self.output);

        if self.blanked {
            return submission;
        }
        // An unhandled hotplug means the classification is against the old
        // mode; skip the flip until the next prepare re-runs it.
        if self.hotplug_pending {
            return submission;
        }

        let needs_render = stack
            .layers
            .iter()
            .any(|l| l.composition == Composition::Render);

        let mut target_flipped = false;
        if (needs_render || self.smart_active)
            && !stack.layers.is_empty()
            && inventory.primary_available(self.output)
        {
            if let Some(submitted) = self.flip_target(services, stack) {
                submission.buffers.push(submitted);
                target_flipped = true;
            }
        }

        for i in 0..self.list.len().min(stack.layers.len()) {
            let Some(plane_id) = self.list.plane(i) else {
                continue;
            };
            if stack.layers[i].skip || stack.layers[i].composition != Composition::Plane {
                continue;
            }

            let flipped = inventory.plane_mut(plane_id).flip(services.sink);
            match flipped {
                Ok(()) => {
                    if let Some(handle) = inventory.plane(plane_id).data_buffer() {
                        submission.buffers.push(SubmittedBuffer {
                            buffer: handle,
                            acquire: stack.layers[i].acquire_fence,
                            release: ReleaseSlot::Layer(i),
                        });
                    }
                }
                Err(_) => {
                    self.detach(services, inventory, i, plane_id, DetachReason::FlipRejected);
                    stack.layers[i].composition = Composition::Render;
                    continue;
                }
            }

            stack.layers[i].clear_hint = false;
        }

        services.tracer.commit(&CommitEvent {
            output: self.output,
            submitted: submission.buffers.len(),
            target_flipped,
        });

        submission
    }

    /// Flips the fallback render target through the pipe's primary plane.
    fn flip_target(
        &mut self,
        services: &mut Services<'_>,
        stack: &LayerStack,
    ) -> Option<SubmittedBuffer> {
        let target = &stack.target;
        let handle = target.buffer?;
        let device = self.target_ring.acquire(services.buffers, handle)?;

        // With planes in front of the target, its alpha must survive
        // scanout; a target that is the whole scene scans out opaque.
        let format = if self.zorder == ZOrder::OverlayTop || self.list.attached_count() == 0 {
            PixelFormat::Bgrx8888
        } else {
            PixelFormat::Bgra8888
        };

        let frame = Rect::new(0.0, 0.0, f64::from(target.width), f64::from(target.height));
        let entry = FlipEntry {
            kind: PlaneKind::Primary,
            index: self.output.0,
            pipe: self.output,
            buffer: handle,
            page_offset: device.page_offset,
            frame,
            crop: frame,
            format,
            stride: align_to(target.width, 32),
            transform: LayerTransform::Identity,
            force_bottom: self.zorder == ZOrder::OverlayTop,
        };
        services.sink.flip(&entry).ok()?;

        Some(SubmittedBuffer {
            buffer: handle,
            acquire: target.acquire_fence,
            release: ReleaseSlot::Target,
        })
    }

    /// Disables every attached plane and drops all mappings. Teardown.
    pub fn release(&mut self, services: &mut Services<'_>, inventory: &mut PlaneInventory) {
        for i in 0..self.list.len() {
            if let Some(id) = self.list.plane(i) {
                let plane = inventory.plane_mut(id);
                let _ = plane.disable(services.sink);
                plane.invalidate_data_buffer(services.buffers);
                self.list.detach(i, inventory);
            }
        }
        self.target_ring.invalidate(services.buffers);
    }

    pub(crate) fn detach(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        i: usize,
        plane_id: PlaneId,
        reason: DetachReason,
    ) {
        self.list.detach(i, inventory);
        services.tracer.detach(&DetachEvent {
            output: self.output,
            layer: i,
            plane: plane_id,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::stack::{BlendMode, Composition, ContentClass, PixelFormat, RenderTarget};

    const GEOMETRY: OutputGeometry = OutputGeometry {
        width: 800,
        height: 600,
        refresh_hz: 60,
    };

    fn layer(frame: Rect, skip: bool) -> StackLayer {
        StackLayer {
            buffer: Some(BufferHandle(1)),
            buffer_width: 800,
            buffer_height: 600,
            stride: 800,
            format: PixelFormat::Bgrx8888,
            source_crop: frame,
            frame,
            blending: BlendMode::None,
            transform: LayerTransform::Identity,
            visible_regions: 1,
            skip,
            protected: false,
            acquire_fence: None,
            composition: Composition::Render,
            clear_hint: false,
        }
    }

    #[test]
    fn screenshot_needs_full_coverage_and_skip() {
        let full = Rect::new(0.0, 0.0, 800.0, 600.0);
        let partial = Rect::new(0.0, 0.0, 400.0, 600.0);

        let stack = LayerStack {
            layers: vec![layer(full, false), layer(full, true)],
            target: RenderTarget::default(),
            topology_changed: true,
        };
        assert!(DisplayDevice::is_screenshot_active(&stack, GEOMETRY));

        let stack = LayerStack {
            layers: vec![layer(full, false), layer(partial, true)],
            target: RenderTarget::default(),
            topology_changed: true,
        };
        assert!(
            !DisplayDevice::is_screenshot_active(&stack, GEOMETRY),
            "partial capture layer is not a screenshot"
        );

        let stack = LayerStack {
            layers: vec![layer(full, false), layer(full, false)],
            target: RenderTarget::default(),
            topology_changed: true,
        };
        assert!(!DisplayDevice::is_screenshot_active(&stack, GEOMETRY));
    }

    #[test]
    fn protected_stack_is_never_a_screenshot() {
        let full = Rect::new(0.0, 0.0, 800.0, 600.0);
        let mut protected = layer(full, false);
        protected.protected = true;
        let stack = LayerStack {
            layers: vec![protected, layer(full, true)],
            target: RenderTarget::default(),
            topology_changed: true,
        };
        assert!(!DisplayDevice::is_screenshot_active(&stack, GEOMETRY));
    }

    #[test]
    fn blank_and_hotplug_flags() {
        let mut dev = DisplayDevice::new(OutputId::PANEL);
        assert!(!dev.is_blanked());

        assert!(dev.blank(true));
        assert!(dev.is_blanked());
        assert!(dev.blank(false));
        assert!(!dev.is_blanked());

        dev.on_hotplug(true);
        assert!(dev.hotplug_pending);
    }

    #[test]
    fn content_class_sanity() {
        // The overlay/color split in update_layers_data keys off the list's
        // derived class; make sure the derivation covers the formats the
        // update paths branch on.
        assert_eq!(PixelFormat::Nv12.content_class(), ContentClass::Video);
        assert_eq!(
            PixelFormat::Bgrx8888.content_class(),
            ContentClass::OpaqueColor
        );
    }
}
