// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The panel device: classification policy and smart composition for the
//! primary on-panel output.
//!
//! [`PanelDevice`] wraps the base [`DisplayDevice`] and adds the pieces
//! that are policy rather than mechanism: when to run a classification
//! pass, which hardware path each layer gets, the revisit/promotion pass
//! for the primary plane, and the smart composition cache.

use crate::classify::{
    ClassifyContext, mini_overlay_eligible, overlay_eligible, primary_eligible, sprite_eligible,
};
use crate::config::PolicyConfig;
use crate::frame::FrameSubmission;
use crate::inventory::PlaneInventory;
use crate::output::{OutputGeometry, OutputId};
use crate::plane::{PlaneId, PlaneKind};
use crate::smart::{SmartCache, SmartTransition};
use crate::stack::{Composition, ContentClass, LayerStack};
use crate::trace::{AttachEvent, ClassifyEvent, ClassifyReason, DetachReason, SmartEvent};

use super::{DisplayDevice, PrepareSummary, Services};

/// Per-output device for the primary on-panel output.
#[derive(Debug)]
pub struct PanelDevice {
    dev: DisplayDevice,
    smart: SmartCache,
}

impl PanelDevice {
    /// Creates the panel device for `output`.
    #[must_use]
    pub fn new(output: OutputId) -> Self {
        Self {
            dev: DisplayDevice::new(output),
            smart: SmartCache::new(),
        }
    }

    /// The output this device drives.
    #[must_use]
    pub fn output(&self) -> OutputId {
        self.dev.output()
    }

    /// Access to the base device (blank/hotplug state, z-order).
    #[must_use]
    pub fn base(&self) -> &DisplayDevice {
        &self.dev
    }

    /// Enters or leaves the blanked state.
    pub fn blank(&mut self, blank: bool) -> bool {
        self.dev.blank(blank)
    }

    /// Notes a hotplug/mode event for the next prepare.
    pub fn on_hotplug(&mut self, connected: bool) {
        self.dev.on_hotplug(connected);
    }

    /// The prepare half of the frame cycle: classify when needed, then
    /// update every attached plane's data buffer, then consult the smart
    /// composition cache. Writes each layer's disposition back into
    /// `stack`.
    pub fn prepare(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        policy: &PolicyConfig,
        stack: &mut LayerStack,
    ) -> PrepareSummary {
        if self.dev.is_blanked() {
            return PrepareSummary::default();
        }

        for layer in &mut stack.layers {
            layer.composition = Composition::Render;
            layer.clear_hint = false;
        }

        let protected_now = stack.any_protected();
        let reason = if stack.topology_changed || stack.layers.len() != self.dev.list.len() {
            Some(ClassifyReason::Topology)
        } else if self.dev.hotplug_pending {
            Some(ClassifyReason::Hotplug)
        } else if protected_now != self.dev.had_protected {
            Some(ClassifyReason::Protection)
        } else {
            None
        };

        if let Some(reason) = reason {
            self.classify_pass(services, inventory, policy, stack, reason);
            self.dev.hotplug_pending = false;
        }
        self.dev.had_protected = protected_now;

        let handled = self.dev.update_layers_data(services, inventory, policy, stack);
        if !handled {
            // Something fell off its plane; see if the survivors now allow
            // a primary promotion (or require a primary demotion).
            self.revisit(services, inventory, policy, stack, false);
        }

        // Feed the frame's buffer identities to the cache.
        for i in 0..self.dev.list.len().min(stack.layers.len()) {
            let buffer = stack.layers[i].buffer;
            self.dev.list.note_buffer(i, buffer);
        }
        let video_slot = self.dev.list.sole_video_index();
        let changes = self.dev.list.drain_changes();
        let transition = self.smart.observe(&changes, video_slot, stack.layers.len(), policy);
        match transition {
            SmartTransition::Entered => services.tracer.smart(&SmartEvent {
                output: self.dev.output(),
                entered: true,
            }),
            SmartTransition::Left => services.tracer.smart(&SmartEvent {
                output: self.dev.output(),
                entered: false,
            }),
            SmartTransition::None => {}
        }
        self.dev.smart_active = self.smart.active();
        if self.dev.smart_active {
            for (i, layer) in stack.layers.iter_mut().enumerate() {
                if Some(i) != video_slot && layer.composition == Composition::Render {
                    layer.composition = Composition::Cached;
                }
            }
        }

        PrepareSummary {
            classified: reason.is_some(),
            attached: self.dev.list.attached_count(),
            fallback: stack
                .layers
                .iter()
                .filter(|l| l.composition == Composition::Render)
                .count(),
            smart_active: self.dev.smart_active,
        }
    }

    /// The commit half of the frame cycle.
    pub fn commit(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        stack: &mut LayerStack,
    ) -> FrameSubmission {
        self.dev.commit(services, inventory, stack)
    }

    /// Disables every attached plane and drops all mappings.
    pub fn release(&mut self, services: &mut Services<'_>, inventory: &mut PlaneInventory) {
        self.dev.release(services, inventory);
    }

    /// Full classification: reclaim everything, rebuild the list, attach
    /// planes greedily in priority order, then revisit.
    fn classify_pass(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        policy: &PolicyConfig,
        stack: &mut LayerStack,
        reason: ClassifyReason,
    ) {
        services.tracer.classify(&ClassifyEvent {
            output: self.dev.output(),
            layers: stack.layers.len(),
            reason,
        });

        self.dev.list.invalidate_planes(inventory);
        self.dev.list.rebuild(stack);

        let geometry = self.geometry(services, stack);
        let external = self.external_connected(services);

        if !DisplayDevice::is_screenshot_active(stack, geometry) {
            for i in 0..stack.layers.len() {
                if !DisplayDevice::is_hwc_layer(&stack.layers[i]) {
                    continue;
                }

                // Protected streams and pipeline-forced streams must reach
                // hardware; remember that for the buffer-update phase.
                let forced = stack.layers[i].protected
                    || self.pipeline_forces_hardware(services, stack, i);
                if forced {
                    self.dev.list.flags_mut(i).force_hardware = true;
                }

                self.try_attach_standard(
                    services, inventory, policy, stack, i, geometry, external, forced,
                );
            }
        }

        self.revisit(services, inventory, policy, stack, true);

        // Stack facts the smart composition cache conditions on. The sole
        // video layer is excluded from the cache's bookkeeping entirely,
        // its skip flag included (the compositor toggles it mid-stream).
        let video_slot = self.dev.list.sole_video_index();
        let has_skip = stack
            .layers
            .iter()
            .enumerate()
            .any(|(i, l)| l.skip && Some(i) != video_slot);
        let has_render_color = stack.layers.iter().enumerate().any(|(i, l)| {
            l.composition == Composition::Render
                && self.dev.list.class(i) != ContentClass::Video
        });
        self.smart.on_topology(has_render_color, has_skip);
    }

    /// Evaluates rules 1–3 (overlay, mini-overlay, sprite) for one layer
    /// and attaches the first that accepts and has a grantable plane.
    fn try_attach_standard(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        policy: &PolicyConfig,
        stack: &mut LayerStack,
        i: usize,
        geometry: OutputGeometry,
        external: bool,
        forced: bool,
    ) {
        let (overlay, mini, sprite) = {
            let ctx = ClassifyContext {
                stack,
                list: &self.dev.list,
                policy,
                geometry,
                external_connected: external,
            };
            (
                overlay_eligible(&ctx, i, forced),
                mini_overlay_eligible(&ctx, i),
                sprite_eligible(&ctx, i),
            )
        };

        if overlay.accept {
            if let Some(id) = inventory.acquire(PlaneKind::Overlay) {
                self.attach(services, inventory, stack, i, id);
                if overlay.needs_clear {
                    self.dev.list.flags_mut(i).needs_clear = true;
                }
            }
            // An exhausted overlay pool is not recoverable by the other
            // paths — video content falls back.
            return;
        }

        if mini {
            if let Some(id) = inventory.acquire(PlaneKind::RgbOverlay) {
                self.attach(services, inventory, stack, i, id);
                return;
            }
        }

        if sprite.accept {
            if let Some(id) = inventory.acquire(PlaneKind::Sprite) {
                self.attach(services, inventory, stack, i, id);
                if sprite.needs_clear {
                    self.dev.list.flags_mut(i).needs_clear = true;
                }
            }
        }
    }

    /// Revisit pass: enforce the protected-content rule and manage primary
    /// plane promotion/demotion.
    ///
    /// Runs at the end of every classification pass and again after a
    /// partially-failed buffer update (content can change eligibility
    /// frame to frame).
    fn revisit(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        policy: &PolicyConfig,
        stack: &mut LayerStack,
        topology_pass: bool,
    ) {
        let geometry = self.geometry(services, stack);
        let external = self.external_connected(services);

        for i in 0..stack.layers.len().min(self.dev.list.len()) {
            if !DisplayDevice::is_hwc_layer(&stack.layers[i]) {
                continue;
            }

            // Protected content must never reach the fallback renderer,
            // plane or not.
            if self.dev.list.is_protected(i) {
                stack.layers[i].composition = Composition::Plane;
            }

            match self.dev.list.plane(i) {
                Some(id) if id.kind == PlaneKind::Primary => {
                    let verdict = {
                        let ctx = ClassifyContext {
                            stack,
                            list: &self.dev.list,
                            policy,
                            geometry,
                            external_connected: external,
                        };
                        primary_eligible(&ctx, i)
                    };
                    if !verdict.accept {
                        // The stack stopped qualifying (e.g. a sibling fell
                        // off its plane); demote and re-run the ordinary
                        // rules for this layer.
                        self.dev
                            .detach(services, inventory, i, id, DetachReason::Reclassified);
                        stack.layers[i].composition = Composition::Render;
                        let forced = self.dev.list.flags(i).force_hardware;
                        self.try_attach_standard(
                            services, inventory, policy, stack, i, geometry, external, forced,
                        );
                    }
                }
                Some(_) => {}
                None => {
                    let verdict = {
                        let ctx = ClassifyContext {
                            stack,
                            list: &self.dev.list,
                            policy,
                            geometry,
                            external_connected: external,
                        };
                        primary_eligible(&ctx, i)
                    };
                    if verdict.accept {
                        if let Some(id) = inventory.acquire_primary(self.dev.output()) {
                            self.attach(services, inventory, stack, i, id);
                        }
                    }
                }
            }
        }

        if topology_pass {
            self.dev.update_zorder(inventory);
        }
    }

    /// Positions and binds an acquired plane, attaches it to the layer.
    fn attach(
        &mut self,
        services: &mut Services<'_>,
        inventory: &mut PlaneInventory,
        stack: &mut LayerStack,
        i: usize,
        id: PlaneId,
    ) {
        let plane = inventory.plane_mut(id);
        plane.set_pipe(self.dev.output());
        plane.set_position(stack.layers[i].frame);
        self.dev.list.attach(i, id);
        stack.layers[i].composition = Composition::Plane;
        services.tracer.attach(&AttachEvent {
            output: self.dev.output(),
            layer: i,
            plane: id,
        });
    }

    /// Whether the video pipeline forces this layer onto hardware.
    fn pipeline_forces_hardware(
        &self,
        services: &mut Services<'_>,
        stack: &LayerStack,
        i: usize,
    ) -> bool {
        let layer = &stack.layers[i];
        if !layer.format.has_video_metadata() {
            return false;
        }
        let Some(buffer) = layer.buffer else {
            return false;
        };
        services
            .buffers
            .video_metadata(buffer)
            .is_some_and(|meta| {
                meta.protected || meta.force_output == crate::buffer::ForceOutput::Hardware
            })
    }

    fn geometry(&self, services: &Services<'_>, stack: &LayerStack) -> OutputGeometry {
        services
            .modes
            .geometry(self.dev.output())
            .unwrap_or(OutputGeometry {
                width: stack.target.width,
                height: stack.target.height,
                refresh_hz: 60,
            })
    }

    fn external_connected(&self, services: &Services<'_>) -> bool {
        OutputId::EXTERNAL != self.dev.output() && services.modes.is_connected(OutputId::EXTERNAL)
    }
}
