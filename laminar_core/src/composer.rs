// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The composer: output-indexed entry points over the device table.
//!
//! One [`Composer`] owns the plane inventory and a [`PanelDevice`] per
//! output, and routes the public entry points by output index. It also
//! fires the buffers-committed event at the end of every commit, which is
//! what finally turns reclaimed planes off (see
//! [`PlaneInventory`](crate::inventory::PlaneInventory)).

use alloc::vec::Vec;

use crate::config::{InventoryConfig, PolicyConfig};
use crate::device::{PanelDevice, PrepareSummary, Services};
use crate::frame::FrameSubmission;
use crate::inventory::PlaneInventory;
use crate::output::{ModeQuery, OutputGeometry, OutputId};
use crate::stack::LayerStack;

/// Top-level scheduler instance: inventory plus one device per output.
#[derive(Debug)]
pub struct Composer {
    inventory: PlaneInventory,
    devices: Vec<PanelDevice>,
    policy: PolicyConfig,
}

impl Composer {
    /// Creates a composer driving `outputs` outputs with the given plane
    /// counts and policy.
    #[must_use]
    pub fn new(outputs: u32, inventory: &InventoryConfig, policy: PolicyConfig) -> Self {
        Self {
            inventory: PlaneInventory::new(inventory),
            devices: (0..outputs).map(|i| PanelDevice::new(OutputId(i))).collect(),
            policy,
        }
    }

    fn device_mut(&mut self, output: OutputId) -> &mut PanelDevice {
        self.devices
            .get_mut(output.0 as usize)
            .unwrap_or_else(|| panic!("no device for {output:?}"))
    }

    /// Runs the prepare half of the frame cycle for one output, writing
    /// each layer's disposition back into `stack`.
    pub fn prepare(
        &mut self,
        output: OutputId,
        stack: &mut LayerStack,
        services: &mut Services<'_>,
    ) -> PrepareSummary {
        let inventory = &mut self.inventory;
        let policy = &self.policy;
        let device = self
            .devices
            .get_mut(output.0 as usize)
            .unwrap_or_else(|| panic!("no device for {output:?}"));
        device.prepare(services, inventory, policy, stack)
    }

    /// Runs the commit half: flips, then the buffers-committed event.
    pub fn commit(
        &mut self,
        output: OutputId,
        stack: &mut LayerStack,
        services: &mut Services<'_>,
    ) -> FrameSubmission {
        let inventory = &mut self.inventory;
        let device = self
            .devices
            .get_mut(output.0 as usize)
            .unwrap_or_else(|| panic!("no device for {output:?}"));

        let flipped = !device.base().is_blanked() && !device.base().hotplug_pending;
        let submission = device.commit(services, inventory, stack);

        // Only a completed flip proves the reclaimed planes' last frame is
        // off screen.
        if flipped {
            inventory.on_frame_committed(services.sink, services.buffers);
        }

        submission
    }

    /// Notes a hotplug event; the output's next prepare reclassifies.
    pub fn on_hotplug(&mut self, output: OutputId, connected: bool) {
        self.device_mut(output).on_hotplug(connected);
    }

    /// Blanks or unblanks an output. While blanked, prepare and commit are
    /// no-ops.
    pub fn blank(&mut self, output: OutputId, blank: bool) -> bool {
        self.device_mut(output).blank(blank)
    }

    /// Surfaces the output's active geometry, if connected.
    #[must_use]
    pub fn display_config(
        &self,
        output: OutputId,
        modes: &dyn ModeQuery,
    ) -> Option<OutputGeometry> {
        modes.is_connected(output).then(|| modes.geometry(output)).flatten()
    }

    /// Tears down one output: disables its planes, drops its mappings.
    pub fn release(&mut self, output: OutputId, services: &mut Services<'_>) {
        let inventory = &mut self.inventory;
        let device = self
            .devices
            .get_mut(output.0 as usize)
            .unwrap_or_else(|| panic!("no device for {output:?}"));
        device.release(services, inventory);
    }

    /// Read access to the inventory (diagnostics and tests).
    #[must_use]
    pub fn inventory(&self) -> &PlaneInventory {
        &self.inventory
    }

    /// Read access to a device (diagnostics and tests).
    #[must_use]
    pub fn device(&self, output: OutputId) -> &PanelDevice {
        self.devices
            .get(output.0 as usize)
            .unwrap_or_else(|| panic!("no device for {output:?}"))
    }
}
