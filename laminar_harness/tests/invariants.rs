// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scheduler's core invariants, checked over whole frame cycles.

use std::collections::HashSet;

use kurbo::Rect;

use laminar_core::composer::Composer;
use laminar_core::config::{InventoryConfig, PolicyConfig};
use laminar_core::output::OutputId;
use laminar_core::plane::PlaneKind;
use laminar_core::stack::Composition;

use laminar_harness::{TestRig, opaque_layer, register_stack, stack_of, video_layer};

fn composer(config: InventoryConfig) -> Composer {
    Composer::new(1, &config, PolicyConfig::default())
}

#[test]
fn admission_never_exceeds_plane_counts() {
    // Three overlay-eligible videos, two overlay engines.
    let mut composer = composer(InventoryConfig {
        sprite_planes: 0,
        primary_planes: 1,
        overlay_planes: 2,
        rgb_overlay_planes: 0,
    });
    let mut rig = TestRig::panel(1024, 768);

    let mut stack = stack_of(
        vec![
            video_layer(1, Rect::new(0.0, 0.0, 300.0, 300.0)),
            video_layer(2, Rect::new(350.0, 0.0, 650.0, 300.0)),
            video_layer(3, Rect::new(700.0, 0.0, 1000.0, 300.0)),
        ],
        100,
        1024,
        768,
    );
    register_stack(&mut rig, &stack);

    let mut services = rig.services();
    let summary = composer.prepare(OutputId::PANEL, &mut stack, &mut services);
    let _ = composer.commit(OutputId::PANEL, &mut stack, &mut services);
    drop(services);

    assert_eq!(summary.attached, 2, "grants bounded by the overlay count");
    let overlay_flips = rig.sink.flips_of(PlaneKind::Overlay);
    assert_eq!(overlay_flips.len(), 2);
    assert_eq!(
        stack.layers[2].composition,
        Composition::Render,
        "the overflow layer falls back"
    );
}

#[test]
fn no_two_layers_share_a_plane() {
    let mut composer = composer(InventoryConfig {
        sprite_planes: 2,
        primary_planes: 1,
        overlay_planes: 2,
        rgb_overlay_planes: 1,
    });
    let mut rig = TestRig::panel(1024, 768);

    let mut stack = stack_of(
        vec![
            video_layer(1, Rect::new(0.0, 0.0, 300.0, 300.0)),
            opaque_layer(2, Rect::new(0.0, 400.0, 512.0, 768.0)),
            opaque_layer(3, Rect::new(512.0, 400.0, 1024.0, 768.0)),
            video_layer(4, Rect::new(350.0, 0.0, 650.0, 300.0)),
        ],
        100,
        1024,
        768,
    );
    register_stack(&mut rig, &stack);

    let mut services = rig.services();
    let _ = composer.prepare(OutputId::PANEL, &mut stack, &mut services);
    let _ = composer.commit(OutputId::PANEL, &mut stack, &mut services);
    drop(services);

    let mut seen = HashSet::new();
    for entry in &rig.sink.flips {
        assert!(
            seen.insert((entry.kind, entry.index)),
            "plane {:?}:{} flipped twice in one frame",
            entry.kind,
            entry.index
        );
    }
    assert!(seen.len() >= 4, "expected every layer on its own plane");
}

#[test]
fn reclaimed_planes_disable_only_after_the_next_flip() {
    let mut composer = composer(InventoryConfig {
        sprite_planes: 0,
        primary_planes: 1,
        overlay_planes: 2,
        rgb_overlay_planes: 0,
    });
    let mut rig = TestRig::panel(1024, 768);

    // Frame 1: a video rides the overlay.
    let mut stack = stack_of(
        vec![video_layer(1, Rect::new(0.0, 0.0, 640.0, 480.0))],
        100,
        1024,
        768,
    );
    register_stack(&mut rig, &stack);
    let mut services = rig.services();
    let _ = composer.prepare(OutputId::PANEL, &mut stack, &mut services);
    let _ = composer.commit(OutputId::PANEL, &mut stack, &mut services);
    drop(services);
    assert_eq!(rig.sink.flips_of(PlaneKind::Overlay).len(), 1);
    assert!(rig.sink.disables.is_empty());

    // Frame 2: the video disappears. Classification reclaims the overlay,
    // but the hardware still displays frame 1 — no disable may happen
    // before the new frame has flipped.
    let mut stack = stack_of(
        vec![opaque_layer(2, Rect::new(0.0, 0.0, 1024.0, 768.0))],
        101,
        1024,
        768,
    );
    register_stack(&mut rig, &stack);

    let mut services = rig.services();
    let _ = composer.prepare(OutputId::PANEL, &mut stack, &mut services);
    drop(services);
    assert!(
        rig.sink.disables.is_empty(),
        "classification must not disable a plane still scanning out"
    );

    let flips_before_commit = rig.sink.flips.len();
    let mut services = rig.services();
    let _ = composer.commit(OutputId::PANEL, &mut stack, &mut services);
    drop(services);

    assert_eq!(
        rig.sink.disables,
        vec![(PlaneKind::Overlay, 0)],
        "the overlay turns off at the buffers-committed event"
    );
    assert!(
        rig.sink.flips.len() > flips_before_commit,
        "frame 2 flipped before the disable"
    );
}

#[test]
fn repeated_prepare_is_idempotent() {
    let mut composer = composer(InventoryConfig {
        sprite_planes: 2,
        primary_planes: 1,
        overlay_planes: 2,
        rgb_overlay_planes: 1,
    });
    let mut rig = TestRig::panel(1024, 768);

    let mut stack = stack_of(
        vec![
            video_layer(1, Rect::new(0.0, 0.0, 640.0, 480.0)),
            opaque_layer(2, Rect::new(0.0, 500.0, 1024.0, 768.0)),
        ],
        100,
        1024,
        768,
    );
    register_stack(&mut rig, &stack);

    let mut services = rig.services();
    let first = composer.prepare(OutputId::PANEL, &mut stack, &mut services);
    drop(services);
    let dispositions: Vec<_> = stack.layers.iter().map(|l| l.composition).collect();

    stack.topology_changed = false;
    let mut services = rig.services();
    let second = composer.prepare(OutputId::PANEL, &mut stack, &mut services);
    drop(services);

    assert!(!second.classified, "no reclassification without a signal");
    assert_eq!(second.attached, first.attached, "no attach/detach churn");
    let again: Vec<_> = stack.layers.iter().map(|l| l.composition).collect();
    assert_eq!(again, dispositions, "identical classification");
}

#[test]
fn every_unattached_layer_is_represented_in_fallback() {
    // No sprite or overlay capacity at all: everything must fall back.
    let mut composer = composer(InventoryConfig {
        sprite_planes: 0,
        primary_planes: 1,
        overlay_planes: 1,
        rgb_overlay_planes: 0,
    });
    let mut rig = TestRig::panel(1024, 768);

    let mut stack = stack_of(
        vec![
            video_layer(1, Rect::new(0.0, 0.0, 640.0, 480.0)),
            video_layer(2, Rect::new(650.0, 0.0, 1000.0, 300.0)),
            opaque_layer(3, Rect::new(0.0, 500.0, 512.0, 768.0)),
            opaque_layer(4, Rect::new(512.0, 500.0, 1024.0, 768.0)),
        ],
        100,
        1024,
        768,
    );
    register_stack(&mut rig, &stack);

    let mut services = rig.services();
    let summary = composer.prepare(OutputId::PANEL, &mut stack, &mut services);
    let submission = composer.commit(OutputId::PANEL, &mut stack, &mut services);
    drop(services);

    let unattached = stack.layers.len() - summary.attached;
    let rendered = stack
        .layers
        .iter()
        .filter(|l| l.composition == Composition::Render)
        .count();
    assert_eq!(
        rendered, unattached,
        "every layer without a plane goes to the render path"
    );
    assert!(rendered > 0, "capacity starvation must leave fallback work");
    assert_eq!(
        submission.buffers[0].release,
        laminar_core::frame::ReleaseSlot::Target,
        "the fallback target is part of the flip"
    );
}
