// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scheduling scenarios driven through the harness fakes.

use kurbo::Rect;

use laminar_core::buffer::BufferHandle;
use laminar_core::composer::Composer;
use laminar_core::config::{InventoryConfig, PolicyConfig};
use laminar_core::device::PrepareSummary;
use laminar_core::frame::{FrameSubmission, ReleaseSlot};
use laminar_core::output::OutputId;
use laminar_core::plane::PlaneKind;
use laminar_core::stack::{Composition, LayerStack, LayerTransform};

use laminar_harness::{TestRig, opaque_layer, register_stack, stack_of, video_layer};

fn composer(sprites: u32, primaries: u32, overlays: u32, rgb: u32) -> Composer {
    Composer::new(
        1,
        &InventoryConfig {
            sprite_planes: sprites,
            primary_planes: primaries,
            overlay_planes: overlays,
            rgb_overlay_planes: rgb,
        },
        PolicyConfig::default(),
    )
}

fn run_frame(
    composer: &mut Composer,
    rig: &mut TestRig,
    stack: &mut LayerStack,
) -> (PrepareSummary, FrameSubmission) {
    let mut services = rig.services();
    let summary = composer.prepare(OutputId::PANEL, stack, &mut services);
    let submission = composer.commit(OutputId::PANEL, stack, &mut services);
    (summary, submission)
}

fn full() -> Rect {
    Rect::new(0.0, 0.0, 1024.0, 768.0)
}

// ---------------------------------------------------------------------------
// Scenario A: a single opaque, unrotated, unscaled layer rides a sprite and
// the fallback renderer never runs.
// ---------------------------------------------------------------------------

#[test]
fn single_opaque_layer_rides_sprite_without_fallback() {
    let mut composer = composer(2, 1, 2, 1);
    let mut rig = TestRig::panel(1024, 768);
    let mut stack = stack_of(vec![opaque_layer(1, full())], 100, 1024, 768);
    register_stack(&mut rig, &stack);

    let (summary, submission) = run_frame(&mut composer, &mut rig, &mut stack);

    assert!(summary.classified);
    assert_eq!(summary.attached, 1);
    assert_eq!(stack.layers[0].composition, Composition::Plane);

    let sprite_flips = rig.sink.flips_of(PlaneKind::Sprite);
    assert_eq!(sprite_flips.len(), 1);
    assert!(
        rig.sink.flips_of(PlaneKind::Primary).is_empty(),
        "no render-target flip for a fully offloaded stack"
    );
    assert_eq!(submission.buffers.len(), 1);
    assert_eq!(submission.buffers[0].buffer, BufferHandle(1));
    assert_eq!(submission.buffers[0].release, ReleaseSlot::Layer(0));
}

// ---------------------------------------------------------------------------
// Scenario B: protected rotated video blocks on the rotation provider and
// never falls back.
// ---------------------------------------------------------------------------

#[test]
fn protected_rotated_video_blocks_until_rotation_completes() {
    let mut composer = composer(0, 1, 2, 1);
    let mut rig = TestRig::panel(1024, 768);

    let mut video = video_layer(5, Rect::new(0.0, 0.0, 1280.0, 720.0));
    video.protected = true;
    video.transform = LayerTransform::Rotate90;
    let mut stack = stack_of(vec![video], 100, 1024, 768);
    register_stack(&mut rig, &stack);
    // The rotated copy the provider will hand back.
    rig.buffers.register(BufferHandle(5 + 0x1000), 4096);

    let (summary, submission) = run_frame(&mut composer, &mut rig, &mut stack);

    assert_eq!(summary.attached, 1);
    assert_eq!(
        stack.layers[0].composition,
        Composition::Plane,
        "protected content must not fall back"
    );
    assert_eq!(
        rig.rotation.completions().len(),
        1,
        "pipeline waited on the provider"
    );
    assert!(rig.rotation.submissions().is_empty());

    let overlay_flips = rig.sink.flips_of(PlaneKind::Overlay);
    assert_eq!(overlay_flips.len(), 1);
    assert_eq!(
        overlay_flips[0].buffer,
        BufferHandle(5 + 0x1000),
        "the rotated copy is scanned out, not the source"
    );
    assert_eq!(overlay_flips[0].transform, LayerTransform::Rotate90);
    assert_eq!(submission.buffers.len(), 1);
}

#[test]
fn unprotected_rotated_video_defers_then_recovers() {
    let mut composer = composer(0, 1, 2, 1);
    let mut rig = TestRig::panel(1024, 768);

    let mut video = video_layer(5, Rect::new(0.0, 0.0, 1280.0, 720.0));
    video.transform = LayerTransform::Rotate90;
    let mut stack = stack_of(vec![video], 100, 1024, 768);
    register_stack(&mut rig, &stack);
    rig.buffers.register(BufferHandle(5 + 0x1000), 4096);

    // Frame 1: rotation pending → the layer stays on the fallback path.
    let (_, submission) = run_frame(&mut composer, &mut rig, &mut stack);
    assert_eq!(stack.layers[0].composition, Composition::Render);
    assert_eq!(rig.rotation.submissions().len(), 1, "request was issued");
    assert!(rig.sink.flips_of(PlaneKind::Overlay).is_empty());
    assert_eq!(
        submission.buffers[0].release,
        ReleaseSlot::Target,
        "fallback target carries the frame"
    );

    // The provider finishes between frames.
    let request = rig.rotation.submissions()[0];
    let rotated = laminar_harness::rotated_for(&request);
    rig.rotation.stage(&request, rotated);

    // Frame 2: the hardware path is retried and succeeds.
    stack.topology_changed = false;
    rig.sink.clear();
    let (_, submission) = run_frame(&mut composer, &mut rig, &mut stack);
    assert_eq!(stack.layers[0].composition, Composition::Plane);
    let overlay_flips = rig.sink.flips_of(PlaneKind::Overlay);
    assert_eq!(overlay_flips.len(), 1);
    assert_eq!(overlay_flips[0].buffer, rotated.buffer);
    assert_eq!(submission.buffers.len(), 1);
}

// ---------------------------------------------------------------------------
// Scenario C: an opaque sprite layer under blended video gets the clear
// hint; the video falls back.
// ---------------------------------------------------------------------------

#[test]
fn opaque_sprite_under_blended_video_needs_clear() {
    let mut composer = composer(2, 1, 2, 1);
    let mut rig = TestRig::panel(1024, 768);

    let bottom = opaque_layer(1, full());
    let mut top = video_layer(2, Rect::new(100.0, 100.0, 700.0, 500.0));
    top.blending = laminar_core::stack::BlendMode::Premultiplied;
    let mut stack = stack_of(vec![bottom, top], 100, 1024, 768);
    register_stack(&mut rig, &stack);

    let (summary, submission) = run_frame(&mut composer, &mut rig, &mut stack);

    assert_eq!(summary.attached, 1);
    assert_eq!(stack.layers[0].composition, Composition::Plane);
    assert!(
        stack.layers[0].clear_hint,
        "nothing else erases the sprite layer's stale region"
    );
    assert_eq!(
        stack.layers[1].composition,
        Composition::Render,
        "blended video cannot ride the overlay"
    );

    // Both composited: target flip (for the video) plus the sprite flip.
    assert_eq!(submission.buffers.len(), 2);
    assert_eq!(submission.buffers[0].release, ReleaseSlot::Target);
    assert_eq!(submission.buffers[1].release, ReleaseSlot::Layer(0));
}

// ---------------------------------------------------------------------------
// Scenario D: static UI over a skip-flagged video enters smart composition
// after one stable frame.
// ---------------------------------------------------------------------------

#[test]
fn static_ui_over_video_enters_smart_composition() {
    let mut composer = composer(0, 1, 2, 1);
    let mut rig = TestRig::panel(1024, 768);

    let mut video = video_layer(10, Rect::new(0.0, 0.0, 1024.0, 576.0));
    video.skip = true;
    let ui: Vec<_> = (0u32..5)
        .map(|i| {
            let y = 600.0 + f64::from(i) * 30.0;
            opaque_layer(20 + u64::from(i), Rect::new(0.0, y, 1024.0, y + 30.0))
        })
        .collect();

    let mut layers = vec![video];
    layers.extend(ui);
    let mut stack = stack_of(layers, 100, 1024, 768);
    register_stack(&mut rig, &stack);

    // Frame 1: every buffer is a first sighting; cache stays out.
    let (summary, _) = run_frame(&mut composer, &mut rig, &mut stack);
    assert!(!summary.smart_active);

    // Frame 2: only the video buffer rotates.
    stack.topology_changed = false;
    let new_video = BufferHandle(11);
    rig.buffers.register_video(
        new_video,
        4096,
        laminar_core::buffer::VideoMetadata::default(),
    );
    stack.layers[0].buffer = Some(new_video);

    let (summary, submission) = run_frame(&mut composer, &mut rig, &mut stack);
    assert!(summary.smart_active, "stable UI enters cache mode");
    for layer in &stack.layers[1..] {
        assert_eq!(
            layer.composition,
            Composition::Cached,
            "UI layers are marked already composited"
        );
    }
    assert_eq!(
        stack.layers[0].composition,
        Composition::Render,
        "the video still renders each frame"
    );

    // The target still flips (it holds the composited UI).
    assert_eq!(submission.buffers.len(), 1);
    assert_eq!(submission.buffers[0].release, ReleaseSlot::Target);

    // Frame 3: a UI buffer changes; the cache leaves.
    rig.buffers.register(BufferHandle(30), 4096);
    stack.layers[2].buffer = Some(BufferHandle(30));
    let (summary, _) = run_frame(&mut composer, &mut rig, &mut stack);
    assert!(!summary.smart_active, "UI update leaves cache mode");
    assert_eq!(stack.layers[1].composition, Composition::Render);
}

// ---------------------------------------------------------------------------
// Scenario E: a topology change reclassifies exactly once, in prepare.
// ---------------------------------------------------------------------------

#[test]
fn topology_change_reclassifies_once_in_prepare() {
    let mut composer = composer(2, 1, 2, 1);
    let mut rig = TestRig::panel(1024, 768);

    let mut stack = stack_of(
        vec![
            opaque_layer(1, Rect::new(0.0, 0.0, 512.0, 768.0)),
            opaque_layer(2, Rect::new(512.0, 0.0, 1024.0, 768.0)),
        ],
        100,
        1024,
        768,
    );
    register_stack(&mut rig, &stack);

    let (summary, _) = run_frame(&mut composer, &mut rig, &mut stack);
    assert!(summary.classified);

    // Steady state: no reclassification.
    stack.topology_changed = false;
    let (summary, _) = run_frame(&mut composer, &mut rig, &mut stack);
    assert!(!summary.classified);

    // A new layer appears mid-stream.
    stack
        .layers
        .push(opaque_layer(3, Rect::new(0.0, 0.0, 100.0, 100.0)));
    stack.topology_changed = true;
    register_stack(&mut rig, &stack);

    let mut services = rig.services();
    let summary = composer.prepare(OutputId::PANEL, &mut stack, &mut services);
    assert!(summary.classified, "insertion reclassifies on prepare");

    // Commit never classifies: the classification is unchanged afterwards.
    let attached_before = summary.attached;
    let _ = composer.commit(OutputId::PANEL, &mut stack, &mut services);
    drop(services);

    stack.topology_changed = false;
    let (summary, _) = run_frame(&mut composer, &mut rig, &mut stack);
    assert!(!summary.classified, "nothing reclassifies after the insert");
    assert_eq!(summary.attached, attached_before);
}
