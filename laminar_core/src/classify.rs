// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer eligibility rules.
//!
//! Each candidate hardware path gets a predicate answering "can this stack
//! layer ride that path". The panel device evaluates them in priority
//! order — overlay, mini-overlay, sprite, and (during the revisit pass)
//! primary — and attaches the first that accepts and has a free plane.
//!
//! The predicates dispatch on layer properties only. They are pure over
//! the stack and list; anything that needs a collaborator (the
//! pipeline-forced flag read from video metadata) is computed by the
//! caller and passed in.

use crate::config::PolicyConfig;
use crate::list::CompositionLayerList;
use crate::output::OutputGeometry;
use crate::stack::{BlendMode, Composition, ContentClass, LayerStack};

/// Shared read-only inputs to the eligibility predicates.
#[derive(Debug)]
pub struct ClassifyContext<'a> {
    /// The incoming frame stack.
    pub stack: &'a LayerStack,
    /// The rebuilt composition layer list for the same stack.
    pub list: &'a CompositionLayerList,
    /// Policy thresholds.
    pub policy: &'a PolicyConfig,
    /// Active geometry of the output being classified.
    pub geometry: OutputGeometry,
    /// Whether an external output is connected.
    pub external_connected: bool,
}

/// Outcome of the overlay predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayVerdict {
    /// The layer can ride an overlay engine.
    pub accept: bool,
    /// A layer above intersects this one with blending; the fallback
    /// renderer must clear the region beneath the overlay.
    pub needs_clear: bool,
}

/// Outcome of the sprite predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteVerdict {
    /// The layer can ride a sprite-class plane.
    pub accept: bool,
    /// Blending is `None`, so nothing erases the layer's previous region
    /// in the render target; the renderer must clear it.
    pub needs_clear: bool,
}

/// Whether the layer can ride a video overlay engine.
///
/// `forced` carries the protected/pipeline-forced status the device read
/// from the layer and its video metadata; forced content always routes to
/// overlay (skipping hardware is not an option for it).
pub fn overlay_eligible(ctx: &ClassifyContext<'_>, index: usize, forced: bool) -> OverlayVerdict {
    let layer = &ctx.stack.layers[index];
    let count = ctx.stack.layers.len();

    // The region beneath the overlay needs clearing when a blended layer
    // above overlaps it; computed up front since the forced path wants it
    // too.
    let covered_by_blend = ctx.stack.layers[index + 1..].iter().any(|above| {
        above.blending != BlendMode::None && above.intersects(layer)
    });

    if ctx.list.class(index) != ContentClass::Video {
        return OverlayVerdict {
            accept: false,
            needs_clear: false,
        };
    }

    if forced {
        return OverlayVerdict {
            accept: true,
            needs_clear: covered_by_blend,
        };
    }

    let mut accept = true;

    // Overlay engines cannot blend against what is beneath them.
    if layer.blending != BlendMode::None {
        accept = false;
    }

    if layer.skip {
        accept = false;
    }

    // Partially occluded content would scan out the occluded pixels too.
    if layer.visible_regions > 1 {
        accept = false;
    }

    // A video layer sandwiched over other content would hide whatever it
    // covers, since the overlay ignores z-ordering against the render
    // target below it.
    if accept && index > 0 && index < count.saturating_sub(1) {
        let covers_below = ctx.stack.layers[..index]
            .iter()
            .any(|below| layer.intersects(below));
        if covers_below {
            accept = false;
        }
    }

    OverlayVerdict {
        accept,
        needs_clear: accept && covered_by_blend,
    }
}

/// Whether the layer can ride an overlay engine as an RGB mini-overlay.
///
/// A narrow secondary offload: small, unrotated, unscaled color content
/// near the top of a video-free stack on the panel alone.
pub fn mini_overlay_eligible(ctx: &ClassifyContext<'_>, index: usize) -> bool {
    let layer = &ctx.stack.layers[index];
    let count = ctx.stack.layers.len();

    // A lone layer is better served by the primary plane path.
    if count < 2 {
        return false;
    }

    if ctx.external_connected || ctx.list.video_count() > 0 {
        return false;
    }

    if layer.skip || !layer.transform.is_identity() {
        return false;
    }

    if ctx.list.class(index) == ContentClass::Video {
        return false;
    }

    // No scaling: the engine is borrowed for 1:1 scanout only.
    if layer.frame.width() != f64::from(layer.buffer_width)
        || layer.frame.height() != f64::from(layer.buffer_height)
    {
        return false;
    }

    // Larger content is cheaper to leave to the renderer.
    let src_area = u64::from(layer.buffer_width) * u64::from(layer.buffer_height);
    if src_area > ctx.geometry.area() >> ctx.policy.mini_overlay_area_shift {
        return false;
    }

    // Only the top two stack positions qualify.
    if index + 2 < count {
        return false;
    }

    // The top layer without blending composes trivially above everything.
    if index == count - 1 && layer.blending == BlendMode::None {
        return true;
    }

    // Otherwise it must not overlap any other layer.
    ctx.stack
        .layers
        .iter()
        .enumerate()
        .all(|(i, other)| i == index || !layer.intersects(other))
}

/// Whether the layer can ride a sprite plane.
pub fn sprite_eligible(ctx: &ClassifyContext<'_>, index: usize) -> SpriteVerdict {
    let layer = &ctx.stack.layers[index];
    let reject = SpriteVerdict {
        accept: false,
        needs_clear: false,
    };

    if ctx.list.class(index) == ContentClass::Video {
        return reject;
    }

    if layer.skip {
        return reject;
    }

    // Sprites blend with nothing or premultiplied alpha only.
    if layer.blending == BlendMode::Coverage {
        return reject;
    }

    if !layer.transform.is_identity() {
        return reject;
    }

    // No scaling: source and destination sizes must match.
    if layer.is_scaled() {
        return reject;
    }

    SpriteVerdict {
        accept: true,
        needs_clear: layer.blending == BlendMode::None,
    }
}

/// Whether the layer can be promoted to the pipe's primary plane.
///
/// Only the top-of-stack layer qualifies, only when every other layer
/// already has a hardware path, and only when it independently satisfies
/// the sprite criteria.
pub fn primary_eligible(ctx: &ClassifyContext<'_>, index: usize) -> SpriteVerdict {
    let reject = SpriteVerdict {
        accept: false,
        needs_clear: false,
    };

    if index + 1 != ctx.stack.layers.len() {
        return reject;
    }

    let others_handled = ctx
        .stack
        .layers
        .iter()
        .enumerate()
        .all(|(i, other)| i == index || other.composition == Composition::Plane);
    if !others_handled {
        return reject;
    }

    sprite_eligible(ctx, index)
}
