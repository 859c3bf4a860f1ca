// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rotated-buffer coordination with the external rotation service.
//!
//! Overlay engines scan out unrotated memory, so a video layer with a
//! non-identity transform needs a rotated copy of each decoded frame. Two
//! producers exist for that copy:
//!
//! - The **video pipeline** rotates ahead of time and stamps the buffer's
//!   shared metadata with the transform it produced
//!   ([`VideoMetadata::client_transform`]). When the stamp matches the
//!   requested transform by value, the copy is ready with zero extra
//!   latency — [`RotationProvider::poll`] returns
//!   [`RotationPoll::Ready`].
//! - Otherwise the scheduler [`submit`](RotationProvider::submit)s a
//!   [`RotationRequest`] and the provider produces the copy
//!   asynchronously on its own execution context, signalling completion by
//!   updating the stamp. The layer stays on the fallback path until a later
//!   frame's poll succeeds.
//!
//! Protected content is the exception: it must never reach the fallback
//! renderer, so the scheduler calls the bounded-blocking
//! [`complete`](RotationProvider::complete) instead and eats the wait.
//!
//! [`VideoMetadata::client_transform`]: crate::buffer::VideoMetadata::client_transform

use kurbo::Rect;

use crate::buffer::BufferHandle;
use crate::stack::LayerTransform;

/// Pitch alignment of rotated buffers, in pixels.
///
/// The rotation engine writes rows padded to this multiple; the real
/// content sits at the far edge of the padding on the rotated axes.
pub const ROTATION_PITCH_ALIGN: u32 = 16;

/// A request for a rotated copy of a source buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RotationRequest {
    /// The unrotated source buffer.
    pub source: BufferHandle,
    /// The transform to apply.
    pub transform: LayerTransform,
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
}

/// A rotated copy produced by the provider or the video pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RotatedBuffer {
    /// The rotated buffer.
    pub buffer: BufferHandle,
    /// Buffer width in pixels (already axis-swapped for 90°/270°).
    pub width: u32,
    /// Buffer height in pixels.
    pub height: u32,
}

/// Result of a non-blocking readiness check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RotationPoll {
    /// A rotated copy matching the request is ready.
    Ready(RotatedBuffer),
    /// No matching copy yet; retry on a later frame.
    Pending,
}

/// Consumed interface to the asynchronous rotation service.
///
/// Implementations communicate through the buffers' shared metadata
/// region. Stamps are compared by value — the region is written from a
/// different execution context and identity comparisons would race.
pub trait RotationProvider {
    /// Checks, without blocking, whether a rotated copy matching `request`
    /// exists.
    fn poll(&mut self, request: &RotationRequest) -> RotationPoll;

    /// Stamps `request` into the source buffer's shared metadata and kicks
    /// off asynchronous production of the rotated copy. Never blocks.
    fn submit(&mut self, request: &RotationRequest);

    /// Produces the rotated copy synchronously, waiting a bounded time.
    ///
    /// Only used for content that cannot fall back to the renderer.
    /// Returns `None` when the copy could not be produced in time.
    fn complete(&mut self, request: &RotationRequest) -> Option<RotatedBuffer>;
}

/// Adjusts a source crop for reading out of a rotated buffer.
///
/// For 90°/270° the crop axes swap. The rotation engine pads each rotated
/// row to [`ROTATION_PITCH_ALIGN`]; the padding sits before the content on
/// the axes the rotation reversed, so the crop origin shifts by the
/// padding amount.
#[must_use]
pub fn rotated_crop(crop: Rect, transform: LayerTransform) -> Rect {
    let (x, y, w, h) = if transform.swaps_axes() {
        (crop.y0, crop.x0, crop.height(), crop.width())
    } else {
        (crop.x0, crop.y0, crop.width(), crop.height())
    };

    let pad = |v: f64| {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "crop extents are small non-negative pixel counts"
        )]
        let px = v as u32;
        f64::from(crate::buffer::align_to(px, ROTATION_PITCH_ALIGN) - px)
    };

    let (dx, dy) = match transform {
        LayerTransform::Identity => (0.0, 0.0),
        LayerTransform::Rotate90 => (pad(w), 0.0),
        LayerTransform::Rotate180 => (pad(w), pad(h)),
        LayerTransform::Rotate270 => (0.0, pad(h)),
    };

    Rect::new(x + dx, y + dy, x + dx + w, y + dy + h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_crop_is_unchanged() {
        let crop = Rect::new(0.0, 0.0, 720.0, 480.0);
        assert_eq!(rotated_crop(crop, LayerTransform::Identity), crop);
    }

    #[test]
    fn quarter_turns_swap_axes() {
        let crop = Rect::new(0.0, 0.0, 720.0, 480.0);
        let r = rotated_crop(crop, LayerTransform::Rotate90);
        assert_eq!(r.width(), 480.0);
        assert_eq!(r.height(), 720.0);
    }

    #[test]
    fn rotate90_skips_row_padding() {
        // 480 is 16-aligned, so no padding; 470 pads by 10.
        let crop = Rect::new(0.0, 0.0, 720.0, 470.0);
        let r = rotated_crop(crop, LayerTransform::Rotate90);
        assert_eq!(r.x0, 10.0, "crop origin skips the rotation padding");
        assert_eq!(r.y0, 0.0);
        assert_eq!(r.width(), 470.0);
    }

    #[test]
    fn rotate180_pads_both_axes() {
        let crop = Rect::new(0.0, 0.0, 700.0, 470.0);
        let r = rotated_crop(crop, LayerTransform::Rotate180);
        assert_eq!(r.x0, 4.0, "700 pads to 704");
        assert_eq!(r.y0, 10.0, "470 pads to 480");
        assert_eq!(r.width(), 700.0);
        assert_eq!(r.height(), 470.0);
    }
}
