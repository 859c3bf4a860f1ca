// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame input layer stack.
//!
//! Once per refresh the window compositor hands the scheduler a
//! [`LayerStack`]: the visible layers in back-to-front order plus the
//! fallback render target it will composite unhandled layers into. The
//! stack is an *input/output* structure — [`prepare`] reads the layer
//! properties and writes back each layer's [`Composition`] disposition and
//! clear hint, which the compositor consumes to decide what it still has to
//! render itself.
//!
//! All rectangles are [`kurbo::Rect`] in output-space pixels. Source crops
//! are fractional (video pipelines produce sub-pixel crops); destination
//! frames are expected to be integral but are not required to be.
//!
//! [`prepare`]: crate::composer::Composer::prepare

use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::buffer::BufferHandle;

/// Blending applied when a layer is composited over the layers below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// No blending; the layer fully replaces what is underneath.
    #[default]
    None,
    /// Source-over with premultiplied alpha.
    Premultiplied,
    /// Source-over with per-pixel coverage alpha.
    Coverage,
}

/// Rotation requested for a layer's content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayerTransform {
    /// No rotation.
    #[default]
    Identity,
    /// 90° clockwise.
    Rotate90,
    /// 180°.
    Rotate180,
    /// 270° clockwise.
    Rotate270,
}

impl LayerTransform {
    /// Returns whether this is the identity transform.
    #[inline]
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Returns whether the transform exchanges the horizontal and vertical
    /// axes (90° and 270°).
    #[inline]
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::Rotate90 | Self::Rotate270)
    }
}

/// Pixel format of a layer's data buffer.
///
/// The set mirrors what the display engine can scan out: a handful of RGB
/// formats for sprite-class planes and the packed/planar YUV family the
/// video decoder produces for overlay-class planes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 16-bit RGB, no alpha.
    Rgb565,
    /// 32-bit BGRA with alpha.
    Bgra8888,
    /// 32-bit BGRX, alpha ignored.
    Bgrx8888,
    /// 32-bit RGBA with alpha.
    Rgba8888,
    /// 32-bit RGBX, alpha ignored.
    Rgbx8888,
    /// Planar YUV 4:2:0, decoder-linear layout.
    Nv12,
    /// Planar YUV 4:2:0, decoder-tiled layout.
    Nv12Tiled,
    /// Packed YUV 4:2:2.
    Yuy2,
    /// Planar YUV 4:2:0, three-plane layout.
    I420,
}

/// Coarse classification of a layer's content derived from its format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentClass {
    /// RGB content with no alpha channel.
    OpaqueColor,
    /// RGB content carrying alpha.
    OtherColor,
    /// YUV video content.
    Video,
}

impl PixelFormat {
    /// Returns the content class this format implies.
    #[must_use]
    pub const fn content_class(self) -> ContentClass {
        match self {
            Self::Rgb565 | Self::Bgrx8888 | Self::Rgbx8888 => ContentClass::OpaqueColor,
            Self::Bgra8888 | Self::Rgba8888 => ContentClass::OtherColor,
            Self::Nv12 | Self::Nv12Tiled | Self::Yuy2 | Self::I420 => ContentClass::Video,
        }
    }

    /// Returns whether the format carries per-pixel alpha.
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Bgra8888 | Self::Rgba8888)
    }

    /// Returns the alpha-ignoring variant of an alpha format.
    ///
    /// Scanning out an alpha format on a plane that does no blending
    /// produces wrong pixels on some engines; callers substitute the X
    /// variant when a layer's blending is [`BlendMode::None`].
    #[must_use]
    pub const fn opaque_equivalent(self) -> Self {
        match self {
            Self::Bgra8888 => Self::Bgrx8888,
            Self::Rgba8888 => Self::Rgbx8888,
            other => other,
        }
    }

    /// Returns whether this is a video-decoder format whose buffers carry a
    /// shared metadata payload (rotation stamps, output policy).
    #[must_use]
    pub const fn has_video_metadata(self) -> bool {
        matches!(self, Self::Nv12 | Self::Nv12Tiled)
    }
}

/// A synchronization fence token.
///
/// Acquire fences gate reads of a submitted buffer; release fences are
/// signalled by the display when a buffer becomes reusable. The scheduler
/// passes fences through without waiting on them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fence(pub i32);

impl fmt::Debug for Fence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fence({})", self.0)
    }
}

/// How a layer will be composited this frame. Written back by `prepare`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Composition {
    /// The fallback compositor renders this layer into the render target.
    #[default]
    Render,
    /// A hardware plane scans this layer out directly.
    Plane,
    /// The layer's pixels are already in the render target from a previous
    /// frame; no re-render and no plane needed (smart composition).
    Cached,
}

/// One layer of the incoming stack, back-to-front order.
#[derive(Clone, Debug)]
pub struct StackLayer {
    /// The layer's current data buffer, if it has one.
    pub buffer: Option<BufferHandle>,
    /// Allocated buffer width in pixels.
    pub buffer_width: u32,
    /// Allocated buffer height in pixels.
    pub buffer_height: u32,
    /// Row stride in pixels.
    pub stride: u32,
    /// Pixel format of the buffer.
    pub format: PixelFormat,
    /// Source crop within the buffer.
    pub source_crop: Rect,
    /// Destination rectangle on the output.
    pub frame: Rect,
    /// Blending against layers below.
    pub blending: BlendMode,
    /// Requested content rotation.
    pub transform: LayerTransform,
    /// Number of visible sub-rectangles after window-manager occlusion.
    pub visible_regions: u32,
    /// The compositor asked for this layer to stay off hardware paths.
    pub skip: bool,
    /// The buffer holds protected content that must not reach the GPU.
    pub protected: bool,
    /// Fence to wait on before reading the buffer.
    pub acquire_fence: Option<Fence>,
    /// Disposition for this frame. Written back by `prepare`.
    pub composition: Composition,
    /// The fallback compositor should clear this layer's destination
    /// region before rendering. Written back by `prepare`.
    pub clear_hint: bool,
}

impl StackLayer {
    /// Width of the source crop in pixels.
    #[inline]
    #[must_use]
    pub fn crop_width(&self) -> f64 {
        self.source_crop.width()
    }

    /// Height of the source crop in pixels.
    #[inline]
    #[must_use]
    pub fn crop_height(&self) -> f64 {
        self.source_crop.height()
    }

    /// Returns whether the layer is scaled (crop size differs from
    /// destination size).
    #[must_use]
    pub fn is_scaled(&self) -> bool {
        self.source_crop.width() != self.frame.width()
            || self.source_crop.height() != self.frame.height()
    }

    /// Returns whether two layers' destination rectangles overlap.
    ///
    /// Touching edges do not count as overlap.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.frame.intersect(other.frame).area() > 0.0
    }
}

/// The fallback render target the compositor draws unhandled layers into.
#[derive(Clone, Debug, Default)]
pub struct RenderTarget {
    /// Current back buffer of the render target, if one was submitted.
    pub buffer: Option<BufferHandle>,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Fence to wait on before scanning the buffer out.
    pub acquire_fence: Option<Fence>,
}

/// The complete per-frame input: layers plus the fallback render target.
#[derive(Clone, Debug, Default)]
pub struct LayerStack {
    /// Visible layers, back to front. Does not include the render target.
    pub layers: Vec<StackLayer>,
    /// The fallback render target.
    pub target: RenderTarget,
    /// The compositor signals that layer count, order, or a display mode
    /// changed since the previous frame.
    pub topology_changed: bool,
}

impl LayerStack {
    /// Returns whether any layer holds protected content.
    #[must_use]
    pub fn any_protected(&self) -> bool {
        self.layers.iter().any(|l| l.protected)
    }

    /// Returns whether any layer is a video-class layer.
    #[must_use]
    pub fn any_video(&self) -> bool {
        self.layers
            .iter()
            .any(|l| l.format.content_class() == ContentClass::Video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[expect(
        clippy::cast_possible_truncation,
        reason = "test geometry is small and integral"
    )]
    fn layer(frame: Rect) -> StackLayer {
        StackLayer {
            buffer: Some(BufferHandle(1)),
            buffer_width: frame.width() as u32,
            buffer_height: frame.height() as u32,
            stride: frame.width() as u32,
            format: PixelFormat::Bgra8888,
            source_crop: Rect::new(0.0, 0.0, frame.width(), frame.height()),
            frame,
            blending: BlendMode::None,
            transform: LayerTransform::Identity,
            visible_regions: 1,
            skip: false,
            protected: false,
            acquire_fence: None,
            composition: Composition::Render,
            clear_hint: false,
        }
    }

    #[test]
    fn content_class_from_format() {
        assert_eq!(
            PixelFormat::Bgrx8888.content_class(),
            ContentClass::OpaqueColor
        );
        assert_eq!(
            PixelFormat::Rgba8888.content_class(),
            ContentClass::OtherColor
        );
        assert_eq!(PixelFormat::Nv12.content_class(), ContentClass::Video);
    }

    #[test]
    fn opaque_equivalent_strips_alpha() {
        assert_eq!(
            PixelFormat::Bgra8888.opaque_equivalent(),
            PixelFormat::Bgrx8888
        );
        assert_eq!(
            PixelFormat::Rgba8888.opaque_equivalent(),
            PixelFormat::Rgbx8888
        );
        assert_eq!(PixelFormat::Nv12.opaque_equivalent(), PixelFormat::Nv12);
    }

    #[test]
    fn touching_frames_do_not_intersect() {
        let a = layer(Rect::new(0.0, 0.0, 100.0, 100.0));
        let b = layer(Rect::new(100.0, 0.0, 200.0, 100.0));
        assert!(!a.intersects(&b), "shared edge is not an overlap");

        let c = layer(Rect::new(99.0, 0.0, 200.0, 100.0));
        assert!(a.intersects(&c), "one-pixel overlap counts");
    }

    #[test]
    fn scaled_layer_detected() {
        let mut l = layer(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(!l.is_scaled());
        l.source_crop = Rect::new(0.0, 0.0, 50.0, 100.0);
        assert!(l.is_scaled());
    }

    #[test]
    fn transform_axis_swap() {
        assert!(LayerTransform::Rotate90.swaps_axes());
        assert!(LayerTransform::Rotate270.swaps_axes());
        assert!(!LayerTransform::Rotate180.swaps_axes());
        assert!(LayerTransform::Identity.is_identity());
    }
}
