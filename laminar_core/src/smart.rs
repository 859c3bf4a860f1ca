// Copyright 2026 the Laminar Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The smart composition cache.
//!
//! The common video-playback scene is a video overlay under a handful of
//! static UI layers. The UI does not change frame to frame, but video
//! buffers do, so every frame the fallback compositor would re-render the
//! same UI pixels into the render target. The cache detects the static
//! case and marks the non-video layers *already composited*: the render
//! target keeps flipping (it still holds the UI), but nothing re-renders.
//!
//! The cache is deliberately narrow. It engages only when the stack has
//! exactly one video layer, some color layer actually uses the fallback
//! renderer, no other layer is skip-flagged, and the stack size is within
//! the configured range. The video layer itself is excluded from the
//! bookkeeping — its buffers change every frame by definition. Any
//! buffer-identity change outside it, or any topology change, leaves the
//! mode immediately.

use crate::config::PolicyConfig;
use crate::list::ListChanges;

/// Cache state transition reported by [`SmartCache::observe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmartTransition {
    /// No state change this frame.
    None,
    /// The cache engaged; non-video layers are now marked composited.
    Entered,
    /// The cache disengaged; normal fallback rendering resumes.
    Left,
}

/// Memoizes scene stability across frames for one output.
#[derive(Debug, Default)]
pub struct SmartCache {
    active: bool,
    has_render_color: bool,
    has_skip: bool,
}

impl SmartCache {
    /// Creates an inactive cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cache is currently suppressing fallback rendering.
    #[must_use]
    pub fn active(&self) -> bool {
        self.active
    }

    /// Records stack facts after a classification pass.
    ///
    /// `has_render_color` is whether any color-class layer ended up on the
    /// fallback renderer (without that there is no render work to save);
    /// `has_skip` disables the cache for stacks the compositor flagged.
    pub fn on_topology(&mut self, has_render_color: bool, has_skip: bool) {
        self.active = false;
        self.has_render_color = has_render_color;
        self.has_skip = has_skip;
    }

    /// Per-frame decision point.
    ///
    /// `changes` is the frame's drained dirty set; `video_slot` the index
    /// of the stack's sole video layer, if there is exactly one.
    pub fn observe(
        &mut self,
        changes: &ListChanges,
        video_slot: Option<usize>,
        layer_count: usize,
        policy: &PolicyConfig,
    ) -> SmartTransition {
        let applicable = video_slot.is_some()
            && self.has_render_color
            && !self.has_skip
            && policy.smart_layers.contains(&layer_count);

        if !applicable {
            return self.leave();
        }

        let dirty = changes.topology_changed
            || changes
                .content
                .iter()
                .any(|&i| Some(i as usize) != video_slot);

        if dirty {
            self.leave()
        } else if self.active {
            SmartTransition::None
        } else {
            self.active = true;
            SmartTransition::Entered
        }
    }

    fn leave(&mut self) -> SmartTransition {
        if self.active {
            self.active = false;
            SmartTransition::Left
        } else {
            SmartTransition::None
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn quiet() -> ListChanges {
        ListChanges {
            content: vec![],
            topology_changed: false,
        }
    }

    fn policy() -> PolicyConfig {
        PolicyConfig::default()
    }

    #[test]
    fn enters_on_first_static_frame() {
        let mut cache = SmartCache::new();
        cache.on_topology(true, false);

        // First frame after topology: every buffer is a first sighting.
        let changes = ListChanges {
            content: vec![0, 1, 2, 3],
            topology_changed: false,
        };
        assert_eq!(
            cache.observe(&changes, Some(1), 4, &policy()),
            SmartTransition::None
        );
        assert!(!cache.active());

        // Second frame: only the video buffer rotated.
        let changes = ListChanges {
            content: vec![1],
            topology_changed: false,
        };
        assert_eq!(
            cache.observe(&changes, Some(1), 4, &policy()),
            SmartTransition::Entered
        );
        assert!(cache.active());
    }

    #[test]
    fn ui_update_leaves_the_mode() {
        let mut cache = SmartCache::new();
        cache.on_topology(true, false);
        let _ = cache.observe(&quiet(), Some(0), 4, &policy());
        assert!(cache.active());

        let changes = ListChanges {
            content: vec![2],
            topology_changed: false,
        };
        assert_eq!(
            cache.observe(&changes, Some(0), 4, &policy()),
            SmartTransition::Left
        );
        assert!(!cache.active());
    }

    #[test]
    fn requires_video_overlay_and_render_work() {
        let mut cache = SmartCache::new();

        cache.on_topology(true, false);
        assert_eq!(
            cache.observe(&quiet(), None, 4, &policy()),
            SmartTransition::None,
            "no video overlay, no cache"
        );

        cache.on_topology(false, false);
        assert_eq!(
            cache.observe(&quiet(), Some(0), 4, &policy()),
            SmartTransition::None,
            "nothing renders, nothing to save"
        );
        assert!(!cache.active());
    }

    #[test]
    fn skip_layers_disable_the_cache() {
        let mut cache = SmartCache::new();
        cache.on_topology(true, true);
        assert_eq!(
            cache.observe(&quiet(), Some(0), 4, &policy()),
            SmartTransition::None
        );
        assert!(!cache.active());
    }

    #[test]
    fn layer_count_bounds_apply() {
        let mut cache = SmartCache::new();
        cache.on_topology(true, false);
        assert_eq!(
            cache.observe(&quiet(), Some(0), 9, &policy()),
            SmartTransition::None,
            "large stacks stay out of cache mode"
        );

        cache.on_topology(true, false);
        let _ = cache.observe(&quiet(), Some(0), 4, &policy());
        assert!(cache.active(), "in-range stack enters");
    }

    #[test]
    fn topology_mark_forces_exit() {
        let mut cache = SmartCache::new();
        cache.on_topology(true, false);
        let _ = cache.observe(&quiet(), Some(0), 4, &policy());
        assert!(cache.active());

        let changes = ListChanges {
            content: vec![],
            topology_changed: true,
        };
        assert_eq!(
            cache.observe(&changes, Some(0), 4, &policy()),
            SmartTransition::Left
        );
    }
}
