// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-frame state exchanged between the two threads.

use crate::geometry::Size;
use crate::resources::ResourceUpdateQueue;
use crate::scene::{AnimationId, LayerId, LayerNode, Scene};
use std::time::Instant;

/// A scroll offset accumulated on the impl thread for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollDelta {
    /// Scrolled layer.
    pub layer: LayerId,
    /// Horizontal delta in pixels.
    pub dx: i32,
    /// Vertical delta in pixels.
    pub dy: i32,
}

/// Input-driven changes the impl thread applied since the last begin-frame,
/// to be folded into the main thread's scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollAndScaleSet {
    /// Per-layer scroll deltas.
    pub scrolls: Vec<ScrollDelta>,
    /// Multiplicative page scale change; `1.0` means unchanged.
    pub page_scale_delta: f32,
}

impl Default for ScrollAndScaleSet {
    fn default() -> Self {
        Self {
            scrolls: Vec::new(),
            page_scale_delta: 1.0,
        }
    }
}

impl ScrollAndScaleSet {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.scrolls.is_empty() && self.page_scale_delta == 1.0
    }
}

/// Sent from the impl thread to the main thread when a frame begins.
#[derive(Debug, Clone, PartialEq)]
pub struct BeginFrameState {
    /// Monotonic time at which the impl thread started the frame.
    pub monotonic_frame_begin_time: Instant,
    /// Input deltas to apply before updating the scene.
    pub scroll_info: ScrollAndScaleSet,
    /// The impl thread dropped its content textures; everything must be re-uploaded.
    pub contents_textures_purged: bool,
    /// Texture memory the scene owner may use. Zero while hidden.
    pub memory_allocation_limit_bytes: usize,
}

/// What happened to a compositor-side animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEventKind {
    /// The animation produced its first frame.
    Started,
    /// The animation reached its end value.
    Finished,
}

/// Notification about an impl-thread animation, delivered to the main thread.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationEvent {
    /// Animated layer.
    pub layer: LayerId,
    /// Animation identifier.
    pub animation: AnimationId,
    /// Start or finish.
    pub kind: AnimationEventKind,
    /// Impl-thread monotonic time of the event.
    pub monotonic_time: Instant,
}

/// The committed scene as seen by the impl thread.
///
/// Exclusively owned by the impl thread; the main thread keeps no reference into it.
#[derive(Debug, Clone, Default)]
pub struct FrameState {
    /// Latest committed layer tree.
    pub tree: Option<LayerNode>,
    /// Viewport the tree was laid out for.
    pub viewport: Size,
    /// `source_frame_number` of the committed scene.
    pub source_frame_number: u64,
    /// Page scale of the committed scene.
    pub page_scale: f32,
    /// Content textures were dropped; a non-forced draw would show garbage.
    pub contents_textures_purged: bool,
    /// Uploads still to be performed for the incoming commit.
    pub pending_updates: ResourceUpdateQueue,
    /// The next successful draw is the first one of a new commit.
    pub newly_committed_frame: bool,
}

impl FrameState {
    /// Replaces the committed tree with `scene`.
    pub fn commit(&mut self, scene: Scene) {
        self.tree = scene.root;
        self.viewport = scene.viewport;
        self.source_frame_number = scene.source_frame_number;
        self.page_scale = scene.page_scale;
        self.newly_committed_frame = true;
    }

    /// Returns `true` if there is a non-empty tree to draw.
    pub fn has_content(&self) -> bool {
        self.tree.is_some() && !self.viewport.is_empty()
    }

    /// Number of committed layers.
    pub fn layer_count(&self) -> usize {
        self.tree.as_ref().map_or(0, LayerNode::count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn commit_moves_the_scene_in() {
        let mut frame = FrameState::default();
        assert!(!frame.has_content());

        let mut scene = Scene::new(
            LayerNode::new(LayerId(1), Rect::new(0, 0, 10, 10), [1, 2, 3, 255]),
            Size::new(10, 10),
        );
        scene.source_frame_number = 5;
        frame.commit(scene);

        assert!(frame.has_content());
        assert!(frame.newly_committed_frame);
        assert_eq!(frame.source_frame_number, 5);
        assert_eq!(frame.layer_count(), 1);
    }

    #[test]
    fn empty_viewport_has_no_content() {
        let mut frame = FrameState::default();
        frame.commit(Scene::new(
            LayerNode::new(LayerId(1), Rect::new(0, 0, 10, 10), [0; 4]),
            Size::new(0, 10),
        ));
        assert!(!frame.has_content());
    }

    #[test]
    fn default_scroll_set_is_empty() {
        assert!(ScrollAndScaleSet::default().is_empty());
    }
}
