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

//! The scene description owned by the main thread.
//!
//! A [`Scene`] is the source of truth for what should be on screen. The main
//! thread mutates it freely; during a commit a snapshot is moved to the impl
//! thread, which never reaches back into the main thread's copy.

use crate::geometry::{Rect, Size};
use std::time::Duration;

/// Stable identifier of a layer across commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

/// Identifier of a compositor-side animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub u64);

/// An opacity animation run by the impl thread without main-thread involvement.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerAnimation {
    /// Identifier reported back in animation events.
    pub id: AnimationId,
    /// Opacity at the start of the animation.
    pub from_opacity: f32,
    /// Opacity once the animation finishes.
    pub to_opacity: f32,
    /// Total run time.
    pub duration: Duration,
}

impl LayerAnimation {
    /// Opacity after `elapsed`, clamped to the end value.
    pub fn opacity_at(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.to_opacity;
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from_opacity + (self.to_opacity - self.from_opacity) * t
    }
}

/// A node of the layer tree.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerNode {
    /// Stable identifier.
    pub id: LayerId,
    /// Bounds in device pixels, relative to the viewport.
    pub bounds: Rect,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// RGBA fill used by simple renderers.
    pub color: [u8; 4],
    /// Compositor-side animations attached to this layer.
    pub animations: Vec<LayerAnimation>,
    /// Child layers, painted after (above) their parent.
    pub children: Vec<LayerNode>,
}

impl LayerNode {
    /// Creates an opaque layer with no children.
    pub fn new(id: LayerId, bounds: Rect, color: [u8; 4]) -> Self {
        Self {
            id,
            bounds,
            opacity: 1.0,
            color,
            animations: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a child layer, builder style.
    pub fn with_child(mut self, child: LayerNode) -> Self {
        self.children.push(child);
        self
    }

    /// Attaches an animation, builder style.
    pub fn with_animation(mut self, animation: LayerAnimation) -> Self {
        self.animations.push(animation);
        self
    }

    /// Visits this node and all descendants in paint order.
    pub fn for_each(&self, visit: &mut impl FnMut(&LayerNode)) {
        visit(self);
        for child in &self.children {
            child.for_each(visit);
        }
    }

    /// Mutable pre-order traversal.
    pub fn for_each_mut(&mut self, visit: &mut impl FnMut(&mut LayerNode)) {
        visit(self);
        for child in &mut self.children {
            child.for_each_mut(visit);
        }
    }

    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(LayerNode::count).sum::<usize>()
    }

    /// Finds the node with the given id in this subtree.
    pub fn find(&self, id: LayerId) -> Option<&LayerNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Mutable variant of [`find`](Self::find).
    pub fn find_mut(&mut self, id: LayerId) -> Option<&mut LayerNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }
}

/// The complete description handed over at commit time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    /// Root of the layer tree; `None` means there is nothing to draw.
    pub root: Option<LayerNode>,
    /// Size of the output surface the tree is laid out for.
    pub viewport: Size,
    /// Incremented by the scene owner on every commit.
    pub source_frame_number: u64,
    /// Page scale applied to the root.
    pub page_scale: f32,
}

impl Scene {
    /// Creates a scene with a root layer.
    pub fn new(root: LayerNode, viewport: Size) -> Self {
        Self {
            root: Some(root),
            viewport,
            source_frame_number: 0,
            page_scale: 1.0,
        }
    }

    /// Total number of layers.
    pub fn layer_count(&self) -> usize {
        self.root.as_ref().map_or(0, LayerNode::count)
    }

    /// Finds a layer anywhere in the tree.
    pub fn layer(&self, id: LayerId) -> Option<&LayerNode> {
        self.root.as_ref().and_then(|root| root.find(id))
    }

    /// Finds a layer anywhere in the tree for mutation.
    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut LayerNode> {
        self.root.as_mut().and_then(|root| root.find_mut(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scene() -> Scene {
        let root = LayerNode::new(LayerId(1), Rect::new(0, 0, 64, 64), [0, 0, 0, 255])
            .with_child(LayerNode::new(LayerId(2), Rect::new(0, 0, 8, 8), [255, 0, 0, 255]))
            .with_child(
                LayerNode::new(LayerId(3), Rect::new(8, 8, 8, 8), [0, 255, 0, 255])
                    .with_child(LayerNode::new(LayerId(4), Rect::new(9, 9, 2, 2), [0, 0, 255, 255])),
            );
        Scene::new(root, Size::new(64, 64))
    }

    #[test]
    fn layer_lookup_and_count() {
        let mut scene = sample_scene();
        assert_eq!(scene.layer_count(), 4);
        assert_eq!(scene.layer(LayerId(4)).map(|l| l.bounds.width), Some(2));
        assert!(scene.layer(LayerId(9)).is_none());

        scene.layer_mut(LayerId(2)).expect("layer 2").opacity = 0.5;
        assert_eq!(scene.layer(LayerId(2)).map(|l| l.opacity), Some(0.5));
    }

    #[test]
    fn traversal_is_paint_order() {
        let scene = sample_scene();
        let mut order = Vec::new();
        scene
            .root
            .as_ref()
            .expect("root")
            .for_each(&mut |layer| order.push(layer.id.0));
        assert_eq!(order, vec![1, 2, 3, 4]);
    }

    #[test]
    fn animation_interpolates_and_clamps() {
        let animation = LayerAnimation {
            id: AnimationId(1),
            from_opacity: 0.0,
            to_opacity: 1.0,
            duration: Duration::from_millis(100),
        };
        assert_eq!(animation.opacity_at(Duration::ZERO), 0.0);
        assert!((animation.opacity_at(Duration::from_millis(50)) - 0.5).abs() < 1e-4);
        assert_eq!(animation.opacity_at(Duration::from_millis(500)), 1.0);
    }
}
