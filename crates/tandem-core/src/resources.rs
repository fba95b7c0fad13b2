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

//! Resource (texture) uploads gathered on the main thread and consumed on the
//! impl thread in time-limited batches.

use crate::geometry::Rect;
use crate::scene::LayerId;
use std::collections::VecDeque;

/// Whether an upload replaces a whole texture or patches part of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceUpdateKind {
    /// The full contents of the layer texture.
    Full,
    /// A sub-rectangle of an existing texture.
    Partial,
}

/// A single upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUpdate {
    /// Layer whose texture is updated.
    pub layer: LayerId,
    /// Full or partial upload.
    pub kind: ResourceUpdateKind,
    /// Region of the layer covered by the upload.
    pub rect: Rect,
    /// Payload size, used for accounting only.
    pub bytes: usize,
}

impl ResourceUpdate {
    /// A full upload covering `rect`.
    pub fn full(layer: LayerId, rect: Rect) -> Self {
        Self {
            layer,
            kind: ResourceUpdateKind::Full,
            rect,
            bytes: rect.size().area() * 4,
        }
    }

    /// A partial upload covering `rect`.
    pub fn partial(layer: LayerId, rect: Rect) -> Self {
        Self {
            layer,
            kind: ResourceUpdateKind::Partial,
            rect,
            bytes: rect.size().area() * 4,
        }
    }
}

/// FIFO of pending uploads. Full uploads drain before partial ones because
/// partial uploads may patch textures created by a full upload of the same frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceUpdateQueue {
    full: VecDeque<ResourceUpdate>,
    partial: VecDeque<ResourceUpdate>,
}

impl ResourceUpdateQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an upload to the matching lane.
    pub fn push(&mut self, update: ResourceUpdate) {
        match update.kind {
            ResourceUpdateKind::Full => self.full.push_back(update),
            ResourceUpdateKind::Partial => self.partial.push_back(update),
        }
    }

    /// Removes the next upload to perform.
    pub fn pop(&mut self) -> Option<ResourceUpdate> {
        self.full.pop_front().or_else(|| self.partial.pop_front())
    }

    /// Puts an upload back at the front of its lane (used when a batch is interrupted).
    pub fn push_front(&mut self, update: ResourceUpdate) {
        match update.kind {
            ResourceUpdateKind::Full => self.full.push_front(update),
            ResourceUpdateKind::Partial => self.partial.push_front(update),
        }
    }

    /// Number of pending full uploads.
    pub fn full_count(&self) -> usize {
        self.full.len()
    }

    /// Number of pending partial uploads.
    pub fn partial_count(&self) -> usize {
        self.partial.len()
    }

    /// Total pending uploads.
    pub fn len(&self) -> usize {
        self.full.len() + self.partial.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.full.is_empty() && self.partial.is_empty()
    }

    /// Drops every pending upload.
    pub fn clear(&mut self) {
        self.full.clear();
        self.partial.clear();
    }

    /// Total bytes still to be uploaded.
    pub fn pending_bytes(&self) -> usize {
        self.full
            .iter()
            .chain(self.partial.iter())
            .map(|update| update.bytes)
            .sum()
    }
}
