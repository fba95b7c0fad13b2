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

//! Impl-thread rendering contracts.

use crate::error::RenderError;
use crate::frame::FrameState;
use crate::geometry::Rect;
use crate::resources::ResourceUpdate;
use std::fmt::Debug;

/// Static properties of an initialized renderer, copied to the main thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererCapabilities {
    /// Largest texture edge the backend accepts.
    pub max_texture_size: u32,
    /// Partial texture uploads are supported.
    pub supports_partial_texture_updates: bool,
    /// Pixels can be read back from the back buffer.
    pub supports_readback: bool,
}

impl Default for RendererCapabilities {
    fn default() -> Self {
        Self {
            max_texture_size: 4096,
            supports_partial_texture_updates: true,
            supports_readback: true,
        }
    }
}

/// A graphics context handed from the main thread to the renderer.
///
/// Created on the main thread (so creation can be retried there after a loss)
/// and then owned by the impl thread.
pub trait GraphicsContext: Debug + Send {
    /// A human-readable label for logs.
    fn label(&self) -> &str;

    /// Binds the context for use on the calling thread.
    fn make_current(&mut self) -> Result<(), RenderError>;

    /// Returns `true` once the context can no longer be used.
    fn is_lost(&self) -> bool;
}

/// The impl-thread renderer.
///
/// The proxy never interprets what is drawn, only whether each call succeeded.
/// Returning [`RenderError::ContextLost`] from any method starts context recreation.
pub trait Renderer: Send {
    /// (Re)initializes the renderer on top of a fresh context.
    fn initialize(
        &mut self,
        context: Box<dyn GraphicsContext>,
    ) -> Result<RendererCapabilities, RenderError>;

    /// Returns `true` after a successful [`initialize`](Self::initialize).
    fn is_initialized(&self) -> bool;

    /// Returns `true` if there is a surface to present to.
    fn has_output_surface(&self) -> bool;

    /// Performs one resource upload.
    fn upload(&mut self, update: &ResourceUpdate) -> Result<(), RenderError>;

    /// Draws the committed frame into the back buffer.
    fn draw(&mut self, frame: &FrameState) -> Result<(), RenderError>;

    /// Presents the back buffer.
    fn swap_buffers(&mut self) -> Result<(), RenderError>;

    /// Copies `rect` of the back buffer into `pixels` as tightly packed RGBA8.
    fn read_pixels(&mut self, rect: Rect, pixels: &mut [u8]) -> Result<(), RenderError>;

    /// Blocks until all submitted work has completed.
    fn finish(&mut self) -> Result<(), RenderError>;

    /// Visibility of the output surface changed.
    fn set_visible(&mut self, visible: bool);

    /// Drops content textures (memory pressure or hidden surface).
    fn release_resources(&mut self);

    /// Releases every resource; called once when the impl thread shuts down.
    fn shutdown(&mut self) {}
}
