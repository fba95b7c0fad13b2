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

//! # Tandem Core
//!
//! Foundational crate containing the data model, collaborator traits, and the
//! cross-thread primitives shared by the scheduler and the thread proxy.

#![warn(missing_docs)]

pub mod completion;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod resources;
pub mod scene;
pub mod stats;
pub mod traits;

pub use completion::{completion_pair, CompletionEvent, CompletionWaiter};
pub use config::{ProxyConfig, VSyncMode};
pub use error::{CompletionError, ConfigError, RenderError};
pub use frame::{
    AnimationEvent, AnimationEventKind, BeginFrameState, FrameState, ScrollAndScaleSet, ScrollDelta,
};
pub use geometry::{Rect, Size};
pub use resources::{ResourceUpdate, ResourceUpdateKind, ResourceUpdateQueue};
pub use scene::{AnimationId, LayerAnimation, LayerId, LayerNode, Scene};
pub use stats::RenderingStats;
pub use traits::{GraphicsContext, InputHandler, Renderer, RendererCapabilities, SceneHost};
