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

//! Interface contracts for the collaborators of the thread proxy.
//!
//! - [`SceneHost`] lives on the main thread and owns the scene.
//! - [`Renderer`] and [`GraphicsContext`] live on the impl thread.
//! - [`InputHandler`] is an optional impl-thread observer.

pub mod host;
pub mod input;
pub mod renderer;

pub use host::SceneHost;
pub use input::InputHandler;
pub use renderer::{GraphicsContext, Renderer, RendererCapabilities};
