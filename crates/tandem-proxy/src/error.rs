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

//! Errors surfaced by [`ThreadProxy`](crate::ThreadProxy).

use std::io;
use tandem_core::{CompletionError, ConfigError, RenderError};
use thiserror::Error;

/// An error returned by a main-thread proxy call.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The impl thread has not been started, or has been stopped.
    #[error("The impl thread is not running.")]
    NotStarted,
    /// `start` was called twice.
    #[error("The impl thread was already started.")]
    AlreadyStarted,
    /// The impl thread could not be spawned.
    #[error("Failed to spawn the impl thread: {0}")]
    ThreadSpawn(#[from] io::Error),
    /// A blocking call did not get its answer.
    #[error("Blocking call failed: {0}")]
    Completion(#[from] CompletionError),
    /// The renderer reported an error.
    #[error("Renderer error: {0}")]
    Renderer(#[from] RenderError),
    /// The configuration was rejected.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
