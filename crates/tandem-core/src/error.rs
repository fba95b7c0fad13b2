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

//! Error types shared by every tandem crate.

use std::time::Duration;
use thiserror::Error;

/// An error reported by a [`Renderer`](crate::Renderer) or its graphics context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The graphics context became unusable and must be recreated.
    #[error("The graphics context was lost and needs to be recreated.")]
    ContextLost,
    /// There is no surface to present to.
    #[error("No output surface is available.")]
    NoOutputSurface,
    /// An operation was attempted before the renderer was initialized.
    #[error("The renderer is not initialized.")]
    NotInitialized,
    /// Renderer or context initialization failed.
    #[error("Failed to initialize the renderer: {0}")]
    InitializationFailed(String),
    /// Any other backend-specific failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl RenderError {
    /// Returns `true` if the error means the context must be recreated.
    pub fn is_context_lost(&self) -> bool {
        matches!(self, RenderError::ContextLost)
    }
}

/// Why a [`CompletionWaiter`](crate::CompletionWaiter) returned without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// The signalling side was dropped without signalling.
    #[error("The completion event was dropped without being signalled.")]
    Abandoned,
    /// The wait exceeded its bound.
    #[error("Timed out after {0:?} waiting for completion.")]
    TimedOut(Duration),
}

/// A tuning value in [`ProxyConfig`](crate::ProxyConfig) is out of range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A duration that must be positive was zero.
    #[error("`{0}` must be greater than zero")]
    ZeroDuration(&'static str),
    /// A count that must be positive was zero.
    #[error("`{0}` must be greater than zero")]
    ZeroCount(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_display() {
        assert_eq!(
            RenderError::Backend("out of memory".to_string()).to_string(),
            "Backend error: out of memory"
        );
        assert!(RenderError::ContextLost.is_context_lost());
        assert!(!RenderError::NoOutputSurface.is_context_lost());
    }

    #[test]
    fn config_error_names_the_field() {
        let err = ConfigError::ZeroCount("max_frames_pending");
        assert_eq!(err.to_string(), "`max_frames_pending` must be greater than zero");
    }
}
