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

//! Construction-time tuning for the proxy and its scheduler.

use crate::error::ConfigError;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where vsync ticks come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VSyncMode {
    /// An internal timer ticks every `frame_interval`, phase-aligned to the
    /// last reported vsync timebase.
    #[default]
    Timer,
    /// Ticks are delivered by the scene owner through `ThreadProxy::did_vsync`.
    External,
    /// A tick is taken as soon as a frame is wanted; only swap throttling
    /// limits the frame rate.
    Unthrottled,
}

/// Configuration for a thread proxy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProxyConfig {
    /// Source of vsync ticks.
    pub vsync: VSyncMode,
    /// Display refresh interval used by [`VSyncMode::Timer`].
    pub frame_interval: Duration,
    /// Swaps that may be outstanding before ticks are withheld.
    pub max_frames_pending: usize,
    /// Wall-clock budget of a single resource-update batch.
    pub resource_update_time_limit: Duration,
    /// Upper bound on uploads per resource-update batch.
    pub max_resource_updates_per_batch: usize,
    /// Partial texture updates the scene owner may queue per frame.
    pub max_partial_texture_updates: usize,
    /// Failed `DrawIfPossible` attempts before a draw is forced.
    pub max_consecutive_failed_draws: u32,
    /// Context recreation attempts before the failure is reported as terminal.
    pub max_context_recreation_attempts: u32,
    /// Delay between two context recreation attempts.
    pub context_recreation_retry_delay: Duration,
    /// Upper bound for every blocking main-thread call.
    /// `None` waits until the impl thread signals or goes away.
    pub blocking_call_timeout: Option<Duration>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            vsync: VSyncMode::Timer,
            frame_interval: Duration::from_nanos(16_666_667),
            max_frames_pending: 2,
            resource_update_time_limit: Duration::from_millis(4),
            max_resource_updates_per_batch: 48,
            max_partial_texture_updates: 12,
            max_consecutive_failed_draws: 3,
            max_context_recreation_attempts: 5,
            context_recreation_retry_delay: Duration::from_millis(16),
            blocking_call_timeout: None,
        }
    }
}

impl ProxyConfig {
    /// Checks every tuning value that must be non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("frame_interval"));
        }
        if self.resource_update_time_limit.is_zero() {
            return Err(ConfigError::ZeroDuration("resource_update_time_limit"));
        }
        if self.max_frames_pending == 0 {
            return Err(ConfigError::ZeroCount("max_frames_pending"));
        }
        if self.max_resource_updates_per_batch == 0 {
            return Err(ConfigError::ZeroCount("max_resource_updates_per_batch"));
        }
        if self.max_consecutive_failed_draws == 0 {
            return Err(ConfigError::ZeroCount("max_consecutive_failed_draws"));
        }
        if self.max_context_recreation_attempts == 0 {
            return Err(ConfigError::ZeroCount("max_context_recreation_attempts"));
        }
        if matches!(self.blocking_call_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(ConfigError::ZeroDuration("blocking_call_timeout"));
        }
        Ok(())
    }
}
