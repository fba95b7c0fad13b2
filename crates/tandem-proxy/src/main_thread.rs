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

//! Bookkeeping the proxy keeps on the main thread.

use crate::messages::MainThreadAction;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tandem_core::{BeginFrameState, RendererCapabilities};

/// Outcome of a failed context recreation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecreationOutcome {
    /// Another attempt is scheduled.
    Retry,
    /// The attempt budget is spent; the proxy stays without a context.
    GaveUp,
}

#[derive(Debug, Clone, Copy)]
struct ContextRecreation {
    attempts: u32,
    next_attempt: Instant,
}

#[derive(Debug, Default)]
pub(crate) struct MainThreadState {
    commit_requested: bool,
    renderer_initialized: bool,
    renderer_capabilities: Option<RendererCapabilities>,
    textures_acquired: bool,
    deferred: VecDeque<MainThreadAction>,
    recreation: Option<ContextRecreation>,
    recreation_failed: bool,
}

impl MainThreadState {
    /// Returns `true` if this call turned the request on.
    pub fn request_commit(&mut self) -> bool {
        !std::mem::replace(&mut self.commit_requested, true)
    }

    pub fn commit_requested(&self) -> bool {
        self.commit_requested
    }

    /// A begin-frame reached the main thread; new requests start a new epoch.
    pub fn begin_frame_started(&mut self) {
        self.commit_requested = false;
        // The commit hands the textures back to the impl thread.
        self.textures_acquired = false;
    }

    pub fn renderer_initialized(&self) -> bool {
        self.renderer_initialized
    }

    pub fn renderer_capabilities(&self) -> Option<&RendererCapabilities> {
        self.renderer_capabilities.as_ref()
    }

    pub fn renderer_ready(&mut self, capabilities: RendererCapabilities) {
        self.renderer_initialized = true;
        self.renderer_capabilities = Some(capabilities);
    }

    pub fn textures_acquired(&self) -> bool {
        self.textures_acquired
    }

    pub fn set_textures_acquired(&mut self, acquired: bool) {
        self.textures_acquired = acquired;
    }

    pub fn defer(&mut self, task: MainThreadAction) {
        self.deferred.push_back(task);
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub fn next_deferred(&mut self) -> Option<MainThreadAction> {
        self.deferred.pop_front()
    }

    /// Pulls a queued begin-frame out of the deferred tasks, keeping the rest in order.
    pub fn take_deferred_begin_frame(&mut self) -> Option<BeginFrameState> {
        let index = self
            .deferred
            .iter()
            .position(|task| matches!(task, MainThreadAction::BeginFrame(_)))?;
        match self.deferred.remove(index) {
            Some(MainThreadAction::BeginFrame(state)) => Some(state),
            _ => None,
        }
    }

    pub fn discard_tasks(&mut self) -> usize {
        let discarded = self.deferred.len();
        self.deferred.clear();
        discarded
    }

    pub fn did_lose_context(&mut self) {
        self.renderer_initialized = false;
    }

    /// The impl thread asked for a new context.
    pub fn start_recreation(&mut self, now: Instant) {
        if self.recreation_failed {
            return;
        }
        self.recreation.get_or_insert(ContextRecreation {
            attempts: 0,
            next_attempt: now,
        });
    }

    pub fn recreation_deadline(&self) -> Option<Instant> {
        self.recreation.map(|recreation| recreation.next_attempt)
    }

    pub fn recreation_due(&self, now: Instant) -> bool {
        self.recreation_deadline()
            .is_some_and(|deadline| deadline <= now)
    }

    /// Counts an attempt. Returns its 1-based number, or `None` if none is pending.
    pub fn begin_recreation_attempt(&mut self) -> Option<u32> {
        let recreation = self.recreation.as_mut()?;
        recreation.attempts += 1;
        Some(recreation.attempts)
    }

    pub fn recreation_succeeded(&mut self, capabilities: RendererCapabilities) {
        self.recreation = None;
        self.renderer_ready(capabilities);
    }

    pub fn recreation_attempt_failed(
        &mut self,
        now: Instant,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> RecreationOutcome {
        let Some(recreation) = self.recreation.as_mut() else {
            return RecreationOutcome::GaveUp;
        };
        if recreation.attempts >= max_attempts {
            self.recreation = None;
            self.recreation_failed = true;
            return RecreationOutcome::GaveUp;
        }
        recreation.next_attempt = now + retry_delay;
        RecreationOutcome::Retry
    }

    pub fn recreation_failed(&self) -> bool {
        self.recreation_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::ScrollAndScaleSet;

    fn begin_frame_state() -> BeginFrameState {
        BeginFrameState {
            monotonic_frame_begin_time: Instant::now(),
            scroll_info: ScrollAndScaleSet::default(),
            contents_textures_purged: false,
            memory_allocation_limit_bytes: 0,
        }
    }

    #[test]
    fn commit_requests_coalesce_until_begin_frame() {
        let mut state = MainThreadState::default();
        assert!(state.request_commit());
        assert!(!state.request_commit());
        assert!(state.commit_requested());

        state.begin_frame_started();
        assert!(!state.commit_requested());
        assert!(state.request_commit());
    }

    #[test]
    fn begin_frame_returns_textures() {
        let mut state = MainThreadState::default();
        state.set_textures_acquired(true);
        state.begin_frame_started();
        assert!(!state.textures_acquired());
    }

    #[test]
    fn deferred_begin_frame_is_pulled_out_of_order() {
        let mut state = MainThreadState::default();
        state.defer(MainThreadAction::DidCompleteSwapBuffers);
        state.defer(MainThreadAction::BeginFrame(begin_frame_state()));
        state.defer(MainThreadAction::DidCommitAndDrawFrame);

        assert!(state.take_deferred_begin_frame().is_some());
        assert!(state.take_deferred_begin_frame().is_none());
        assert!(matches!(
            state.next_deferred(),
            Some(MainThreadAction::DidCompleteSwapBuffers)
        ));
        assert!(matches!(
            state.next_deferred(),
            Some(MainThreadAction::DidCommitAndDrawFrame)
        ));
        assert!(!state.has_deferred());
    }

    #[test]
    fn recreation_retries_then_gives_up() {
        let mut state = MainThreadState::default();
        let now = Instant::now();
        let delay = Duration::from_millis(10);

        state.start_recreation(now);
        assert!(state.recreation_due(now));

        assert_eq!(state.begin_recreation_attempt(), Some(1));
        assert_eq!(
            state.recreation_attempt_failed(now, 2, delay),
            RecreationOutcome::Retry
        );
        assert!(!state.recreation_due(now));
        assert!(state.recreation_due(now + delay));

        assert_eq!(state.begin_recreation_attempt(), Some(2));
        assert_eq!(
            state.recreation_attempt_failed(now, 2, delay),
            RecreationOutcome::GaveUp
        );
        assert!(state.recreation_failed());
        assert_eq!(state.recreation_deadline(), None);

        // A failed proxy does not start over.
        state.start_recreation(now);
        assert_eq!(state.begin_recreation_attempt(), None);
    }

    #[test]
    fn successful_recreation_restores_renderer() {
        let mut state = MainThreadState::default();
        state.renderer_ready(RendererCapabilities::default());
        state.did_lose_context();
        assert!(!state.renderer_initialized());

        state.start_recreation(Instant::now());
        state.begin_recreation_attempt();
        state.recreation_succeeded(RendererCapabilities::default());
        assert!(state.renderer_initialized());
        assert_eq!(state.recreation_deadline(), None);
    }
}
