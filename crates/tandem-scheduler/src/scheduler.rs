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

//! Drives the state machine against a [`SchedulerClient`].

use crate::frame_rate_controller::{DelayBasedTimeSource, FrameRateController, TimeSource};
use crate::state_machine::{CommitState, SchedulerAction, SchedulerStateMachine};
use std::time::{Duration, Instant};
use tandem_core::{ProxyConfig, VSyncMode};

/// Outcome of a draw-and-swap action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawAndSwapResult {
    /// A frame was drawn.
    pub did_draw: bool,
    /// The frame was presented; counts against the pending-frames budget.
    pub did_swap: bool,
    /// The draw stopped because the graphics context is gone.
    pub aborted_due_to_context_loss: bool,
}

impl DrawAndSwapResult {
    /// A draw that produced and presented a frame.
    pub fn drawn_and_swapped() -> Self {
        Self {
            did_draw: true,
            did_swap: true,
            aborted_due_to_context_loss: false,
        }
    }

    /// A draw that produced nothing.
    pub fn failed() -> Self {
        Self::default()
    }

    /// A draw abandoned because the context was lost.
    pub fn context_lost() -> Self {
        Self {
            aborted_due_to_context_loss: true,
            ..Self::default()
        }
    }
}

/// The side that actually performs scheduled work.
pub trait SchedulerClient {
    /// Whether a regular draw could succeed right now.
    fn can_draw(&self) -> bool;
    /// Whether resource uploads remain for the incoming frame.
    fn has_more_resource_updates(&self) -> bool;

    /// Ask the main thread for a frame.
    fn scheduled_action_begin_frame(&mut self);
    /// Upload resources until `deadline` or until the batch limit is hit.
    fn scheduled_action_update_more_resources(&mut self, deadline: Instant);
    /// Swap the pending frame in.
    fn scheduled_action_commit(&mut self);
    /// Draw and present unless something prevents it.
    fn scheduled_action_draw_and_swap_if_possible(&mut self) -> DrawAndSwapResult;
    /// Draw and present regardless of readiness.
    fn scheduled_action_draw_and_swap_forced(&mut self) -> DrawAndSwapResult;
    /// Ask the main thread to recreate the graphics context.
    fn scheduled_action_begin_context_recreation(&mut self);
    /// Hand the layer textures to the main thread.
    fn scheduled_action_acquire_layer_textures_for_main_thread(&mut self);
}

/// Feeds inputs to a [`SchedulerStateMachine`] and executes what it picks.
///
/// Every input runs the pending actions before returning, so a caller never
/// has to remember to "kick" the scheduler.
#[derive(Debug)]
pub struct Scheduler {
    state_machine: SchedulerStateMachine,
    frame_rate_controller: FrameRateController,
    resource_update_time_limit: Duration,
    resource_update_retry_interval: Duration,
    last_resource_update: Option<Instant>,
}

impl Scheduler {
    /// Creates a scheduler from explicit parts.
    ///
    /// Leftover resource updates resume on the next vsync tick, or after
    /// `resource_update_retry_interval` when no tick source is running
    /// (the main thread is blocked on the commit and cannot drive vsync).
    pub fn new(
        state_machine: SchedulerStateMachine,
        frame_rate_controller: FrameRateController,
        resource_update_time_limit: Duration,
        resource_update_retry_interval: Duration,
    ) -> Self {
        Self {
            state_machine,
            frame_rate_controller,
            resource_update_time_limit,
            resource_update_retry_interval,
            last_resource_update: None,
        }
    }

    /// Creates a scheduler tuned by `config`, with the timer phase starting at `now`.
    pub fn from_config(config: &ProxyConfig, now: Instant) -> Self {
        let source = match config.vsync {
            VSyncMode::Timer => {
                TimeSource::DelayBased(DelayBasedTimeSource::new(config.frame_interval, now))
            }
            VSyncMode::External => TimeSource::External,
            VSyncMode::Unthrottled => TimeSource::Unthrottled,
        };
        Self::new(
            SchedulerStateMachine::new(config.max_consecutive_failed_draws),
            FrameRateController::new(source, config.max_frames_pending),
            config.resource_update_time_limit,
            config.frame_interval,
        )
    }

    /// Read access for diagnostics and tests.
    pub fn state_machine(&self) -> &SchedulerStateMachine {
        &self.state_machine
    }

    /// Read access for diagnostics and tests.
    pub fn frame_rate_controller(&self) -> &FrameRateController {
        &self.frame_rate_controller
    }

    /// A commit is requested or in flight.
    pub fn commit_pending(&self) -> bool {
        self.state_machine.commit_pending()
    }

    /// A redraw is requested.
    pub fn redraw_pending(&self) -> bool {
        self.state_machine.redraw_pending()
    }

    /// The output became visible or hidden.
    pub fn set_visible(&mut self, visible: bool, client: &mut dyn SchedulerClient) {
        self.state_machine.set_visible(visible);
        self.process_scheduled_actions(client);
    }

    /// The output surface can accept frames.
    pub fn set_can_begin_frame(&mut self, can: bool, client: &mut dyn SchedulerClient) {
        self.state_machine.set_can_begin_frame(can);
        self.process_scheduled_actions(client);
    }

    /// Requests a commit. Requests coalesce until the frame begins.
    pub fn set_needs_commit(&mut self, client: &mut dyn SchedulerClient) {
        self.state_machine.set_needs_commit();
        self.process_scheduled_actions(client);
    }

    /// Requests a commit that ignores visibility.
    pub fn set_needs_forced_commit(&mut self, client: &mut dyn SchedulerClient) {
        self.state_machine.set_needs_forced_commit();
        self.process_scheduled_actions(client);
    }

    /// Requests a draw at the next vsync.
    pub fn set_needs_redraw(&mut self, client: &mut dyn SchedulerClient) {
        self.state_machine.set_needs_redraw();
        self.process_scheduled_actions(client);
    }

    /// Requests a draw that ignores visibility and readiness.
    pub fn set_needs_forced_redraw(&mut self, client: &mut dyn SchedulerClient) {
        self.state_machine.set_needs_forced_redraw();
        self.process_scheduled_actions(client);
    }

    /// The main thread wants to write into the layer textures.
    pub fn set_main_thread_needs_layer_textures(&mut self, client: &mut dyn SchedulerClient) {
        self.state_machine.set_main_thread_needs_layer_textures();
        self.process_scheduled_actions(client);
    }

    /// The main thread gave the layer textures back.
    pub fn did_release_layer_textures(&mut self, client: &mut dyn SchedulerClient) {
        self.state_machine.did_release_layer_textures();
        self.process_scheduled_actions(client);
    }

    /// The main thread delivered the frame it was asked for.
    pub fn begin_frame_complete(&mut self, client: &mut dyn SchedulerClient) {
        self.state_machine.begin_frame_complete();
        self.process_scheduled_actions(client);
    }

    /// The main thread declined to produce a frame.
    pub fn begin_frame_aborted(&mut self, client: &mut dyn SchedulerClient) {
        self.state_machine.begin_frame_aborted();
        self.process_scheduled_actions(client);
    }

    /// Returns `true` the first time a given loss is reported.
    pub fn did_lose_context(&mut self, client: &mut dyn SchedulerClient) -> bool {
        let first = self.state_machine.did_lose_context();
        self.frame_rate_controller
            .did_abort_all_pending_frames(Instant::now());
        self.process_scheduled_actions(client);
        first
    }

    /// A new graphics context is in place.
    pub fn did_recreate_context(&mut self, client: &mut dyn SchedulerClient) {
        self.state_machine.did_recreate_context();
        self.process_scheduled_actions(client);
    }

    /// A presented frame reached the display.
    pub fn did_swap_buffers_complete(&mut self) {
        self.frame_rate_controller.did_finish_frame(Instant::now());
    }

    /// Re-aligns an internal vsync timer.
    pub fn set_timebase_and_interval(&mut self, timebase: Instant, interval: Duration) {
        self.frame_rate_controller
            .set_timebase_and_interval(timebase, interval, Instant::now());
    }

    /// When [`Scheduler::poll_tick`] should run next, if ever.
    pub fn next_tick_deadline(&self, now: Instant) -> Option<Instant> {
        self.frame_rate_controller
            .next_tick_deadline(now)
            .or_else(|| self.resource_update_deadline())
    }

    /// Runs a vsync tick if one is due. Returns `true` if it ran.
    pub fn poll_tick(&mut self, now: Instant, client: &mut dyn SchedulerClient) -> bool {
        let due = self.frame_rate_controller.poll_tick(now)
            || self
                .resource_update_deadline()
                .is_some_and(|deadline| deadline <= now);
        if !due {
            return false;
        }
        self.vsync_tick(client);
        true
    }

    fn resource_update_deadline(&self) -> Option<Instant> {
        if self.state_machine.commit_state() != CommitState::UpdatingResources
            || !self.state_machine.vsync_callback_needed()
        {
            return None;
        }
        self.last_resource_update
            .map(|last| last + self.resource_update_retry_interval)
    }

    /// An externally delivered vsync. Returns `true` if it was acted on.
    pub fn did_vsync(&mut self, client: &mut dyn SchedulerClient) -> bool {
        if !self.frame_rate_controller.external_tick() {
            return false;
        }
        self.vsync_tick(client);
        true
    }

    /// Runs the actions allowed inside a vsync interval.
    pub fn vsync_tick(&mut self, client: &mut dyn SchedulerClient) {
        self.state_machine.did_enter_vsync();
        self.process_scheduled_actions(client);
        self.state_machine.did_leave_vsync();
    }

    /// Performs actions until the state machine has nothing left to do.
    pub fn process_scheduled_actions(&mut self, client: &mut dyn SchedulerClient) {
        loop {
            self.state_machine.set_can_draw(client.can_draw());
            let action = self.state_machine.next_action();
            if action == SchedulerAction::None {
                break;
            }
            log::trace!("scheduler action {action:?}");
            self.state_machine.update_state(action);
            match action {
                SchedulerAction::None => {}
                SchedulerAction::BeginFrame => client.scheduled_action_begin_frame(),
                SchedulerAction::BeginUpdateMoreResources => {
                    let started = Instant::now();
                    self.last_resource_update = Some(started);
                    let deadline = started + self.resource_update_time_limit;
                    client.scheduled_action_update_more_resources(deadline);
                    self.state_machine
                        .begin_update_more_resources_complete(client.has_more_resource_updates());
                }
                SchedulerAction::Commit => client.scheduled_action_commit(),
                SchedulerAction::DrawIfPossible => {
                    let result = client.scheduled_action_draw_and_swap_if_possible();
                    // A lost context says nothing about the content; recreation recommits anyway.
                    if !result.aborted_due_to_context_loss {
                        self.state_machine
                            .did_draw_if_possible_completed(result.did_draw);
                    }
                    self.handle_draw_result(result);
                }
                SchedulerAction::DrawForced => {
                    let result = client.scheduled_action_draw_and_swap_forced();
                    self.handle_draw_result(result);
                }
                SchedulerAction::BeginContextRecreation => {
                    client.scheduled_action_begin_context_recreation()
                }
                SchedulerAction::AcquireLayerTexturesForMainThread => {
                    client.scheduled_action_acquire_layer_textures_for_main_thread()
                }
            }
        }
        let needed = self.state_machine.vsync_callback_needed();
        self.frame_rate_controller.set_active(needed, Instant::now());
    }

    fn handle_draw_result(&mut self, result: DrawAndSwapResult) {
        let now = Instant::now();
        if result.aborted_due_to_context_loss {
            if self.state_machine.did_lose_context() {
                log::warn!("draw aborted: graphics context lost");
            }
            self.frame_rate_controller.did_abort_all_pending_frames(now);
            return;
        }
        if result.did_swap {
            self.frame_rate_controller.did_begin_frame(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::ContextState;

    #[derive(Default)]
    struct RecordingClient {
        actions: Vec<&'static str>,
        can_draw: bool,
        resource_batches_left: usize,
        draw_result: DrawAndSwapResult,
    }

    impl RecordingClient {
        fn drawing() -> Self {
            Self {
                can_draw: true,
                draw_result: DrawAndSwapResult::drawn_and_swapped(),
                ..Default::default()
            }
        }

        fn take(&mut self) -> Vec<&'static str> {
            std::mem::take(&mut self.actions)
        }
    }

    impl SchedulerClient for RecordingClient {
        fn can_draw(&self) -> bool {
            self.can_draw
        }

        fn has_more_resource_updates(&self) -> bool {
            self.resource_batches_left > 0
        }

        fn scheduled_action_begin_frame(&mut self) {
            self.actions.push("begin_frame");
        }

        fn scheduled_action_update_more_resources(&mut self, _deadline: Instant) {
            self.actions.push("update_more_resources");
            self.resource_batches_left = self.resource_batches_left.saturating_sub(1);
        }

        fn scheduled_action_commit(&mut self) {
            self.actions.push("commit");
        }

        fn scheduled_action_draw_and_swap_if_possible(&mut self) -> DrawAndSwapResult {
            self.actions.push("draw_if_possible");
            self.draw_result
        }

        fn scheduled_action_draw_and_swap_forced(&mut self) -> DrawAndSwapResult {
            self.actions.push("draw_forced");
            self.draw_result
        }

        fn scheduled_action_begin_context_recreation(&mut self) {
            self.actions.push("begin_context_recreation");
        }

        fn scheduled_action_acquire_layer_textures_for_main_thread(&mut self) {
            self.actions.push("acquire_textures");
        }
    }

    fn scheduler(vsync: VSyncMode) -> Scheduler {
        let config = ProxyConfig {
            vsync,
            max_frames_pending: 1,
            ..Default::default()
        };
        Scheduler::from_config(&config, Instant::now())
    }

    fn ready(vsync: VSyncMode, client: &mut RecordingClient) -> Scheduler {
        let mut s = scheduler(vsync);
        s.set_can_begin_frame(true, client);
        s.set_visible(true, client);
        s
    }

    #[test]
    fn full_commit_then_draw_on_vsync() {
        let mut client = RecordingClient::drawing();
        client.resource_batches_left = 1;
        let mut s = ready(VSyncMode::External, &mut client);

        s.set_needs_commit(&mut client);
        assert_eq!(client.take(), vec!["begin_frame"]);

        s.begin_frame_complete(&mut client);
        assert_eq!(client.take(), vec!["update_more_resources", "commit"]);
        assert!(s.redraw_pending());
        assert!(s.frame_rate_controller().is_active());

        assert!(s.did_vsync(&mut client));
        assert_eq!(client.take(), vec!["draw_if_possible"]);
        assert_eq!(s.state_machine().commit_state(), CommitState::Idle);
    }

    #[test]
    fn resource_uploads_span_several_vsyncs() {
        let mut client = RecordingClient::drawing();
        client.resource_batches_left = 3;
        let mut s = ready(VSyncMode::External, &mut client);

        s.set_needs_commit(&mut client);
        s.begin_frame_complete(&mut client);
        assert_eq!(client.take(), vec!["begin_frame", "update_more_resources"]);

        assert!(s.did_vsync(&mut client));
        assert_eq!(client.take(), vec!["update_more_resources"]);
        assert!(s.did_vsync(&mut client));
        assert_eq!(
            client.take(),
            vec!["update_more_resources", "commit", "draw_if_possible"]
        );
    }

    #[test]
    fn swaps_throttle_vsync() {
        let mut client = RecordingClient::drawing();
        let mut s = ready(VSyncMode::External, &mut client);

        s.set_needs_redraw(&mut client);
        assert!(s.did_vsync(&mut client));
        assert_eq!(client.take(), vec!["draw_if_possible"]);

        s.set_needs_redraw(&mut client);
        assert!(!s.did_vsync(&mut client));
        assert!(client.take().is_empty());

        s.did_swap_buffers_complete();
        assert!(s.did_vsync(&mut client));
        assert_eq!(client.take(), vec!["draw_if_possible"]);
    }

    #[test]
    fn draw_failure_requests_commit() {
        let mut client = RecordingClient::drawing();
        client.draw_result = DrawAndSwapResult::failed();
        let mut s = ready(VSyncMode::External, &mut client);

        s.set_needs_redraw(&mut client);
        s.did_vsync(&mut client);
        assert_eq!(client.take(), vec!["draw_if_possible", "begin_frame"]);
    }

    #[test]
    fn context_loss_is_not_counted_as_a_failed_draw() {
        let config = ProxyConfig {
            vsync: VSyncMode::External,
            max_frames_pending: 1,
            max_consecutive_failed_draws: 1,
            ..Default::default()
        };
        let mut client = RecordingClient::drawing();
        client.draw_result = DrawAndSwapResult::context_lost();
        let mut s = Scheduler::from_config(&config, Instant::now());
        s.set_can_begin_frame(true, &mut client);
        s.set_visible(true, &mut client);

        s.set_needs_redraw(&mut client);
        s.did_vsync(&mut client);
        assert_eq!(
            client.take(),
            vec!["draw_if_possible", "begin_context_recreation"]
        );

        client.draw_result = DrawAndSwapResult::drawn_and_swapped();
        client.resource_batches_left = 1;
        s.did_recreate_context(&mut client);
        assert_eq!(client.take(), vec!["begin_frame"]);
        s.begin_frame_complete(&mut client);
        assert_eq!(
            client.take(),
            vec!["update_more_resources", "commit"],
            "the first frame after recreation should wait for vsync, not be forced"
        );

        assert!(s.did_vsync(&mut client));
        assert_eq!(client.take(), vec!["draw_if_possible"]);
    }

    #[test]
    fn context_loss_during_draw_starts_recreation() {
        let mut client = RecordingClient::drawing();
        client.draw_result = DrawAndSwapResult::context_lost();
        let mut s = ready(VSyncMode::External, &mut client);

        s.set_needs_redraw(&mut client);
        s.did_vsync(&mut client);
        assert_eq!(
            client.take(),
            vec!["draw_if_possible", "begin_context_recreation"]
        );
        assert_eq!(s.state_machine().context_state(), ContextState::Recreating);
        assert_eq!(s.frame_rate_controller().num_frames_pending(), 0);

        assert!(!s.did_lose_context(&mut client));
    }

    #[test]
    fn unthrottled_ticks_are_due_immediately() {
        let mut client = RecordingClient::drawing();
        let mut s = ready(VSyncMode::Unthrottled, &mut client);
        let now = Instant::now();
        assert_eq!(s.next_tick_deadline(now), None);

        s.set_needs_redraw(&mut client);
        assert_eq!(s.next_tick_deadline(now), Some(now));
        assert!(s.poll_tick(now, &mut client));
        assert_eq!(client.take(), vec!["draw_if_possible"]);
        assert_eq!(s.next_tick_deadline(now), None);
    }

    #[test]
    fn timer_ticks_wait_for_the_deadline() {
        let mut client = RecordingClient::drawing();
        let mut s = ready(VSyncMode::Timer, &mut client);
        s.set_needs_redraw(&mut client);

        let deadline = s
            .next_tick_deadline(Instant::now())
            .expect("redraw should arm the timer");
        assert!(s.poll_tick(deadline, &mut client));
        assert_eq!(client.take(), vec!["draw_if_possible"]);
    }

    #[test]
    fn leftover_uploads_resume_without_external_vsync() {
        let mut client = RecordingClient::drawing();
        client.resource_batches_left = 2;
        let mut s = ready(VSyncMode::External, &mut client);

        s.set_needs_commit(&mut client);
        s.begin_frame_complete(&mut client);
        assert_eq!(client.take(), vec!["begin_frame", "update_more_resources"]);

        let deadline = s
            .next_tick_deadline(Instant::now())
            .expect("leftover uploads should arm a retry");
        assert!(s.poll_tick(deadline, &mut client));
        assert_eq!(
            client.take(),
            vec!["update_more_resources", "commit", "draw_if_possible"]
        );
    }

    #[test]
    fn hidden_scheduler_stays_quiet() {
        let mut client = RecordingClient::drawing();
        let mut s = scheduler(VSyncMode::External);
        s.set_can_begin_frame(true, &mut client);
        s.set_needs_commit(&mut client);
        s.set_needs_redraw(&mut client);
        assert!(client.take().is_empty());
        assert!(!s.frame_rate_controller().is_active());
        assert!(s.commit_pending());
    }
}
