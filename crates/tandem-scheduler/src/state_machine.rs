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

//! The begin-frame / commit / draw decision table.
//!
//! The state machine owns no resources and performs no work. Inputs flip
//! flags; [`SchedulerStateMachine::next_action`] reads them and
//! [`SchedulerStateMachine::update_state`] records that an action was taken.
//!
//! Priorities, highest first:
//!
//! | Situation | Action |
//! |---|---|
//! | Main thread waits for textures and no draw is due | `AcquireLayerTexturesForMainThread` |
//! | Forced commit while the context is not active | `BeginFrame` |
//! | Context lost | `BeginContextRecreation` |
//! | Forced redraw, no commit in flight | `DrawForced` |
//! | Commit requested and a frame may begin | `BeginFrame` |
//! | Redraw requested inside vsync | `DrawIfPossible` |

use std::fmt;

/// Progress of the current commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitState {
    /// No commit in flight.
    #[default]
    Idle,
    /// The main thread is building the next frame.
    FrameInProgress,
    /// Resource uploads for the incoming frame are being performed.
    UpdatingResources,
    /// Uploads are done; the tree can be swapped in.
    ReadyToCommit,
    /// The commit landed and its first draw is still pending.
    WaitingForFirstDraw,
}

/// Ownership of the layer textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureState {
    /// Nobody holds the textures.
    #[default]
    Unlocked,
    /// The main thread renders into them; the impl thread must not draw.
    AcquiredByMainThread,
    /// The impl thread draws from them.
    AcquiredByImplThread,
}

/// Health of the graphics context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextState {
    /// The context is usable.
    #[default]
    Active,
    /// The context was lost and recreation has not started.
    Lost,
    /// The main thread is recreating the context.
    Recreating,
}

/// What the scheduler should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    /// Nothing to do until the next input.
    None,
    /// Ask the main thread for a new frame.
    BeginFrame,
    /// Perform one time-limited batch of resource uploads.
    BeginUpdateMoreResources,
    /// Swap the pending scene into the impl thread.
    Commit,
    /// Draw unless something prevents it (e.g. purged textures).
    DrawIfPossible,
    /// Draw no matter what.
    DrawForced,
    /// Ask the main thread to recreate the graphics context.
    BeginContextRecreation,
    /// Hand the layer textures to the main thread.
    AcquireLayerTexturesForMainThread,
}

/// Flags and counters driving [`SchedulerAction`] selection.
#[derive(Clone)]
pub struct SchedulerStateMachine {
    commit_state: CommitState,
    texture_state: TextureState,
    context_state: ContextState,

    current_frame_number: u64,
    last_frame_number_where_draw_was_called: Option<u64>,
    last_frame_number_where_update_was_called: Option<u64>,
    last_frame_number_where_begin_frame_aborted: Option<u64>,

    consecutive_failed_draws: u32,
    max_consecutive_failed_draws: u32,
    draw_if_possible_failed: bool,

    needs_redraw: bool,
    needs_forced_redraw: bool,
    needs_forced_redraw_after_next_commit: bool,
    needs_commit: bool,
    needs_forced_commit: bool,
    main_thread_needs_layer_textures: bool,
    update_more_resources_pending: bool,

    inside_vsync: bool,
    visible: bool,
    can_begin_frame: bool,
    can_draw: bool,
}

impl SchedulerStateMachine {
    /// Creates an idle, invisible state machine.
    ///
    /// ## Arguments
    /// * `max_consecutive_failed_draws` - failed `DrawIfPossible` attempts before a forced draw.
    pub fn new(max_consecutive_failed_draws: u32) -> Self {
        Self {
            commit_state: CommitState::Idle,
            texture_state: TextureState::Unlocked,
            context_state: ContextState::Active,
            current_frame_number: 0,
            last_frame_number_where_draw_was_called: None,
            last_frame_number_where_update_was_called: None,
            last_frame_number_where_begin_frame_aborted: None,
            consecutive_failed_draws: 0,
            max_consecutive_failed_draws: max_consecutive_failed_draws.max(1),
            draw_if_possible_failed: false,
            needs_redraw: false,
            needs_forced_redraw: false,
            needs_forced_redraw_after_next_commit: false,
            needs_commit: false,
            needs_forced_commit: false,
            main_thread_needs_layer_textures: false,
            update_more_resources_pending: false,
            inside_vsync: false,
            visible: false,
            can_begin_frame: false,
            can_draw: false,
        }
    }

    /// Current commit progress.
    pub fn commit_state(&self) -> CommitState {
        self.commit_state
    }

    /// Current texture ownership.
    pub fn texture_state(&self) -> TextureState {
        self.texture_state
    }

    /// Current context health.
    pub fn context_state(&self) -> ContextState {
        self.context_state
    }

    /// Number of vsync frames seen so far.
    pub fn current_frame_number(&self) -> u64 {
        self.current_frame_number
    }

    /// A commit has started and has not been swapped in yet.
    pub fn commit_in_flight(&self) -> bool {
        matches!(
            self.commit_state,
            CommitState::FrameInProgress
                | CommitState::UpdatingResources
                | CommitState::ReadyToCommit
        )
    }

    /// A commit is requested or in flight.
    pub fn commit_pending(&self) -> bool {
        self.needs_commit || self.commit_in_flight()
    }

    /// A redraw of either kind is requested.
    pub fn redraw_pending(&self) -> bool {
        self.needs_redraw || self.needs_forced_redraw
    }

    /// The main thread is waiting for texture ownership.
    pub fn main_thread_needs_layer_textures(&self) -> bool {
        self.main_thread_needs_layer_textures
    }

    /// Returns `true` while the committed visible state allows drawing.
    pub fn visible(&self) -> bool {
        self.visible
    }

    fn has_drawn_this_frame(&self) -> bool {
        self.last_frame_number_where_draw_was_called == Some(self.current_frame_number)
    }

    fn has_updated_resources_this_frame(&self) -> bool {
        self.last_frame_number_where_update_was_called == Some(self.current_frame_number)
    }

    fn begin_frame_aborted_this_frame(&self) -> bool {
        self.last_frame_number_where_begin_frame_aborted == Some(self.current_frame_number)
    }

    fn draw_suspended_until_commit(&self) -> bool {
        self.texture_state == TextureState::AcquiredByMainThread
    }

    /// Something other than vsync pacing keeps a regular draw from happening.
    fn draw_blocked(&self) -> bool {
        self.draw_suspended_until_commit()
            || self.context_state != ContextState::Active
            || !self.visible
            || !self.can_draw
    }

    fn should_draw(&self) -> bool {
        if self.draw_suspended_until_commit() || self.commit_in_flight() {
            return false;
        }
        if self.context_state != ContextState::Active {
            return false;
        }
        if self.needs_forced_redraw {
            return true;
        }
        self.needs_redraw
            && self.inside_vsync
            && self.visible
            && self.can_draw
            && !self.has_drawn_this_frame()
    }

    fn can_begin_frame_now(&self) -> bool {
        if self.needs_forced_commit {
            return true;
        }
        self.visible && self.can_begin_frame && !self.begin_frame_aborted_this_frame()
    }

    fn should_acquire_layer_textures_for_main_thread(&self) -> bool {
        if !self.main_thread_needs_layer_textures {
            return false;
        }
        match self.texture_state {
            TextureState::Unlocked | TextureState::AcquiredByMainThread => true,
            // Never hand them over right before the impl thread is about to draw.
            TextureState::AcquiredByImplThread => !self.should_draw(),
        }
    }

    fn draw_action(&self) -> SchedulerAction {
        if self.needs_forced_redraw {
            SchedulerAction::DrawForced
        } else {
            SchedulerAction::DrawIfPossible
        }
    }

    /// Picks the next action from the current flags.
    pub fn next_action(&self) -> SchedulerAction {
        if self.should_acquire_layer_textures_for_main_thread() {
            return SchedulerAction::AcquireLayerTexturesForMainThread;
        }

        match self.commit_state {
            CommitState::Idle => {
                // A blocked readback needs its frame even without a context.
                if self.context_state != ContextState::Active
                    && self.needs_commit
                    && self.needs_forced_commit
                {
                    return SchedulerAction::BeginFrame;
                }
                match self.context_state {
                    ContextState::Lost => return SchedulerAction::BeginContextRecreation,
                    ContextState::Recreating => return SchedulerAction::None,
                    ContextState::Active => {}
                }
                if self.needs_forced_redraw && self.should_draw() {
                    return SchedulerAction::DrawForced;
                }
                if self.needs_commit && self.can_begin_frame_now() {
                    return SchedulerAction::BeginFrame;
                }
                if self.should_draw() {
                    return self.draw_action();
                }
                SchedulerAction::None
            }
            CommitState::FrameInProgress => SchedulerAction::None,
            CommitState::UpdatingResources => {
                if !self.update_more_resources_pending && !self.has_updated_resources_this_frame()
                {
                    SchedulerAction::BeginUpdateMoreResources
                } else {
                    SchedulerAction::None
                }
            }
            CommitState::ReadyToCommit => SchedulerAction::Commit,
            CommitState::WaitingForFirstDraw => {
                if self.should_draw() {
                    return self.draw_action();
                }
                // A blocked first draw must not hold back the next commit; a forced
                // commit (readback) never waits for it.
                if self.needs_commit
                    && (self.needs_forced_commit
                        || (self.can_begin_frame_now() && self.draw_blocked()))
                {
                    return SchedulerAction::BeginFrame;
                }
                SchedulerAction::None
            }
        }
    }

    /// Records that `action` is being performed.
    pub fn update_state(&mut self, action: SchedulerAction) {
        match action {
            SchedulerAction::None => {}
            SchedulerAction::BeginFrame => {
                self.commit_state = CommitState::FrameInProgress;
                self.needs_commit = false;
                self.needs_forced_commit = false;
            }
            SchedulerAction::BeginUpdateMoreResources => {
                self.update_more_resources_pending = true;
            }
            SchedulerAction::Commit => {
                self.commit_state = if self.context_state == ContextState::Active {
                    CommitState::WaitingForFirstDraw
                } else {
                    CommitState::Idle
                };
                self.needs_redraw = true;
                if self.draw_if_possible_failed {
                    // The commit brings the content the failed draw was missing.
                    self.last_frame_number_where_draw_was_called = None;
                }
                if self.needs_forced_redraw_after_next_commit {
                    self.needs_forced_redraw_after_next_commit = false;
                    self.needs_forced_redraw = true;
                }
                self.texture_state = TextureState::AcquiredByImplThread;
            }
            SchedulerAction::DrawIfPossible | SchedulerAction::DrawForced => {
                self.needs_redraw = false;
                self.needs_forced_redraw = false;
                self.draw_if_possible_failed = false;
                if self.inside_vsync {
                    self.last_frame_number_where_draw_was_called = Some(self.current_frame_number);
                }
                if self.commit_state == CommitState::WaitingForFirstDraw {
                    self.commit_state = CommitState::Idle;
                }
                self.texture_state = TextureState::AcquiredByImplThread;
            }
            SchedulerAction::BeginContextRecreation => {
                self.context_state = ContextState::Recreating;
            }
            SchedulerAction::AcquireLayerTexturesForMainThread => {
                self.texture_state = TextureState::AcquiredByMainThread;
                self.main_thread_needs_layer_textures = false;
            }
        }
    }

    /// Returns `true` if vsync ticks are needed to make progress.
    pub fn vsync_callback_needed(&self) -> bool {
        if self.commit_state == CommitState::UpdatingResources
            && !self.update_more_resources_pending
            && self.has_updated_resources_this_frame()
        {
            return true;
        }
        if self.needs_commit && self.begin_frame_aborted_this_frame() {
            return true;
        }
        if self.commit_in_flight() {
            return false;
        }
        self.needs_redraw && !self.draw_blocked()
    }

    /// A vsync tick started; the frame number advances.
    pub fn did_enter_vsync(&mut self) {
        self.current_frame_number += 1;
        self.inside_vsync = true;
    }

    /// The vsync tick ended.
    pub fn did_leave_vsync(&mut self) {
        self.inside_vsync = false;
    }

    /// Returns `true` between `did_enter_vsync` and `did_leave_vsync`.
    pub fn inside_vsync(&self) -> bool {
        self.inside_vsync
    }

    /// The output became visible or hidden.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// The output surface is ready for frames.
    pub fn set_can_begin_frame(&mut self, can: bool) {
        self.can_begin_frame = can;
    }

    /// Whether the impl thread has everything it needs to draw.
    pub fn set_can_draw(&mut self, can: bool) {
        self.can_draw = can;
    }

    /// Requests a draw at the next vsync.
    pub fn set_needs_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Requests a draw that ignores visibility and readiness.
    pub fn set_needs_forced_redraw(&mut self) {
        self.needs_forced_redraw = true;
    }

    /// Requests a commit. Repeated requests coalesce.
    pub fn set_needs_commit(&mut self) {
        self.needs_commit = true;
    }

    /// Requests a commit that ignores visibility.
    pub fn set_needs_forced_commit(&mut self) {
        self.needs_commit = true;
        self.needs_forced_commit = true;
    }

    /// The main thread asked for the layer textures.
    pub fn set_main_thread_needs_layer_textures(&mut self) {
        self.main_thread_needs_layer_textures = true;
    }

    /// The main thread gave the layer textures back without committing.
    pub fn did_release_layer_textures(&mut self) {
        if self.texture_state == TextureState::AcquiredByMainThread {
            self.texture_state = TextureState::Unlocked;
        }
    }

    /// The main thread finished building the frame.
    pub fn begin_frame_complete(&mut self) {
        debug_assert_eq!(self.commit_state, CommitState::FrameInProgress);
        self.commit_state = CommitState::UpdatingResources;
        self.update_more_resources_pending = false;
        self.last_frame_number_where_update_was_called = None;
    }

    /// The main thread declined to build the frame; retry at the next vsync.
    pub fn begin_frame_aborted(&mut self) {
        debug_assert_eq!(self.commit_state, CommitState::FrameInProgress);
        self.commit_state = CommitState::Idle;
        self.needs_commit = true;
        self.last_frame_number_where_begin_frame_aborted = Some(self.current_frame_number);
    }

    /// A batch of uploads finished.
    pub fn begin_update_more_resources_complete(&mut self, has_more: bool) {
        self.update_more_resources_pending = false;
        if self.commit_state != CommitState::UpdatingResources {
            return;
        }
        if has_more {
            self.last_frame_number_where_update_was_called = Some(self.current_frame_number);
        } else {
            self.commit_state = CommitState::ReadyToCommit;
        }
    }

    /// Reports the outcome of a `DrawIfPossible`.
    pub fn did_draw_if_possible_completed(&mut self, success: bool) {
        self.draw_if_possible_failed = !success;
        if success {
            self.consecutive_failed_draws = 0;
            return;
        }
        self.needs_redraw = true;
        self.needs_commit = true;
        self.consecutive_failed_draws += 1;
        if self.consecutive_failed_draws >= self.max_consecutive_failed_draws {
            self.consecutive_failed_draws = 0;
            // Forcing only makes sense once new content has arrived.
            self.needs_forced_redraw_after_next_commit = true;
        }
    }

    /// The context was lost. Returns `false` if the loss was already known.
    pub fn did_lose_context(&mut self) -> bool {
        if self.context_state != ContextState::Active {
            return false;
        }
        self.context_state = ContextState::Lost;
        self.needs_forced_redraw = false;
        if self.commit_state == CommitState::WaitingForFirstDraw {
            self.commit_state = CommitState::Idle;
        }
        true
    }

    /// The context was recreated; fresh content is needed.
    pub fn did_recreate_context(&mut self) {
        self.context_state = ContextState::Active;
        self.needs_commit = true;
        self.needs_redraw = true;
    }
}

impl fmt::Debug for SchedulerStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerStateMachine")
            .field("commit_state", &self.commit_state)
            .field("texture_state", &self.texture_state)
            .field("context_state", &self.context_state)
            .field("frame", &self.current_frame_number)
            .field("needs_commit", &self.needs_commit)
            .field("needs_forced_commit", &self.needs_forced_commit)
            .field("needs_redraw", &self.needs_redraw)
            .field("needs_forced_redraw", &self.needs_forced_redraw)
            .field("visible", &self.visible)
            .field("can_draw", &self.can_draw)
            .finish()
    }
}

impl Default for SchedulerStateMachine {
    fn default() -> Self {
        Self::new(3)
    }
}
