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

//! The impl-thread loop.

use crate::impl_state::ImplThreadState;
use crate::messages::{ImplThreadAction, MainThreadAction};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::ops::ControlFlow;
use std::time::Instant;
use tandem_core::{CompletionEvent, InputHandler, ProxyConfig, Renderer};
use tandem_scheduler::{CommitState, Scheduler, SchedulerClient};

/// Owns the scheduler and the impl state, and runs messages and vsync ticks
/// until the main thread closes it.
pub(crate) struct ImplThread {
    scheduler: Scheduler,
    state: ImplThreadState,
    receiver: Receiver<ImplThreadAction>,
}

impl ImplThread {
    pub fn new(
        config: &ProxyConfig,
        renderer: Box<dyn Renderer>,
        input_handler: Option<Box<dyn InputHandler>>,
        receiver: Receiver<ImplThreadAction>,
        main: Sender<MainThreadAction>,
    ) -> Self {
        Self {
            scheduler: Scheduler::from_config(config, Instant::now()),
            state: ImplThreadState::new(config, renderer, input_handler, main),
            receiver,
        }
    }

    pub fn run(mut self) {
        log::info!("Impl thread started.");
        let closed = loop {
            let message = match self.scheduler.next_tick_deadline(Instant::now()) {
                Some(deadline) => match self.receiver.recv_deadline(deadline) {
                    Ok(action) => Some(action),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break None,
                },
                None => match self.receiver.recv() {
                    Ok(action) => Some(action),
                    Err(_) => break None,
                },
            };

            if let Some(action) = message {
                log::trace!("Impl thread handling {}", action.name());
                if let ControlFlow::Break(done) = self.handle(action) {
                    break Some(done);
                }
            }
            self.poll_vsync();
            self.flush_requests();
        };

        self.state.shutdown();
        drop(self);
        if let Some(done) = closed {
            done.complete();
        }
        log::info!("Impl thread stopped.");
    }

    fn poll_vsync(&mut self) {
        let now = Instant::now();
        self.state.set_frame_time(Some(now));
        self.scheduler.poll_tick(now, &mut self.state);
        self.state.set_frame_time(None);
    }

    /// Feeds follow-ups raised by actions back into the scheduler.
    fn flush_requests(&mut self) {
        loop {
            let requests = self.state.take_requests();
            if requests.is_empty() {
                return;
            }
            for _ in 0..requests.swaps_completed {
                self.scheduler.did_swap_buffers_complete();
            }
            if requests.context_lost {
                self.scheduler.did_lose_context(&mut self.state);
            }
            if requests.commit {
                self.scheduler.set_needs_commit(&mut self.state);
            }
            if requests.redraw {
                self.scheduler.set_needs_redraw(&mut self.state);
            }
        }
    }

    fn frame_in_progress(&self) -> bool {
        self.scheduler.state_machine().commit_state() == CommitState::FrameInProgress
    }

    fn handle(&mut self, action: ImplThreadAction) -> ControlFlow<CompletionEvent> {
        match action {
            ImplThreadAction::InitializeContext { context } => {
                self.state.initialize_context(context);
            }
            ImplThreadAction::InitializeRenderer { completion } => {
                let result = self.state.initialize_renderer();
                if result.is_ok() {
                    self.scheduler.process_scheduled_actions(&mut self.state);
                }
                completion.signal(result);
            }
            ImplThreadAction::SetSurfaceReady => {
                self.scheduler.set_can_begin_frame(true, &mut self.state);
            }
            ImplThreadAction::SetVisible {
                visible,
                completion,
            } => {
                log::debug!("Impl thread visibility -> {visible}");
                self.state.set_visible(visible);
                self.scheduler.set_visible(visible, &mut self.state);
                if visible {
                    if self.state.contents_textures_purged() {
                        self.scheduler.set_needs_commit(&mut self.state);
                    }
                    self.scheduler.set_needs_redraw(&mut self.state);
                }
                completion.complete();
            }
            ImplThreadAction::SetNeedsCommit => {
                self.scheduler.set_needs_commit(&mut self.state);
            }
            ImplThreadAction::SetNeedsRedraw => {
                self.scheduler.set_needs_redraw(&mut self.state);
            }
            ImplThreadAction::SetNeedsForcedRedraw => {
                self.scheduler.set_needs_forced_redraw(&mut self.state);
            }
            ImplThreadAction::ForceBeginFrame { completion } => {
                if self.frame_in_progress() {
                    // The begin-frame is already on its way to the main thread.
                    completion.signal(None);
                } else {
                    self.state.set_forced_begin_frame(completion);
                    self.scheduler.set_needs_forced_commit(&mut self.state);
                }
            }
            ImplThreadAction::BeginFrameComplete { commit, completion } => {
                if self.frame_in_progress() {
                    self.state.receive_commit(commit, completion);
                    self.scheduler.begin_frame_complete(&mut self.state);
                } else {
                    log::warn!("Ignoring a frame that was never requested");
                    completion.complete();
                }
            }
            ImplThreadAction::BeginFrameAborted => {
                if self.frame_in_progress() {
                    log::debug!("Begin-frame aborted, retrying next frame");
                    self.scheduler.begin_frame_aborted(&mut self.state);
                }
            }
            ImplThreadAction::RequestReadback { rect, completion } => {
                // With a frame in progress the main thread would have to answer it first.
                if self.frame_in_progress() {
                    completion.signal(None);
                } else if self.state.request_readback(rect, completion) {
                    self.scheduler.set_needs_forced_redraw(&mut self.state);
                }
            }
            ImplThreadAction::FinishAllRendering { completion } => {
                if self.state.can_draw() {
                    self.scheduler.set_needs_forced_redraw(&mut self.state);
                }
                self.state.finish();
                completion.complete();
            }
            ImplThreadAction::AcquireLayerTextures { completion } => {
                self.state.set_texture_acquisition(completion);
                self.scheduler
                    .set_main_thread_needs_layer_textures(&mut self.state);
            }
            ImplThreadAction::ReleaseLayerTextures => {
                self.scheduler.did_release_layer_textures(&mut self.state);
            }
            ImplThreadAction::LoseContext => {
                self.state.note_context_lost();
            }
            ImplThreadAction::RecreateContext {
                context,
                completion,
            } => {
                let result = self.state.recreate_context(context);
                if result.is_ok() {
                    self.scheduler.did_recreate_context(&mut self.state);
                }
                completion.signal(result);
            }
            ImplThreadAction::SetVSyncParameters { timebase, interval } => {
                self.scheduler.set_timebase_and_interval(timebase, interval);
            }
            ImplThreadAction::DidVSync { frame_time } => {
                self.state.set_frame_time(Some(frame_time));
                self.scheduler.did_vsync(&mut self.state);
                self.state.set_frame_time(None);
            }
            ImplThreadAction::RenderingStats { completion } => {
                completion.signal(self.state.stats());
            }
            ImplThreadAction::Close { completion } => return ControlFlow::Break(completion),
        }
        ControlFlow::Continue(())
    }
}
