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

//! The main-thread face of the compositor.

use crate::error::ProxyError;
use crate::impl_thread::ImplThread;
use crate::main_thread::{MainThreadState, RecreationOutcome};
use crate::messages::{ImplThreadAction, MainThreadAction, PendingCommit};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tandem_core::{
    completion_pair, BeginFrameState, CompletionError, CompletionEvent, GraphicsContext,
    InputHandler, ProxyConfig, Rect, RenderError, Renderer, RendererCapabilities, RenderingStats,
    ResourceUpdateQueue, SceneHost,
};

static NEXT_COMPOSITOR_IDENTIFIER: AtomicU64 = AtomicU64::new(1);

/// Everything the impl thread takes with it when it starts.
struct Startup {
    renderer: Box<dyn Renderer>,
    input_handler: Option<Box<dyn InputHandler>>,
    impl_receiver: Receiver<ImplThreadAction>,
    main_sender: Sender<MainThreadAction>,
}

/// Coordinates the main thread (scene owner) with the impl thread (renderer).
///
/// Non-blocking calls post a message and return. Blocking calls post a
/// message carrying a [`CompletionEvent`] and wait for the impl thread to
/// signal it, bounded by [`ProxyConfig::blocking_call_timeout`].
///
/// Callbacks to the [`SceneHost`] run only on the main thread, inside
/// [`ThreadProxy::dispatch_main_thread_tasks`],
/// [`ThreadProxy::wait_for_main_thread_tasks`] or
/// [`ThreadProxy::composite_and_readback`].
///
/// # Example
///
/// ```no_run
/// # use tandem_core::{ProxyConfig, Renderer, SceneHost, GraphicsContext};
/// # use tandem_proxy::ThreadProxy;
/// # use std::time::Duration;
/// # fn demo(renderer: Box<dyn Renderer>, context: Box<dyn GraphicsContext>, host: &mut dyn SceneHost) -> Result<(), tandem_proxy::ProxyError> {
/// let mut proxy = ThreadProxy::new(ProxyConfig::default(), renderer, None)?;
/// proxy.start()?;
/// proxy.initialize_context(context);
/// proxy.initialize_renderer()?;
/// proxy.set_surface_ready();
/// proxy.set_visible(true)?;
/// proxy.set_needs_commit();
/// proxy.wait_for_main_thread_tasks(host, Duration::from_millis(16));
/// proxy.stop();
/// # Ok(())
/// # }
/// ```
pub struct ThreadProxy {
    config: ProxyConfig,
    main: MainThreadState,
    impl_sender: Sender<ImplThreadAction>,
    main_receiver: Receiver<MainThreadAction>,
    startup: Option<Startup>,
    impl_thread: Option<JoinHandle<()>>,
    stopped: bool,
    compositor_identifier: u64,
}

impl ThreadProxy {
    /// Creates a proxy. The impl thread does not run until [`ThreadProxy::start`].
    ///
    /// Messages posted before `start` are kept and handled in order once it runs.
    pub fn new(
        config: ProxyConfig,
        renderer: Box<dyn Renderer>,
        input_handler: Option<Box<dyn InputHandler>>,
    ) -> Result<Self, ProxyError> {
        config.validate()?;
        let (impl_sender, impl_receiver) = crossbeam_channel::unbounded();
        let (main_sender, main_receiver) = crossbeam_channel::unbounded();
        Ok(Self {
            config,
            main: MainThreadState::default(),
            impl_sender,
            main_receiver,
            startup: Some(Startup {
                renderer,
                input_handler,
                impl_receiver,
                main_sender,
            }),
            impl_thread: None,
            stopped: false,
            compositor_identifier: NEXT_COMPOSITOR_IDENTIFIER.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Spawns the impl thread and blocks until it is ready.
    pub fn start(&mut self) -> Result<(), ProxyError> {
        let startup = self.startup.take().ok_or(ProxyError::AlreadyStarted)?;
        let config = self.config.clone();
        let (ready, ready_waiter) = completion_pair();

        let handle = thread::Builder::new()
            .name(format!("tandem-impl-{}", self.compositor_identifier))
            .spawn(move || {
                let impl_thread = ImplThread::new(
                    &config,
                    startup.renderer,
                    startup.input_handler,
                    startup.impl_receiver,
                    startup.main_sender,
                );
                ready.complete();
                impl_thread.run();
            })?;
        self.impl_thread = Some(handle);

        ready_waiter.wait_with(self.config.blocking_call_timeout)?;
        log::info!("Compositor {} started", self.compositor_identifier);
        Ok(())
    }

    /// Returns `true` between a successful `start` and `stop`.
    pub fn is_started(&self) -> bool {
        self.impl_thread.is_some()
    }

    /// Unique identifier of this proxy within the process.
    pub fn compositor_identifier(&self) -> u64 {
        self.compositor_identifier
    }

    /// The configuration the proxy was created with.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    fn post(&self, action: ImplThreadAction) {
        let name = action.name();
        if self.impl_sender.send(action).is_err() {
            log::debug!("Impl thread gone, dropping {name}");
        }
    }

    /// Posts a request and blocks for its answer.
    fn call<T>(
        &self,
        make: impl FnOnce(CompletionEvent<T>) -> ImplThreadAction,
    ) -> Result<T, ProxyError> {
        if !self.is_started() {
            return Err(ProxyError::NotStarted);
        }
        let (completion, waiter) = completion_pair();
        self.impl_sender
            .send(make(completion))
            .map_err(|_| CompletionError::Abandoned)?;
        Ok(waiter.wait_with(self.config.blocking_call_timeout)?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Renderer lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Hands the graphics context to the impl thread.
    pub fn initialize_context(&mut self, context: Box<dyn GraphicsContext>) {
        self.post(ImplThreadAction::InitializeContext { context });
    }

    /// Initializes the renderer on the impl thread with the context passed to
    /// [`ThreadProxy::initialize_context`]. Blocking.
    pub fn initialize_renderer(&mut self) -> Result<RendererCapabilities, ProxyError> {
        let capabilities =
            self.call(|completion| ImplThreadAction::InitializeRenderer { completion })??;
        self.main.renderer_ready(capabilities.clone());
        Ok(capabilities)
    }

    /// The capabilities reported by the last successful initialization.
    pub fn renderer_capabilities(&self) -> Option<&RendererCapabilities> {
        self.main.renderer_capabilities()
    }

    /// Partial texture updates the scene owner may queue per frame.
    pub fn max_partial_texture_updates(&self) -> usize {
        match self.main.renderer_capabilities() {
            Some(capabilities) if !capabilities.supports_partial_texture_updates => 0,
            _ => self.config.max_partial_texture_updates,
        }
    }

    /// Returns `true` once context recreation has failed for good.
    pub fn context_recreation_failed(&self) -> bool {
        self.main.recreation_failed()
    }

    /// The output surface can now accept frames.
    pub fn set_surface_ready(&mut self) {
        self.post(ImplThreadAction::SetSurfaceReady);
    }

    /// Shows or hides the output. Blocking: hiding releases renderer resources
    /// before this returns.
    pub fn set_visible(&mut self, visible: bool) -> Result<(), ProxyError> {
        log::debug!("Compositor {} visible: {visible}", self.compositor_identifier);
        self.call(|completion| ImplThreadAction::SetVisible {
            visible,
            completion,
        })
    }

    /// Simulates a graphics context loss on the impl thread.
    pub fn lose_context(&mut self) {
        self.post(ImplThreadAction::LoseContext);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Frame requests
    // ─────────────────────────────────────────────────────────────────────

    /// Asks for a new frame from the scene owner. Requests coalesce until the
    /// next begin-frame reaches the main thread.
    pub fn set_needs_commit(&mut self) {
        if self.main.request_commit() {
            self.post(ImplThreadAction::SetNeedsCommit);
        }
    }

    /// Asks for a begin-frame so the scene owner can animate.
    pub fn set_needs_animate(&mut self) {
        log::trace!("Animation requested");
        self.set_needs_commit();
    }

    /// Returns `true` between a commit request and the begin-frame that serves it.
    pub fn commit_requested(&self) -> bool {
        self.main.commit_requested()
    }

    /// Asks for the committed frame to be drawn again.
    pub fn set_needs_redraw(&mut self) {
        self.post(ImplThreadAction::SetNeedsRedraw);
    }

    /// Asks for a draw that ignores visibility and readiness.
    pub fn set_needs_forced_redraw(&mut self) {
        self.post(ImplThreadAction::SetNeedsForcedRedraw);
    }

    /// Re-phases the internal vsync timer.
    pub fn set_vsync_parameters(&mut self, timebase: Instant, interval: Duration) {
        self.post(ImplThreadAction::SetVSyncParameters { timebase, interval });
    }

    /// Delivers a vsync when configured with [`VSyncMode::External`](tandem_core::VSyncMode::External).
    pub fn did_vsync(&mut self, frame_time: Instant) {
        self.post(ImplThreadAction::DidVSync { frame_time });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Blocking calls
    // ─────────────────────────────────────────────────────────────────────

    /// Blocks until the impl thread has drained its rendering work.
    pub fn finish_all_rendering(&mut self) -> Result<(), ProxyError> {
        self.call(|completion| ImplThreadAction::FinishAllRendering { completion })
    }

    /// Takes the layer textures for main-thread rendering. Blocks until the
    /// impl thread is not about to draw; drawing stays suspended until
    /// [`ThreadProxy::release_layer_textures`] or the next commit.
    pub fn acquire_layer_textures(&mut self) -> Result<(), ProxyError> {
        if self.main.textures_acquired() {
            return Ok(());
        }
        self.call(|completion| ImplThreadAction::AcquireLayerTextures { completion })?;
        self.main.set_textures_acquired(true);
        Ok(())
    }

    /// Gives the layer textures back to the impl thread.
    pub fn release_layer_textures(&mut self) {
        if self.main.textures_acquired() {
            self.main.set_textures_acquired(false);
            self.post(ImplThreadAction::ReleaseLayerTextures);
        }
    }

    /// Copies the impl thread's rendering counters.
    pub fn impl_side_rendering_stats(&self) -> Result<RenderingStats, ProxyError> {
        self.call(|completion| ImplThreadAction::RenderingStats { completion })
    }

    /// Forces a frame right now and reads `rect` back into `pixels` (RGBA8).
    ///
    /// Works while hidden. Returns `false` if there is no renderer or output
    /// surface, if `pixels` is too small, or if the frame could not be drawn.
    pub fn composite_and_readback(
        &mut self,
        host: &mut dyn SceneHost,
        pixels: &mut [u8],
        rect: Rect,
    ) -> bool {
        if !self.is_started() || !self.main.renderer_initialized() {
            return false;
        }
        let needed = rect.width as usize * rect.height as usize * 4;
        if pixels.len() < needed {
            log::warn!(
                "Readback buffer holds {} bytes, {needed} needed",
                pixels.len()
            );
            return false;
        }

        let state = match self.call(|completion| ImplThreadAction::ForceBeginFrame { completion })
        {
            Ok(Some(state)) => Some(state),
            Ok(None) => self.take_queued_begin_frame(),
            Err(error) => {
                log::warn!("Forced begin-frame failed: {error}");
                None
            }
        };
        let Some(state) = state else {
            return false;
        };
        self.run_begin_frame(host, state);

        match self.call(|completion| ImplThreadAction::RequestReadback { rect, completion }) {
            Ok(Some(data)) if data.len() <= pixels.len() => {
                pixels[..data.len()].copy_from_slice(&data);
                true
            }
            Ok(_) => false,
            Err(error) => {
                log::warn!("Readback failed: {error}");
                false
            }
        }
    }

    /// Finds the begin-frame the impl thread already sent, deferring other tasks.
    fn take_queued_begin_frame(&mut self) -> Option<BeginFrameState> {
        if let Some(state) = self.main.take_deferred_begin_frame() {
            return Some(state);
        }
        let deadline = self
            .config
            .blocking_call_timeout
            .map(|timeout| Instant::now() + timeout);
        loop {
            let task = match deadline {
                Some(deadline) => self.main_receiver.recv_deadline(deadline).ok()?,
                None => self.main_receiver.recv().ok()?,
            };
            match task {
                MainThreadAction::BeginFrame(state) => return Some(state),
                other => self.main.defer(other),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Main-thread pump
    // ─────────────────────────────────────────────────────────────────────

    /// Runs every task the impl thread has posted so far. Returns how many ran.
    pub fn dispatch_main_thread_tasks(&mut self, host: &mut dyn SceneHost) -> usize {
        if self.stopped {
            return 0;
        }
        if self.main.recreation_due(Instant::now()) {
            self.try_recreate_context(host);
        }
        let mut dispatched = 0;
        while let Some(task) = self.next_main_task() {
            self.run_main_task(host, task);
            dispatched += 1;
        }
        dispatched
    }

    /// Waits up to `timeout` for a task (or a due recreation retry), then dispatches.
    pub fn wait_for_main_thread_tasks(
        &mut self,
        host: &mut dyn SceneHost,
        timeout: Duration,
    ) -> usize {
        if self.stopped {
            return 0;
        }
        if !self.main.has_deferred() {
            let mut deadline = Instant::now() + timeout;
            if let Some(retry) = self.main.recreation_deadline() {
                deadline = deadline.min(retry);
            }
            if let Ok(task) = self.main_receiver.recv_deadline(deadline) {
                self.main.defer(task);
            }
        }
        self.dispatch_main_thread_tasks(host)
    }

    fn next_main_task(&mut self) -> Option<MainThreadAction> {
        self.main
            .next_deferred()
            .or_else(|| self.main_receiver.try_recv().ok())
    }

    fn run_main_task(&mut self, host: &mut dyn SceneHost, task: MainThreadAction) {
        match task {
            MainThreadAction::BeginFrame(state) => self.run_begin_frame(host, state),
            MainThreadAction::DidCommitAndDrawFrame => host.did_commit_and_draw_frame(),
            MainThreadAction::DidCompleteSwapBuffers => host.did_complete_swap_buffers(),
            MainThreadAction::DidLoseContext => {
                self.main.did_lose_context();
                host.did_lose_context();
            }
            MainThreadAction::BeginContextRecreation => {
                self.main.start_recreation(Instant::now());
                self.try_recreate_context(host);
            }
            MainThreadAction::SetAnimationEvents {
                events,
                wall_clock_time,
            } => host.set_animation_events(events, wall_clock_time),
        }
    }

    /// Builds the frame the impl thread asked for and blocks until it is committed.
    fn run_begin_frame(&mut self, host: &mut dyn SceneHost, state: BeginFrameState) {
        self.main.begin_frame_started();
        if !self.main.renderer_initialized() {
            log::debug!("Aborting begin-frame: renderer not initialized");
            self.post(ImplThreadAction::BeginFrameAborted);
            return;
        }

        host.begin_frame(&state);
        let mut updates = ResourceUpdateQueue::new();
        host.update_scene(&mut updates, &state);
        let commit = PendingCommit {
            scene: host.scene_for_commit(),
            updates,
            textures_reuploaded: state.contents_textures_purged,
        };

        match self.call(|completion| ImplThreadAction::BeginFrameComplete { commit, completion }) {
            Ok(()) => host.did_commit(),
            Err(error) => log::warn!("Commit did not complete: {error}"),
        }
    }

    fn try_recreate_context(&mut self, host: &mut dyn SceneHost) {
        let Some(attempt) = self.main.begin_recreation_attempt() else {
            return;
        };
        log::debug!("Recreating graphics context, attempt {attempt}");

        let result = match host.create_context() {
            Some(context) => self
                .call(|completion| ImplThreadAction::RecreateContext {
                    context,
                    completion,
                })
                .and_then(|result| result.map_err(ProxyError::from)),
            None => Err(ProxyError::Renderer(RenderError::InitializationFailed(
                "the scene host did not provide a context".to_string(),
            ))),
        };

        match result {
            Ok(capabilities) => {
                self.main.recreation_succeeded(capabilities);
                log::info!("Graphics context recreated after {attempt} attempt(s)");
                host.did_recreate_context(true);
            }
            Err(error) => match self.main.recreation_attempt_failed(
                Instant::now(),
                self.config.max_context_recreation_attempts,
                self.config.context_recreation_retry_delay,
            ) {
                RecreationOutcome::Retry => {
                    log::warn!("Context recreation attempt {attempt} failed: {error}");
                }
                RecreationOutcome::GaveUp => {
                    log::error!("Giving up on context recreation after {attempt} attempts: {error}");
                    host.did_recreate_context(false);
                }
            },
        }
    }

    /// Tears the impl thread down. Blocking and idempotent.
    ///
    /// After this returns no [`SceneHost`] callback fires: pending
    /// impl-to-main tasks are discarded.
    pub fn stop(&mut self) {
        let Some(handle) = self.impl_thread.take() else {
            return;
        };
        log::info!("Stopping compositor {}", self.compositor_identifier);

        let (completion, waiter) = completion_pair();
        if self
            .impl_sender
            .send(ImplThreadAction::Close { completion })
            .is_ok()
        {
            if let Err(error) = waiter.wait_with(self.config.blocking_call_timeout) {
                log::warn!("Impl thread did not acknowledge close: {error}");
            }
        }
        if handle.join().is_err() {
            log::error!("Impl thread panicked");
        }

        let mut discarded = self.main.discard_tasks();
        while self.main_receiver.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            log::debug!("Discarded {discarded} main-thread tasks on stop");
        }
        self.stopped = true;
    }
}

impl Drop for ThreadProxy {
    fn drop(&mut self) {
        self.stop();
    }
}
