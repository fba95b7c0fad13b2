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

//! State owned by the impl thread.
//!
//! [`ImplThreadState`] holds the committed [`FrameState`], the renderer and the
//! input handler, and performs the work the scheduler picks. It never calls
//! back into the scheduler: anything it needs the scheduler to know is
//! recorded in [`ImplRequests`] and applied by the impl loop afterwards.

use crate::messages::{MainThreadAction, PendingCommit};
use crossbeam_channel::Sender;
use std::collections::{HashMap, HashSet};
use std::mem;
use std::time::{Instant, SystemTime};
use tandem_core::{
    AnimationEvent, AnimationEventKind, AnimationId, BeginFrameState, CompletionEvent,
    FrameState, GraphicsContext, InputHandler, LayerId, ProxyConfig, Rect, RenderError, Renderer,
    RendererCapabilities, RenderingStats, Scene,
};
use tandem_scheduler::{DrawAndSwapResult, SchedulerClient};

/// Memory budget advertised to the main thread while visible.
const VISIBLE_MEMORY_ALLOCATION_LIMIT_BYTES: usize = 64 * 1024 * 1024;

/// Follow-ups raised while an action ran.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImplRequests {
    pub redraw: bool,
    pub commit: bool,
    pub context_lost: bool,
    pub swaps_completed: u32,
}

impl ImplRequests {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

struct InFlightCommit {
    scene: Scene,
    textures_reuploaded: bool,
    received_at: Instant,
    completion: CompletionEvent,
}

struct ReadbackRequest {
    rect: Rect,
    completion: CompletionEvent<Option<Vec<u8>>>,
}

pub(crate) struct ImplThreadState {
    renderer: Box<dyn Renderer>,
    input_handler: Option<Box<dyn InputHandler>>,
    main: Sender<MainThreadAction>,
    max_resource_updates_per_batch: usize,

    frame: FrameState,
    context: Option<Box<dyn GraphicsContext>>,
    context_lost: bool,
    visible: bool,
    frame_time: Option<Instant>,
    textures_purged_since_begin_frame: bool,
    animation_starts: HashMap<(LayerId, AnimationId), Instant>,

    in_flight_commit: Option<InFlightCommit>,
    forced_begin_frame: Option<CompletionEvent<Option<BeginFrameState>>>,
    readback: Option<ReadbackRequest>,
    texture_acquisition: Option<CompletionEvent>,

    requests: ImplRequests,
    stats: RenderingStats,
}

impl ImplThreadState {
    pub fn new(
        config: &ProxyConfig,
        renderer: Box<dyn Renderer>,
        input_handler: Option<Box<dyn InputHandler>>,
        main: Sender<MainThreadAction>,
    ) -> Self {
        Self {
            renderer,
            input_handler,
            main,
            max_resource_updates_per_batch: config.max_resource_updates_per_batch,
            frame: FrameState::default(),
            context: None,
            context_lost: false,
            visible: false,
            frame_time: None,
            textures_purged_since_begin_frame: false,
            animation_starts: HashMap::new(),
            in_flight_commit: None,
            forced_begin_frame: None,
            readback: None,
            texture_acquisition: None,
            requests: ImplRequests::default(),
            stats: RenderingStats::default(),
        }
    }

    fn post(&self, action: MainThreadAction) {
        if let Err(error) = self.main.send(action) {
            log::debug!("Main thread gone, dropping {:?}", error.0);
        }
    }

    pub fn frame(&self) -> &FrameState {
        &self.frame
    }

    pub fn stats(&self) -> RenderingStats {
        self.stats.clone()
    }

    pub fn take_requests(&mut self) -> ImplRequests {
        mem::take(&mut self.requests)
    }

    /// Time reported to begin-frames and animations; the tick time while inside one.
    pub fn set_frame_time(&mut self, frame_time: Option<Instant>) {
        self.frame_time = frame_time;
    }

    fn now(&self) -> Instant {
        self.frame_time.unwrap_or_else(Instant::now)
    }

    pub fn initialize_context(&mut self, context: Box<dyn GraphicsContext>) {
        log::debug!("Received graphics context '{}'", context.label());
        self.context = Some(context);
    }

    pub fn initialize_renderer(&mut self) -> Result<RendererCapabilities, RenderError> {
        let context = self.context.take().ok_or_else(|| {
            RenderError::InitializationFailed("no graphics context was provided".to_string())
        })?;
        let capabilities = self.renderer.initialize(context)?;
        self.context_lost = false;
        log::info!("Renderer initialized: {capabilities:?}");
        Ok(capabilities)
    }

    pub fn recreate_context(
        &mut self,
        context: Box<dyn GraphicsContext>,
    ) -> Result<RendererCapabilities, RenderError> {
        let capabilities = self.renderer.initialize(context)?;
        self.context_lost = false;
        // Everything the old context held is gone.
        self.frame.contents_textures_purged = true;
        self.textures_purged_since_begin_frame = true;
        log::info!("Graphics context recreated");
        Ok(capabilities)
    }

    pub fn contents_textures_purged(&self) -> bool {
        self.frame.contents_textures_purged
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        self.renderer.set_visible(visible);
        if !visible {
            self.renderer.release_resources();
            self.frame.contents_textures_purged = true;
            self.textures_purged_since_begin_frame = true;
            log::debug!("Hidden: released renderer resources");
        }
    }

    /// Takes over the main thread's frame. Uploads are queued, the tree waits for `Commit`.
    pub fn receive_commit(&mut self, mut commit: PendingCommit, completion: CompletionEvent) {
        while let Some(update) = commit.updates.pop() {
            self.frame.pending_updates.push(update);
        }
        self.in_flight_commit = Some(InFlightCommit {
            scene: commit.scene,
            textures_reuploaded: commit.textures_reuploaded,
            received_at: Instant::now(),
            completion,
        });
    }

    pub fn set_forced_begin_frame(&mut self, completion: CompletionEvent<Option<BeginFrameState>>) {
        self.forced_begin_frame = Some(completion);
    }

    /// Queues a readback for the next draw. Returns `false` if it was failed on the spot.
    pub fn request_readback(&mut self, rect: Rect, completion: CompletionEvent<Option<Vec<u8>>>) -> bool {
        if !self.can_draw() || rect.is_empty() {
            completion.signal(None);
            return false;
        }
        if let Some(previous) = self.readback.replace(ReadbackRequest { rect, completion }) {
            previous.completion.signal(None);
        }
        true
    }

    fn fail_readback(&mut self) {
        if let Some(readback) = self.readback.take() {
            readback.completion.signal(None);
        }
    }

    pub fn set_texture_acquisition(&mut self, completion: CompletionEvent) {
        self.texture_acquisition = Some(completion);
    }

    /// Records a context loss. Only the first report of a loss reaches the main thread.
    pub fn note_context_lost(&mut self) {
        if self.context_lost {
            return;
        }
        log::warn!("Graphics context lost");
        self.context_lost = true;
        self.requests.context_lost = true;
        // Uploads into a dead context are pointless and would hold the commit back.
        self.frame.pending_updates.clear();
        self.frame.contents_textures_purged = true;
        self.textures_purged_since_begin_frame = true;
        self.fail_readback();
        self.post(MainThreadAction::DidLoseContext);
    }

    pub fn finish(&mut self) {
        match self.renderer.finish() {
            Ok(()) => {}
            Err(RenderError::ContextLost) => self.note_context_lost(),
            Err(error) => log::warn!("Finishing rendering failed: {error}"),
        }
    }

    pub fn shutdown(&mut self) {
        self.in_flight_commit = None;
        self.forced_begin_frame = None;
        self.readback = None;
        self.texture_acquisition = None;
        self.renderer.shutdown();
    }

    /// Draws the committed frame and presents it, or serves a pending readback instead.
    pub fn draw_and_swap(&mut self, forced: bool) -> DrawAndSwapResult {
        if self.context_lost {
            self.fail_readback();
            return DrawAndSwapResult::context_lost();
        }
        if !self.renderer.is_initialized() || !self.frame.has_content() {
            self.stats.draws_failed += 1;
            self.fail_readback();
            return DrawAndSwapResult::failed();
        }
        if !forced && self.frame.contents_textures_purged {
            log::debug!("Skipping draw: content textures are purged");
            self.stats.draws_failed += 1;
            return DrawAndSwapResult::failed();
        }

        let now = self.now();
        self.animate(now);

        if let Err(error) = self.renderer.draw(&self.frame) {
            if error.is_context_lost() {
                self.stats.draws_aborted_context_lost += 1;
                self.note_context_lost();
                return DrawAndSwapResult::context_lost();
            }
            log::warn!("Draw failed: {error}");
            self.stats.draws_failed += 1;
            self.fail_readback();
            return DrawAndSwapResult::failed();
        }
        self.stats.frames_drawn += 1;

        let mut did_swap = false;
        if let Some(readback) = self.readback.take() {
            let rect = readback.rect;
            let mut pixels = vec![0; rect.width as usize * rect.height as usize * 4];
            match self.renderer.read_pixels(rect, &mut pixels) {
                Ok(()) => {
                    self.stats.readbacks += 1;
                    readback.completion.signal(Some(pixels));
                }
                Err(error) => {
                    readback.completion.signal(None);
                    if error.is_context_lost() {
                        self.stats.draws_aborted_context_lost += 1;
                        self.note_context_lost();
                        return DrawAndSwapResult::context_lost();
                    }
                    log::warn!("Readback failed: {error}");
                }
            }
        } else {
            match self.renderer.swap_buffers() {
                Ok(()) => did_swap = true,
                Err(RenderError::ContextLost) => {
                    self.stats.draws_aborted_context_lost += 1;
                    self.note_context_lost();
                    return DrawAndSwapResult {
                        did_draw: true,
                        ..DrawAndSwapResult::context_lost()
                    };
                }
                Err(error) => log::warn!("Swap failed: {error}"),
            }
        }

        if did_swap {
            self.stats.frames_swapped += 1;
            self.requests.swaps_completed += 1;
            self.post(MainThreadAction::DidCompleteSwapBuffers);
        }
        if self.frame.newly_committed_frame {
            self.frame.newly_committed_frame = false;
            self.post(MainThreadAction::DidCommitAndDrawFrame);
        }
        DrawAndSwapResult {
            did_draw: true,
            did_swap,
            aborted_due_to_context_loss: false,
        }
    }

    /// Forgets start times of animations the committed tree no longer carries.
    fn prune_animation_starts(&mut self) {
        let mut live = HashSet::new();
        if let Some(root) = &self.frame.tree {
            root.for_each(&mut |layer| {
                live.extend(layer.animations.iter().map(|animation| (layer.id, animation.id)));
            });
        }
        self.animation_starts.retain(|key, _| live.contains(key));
    }

    /// Advances compositor-side animations to `now`.
    fn animate(&mut self, now: Instant) {
        let mut events = Vec::new();
        let mut running = false;
        let starts = &mut self.animation_starts;

        if let Some(root) = self.frame.tree.as_mut() {
            root.for_each_mut(&mut |layer| {
                let layer_id = layer.id;
                let mut opacity = None;
                layer.animations.retain(|animation| {
                    let key = (layer_id, animation.id);
                    let start = *starts.entry(key).or_insert_with(|| {
                        events.push(AnimationEvent {
                            layer: layer_id,
                            animation: animation.id,
                            kind: AnimationEventKind::Started,
                            monotonic_time: now,
                        });
                        now
                    });
                    let elapsed = now.saturating_duration_since(start);
                    opacity = Some(animation.opacity_at(elapsed));
                    if elapsed < animation.duration {
                        running = true;
                        return true;
                    }
                    starts.remove(&key);
                    events.push(AnimationEvent {
                        layer: layer_id,
                        animation: animation.id,
                        kind: AnimationEventKind::Finished,
                        monotonic_time: now,
                    });
                    false
                });
                if let Some(opacity) = opacity {
                    layer.opacity = opacity;
                }
            });
        }

        if let Some(handler) = self.input_handler.as_mut() {
            running |= handler.animate(now);
        }
        if running {
            self.requests.redraw = true;
        }
        if !events.is_empty() {
            log::trace!("Posting {} animation events", events.len());
            self.post(MainThreadAction::SetAnimationEvents {
                events,
                wall_clock_time: SystemTime::now(),
            });
        }
    }
}

impl SchedulerClient for ImplThreadState {
    fn can_draw(&self) -> bool {
        self.renderer.is_initialized()
            && !self.context_lost
            && self.renderer.has_output_surface()
            && self.frame.has_content()
    }

    fn has_more_resource_updates(&self) -> bool {
        !self.frame.pending_updates.is_empty()
    }

    fn scheduled_action_begin_frame(&mut self) {
        let scroll_info = self
            .input_handler
            .as_mut()
            .map(|handler| handler.take_scroll_and_scale())
            .unwrap_or_default();
        let state = BeginFrameState {
            monotonic_frame_begin_time: self.now(),
            scroll_info,
            contents_textures_purged: self.frame.contents_textures_purged,
            memory_allocation_limit_bytes: if self.visible {
                VISIBLE_MEMORY_ALLOCATION_LIMIT_BYTES
            } else {
                0
            },
        };
        self.textures_purged_since_begin_frame = false;

        let state = match self.forced_begin_frame.take() {
            Some(completion) => match completion.try_signal(Some(state)) {
                Ok(()) => return,
                // The readback gave up waiting; the main loop still has to run this frame.
                Err(state) => state,
            },
            None => Some(state),
        };
        if let Some(state) = state {
            self.post(MainThreadAction::BeginFrame(state));
        }
    }

    fn scheduled_action_update_more_resources(&mut self, deadline: Instant) {
        let mut uploaded = 0;
        while let Some(update) = self.frame.pending_updates.pop() {
            match self.renderer.upload(&update) {
                Ok(()) => {
                    uploaded += 1;
                    self.stats.resource_updates_uploaded += 1;
                }
                Err(RenderError::ContextLost) => {
                    self.note_context_lost();
                    break;
                }
                Err(error) => {
                    log::warn!("Dropping resource update for {:?}: {error}", update.layer)
                }
            }
            if uploaded >= self.max_resource_updates_per_batch || Instant::now() >= deadline {
                break;
            }
        }
        log::trace!(
            "Uploaded {uploaded} resources, {} left",
            self.frame.pending_updates.len()
        );
    }

    fn scheduled_action_commit(&mut self) {
        let Some(commit) = self.in_flight_commit.take() else {
            log::warn!("Commit scheduled without a frame from the main thread");
            return;
        };
        self.frame.commit(commit.scene);
        self.prune_animation_starts();
        if self.textures_purged_since_begin_frame {
            // The main thread uploaded against textures that are gone again.
            self.requests.commit = true;
        } else if commit.textures_reuploaded {
            self.frame.contents_textures_purged = false;
        }
        if let Some(handler) = self.input_handler.as_mut() {
            handler.did_commit(&self.frame);
        }
        self.stats.commits += 1;
        self.stats.total_commit_time += commit.received_at.elapsed();
        log::debug!("Committed frame {}", self.frame.source_frame_number);
        commit.completion.complete();
    }

    fn scheduled_action_draw_and_swap_if_possible(&mut self) -> DrawAndSwapResult {
        self.draw_and_swap(false)
    }

    fn scheduled_action_draw_and_swap_forced(&mut self) -> DrawAndSwapResult {
        self.draw_and_swap(true)
    }

    fn scheduled_action_begin_context_recreation(&mut self) {
        self.post(MainThreadAction::BeginContextRecreation);
    }

    fn scheduled_action_acquire_layer_textures_for_main_thread(&mut self) {
        if let Some(completion) = self.texture_acquisition.take() {
            completion.complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Receiver;
    use std::time::Duration;
    use tandem_core::{
        completion_pair, LayerAnimation, LayerNode, ResourceUpdate, ResourceUpdateQueue, Size,
    };

    #[derive(Debug)]
    struct TestContext;

    impl GraphicsContext for TestContext {
        fn label(&self) -> &str {
            "test"
        }

        fn make_current(&mut self) -> Result<(), RenderError> {
            Ok(())
        }

        fn is_lost(&self) -> bool {
            false
        }
    }

    #[derive(Default)]
    struct TestRenderer {
        initialized: bool,
        lose_context_on_draw: bool,
    }

    impl Renderer for TestRenderer {
        fn initialize(
            &mut self,
            _context: Box<dyn GraphicsContext>,
        ) -> Result<RendererCapabilities, RenderError> {
            self.initialized = true;
            Ok(RendererCapabilities::default())
        }

        fn is_initialized(&self) -> bool {
            self.initialized
        }

        fn has_output_surface(&self) -> bool {
            true
        }

        fn upload(&mut self, _update: &ResourceUpdate) -> Result<(), RenderError> {
            Ok(())
        }

        fn draw(&mut self, _frame: &FrameState) -> Result<(), RenderError> {
            if self.lose_context_on_draw {
                return Err(RenderError::ContextLost);
            }
            Ok(())
        }

        fn swap_buffers(&mut self) -> Result<(), RenderError> {
            Ok(())
        }

        fn read_pixels(&mut self, _rect: Rect, pixels: &mut [u8]) -> Result<(), RenderError> {
            pixels.fill(0xAB);
            Ok(())
        }

        fn finish(&mut self) -> Result<(), RenderError> {
            Ok(())
        }

        fn set_visible(&mut self, _visible: bool) {}

        fn release_resources(&mut self) {}
    }

    fn state_with(renderer: TestRenderer) -> (ImplThreadState, Receiver<MainThreadAction>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut state =
            ImplThreadState::new(&ProxyConfig::default(), Box::new(renderer), None, sender);
        state.initialize_context(Box::new(TestContext));
        state
            .initialize_renderer()
            .expect("test renderer always initializes");
        state.set_visible(true);
        (state, receiver)
    }

    fn layer() -> LayerNode {
        LayerNode::new(LayerId(1), Rect::new(0, 0, 4, 4), [255, 0, 0, 255])
    }

    fn commit(state: &mut ImplThreadState, root: LayerNode, reuploaded: bool) {
        let (completion, waiter) = completion_pair();
        let mut updates = ResourceUpdateQueue::new();
        updates.push(ResourceUpdate::full(root.id, root.bounds));
        state.receive_commit(
            PendingCommit {
                scene: Scene::new(root, Size::new(4, 4)),
                updates,
                textures_reuploaded: reuploaded,
            },
            completion,
        );
        assert!(state.has_more_resource_updates());
        state.scheduled_action_update_more_resources(Instant::now() + Duration::from_secs(1));
        assert!(!state.has_more_resource_updates());
        state.scheduled_action_commit();
        waiter.wait().expect("commit signals its completion");
    }

    #[test]
    fn first_draw_after_commit_reports_commit_and_draw() {
        let (mut state, main) = state_with(TestRenderer::default());
        commit(&mut state, layer(), false);
        assert!(state.can_draw());

        let result = state.draw_and_swap(false);
        assert_eq!(result, DrawAndSwapResult::drawn_and_swapped());
        let posted: Vec<_> = main.try_iter().collect();
        assert!(matches!(
            posted.as_slice(),
            [MainThreadAction::DidCompleteSwapBuffers, MainThreadAction::DidCommitAndDrawFrame]
        ));

        state.draw_and_swap(false);
        assert!(main
            .try_iter()
            .all(|task| !matches!(task, MainThreadAction::DidCommitAndDrawFrame)));
        assert_eq!(state.stats().frames_swapped, 2);
        assert_eq!(state.stats().commits, 1);
    }

    #[test]
    fn purged_textures_block_regular_draws_only() {
        let (mut state, _main) = state_with(TestRenderer::default());
        commit(&mut state, layer(), false);
        state.set_visible(false);
        assert!(state.contents_textures_purged());

        assert_eq!(state.draw_and_swap(false), DrawAndSwapResult::failed());
        assert!(state.draw_and_swap(true).did_draw);

        // A commit that re-uploaded after the purge clears it.
        state.scheduled_action_begin_frame();
        commit(&mut state, layer(), true);
        assert!(!state.contents_textures_purged());
    }

    #[test]
    fn purge_after_begin_frame_requests_another_commit() {
        let (mut state, _main) = state_with(TestRenderer::default());
        state.scheduled_action_begin_frame();
        state.set_visible(false);
        commit(&mut state, layer(), true);
        assert!(state.contents_textures_purged());
        assert!(state.take_requests().commit);
    }

    #[test]
    fn readback_is_served_instead_of_swapping() {
        let (mut state, _main) = state_with(TestRenderer::default());
        commit(&mut state, layer(), false);

        let (completion, waiter) = completion_pair();
        assert!(state.request_readback(Rect::new(0, 0, 2, 2), completion));
        let result = state.draw_and_swap(true);
        assert!(result.did_draw);
        assert!(!result.did_swap);
        assert_eq!(waiter.wait().expect("readback answered"), Some(vec![0xAB; 16]));
    }

    #[test]
    fn readback_without_content_fails_immediately() {
        let (mut state, _main) = state_with(TestRenderer::default());
        let (completion, waiter) = completion_pair();
        assert!(!state.request_readback(Rect::new(0, 0, 2, 2), completion));
        assert_eq!(waiter.wait(), Ok(None));
    }

    #[test]
    fn context_loss_is_reported_once() {
        let (mut state, main) = state_with(TestRenderer {
            lose_context_on_draw: true,
            ..Default::default()
        });
        commit(&mut state, layer(), false);

        assert_eq!(state.draw_and_swap(false), DrawAndSwapResult::context_lost());
        assert_eq!(state.draw_and_swap(true), DrawAndSwapResult::context_lost());
        state.note_context_lost();

        let losses = main
            .try_iter()
            .filter(|task| matches!(task, MainThreadAction::DidLoseContext))
            .count();
        assert_eq!(losses, 1);
        assert!(state.take_requests().context_lost);
        assert!(!state.can_draw());
    }

    #[test]
    fn animations_run_on_the_impl_thread() {
        let (mut state, main) = state_with(TestRenderer::default());
        let animated = layer().with_animation(LayerAnimation {
            id: AnimationId(7),
            from_opacity: 0.0,
            to_opacity: 1.0,
            duration: Duration::from_millis(100),
        });
        commit(&mut state, animated, false);

        let start = Instant::now();
        state.set_frame_time(Some(start));
        state.draw_and_swap(false);
        assert!(state.take_requests().redraw);

        state.set_frame_time(Some(start + Duration::from_millis(50)));
        state.draw_and_swap(false);
        assert!(state.take_requests().redraw);
        let opacity = state
            .frame()
            .tree
            .as_ref()
            .map_or(0.0, |root| root.opacity);
        assert!((opacity - 0.5).abs() < 1e-4, "opacity was {opacity}");

        state.set_frame_time(Some(start + Duration::from_millis(100)));
        state.draw_and_swap(false);
        assert!(!state.take_requests().redraw);

        let kinds: Vec<_> = main
            .try_iter()
            .filter_map(|task| match task {
                MainThreadAction::SetAnimationEvents { events, .. } => Some(events),
                _ => None,
            })
            .flatten()
            .map(|event| event.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![AnimationEventKind::Started, AnimationEventKind::Finished]
        );
    }

    #[test]
    fn recommitted_animation_starts_over() {
        let (mut state, main) = state_with(TestRenderer::default());
        let fade = LayerAnimation {
            id: AnimationId(7),
            from_opacity: 0.0,
            to_opacity: 1.0,
            duration: Duration::from_millis(100),
        };
        let start = Instant::now();

        commit(&mut state, layer().with_animation(fade.clone()), false);
        state.set_frame_time(Some(start));
        state.draw_and_swap(false);

        // The next commit drops the running animation.
        commit(&mut state, layer(), false);
        assert!(state.animation_starts.is_empty());
        state.set_frame_time(Some(start + Duration::from_millis(10)));
        state.draw_and_swap(false);

        commit(&mut state, layer().with_animation(fade), false);
        state.set_frame_time(Some(start + Duration::from_secs(5)));
        state.draw_and_swap(false);

        let opacity = state
            .frame()
            .tree
            .as_ref()
            .map_or(1.0, |root| root.opacity);
        assert!(opacity.abs() < 1e-4, "restarted animation begins at 0, was {opacity}");
        let kinds: Vec<_> = main
            .try_iter()
            .filter_map(|task| match task {
                MainThreadAction::SetAnimationEvents { events, .. } => Some(events),
                _ => None,
            })
            .flatten()
            .map(|event| event.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![AnimationEventKind::Started, AnimationEventKind::Started]
        );
    }
}
