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

//! Fakes shared by the proxy integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tandem_core::{
    AnimationEvent, BeginFrameState, FrameState, GraphicsContext, LayerId, LayerNode,
    ProxyConfig, Rect, RenderError, Renderer, RendererCapabilities, RenderingStats,
    ResourceUpdate, ResourceUpdateQueue, Scene, SceneHost, Size, VSyncMode,
};
use tandem_proxy::ThreadProxy;

/// Fill color of the test scene's root layer.
pub const ROOT_COLOR: [u8; 4] = [0x11, 0x22, 0x33, 0xFF];

/// Generous bound for anything that should happen "soon".
pub const SOON: Duration = Duration::from_secs(2);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug)]
pub struct FakeContext {
    label: String,
}

impl FakeContext {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

impl GraphicsContext for FakeContext {
    fn label(&self) -> &str {
        &self.label
    }

    fn make_current(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn is_lost(&self) -> bool {
        false
    }
}

/// What the renderer was asked to do, in order.
#[derive(Debug, Default)]
pub struct RendererLog {
    pub initializations: usize,
    pub uploads: usize,
    /// Source frame number of every drawn frame.
    pub draws: Vec<u64>,
    pub swaps: usize,
    pub readbacks: usize,
    pub visibility: Vec<bool>,
    pub releases: usize,
}

/// Switches the tests flip from the main thread.
#[derive(Debug, Default)]
pub struct RendererControls {
    pub no_output_surface: AtomicBool,
    pub lose_context_on_next_draw: AtomicBool,
    /// Keeps the impl thread busy inside the next draw.
    pub next_draw_delay_ms: AtomicU64,
}

pub struct FakeRenderer {
    log: Arc<Mutex<RendererLog>>,
    controls: Arc<RendererControls>,
    initialized: bool,
}

impl Renderer for FakeRenderer {
    fn initialize(
        &mut self,
        context: Box<dyn GraphicsContext>,
    ) -> Result<RendererCapabilities, RenderError> {
        log::debug!("FakeRenderer initialized with '{}'", context.label());
        self.initialized = true;
        self.log.lock().unwrap().initializations += 1;
        Ok(RendererCapabilities::default())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn has_output_surface(&self) -> bool {
        !self.controls.no_output_surface.load(Ordering::SeqCst)
    }

    fn upload(&mut self, _update: &ResourceUpdate) -> Result<(), RenderError> {
        self.log.lock().unwrap().uploads += 1;
        Ok(())
    }

    fn draw(&mut self, frame: &FrameState) -> Result<(), RenderError> {
        if self
            .controls
            .lose_context_on_next_draw
            .swap(false, Ordering::SeqCst)
        {
            return Err(RenderError::ContextLost);
        }
        let delay = self.controls.next_draw_delay_ms.swap(0, Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        self.log.lock().unwrap().draws.push(frame.source_frame_number);
        Ok(())
    }

    fn swap_buffers(&mut self) -> Result<(), RenderError> {
        self.log.lock().unwrap().swaps += 1;
        Ok(())
    }

    fn read_pixels(&mut self, _rect: Rect, pixels: &mut [u8]) -> Result<(), RenderError> {
        for pixel in pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&ROOT_COLOR);
        }
        self.log.lock().unwrap().readbacks += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) {
        self.log.lock().unwrap().visibility.push(visible);
    }

    fn release_resources(&mut self) {
        self.log.lock().unwrap().releases += 1;
    }
}

/// A scene owner that records every callback.
pub struct RecordingHost {
    pub root: LayerNode,
    pub updates_per_frame: usize,
    pub failing_context_creations: u32,

    pub begin_frames: Vec<BeginFrameState>,
    pub commits: usize,
    pub commit_and_draws: usize,
    pub swaps: usize,
    pub lost_contexts: usize,
    pub context_creations: u32,
    pub recreations: Vec<bool>,
    pub animation_events: Vec<AnimationEvent>,
    pub last_frame_number: u64,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            root: LayerNode::new(LayerId(1), Rect::new(0, 0, 8, 8), ROOT_COLOR),
            updates_per_frame: 1,
            failing_context_creations: 0,
            begin_frames: Vec::new(),
            commits: 0,
            commit_and_draws: 0,
            swaps: 0,
            lost_contexts: 0,
            context_creations: 0,
            recreations: Vec::new(),
            animation_events: Vec::new(),
            last_frame_number: 0,
        }
    }
}

impl SceneHost for RecordingHost {
    fn begin_frame(&mut self, state: &BeginFrameState) {
        self.begin_frames.push(state.clone());
    }

    fn update_scene(&mut self, queue: &mut ResourceUpdateQueue, _state: &BeginFrameState) {
        for _ in 0..self.updates_per_frame {
            queue.push(ResourceUpdate::full(self.root.id, self.root.bounds));
        }
    }

    fn scene_for_commit(&mut self) -> Scene {
        self.last_frame_number += 1;
        let mut scene = Scene::new(self.root.clone(), Size::new(8, 8));
        scene.source_frame_number = self.last_frame_number;
        // Animations belong to the impl thread once committed.
        self.root.animations.clear();
        scene
    }

    fn did_commit(&mut self) {
        self.commits += 1;
    }

    fn did_commit_and_draw_frame(&mut self) {
        self.commit_and_draws += 1;
    }

    fn did_complete_swap_buffers(&mut self) {
        self.swaps += 1;
    }

    fn did_lose_context(&mut self) {
        self.lost_contexts += 1;
    }

    fn create_context(&mut self) -> Option<Box<dyn GraphicsContext>> {
        self.context_creations += 1;
        if self.failing_context_creations > 0 {
            self.failing_context_creations -= 1;
            return None;
        }
        Some(Box::new(FakeContext::new("recreated")))
    }

    fn did_recreate_context(&mut self, succeeded: bool) {
        self.recreations.push(succeeded);
    }

    fn set_animation_events(&mut self, events: Vec<AnimationEvent>, _wall_clock_time: SystemTime) {
        self.animation_events.extend(events);
    }
}

pub fn test_config(vsync: VSyncMode) -> ProxyConfig {
    ProxyConfig {
        vsync,
        frame_interval: Duration::from_millis(4),
        context_recreation_retry_delay: Duration::from_millis(1),
        blocking_call_timeout: Some(Duration::from_secs(5)),
        ..ProxyConfig::default()
    }
}

pub fn fake_renderer() -> (FakeRenderer, Arc<Mutex<RendererLog>>, Arc<RendererControls>) {
    let log = Arc::new(Mutex::new(RendererLog::default()));
    let controls = Arc::new(RendererControls::default());
    let renderer = FakeRenderer {
        log: Arc::clone(&log),
        controls: Arc::clone(&controls),
        initialized: false,
    };
    (renderer, log, controls)
}

/// A started, visible proxy with a recording host and fake renderer.
pub struct Harness {
    pub proxy: ThreadProxy,
    pub host: RecordingHost,
    pub log: Arc<Mutex<RendererLog>>,
    pub controls: Arc<RendererControls>,
}

impl Harness {
    pub fn start(config: ProxyConfig) -> anyhow::Result<Self> {
        init_logger();
        let (renderer, log, controls) = fake_renderer();
        let mut proxy = ThreadProxy::new(config, Box::new(renderer), None)?;
        proxy.start()?;
        proxy.initialize_context(Box::new(FakeContext::new("primary")));
        proxy.initialize_renderer()?;
        proxy.set_surface_ready();
        proxy.set_visible(true)?;
        Ok(Self {
            proxy,
            host: RecordingHost::new(),
            log,
            controls,
        })
    }

    /// Pumps main-thread tasks until `done` holds or [`SOON`] passes.
    pub fn pump_until(&mut self, mut done: impl FnMut(&RecordingHost) -> bool) -> bool {
        let deadline = Instant::now() + SOON;
        while Instant::now() < deadline {
            if done(&self.host) {
                return true;
            }
            self.proxy
                .wait_for_main_thread_tasks(&mut self.host, Duration::from_millis(5));
        }
        done(&self.host)
    }

    /// Like [`Harness::pump_until`], delivering an external vsync every round.
    pub fn pump_with_vsync_until(&mut self, mut done: impl FnMut(&RecordingHost) -> bool) -> bool {
        let deadline = Instant::now() + SOON;
        while Instant::now() < deadline {
            if done(&self.host) {
                return true;
            }
            self.proxy.did_vsync(Instant::now());
            self.proxy
                .wait_for_main_thread_tasks(&mut self.host, Duration::from_millis(5));
        }
        done(&self.host)
    }

    /// Keeps the main thread responsive for `duration`.
    pub fn pump_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            self.proxy
                .wait_for_main_thread_tasks(&mut self.host, Duration::from_millis(5));
        }
    }

    /// Round-trips through the impl thread, so every earlier post has been handled.
    pub fn sync(&mut self) -> RenderingStats {
        self.proxy
            .impl_side_rendering_stats()
            .expect("impl thread answers stats requests")
    }

    pub fn draws(&self) -> Vec<u64> {
        self.log.lock().unwrap().draws.clone()
    }

    /// Commits the first frame and waits until it has been drawn.
    pub fn commit_first_frame(&mut self) -> bool {
        self.proxy.set_needs_commit();
        self.pump_with_vsync_until(|host| host.commit_and_draws >= 1)
    }
}
