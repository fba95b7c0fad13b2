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

// Tandem headless demo
// Slides a box across a small CPU framebuffer, then reads the final frame back.

use std::collections::HashSet;
use std::time::{Duration, Instant, SystemTime};

use anyhow::{ensure, Result};
use tandem_core::{
    AnimationEvent, AnimationId, BeginFrameState, FrameState, GraphicsContext, LayerAnimation,
    LayerId, LayerNode, ProxyConfig, Rect, RenderError, Renderer, RendererCapabilities,
    ResourceUpdate, ResourceUpdateQueue, Scene, SceneHost, Size,
};
use tandem_proxy::ThreadProxy;

const VIEWPORT: Size = Size::new(64, 48);
const BACKGROUND: LayerId = LayerId(1);
const SLIDER: LayerId = LayerId(2);
const BACKGROUND_COLOR: [u8; 4] = [0x20, 0x20, 0x30, 0xFF];
const SLIDER_COLOR: [u8; 4] = [0xF0, 0x80, 0x10, 0xFF];
const FRAMES: usize = 30;

#[derive(Debug)]
struct CpuContext;

impl GraphicsContext for CpuContext {
    fn label(&self) -> &str {
        "cpu"
    }

    fn make_current(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn is_lost(&self) -> bool {
        false
    }
}

/// Software renderer painting flat layers into an RGBA8 back buffer.
#[derive(Default)]
struct CpuRenderer {
    context: Option<Box<dyn GraphicsContext>>,
    size: Size,
    back: Vec<u8>,
    front: Vec<u8>,
    textures: HashSet<LayerId>,
}

impl CpuRenderer {
    fn fill(&mut self, bounds: Rect, color: [u8; 4], opacity: f32) {
        let x0 = bounds.x.max(0) as u32;
        let y0 = bounds.y.max(0) as u32;
        let x1 = (bounds.right().max(0) as u32).min(self.size.width);
        let y1 = (bounds.bottom().max(0) as u32).min(self.size.height);
        for y in y0..y1 {
            for x in x0..x1 {
                let offset = (y * self.size.width + x) as usize * 4;
                let pixel = &mut self.back[offset..offset + 4];
                for channel in 0..3 {
                    let src = f32::from(color[channel]) * opacity;
                    let dst = f32::from(pixel[channel]) * (1.0 - opacity);
                    pixel[channel] = (src + dst).round() as u8;
                }
                pixel[3] = 0xFF;
            }
        }
    }
}

impl Renderer for CpuRenderer {
    fn initialize(
        &mut self,
        mut context: Box<dyn GraphicsContext>,
    ) -> Result<RendererCapabilities, RenderError> {
        context.make_current()?;
        self.context = Some(context);
        self.textures.clear();
        Ok(RendererCapabilities {
            max_texture_size: 1024,
            ..RendererCapabilities::default()
        })
    }

    fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    fn has_output_surface(&self) -> bool {
        true
    }

    fn upload(&mut self, update: &ResourceUpdate) -> Result<(), RenderError> {
        self.textures.insert(update.layer);
        Ok(())
    }

    fn draw(&mut self, frame: &FrameState) -> Result<(), RenderError> {
        if self.size != frame.viewport {
            self.size = frame.viewport;
            self.back = vec![0; frame.viewport.area() * 4];
            self.front = vec![0; frame.viewport.area() * 4];
        }
        self.back.fill(0);

        let mut layers = Vec::new();
        if let Some(root) = &frame.tree {
            root.for_each(&mut |layer| {
                layers.push((layer.id, layer.bounds, layer.color, layer.opacity));
            });
        }
        for (id, bounds, color, opacity) in layers {
            if self.textures.contains(&id) {
                self.fill(bounds, color, opacity);
            }
        }
        Ok(())
    }

    fn swap_buffers(&mut self) -> Result<(), RenderError> {
        std::mem::swap(&mut self.back, &mut self.front);
        Ok(())
    }

    fn read_pixels(&mut self, rect: Rect, pixels: &mut [u8]) -> Result<(), RenderError> {
        if !Rect::from_size(self.size).contains_rect(&rect) {
            return Err(RenderError::Backend(format!(
                "{rect:?} is outside the {}x{} surface",
                self.size.width, self.size.height
            )));
        }
        let row_bytes = rect.width as usize * 4;
        for row in 0..rect.height as usize {
            let y = rect.y as usize + row;
            let src = (y * self.size.width as usize + rect.x as usize) * 4;
            pixels[row * row_bytes..(row + 1) * row_bytes]
                .copy_from_slice(&self.back[src..src + row_bytes]);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) {
        log::debug!("CPU surface visible: {visible}");
    }

    fn release_resources(&mut self) {
        self.textures.clear();
    }
}

/// Moves the slider two pixels per commit.
#[derive(Default)]
struct SlidingBoxHost {
    frame_number: u64,
    slider_x: i32,
    frames_presented: usize,
    fade_in_committed: bool,
}

impl SlidingBoxHost {
    fn slider_bounds(&self) -> Rect {
        Rect::new(self.slider_x, 16, 16, 16)
    }
}

impl SceneHost for SlidingBoxHost {
    fn begin_frame(&mut self, state: &BeginFrameState) {
        self.slider_x = (self.slider_x + 2) % (VIEWPORT.width as i32 - 16);
        if !state.scroll_info.is_empty() {
            log::debug!("Scroll deltas: {:?}", state.scroll_info.scrolls);
        }
    }

    fn update_scene(&mut self, queue: &mut ResourceUpdateQueue, state: &BeginFrameState) {
        if state.contents_textures_purged || self.frame_number == 0 {
            queue.push(ResourceUpdate::full(BACKGROUND, Rect::from_size(VIEWPORT)));
            queue.push(ResourceUpdate::full(SLIDER, self.slider_bounds()));
        } else {
            queue.push(ResourceUpdate::partial(SLIDER, self.slider_bounds()));
        }
    }

    fn scene_for_commit(&mut self) -> Scene {
        self.frame_number += 1;
        let mut background =
            LayerNode::new(BACKGROUND, Rect::from_size(VIEWPORT), BACKGROUND_COLOR);
        if !self.fade_in_committed {
            background = background.with_animation(LayerAnimation {
                id: AnimationId(1),
                from_opacity: 0.0,
                to_opacity: 1.0,
                duration: Duration::from_millis(250),
            });
            self.fade_in_committed = true;
        }
        let slider = LayerNode::new(SLIDER, self.slider_bounds(), SLIDER_COLOR);
        let root = background.with_child(slider);
        let mut scene = Scene::new(root, VIEWPORT);
        scene.source_frame_number = self.frame_number;
        scene
    }

    fn did_commit_and_draw_frame(&mut self) {
        self.frames_presented += 1;
    }

    fn did_lose_context(&mut self) {
        log::warn!("Demo lost its context");
    }

    fn create_context(&mut self) -> Option<Box<dyn GraphicsContext>> {
        Some(Box::new(CpuContext))
    }

    fn did_recreate_context(&mut self, succeeded: bool) {
        log::info!("Context recreation succeeded: {succeeded}");
    }

    fn set_animation_events(
        &mut self,
        events: Vec<AnimationEvent>,
        _wall_clock_time: SystemTime,
    ) {
        for event in events {
            log::info!("Animation {:?} {:?}", event.animation, event.kind);
        }
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = ProxyConfig {
        frame_interval: Duration::from_micros(16_667),
        ..ProxyConfig::default()
    };
    let mut proxy = ThreadProxy::new(config, Box::new(CpuRenderer::default()), None)?;
    proxy.start()?;
    proxy.initialize_context(Box::new(CpuContext));
    let capabilities = proxy.initialize_renderer()?;
    log::info!("Renderer ready: {capabilities:?}");
    proxy.set_surface_ready();
    proxy.set_visible(true)?;

    let mut host = SlidingBoxHost::default();
    let deadline = Instant::now() + Duration::from_secs(10);
    while host.frames_presented < FRAMES && Instant::now() < deadline {
        proxy.set_needs_commit();
        proxy.wait_for_main_thread_tasks(&mut host, Duration::from_millis(16));
    }
    log::info!("Presented {} frames", host.frames_presented);

    // Readback still works once hidden.
    proxy.set_visible(false)?;
    let mut pixels = vec![0u8; VIEWPORT.area() * 4];
    let read = proxy.composite_and_readback(&mut host, &mut pixels, Rect::from_size(VIEWPORT));
    ensure!(read, "readback of the final frame failed");

    let slider_pixels = pixels
        .chunks_exact(4)
        .filter(|pixel| *pixel == SLIDER_COLOR)
        .count();
    log::info!("Slider covers {slider_pixels} pixels at x = {}", host.slider_x);

    let stats = proxy.impl_side_rendering_stats()?;
    log::info!(
        "Drew {} frames, {} commits averaging {:?}, {} uploads",
        stats.frames_drawn,
        stats.commits,
        stats.average_commit_time(),
        stats.resource_updates_uploaded
    );

    proxy.stop();
    Ok(())
}
