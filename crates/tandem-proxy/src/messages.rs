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

//! Messages exchanged between the two threads.
//!
//! Each direction has its own channel, so ordering holds within a direction
//! and never across them.

use std::time::{Duration, Instant, SystemTime};
use tandem_core::{
    AnimationEvent, BeginFrameState, CompletionEvent, GraphicsContext, Rect, RenderError,
    RendererCapabilities, RenderingStats, ResourceUpdateQueue, Scene,
};

/// What the main thread hands over when it finishes a begin-frame.
#[derive(Debug)]
pub(crate) struct PendingCommit {
    pub scene: Scene,
    pub updates: ResourceUpdateQueue,
    /// The main thread re-uploaded content after a purge.
    pub textures_reuploaded: bool,
}

/// Main thread to impl thread.
pub(crate) enum ImplThreadAction {
    InitializeContext {
        context: Box<dyn GraphicsContext>,
    },
    InitializeRenderer {
        completion: CompletionEvent<Result<RendererCapabilities, RenderError>>,
    },
    SetSurfaceReady,
    SetVisible {
        visible: bool,
        completion: CompletionEvent,
    },
    SetNeedsCommit,
    SetNeedsRedraw,
    SetNeedsForcedRedraw,
    /// Answered with `None` when a begin-frame is already queued for the main thread.
    ForceBeginFrame {
        completion: CompletionEvent<Option<BeginFrameState>>,
    },
    BeginFrameComplete {
        commit: PendingCommit,
        completion: CompletionEvent,
    },
    BeginFrameAborted,
    RequestReadback {
        rect: Rect,
        completion: CompletionEvent<Option<Vec<u8>>>,
    },
    FinishAllRendering {
        completion: CompletionEvent,
    },
    AcquireLayerTextures {
        completion: CompletionEvent,
    },
    ReleaseLayerTextures,
    LoseContext,
    RecreateContext {
        context: Box<dyn GraphicsContext>,
        completion: CompletionEvent<Result<RendererCapabilities, RenderError>>,
    },
    SetVSyncParameters {
        timebase: Instant,
        interval: Duration,
    },
    DidVSync {
        frame_time: Instant,
    },
    RenderingStats {
        completion: CompletionEvent<RenderingStats>,
    },
    Close {
        completion: CompletionEvent,
    },
}

impl ImplThreadAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitializeContext { .. } => "InitializeContext",
            Self::InitializeRenderer { .. } => "InitializeRenderer",
            Self::SetSurfaceReady => "SetSurfaceReady",
            Self::SetVisible { .. } => "SetVisible",
            Self::SetNeedsCommit => "SetNeedsCommit",
            Self::SetNeedsRedraw => "SetNeedsRedraw",
            Self::SetNeedsForcedRedraw => "SetNeedsForcedRedraw",
            Self::ForceBeginFrame { .. } => "ForceBeginFrame",
            Self::BeginFrameComplete { .. } => "BeginFrameComplete",
            Self::BeginFrameAborted => "BeginFrameAborted",
            Self::RequestReadback { .. } => "RequestReadback",
            Self::FinishAllRendering { .. } => "FinishAllRendering",
            Self::AcquireLayerTextures { .. } => "AcquireLayerTextures",
            Self::ReleaseLayerTextures => "ReleaseLayerTextures",
            Self::LoseContext => "LoseContext",
            Self::RecreateContext { .. } => "RecreateContext",
            Self::SetVSyncParameters { .. } => "SetVSyncParameters",
            Self::DidVSync { .. } => "DidVSync",
            Self::RenderingStats { .. } => "RenderingStats",
            Self::Close { .. } => "Close",
        }
    }
}

/// Impl thread to main thread. All of these are fire-and-forget.
#[derive(Debug)]
pub(crate) enum MainThreadAction {
    BeginFrame(BeginFrameState),
    DidCommitAndDrawFrame,
    DidCompleteSwapBuffers,
    DidLoseContext,
    BeginContextRecreation,
    SetAnimationEvents {
        events: Vec<AnimationEvent>,
        wall_clock_time: SystemTime,
    },
}
