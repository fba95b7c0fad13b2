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

//! The main-thread scene owner contract.

use crate::frame::{AnimationEvent, BeginFrameState};
use crate::resources::ResourceUpdateQueue;
use crate::scene::Scene;
use crate::traits::renderer::GraphicsContext;
use std::time::SystemTime;

/// The scene owner, living on the main thread.
///
/// Every method is invoked on the main thread, either from the proxy's task
/// pump or from inside a blocking proxy call.
pub trait SceneHost {
    /// A frame is starting: fold in impl-side input deltas and tick main-thread animations.
    fn begin_frame(&mut self, state: &BeginFrameState) {
        let _ = state;
    }

    /// Brings the scene up to date and queues the uploads it needs.
    ///
    /// When `state.contents_textures_purged` is set every visible layer must be
    /// queued for a full upload.
    fn update_scene(&mut self, queue: &mut ResourceUpdateQueue, state: &BeginFrameState);

    /// Produces the snapshot moved to the impl thread by the commit.
    fn scene_for_commit(&mut self) -> Scene;

    /// The impl thread has taken the snapshot.
    fn did_commit(&mut self) {}

    /// The first frame of the latest commit reached the screen.
    fn did_commit_and_draw_frame(&mut self) {}

    /// A swap has completed.
    fn did_complete_swap_buffers(&mut self) {}

    /// The graphics context was lost; recreation follows.
    fn did_lose_context(&mut self) {}

    /// Creates a fresh graphics context, or `None` if none is available right now.
    fn create_context(&mut self) -> Option<Box<dyn GraphicsContext>>;

    /// Result of context recreation. `false` is terminal: no further attempts are made.
    fn did_recreate_context(&mut self, succeeded: bool) {
        let _ = succeeded;
    }

    /// Impl-thread animations started or finished.
    fn set_animation_events(&mut self, events: Vec<AnimationEvent>, wall_clock_time: SystemTime) {
        let _ = (events, wall_clock_time);
    }
}
