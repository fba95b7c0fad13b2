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

//! The impl-thread input observer contract.

use crate::frame::{FrameState, ScrollAndScaleSet};
use std::time::Instant;

/// Optional impl-thread observer for scroll and pinch input.
///
/// It runs independently of the commit/draw cycle; the proxy only collects its
/// accumulated deltas at each begin-frame and keeps it informed of commits.
pub trait InputHandler: Send {
    /// A new tree was committed.
    fn did_commit(&mut self, frame: &FrameState) {
        let _ = frame;
    }

    /// Advances fling or pinch animations. Returns `true` if a redraw is needed.
    fn animate(&mut self, monotonic_time: Instant) -> bool {
        let _ = monotonic_time;
        false
    }

    /// Hands over the deltas accumulated since the previous begin-frame.
    fn take_scroll_and_scale(&mut self) -> ScrollAndScaleSet {
        ScrollAndScaleSet::default()
    }
}
