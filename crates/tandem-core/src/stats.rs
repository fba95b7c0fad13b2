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

//! Impl-side rendering statistics.

use std::time::Duration;

/// Counters collected on the impl thread, copied to the main thread on request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderingStats {
    /// Draws that produced a frame.
    pub frames_drawn: u64,
    /// Frames presented with a swap.
    pub frames_swapped: u64,
    /// `DrawIfPossible` attempts that could not draw.
    pub draws_failed: u64,
    /// Draws abandoned because the context was lost.
    pub draws_aborted_context_lost: u64,
    /// Commits performed.
    pub commits: u64,
    /// Time the main thread spent blocked inside commits.
    pub total_commit_time: Duration,
    /// Resource uploads performed.
    pub resource_updates_uploaded: u64,
    /// Readbacks served.
    pub readbacks: u64,
}

impl RenderingStats {
    /// Average time the main thread was blocked per commit.
    pub fn average_commit_time(&self) -> Duration {
        if self.commits == 0 {
            return Duration::ZERO;
        }
        let commits = u32::try_from(self.commits).unwrap_or(u32::MAX);
        self.total_commit_time / commits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_commit_time_handles_zero_commits() {
        let mut stats = RenderingStats::default();
        assert_eq!(stats.average_commit_time(), Duration::ZERO);

        stats.commits = 4;
        stats.total_commit_time = Duration::from_millis(8);
        assert_eq!(stats.average_commit_time(), Duration::from_millis(2));
    }
}
