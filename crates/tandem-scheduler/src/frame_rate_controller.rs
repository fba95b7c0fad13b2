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

//! Vsync pacing and swap throttling.

use std::time::{Duration, Instant};

/// A timer that ticks on multiples of `interval` from `timebase`.
#[derive(Debug, Clone)]
pub struct DelayBasedTimeSource {
    timebase: Instant,
    interval: Duration,
    next_tick: Option<Instant>,
}

impl DelayBasedTimeSource {
    /// Creates an inactive timer aligned to `timebase`.
    pub fn new(interval: Duration, timebase: Instant) -> Self {
        Self {
            timebase,
            interval,
            next_tick: None,
        }
    }

    /// Current tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Re-aligns the timer. A pending tick moves to the new phase.
    pub fn set_timebase_and_interval(&mut self, timebase: Instant, interval: Duration, now: Instant) {
        self.timebase = timebase;
        if !interval.is_zero() {
            self.interval = interval;
        }
        if self.next_tick.is_some() {
            self.next_tick = Some(self.aligned_at_or_after(now));
        }
    }

    /// Starts or stops ticking.
    pub fn set_active(&mut self, active: bool, now: Instant) {
        match (active, self.next_tick) {
            (true, None) => self.next_tick = Some(self.aligned_at_or_after(now)),
            (false, Some(_)) => self.next_tick = None,
            _ => {}
        }
    }

    /// Returns `true` while the timer is armed.
    pub fn is_active(&self) -> bool {
        self.next_tick.is_some()
    }

    /// When the next tick is due, if armed.
    pub fn next_tick_time(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Consumes the tick due at or before `now`, re-arming for the following one.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_tick {
            Some(due) if due <= now => {
                // Skip boundaries that were missed entirely.
                self.next_tick = Some(self.aligned_after(now));
                true
            }
            _ => false,
        }
    }

    fn aligned_at_or_after(&self, now: Instant) -> Instant {
        let Some(elapsed) = now.checked_duration_since(self.timebase) else {
            return self.timebase;
        };
        let interval = self.interval.as_nanos().max(1);
        let ticks = elapsed.as_nanos().div_ceil(interval);
        self.timebase + nanos(ticks * interval)
    }

    fn aligned_after(&self, now: Instant) -> Instant {
        let Some(elapsed) = now.checked_duration_since(self.timebase) else {
            return self.timebase;
        };
        let interval = self.interval.as_nanos().max(1);
        let ticks = elapsed.as_nanos() / interval + 1;
        self.timebase + nanos(ticks * interval)
    }
}

fn nanos(value: u128) -> Duration {
    Duration::from_nanos(u64::try_from(value).unwrap_or(u64::MAX))
}

/// Origin of vsync ticks.
#[derive(Debug, Clone)]
pub enum TimeSource {
    /// Internal timer.
    DelayBased(DelayBasedTimeSource),
    /// Ticks are delivered from outside via [`FrameRateController::external_tick`].
    External,
    /// Tick whenever a frame is wanted.
    Unthrottled,
}

/// Paces frames to vsync and stops ticking while too many swaps are outstanding.
#[derive(Debug, Clone)]
pub struct FrameRateController {
    source: TimeSource,
    active: bool,
    num_frames_pending: usize,
    max_frames_pending: usize,
}

impl FrameRateController {
    /// Creates an inactive controller.
    pub fn new(source: TimeSource, max_frames_pending: usize) -> Self {
        Self {
            source,
            active: false,
            num_frames_pending: 0,
            max_frames_pending: max_frames_pending.max(1),
        }
    }

    /// Whether ticks are wanted at all.
    pub fn set_active(&mut self, active: bool, now: Instant) {
        self.active = active;
        self.sync_timer(now);
    }

    /// Returns `true` if ticks are wanted.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Swaps issued and not yet acknowledged.
    pub fn num_frames_pending(&self) -> usize {
        self.num_frames_pending
    }

    /// Returns `true` when no further swap may be issued.
    pub fn throttled(&self) -> bool {
        self.num_frames_pending >= self.max_frames_pending
    }

    /// A swap was issued.
    pub fn did_begin_frame(&mut self, now: Instant) {
        self.num_frames_pending += 1;
        self.sync_timer(now);
    }

    /// A swap was acknowledged.
    pub fn did_finish_frame(&mut self, now: Instant) {
        self.num_frames_pending = self.num_frames_pending.saturating_sub(1);
        self.sync_timer(now);
    }

    /// Swaps in flight are gone with the context.
    pub fn did_abort_all_pending_frames(&mut self, now: Instant) {
        self.num_frames_pending = 0;
        self.sync_timer(now);
    }

    /// Re-aligns an internal timer. Ignored by other sources.
    pub fn set_timebase_and_interval(&mut self, timebase: Instant, interval: Duration, now: Instant) {
        if let TimeSource::DelayBased(timer) = &mut self.source {
            timer.set_timebase_and_interval(timebase, interval, now);
        }
    }

    /// When the owner should call [`FrameRateController::poll_tick`] next.
    ///
    /// `None` means no tick can happen until an input changes.
    pub fn next_tick_deadline(&self, now: Instant) -> Option<Instant> {
        if !self.active || self.throttled() {
            return None;
        }
        match &self.source {
            TimeSource::DelayBased(timer) => timer.next_tick_time(),
            TimeSource::External => None,
            TimeSource::Unthrottled => Some(now),
        }
    }

    /// Returns `true` if a vsync tick is due at `now`.
    pub fn poll_tick(&mut self, now: Instant) -> bool {
        if !self.active || self.throttled() {
            return false;
        }
        match &mut self.source {
            TimeSource::DelayBased(timer) => timer.poll(now),
            TimeSource::External => false,
            TimeSource::Unthrottled => true,
        }
    }

    /// An externally delivered vsync. Returns `true` if it should be acted on.
    pub fn external_tick(&self) -> bool {
        self.active && !self.throttled() && matches!(self.source, TimeSource::External)
    }

    fn sync_timer(&mut self, now: Instant) {
        let wanted = self.active && !self.throttled();
        if let TimeSource::DelayBased(timer) = &mut self.source {
            timer.set_active(wanted, now);
        }
    }
}
