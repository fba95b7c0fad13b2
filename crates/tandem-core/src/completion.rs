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

//! One-shot cross-thread signals.
//!
//! A [`CompletionEvent`] is handed to the thread doing the work, the matching
//! [`CompletionWaiter`] stays with the thread that blocks. Both halves are
//! consumed by use, so an event is signalled at most once and waited at most
//! once. Dropping the event without signalling releases the waiter with
//! [`CompletionError::Abandoned`]; a torn-down impl thread therefore can never
//! leave the main thread blocked.

use crate::error::CompletionError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::time::Duration;

/// The signalling half of a one-shot completion.
pub struct CompletionEvent<T = ()> {
    sender: Sender<T>,
}

/// The waiting half of a one-shot completion.
pub struct CompletionWaiter<T = ()> {
    receiver: Receiver<T>,
}

/// Creates a linked event/waiter pair.
///
/// ## Returns
/// The signalling half (moved to the worker) and the waiting half (kept by the caller).
pub fn completion_pair<T>() -> (CompletionEvent<T>, CompletionWaiter<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    (CompletionEvent { sender }, CompletionWaiter { receiver })
}

impl<T> CompletionEvent<T> {
    /// Signals completion and hands `value` to the waiter.
    ///
    /// If the waiter has already been dropped (for example after a timed-out
    /// wait) the value is discarded.
    pub fn signal(self, value: T) {
        if self.try_signal(value).is_err() {
            log::warn!("Completion signalled after its waiter was dropped.");
        }
    }

    /// Signals completion, giving `value` back if the waiter is gone.
    pub fn try_signal(self, value: T) -> Result<(), T> {
        self.sender.send(value).map_err(|error| error.into_inner())
    }
}

impl CompletionEvent<()> {
    /// Signals a completion that carries no payload.
    pub fn complete(self) {
        self.signal(());
    }
}

impl<T> CompletionWaiter<T> {
    /// Blocks until the event is signalled or abandoned.
    pub fn wait(self) -> Result<T, CompletionError> {
        self.receiver.recv().map_err(|_| CompletionError::Abandoned)
    }

    /// Blocks for at most `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, CompletionError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => Err(CompletionError::TimedOut(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(CompletionError::Abandoned),
        }
    }

    /// Waits with an optional bound; `None` waits until signalled or abandoned.
    pub fn wait_with(self, timeout: Option<Duration>) -> Result<T, CompletionError> {
        match timeout {
            Some(timeout) => self.wait_timeout(timeout),
            None => self.wait(),
        }
    }
}

impl<T> fmt::Debug for CompletionEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionEvent").finish_non_exhaustive()
    }
}

impl<T> fmt::Debug for CompletionWaiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionWaiter")
            .field("signalled", &!self.receiver.is_empty())
            .finish()
    }
}
