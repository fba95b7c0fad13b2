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

//! # Tandem Proxy
//!
//! Coordinates a main thread that owns the scene with an impl thread that
//! owns the renderer.
//!
//! The main thread talks to the impl thread only through [`ThreadProxy`].
//! Requests travel as messages on a FIFO channel; calls that need an answer
//! carry a [`CompletionEvent`](tandem_core::CompletionEvent) and block on its
//! waiter. Notifications from the impl thread travel on a second channel and
//! are delivered to the [`SceneHost`](tandem_core::SceneHost) only from the
//! main-thread pump ([`ThreadProxy::dispatch_main_thread_tasks`]).

#![warn(missing_docs)]

pub mod error;
mod impl_state;
mod impl_thread;
mod main_thread;
mod messages;
mod proxy;

pub use error::ProxyError;
pub use proxy::ThreadProxy;
