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

//! # Tandem Scheduler
//!
//! The impl-thread half of frame scheduling:
//!
//! - [`SchedulerStateMachine`] is a pure decision table: given the current
//!   flags it names the next action to perform.
//! - [`FrameRateController`] paces drawing to vsync and throttles on
//!   outstanding swaps.
//! - [`Scheduler`] feeds inputs to the state machine and runs the chosen
//!   actions against a [`SchedulerClient`].

#![warn(missing_docs)]

pub mod frame_rate_controller;
pub mod scheduler;
pub mod state_machine;

pub use frame_rate_controller::{DelayBasedTimeSource, FrameRateController, TimeSource};
pub use scheduler::{DrawAndSwapResult, Scheduler, SchedulerClient};
pub use state_machine::{
    CommitState, ContextState, SchedulerAction, SchedulerStateMachine, TextureState,
};
