// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod chart;
pub mod cli;
pub mod commands;
pub mod data;
pub mod engine;
pub mod error;
pub mod fx;
pub mod intent;
pub mod models;
pub mod period;
pub mod planner;
pub mod utils;

pub use error::{CopilotError, Result};
pub use planner::{Answer, QueryPlanner, Status, answer};
