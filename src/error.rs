// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Failures raised by the query core. The planner turns every one of these
//! into a user-facing answer; nothing here reaches the caller raw.

use crate::models::Month;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CopilotError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CopilotError {
    /// A non-USD amount has no rate for its month. Never defaulted.
    #[error("cannot compute: missing FX rate for {currency} {month}")]
    MissingFxRate { currency: String, month: Month },

    /// An amount or aggregate left the range `Decimal` can represent.
    #[error("cannot compute: amounts exceed the supported numeric range")]
    Overflow,

    #[error("no data available for {0}")]
    PeriodNotFound(String),

    /// The engine was handed an intent it has no calculation for.
    #[error("unsupported question: {0}")]
    Unsupported(String),

    /// The tables hold no months at all, so there is no "latest" month.
    #[error("no data available")]
    NoData,

    #[error("invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("unknown account category '{0}'")]
    InvalidCategory(String),
}
