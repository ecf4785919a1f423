// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Validation Errors
//!
//! Every aggregate and value object in the domain is validated when it is
//! constructed, so a [`ValidationError`] always surfaces before anything is
//! persisted. Stored rule sets and conditions are therefore well-formed by
//! construction and the access evaluator never has to fail.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Invalid {field}: '{value}'")]
    UnknownVariant { field: &'static str, value: String },

    #[error("Invalid condition type: '{0}' (expected role_based or time_based)")]
    UnknownConditionType(String),

    #[error("Invalid condition data: {0}")]
    MalformedPayload(String),

    #[error("Invalid timezone: '{0}'")]
    InvalidTimezone(String),

    #[error("Invalid time '{value}' for {field}: expected HH:MM")]
    InvalidTime { field: &'static str, value: String },

    #[error("Invalid weekday: '{0}'")]
    InvalidWeekday(String),

    #[error("Time window is empty: start_time equals end_time ({0})")]
    EmptyTimeWindow(String),

    #[error("days_of_week cannot be empty")]
    NoWeekdays,

    #[error("Role names cannot be blank (in {0})")]
    BlankRoleName(&'static str),

    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),
}
