// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: aggregates, value objects, the access evaluator and the
//! persistence and external-source contracts.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Route access policy model; no I/O

pub mod activity;
pub mod agent;
pub mod clock;
pub mod condition;
pub mod discovery;
pub mod events;
pub mod feature;
pub mod policy;
pub mod repository;
pub mod role;
pub mod route;
pub mod router_config;
pub mod user;
pub mod validation;
