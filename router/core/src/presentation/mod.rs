// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`agent-router-core`)
//!
//! HTTP surface that translates external requests into application service
//! calls. Handlers hold no routing-policy logic of their own.

pub mod api;
