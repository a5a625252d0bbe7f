// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Tick-level orchestration of the decision engines.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Exposes [`SwarmCoordinator`] to the CLI and simulation harness

pub mod coordinator;

pub use coordinator::{SwarmCoordinator, TickReport};
