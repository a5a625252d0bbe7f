// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Identities, grid geometry, threat entities, fleet configuration and events.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Passive records shared by the swarm crate and the CLI

pub mod agent;
pub mod entity;
pub mod events;
pub mod fleet_config;
