// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `overwatch-core` — Fleet Domain Primitives
//!
//! Shared vocabulary for the drone fleet: agent and target identities, grid
//! geometry, threat entities, fleet configuration and the domain event stream.
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `AgentId`, `ThreatEntity`, `ProtectedZone`, `FleetConfigManifest`, events |
//! | [`infrastructure`] | Infrastructure | in-memory `EventBus` |
//!
//! Lock coordination itself lives in `overwatch-swarm`.

pub mod domain;
pub mod infrastructure;

pub use domain::*;
