// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `overwatch-swarm` — Target Lock Coordination
//!
//! Decides, without a central scheduler, which drone pursues a threat, which
//! only raises a warning, and how drones avoid pursuing the same person twice.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `TargetRegistry`, `RegistryEntry`, `DecisionEngine`, `Action`, scoring |
//! | [`application`] | Application | `SwarmCoordinator` tick loop |
//!
//! ## Key Concepts
//!
//! - **Target Registry**: the single shared map from person to coordination
//!   state. Mutated only through acquire/observe/release/capture/sweep, each of
//!   which runs under one mutex.
//! - **Lock / holder**: at most one drone holds a target at a time. A holder is
//!   cleared only by its own release or removed with the entry on capture.
//! - **Staleness sweep**: unlocked entries idle longer than the TTL are dropped
//!   once per tick by the coordinator; locked entries never expire.
//! - **First agent wins**: drones decide in registration order, so a lock taken
//!   earlier in a tick blocks every later drone in the same tick.

pub mod application;
pub mod domain;

pub use domain::*;
