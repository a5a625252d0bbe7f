// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure coordination types. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`registry`] | `TargetRegistry`, `RegistryEntry`, `AcquireOutcome` |
//! | [`scoring`] | `ScoringPolicy`, `Priority`, `CandidateClass` |
//! | [`engine`] | `DecisionEngine`, `EngineConfig`, `Action` |
//! | [`error`] | `SwarmError` |

pub mod engine;
pub mod error;
pub mod registry;
pub mod scoring;

pub use engine::{Action, Decision, DecisionEngine, EngineConfig};
pub use error::SwarmError;
pub use registry::{AcquireOutcome, EntryState, RegistryEntry, TargetRegistry, DEFAULT_ENTRY_TTL};
pub use scoring::{Candidate, CandidateClass, Priority, ScoringPolicy};
