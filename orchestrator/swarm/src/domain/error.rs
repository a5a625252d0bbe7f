// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use overwatch_core::domain::agent::AgentId;
use overwatch_core::domain::entity::EntityError;
use thiserror::Error;

/// Errors that can occur during swarm coordination.
///
/// Lock contention, missing entries and stale holders are policy branches,
/// not errors. Only construction-time misconfiguration and misuse of the
/// coordinator surface here.
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Agent {0} is already registered with the coordinator")]
    DuplicateAgent(AgentId),

    #[error("Agent {0} is not registered with the coordinator")]
    UnknownAgent(AgentId),

    #[error("No position supplied for agent {0}")]
    MissingPosition(AgentId),

    #[error(transparent)]
    Entity(#[from] EntityError),
}
