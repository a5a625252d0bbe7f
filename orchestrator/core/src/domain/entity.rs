// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Threat Entities and Grid Geometry
//!
//! Passive records supplied to the fleet each tick by the world:
//!
//! - [`ThreatEntity`] — a monitored person with a threat score in `[0, 1]`.
//! - [`GridPosition`] — a cell on the shared discrete grid.
//! - [`ProtectedZone`] — inclusive rectangle where elevated threat triggers pursuit.
//!
//! Decision engines only read entities. The single mutation the fleet performs
//! is [`ThreatEntity::mark_captured`], issued by the coordinator's capture hook.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable identity of a monitored person (e.g. `P3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Conventional population naming: `P{index}`.
    pub fn indexed(index: usize) -> Self {
        Self(format!("P{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A cell on the shared grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Grid (Chebyshev) distance: `max(|dx|, |dy|)`. Used for sensor range.
    pub fn chebyshev_distance(&self, other: &GridPosition) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Manhattan distance: `|dx| + |dy|`. Used for proximity tie-breaks.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// One grid step toward `target`, moving diagonally when both axes differ.
    pub fn step_toward(&self, target: &GridPosition) -> GridPosition {
        GridPosition {
            x: self.x + (target.x - self.x).signum(),
            y: self.y + (target.y - self.y).signum(),
        }
    }

    /// Clamp into `[0, width) x [0, height)`.
    pub fn clamped(&self, width: u32, height: u32) -> GridPosition {
        let max_x = i32::try_from(width.max(1) - 1).unwrap_or(i32::MAX);
        let max_y = i32::try_from(height.max(1) - 1).unwrap_or(i32::MAX);
        GridPosition {
            x: self.x.clamp(0, max_x),
            y: self.y.clamp(0, max_y),
        }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Inclusive rectangle `(x1, y1)..=(x2, y2)` in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedZone {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl ProtectedZone {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self, EntityError> {
        if x1 > x2 || y1 > y2 {
            return Err(EntityError::InvertedZone { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn contains(&self, position: &GridPosition) -> bool {
        (self.x1..=self.x2).contains(&position.x) && (self.y1..=self.y2).contains(&position.y)
    }
}

impl fmt::Display for ProtectedZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]..[{},{}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Display band for a threat score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    /// `score <= 0.33`
    Low,
    /// `0.33 < score <= 0.66`
    Elevated,
    /// `score > 0.66`
    High,
}

impl ThreatLevel {
    pub fn from_score(score: f64) -> Self {
        if score <= 0.33 {
            ThreatLevel::Low
        } else if score <= 0.66 {
            ThreatLevel::Elevated
        } else {
            ThreatLevel::High
        }
    }
}

/// A monitored person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatEntity {
    pub id: TargetId,
    pub position: GridPosition,
    threat: f64,
    captured: bool,
}

impl ThreatEntity {
    pub fn new(id: TargetId, position: GridPosition, threat: f64) -> Result<Self, EntityError> {
        validate_threat(threat)?;
        Ok(Self {
            id,
            position,
            threat,
            captured: false,
        })
    }

    pub fn threat(&self) -> f64 {
        self.threat
    }

    pub fn threat_level(&self) -> ThreatLevel {
        ThreatLevel::from_score(self.threat)
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Captured is monotonic; there is no way back.
    pub fn mark_captured(&mut self) {
        self.captured = true;
    }

    /// Operator escalation: adds `amount`, saturating at 1.0. Returns the new score.
    pub fn raise_threat(&mut self, amount: f64) -> Result<f64, EntityError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(EntityError::InvalidAdjustment(amount));
        }
        self.threat = (self.threat + amount).min(1.0);
        Ok(self.threat)
    }
}

fn validate_threat(threat: f64) -> Result<(), EntityError> {
    if !(0.0..=1.0).contains(&threat) {
        return Err(EntityError::ThreatOutOfRange(threat));
    }
    Ok(())
}

/// Errors raised when constructing entities or zones.
#[derive(Debug, Error, PartialEq)]
pub enum EntityError {
    #[error("Threat score {0} is outside [0, 1]")]
    ThreatOutOfRange(f64),

    #[error("Threat adjustment {0} must be a finite, non-negative number")]
    InvalidAdjustment(f64),

    #[error("Protected zone corners are inverted: ({x1},{y1})..({x2},{y2})")]
    InvertedZone { x1: i32, y1: i32, x2: i32, y2: i32 },
}
