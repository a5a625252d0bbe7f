// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Candidate classification and priority ordering.
//!
//! A sighted entity is either a pursuit candidate (inside the protected zone,
//! threat above threshold), a warning candidate (above threshold elsewhere), or
//! not a candidate at all. Both classes compete on a single [`Priority`] scale;
//! warnings are discounted but can still outrank a weaker pursuit.

use overwatch_core::domain::entity::{GridPosition, ProtectedZone, ThreatEntity};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateClass {
    Pursue,
    Warn,
}

/// Ranking key for a candidate: higher value first, then the closer one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Priority {
    pub value: f64,
    /// Manhattan distance from the observing agent.
    pub distance: u32,
}

impl Priority {
    pub fn new(value: f64, distance: u32) -> Self {
        Self { value, distance }
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| other.distance.cmp(&self.distance))
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Priority {}

/// A scored entity, borrowed from the tick's entity snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub entity: &'a ThreatEntity,
    pub class: CandidateClass,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    pub threshold: f64,
    pub warn_discount: f64,
}

impl ScoringPolicy {
    pub fn new(threshold: f64, warn_discount: f64) -> Self {
        Self {
            threshold,
            warn_discount,
        }
    }

    /// `None` when the threat does not strictly exceed the threshold.
    pub fn classify(&self, entity: &ThreatEntity, zone: &ProtectedZone) -> Option<CandidateClass> {
        if entity.threat() <= self.threshold {
            return None;
        }
        if zone.contains(&entity.position) {
            Some(CandidateClass::Pursue)
        } else {
            Some(CandidateClass::Warn)
        }
    }

    pub fn score(
        &self,
        entity: &ThreatEntity,
        class: CandidateClass,
        origin: &GridPosition,
    ) -> Priority {
        let value = match class {
            CandidateClass::Pursue => entity.threat(),
            CandidateClass::Warn => entity.threat() * self.warn_discount,
        };
        Priority::new(value, origin.manhattan_distance(&entity.position))
    }

    /// Scan `entities` within Chebyshev `radius` of `origin` and return the
    /// single best candidate across both classes.
    ///
    /// Captured and zero-threat entities are skipped. On an exact priority tie
    /// the earlier entity in `entities` is kept.
    pub fn select_best<'a>(
        &self,
        origin: &GridPosition,
        radius: u32,
        entities: &'a [ThreatEntity],
        zone: &ProtectedZone,
    ) -> Option<Candidate<'a>> {
        let mut best: Option<Candidate<'a>> = None;

        for entity in entities {
            if entity.is_captured() || entity.threat() <= 0.0 {
                continue;
            }
            if origin.chebyshev_distance(&entity.position) > radius {
                continue;
            }
            let Some(class) = self.classify(entity, zone) else {
                continue;
            };
            let priority = self.score(entity, class, origin);

            let replace = match &best {
                None => true,
                Some(current) => priority > current.priority,
            };
            if replace {
                best = Some(Candidate {
                    entity,
                    class,
                    priority,
                });
            }
        }

        best
    }
}
