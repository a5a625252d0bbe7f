// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Text rendering of registry entries and population telemetry.

use overwatch_core::domain::entity::{ThreatEntity, ThreatLevel};
use overwatch_swarm::domain::RegistryEntry;
use serde::Serialize;

/// `P3 pos=(12,9) holder=D0 warn=false contributors=D0,D1`
pub fn format_entry(entry: &RegistryEntry) -> String {
    let holder = entry
        .holder()
        .map(|holder| holder.to_string())
        .unwrap_or_else(|| "-".to_string());
    let contributors = entry
        .contributors()
        .iter()
        .map(|agent| agent.as_str())
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{} pos={} holder={} warn={} contributors={}",
        entry.target_id(),
        entry.position(),
        holder,
        entry.warning_only(),
        contributors
    )
}

/// Population counts per threat band, excluding captured persons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThreatCensus {
    pub low: usize,
    pub elevated: usize,
    pub high: usize,
    pub captured: usize,
}

impl ThreatCensus {
    pub fn of(persons: &[ThreatEntity]) -> Self {
        let mut census = Self::default();
        for person in persons {
            if person.is_captured() {
                census.captured += 1;
                continue;
            }
            match person.threat_level() {
                ThreatLevel::Low => census.low += 1,
                ThreatLevel::Elevated => census.elevated += 1,
                ThreatLevel::High => census.high += 1,
            }
        }
        census
    }
}
