// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for fleet-level lock coordination.
//!
//! Exercises the coordinator end to end: contention between agents in one
//! tick, capture cleanup, staleness expiry, idempotent release, and a seeded
//! randomized run checking the single-holder and no-silent-loss properties
//! after every tick.

use overwatch_core::domain::agent::AgentId;
use overwatch_core::domain::entity::{GridPosition, ProtectedZone, TargetId, ThreatEntity};
use overwatch_core::domain::events::CoordinationEvent;
use overwatch_core::infrastructure::EventBus;
use overwatch_swarm::application::SwarmCoordinator;
use overwatch_swarm::domain::{Action, EngineConfig, EntryState, TargetRegistry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn zone() -> ProtectedZone {
    ProtectedZone::new(10, 8, 17, 15).unwrap()
}

fn person(id: &str, x: i32, y: i32, threat: f64) -> ThreatEntity {
    ThreatEntity::new(TargetId::new(id), GridPosition::new(x, y), threat).unwrap()
}

fn fleet(agents: usize, ttl: u64) -> SwarmCoordinator {
    let mut coordinator = SwarmCoordinator::new(
        EngineConfig::default(),
        Arc::new(TargetRegistry::new(ttl).unwrap()),
        EventBus::new(4096),
    );
    for index in 0..agents {
        coordinator.register_agent(AgentId::indexed(index)).unwrap();
    }
    coordinator
}

#[test]
fn test_contention_same_tick() {
    let mut coordinator = fleet(2, 20);
    let positions = HashMap::from([
        (AgentId::new("D0"), GridPosition::new(11, 9)),
        (AgentId::new("D1"), GridPosition::new(14, 9)),
    ]);
    let entities = vec![person("X", 12, 9, 0.9)];

    let decisions = coordinator.decide_all(&positions, &entities, &zone(), 5).unwrap();

    assert_eq!(decisions[0].action, Action::LockAndPursue { target: TargetId::new("X") });
    assert_eq!(
        decisions[1].action,
        Action::AlreadyLocked { target: TargetId::new("X"), holder: AgentId::new("D0") }
    );
    let entry = coordinator.registry().entry(&TargetId::new("X")).unwrap();
    assert_eq!(entry.holder(), Some(&AgentId::new("D0")));
    assert_eq!(entry.contributors(), &[AgentId::new("D0"), AgentId::new("D1")]);
}

#[test]
fn test_cross_class_precedence() {
    let mut coordinator = fleet(1, 20);
    let entities = vec![person("A", 11, 9, 0.67), person("B", 8, 9, 0.95)];

    let decision = coordinator
        .decide(&AgentId::new("D0"), GridPosition::new(10, 9), &entities, &zone(), 1)
        .unwrap();

    assert_eq!(decision.action, Action::Warn { target: TargetId::new("B") });
    assert!(coordinator.registry().entry(&TargetId::new("A")).is_none());
}

#[test]
fn test_capture_always_removes_entry() {
    let mut coordinator = fleet(2, 20);
    let d0 = AgentId::new("D0");
    let d1 = AgentId::new("D1");
    let mut entities = vec![person("X", 12, 9, 0.9), person("W", 2, 2, 0.9)];

    coordinator.decide(&d0, GridPosition::new(12, 10), &entities, &zone(), 1).unwrap();
    coordinator.decide(&d1, GridPosition::new(3, 3), &entities, &zone(), 1).unwrap();
    assert_eq!(coordinator.registry().len(), 2);

    // a non-holder capturing a locked target still deletes it
    coordinator.report_capture(&d1, &TargetId::new("X"), &mut entities, 2).unwrap();
    coordinator.report_capture(&d1, &TargetId::new("W"), &mut entities, 2).unwrap();
    coordinator.report_capture(&d1, &TargetId::new("gone"), &mut entities, 2).unwrap();

    assert!(coordinator.registry().is_empty());
    assert!(entities.iter().all(ThreatEntity::is_captured));
}

#[test]
fn test_warning_entry_expires_after_ttl() {
    let mut coordinator = fleet(1, 20);
    let entities = vec![person("W", 2, 2, 0.9)];
    coordinator
        .decide(&AgentId::new("D0"), GridPosition::new(3, 3), &entities, &zone(), 0)
        .unwrap();

    assert!(coordinator.end_tick(19, 0).expired.is_empty());
    assert!(coordinator.end_tick(20, 0).expired.is_empty());
    assert_eq!(coordinator.end_tick(21, 0).expired, vec![TargetId::new("W")]);
    assert!(coordinator.registry().is_empty());
}

#[test]
fn test_locked_entry_outlives_ttl() {
    let mut coordinator = fleet(1, 5);
    let entities = vec![person("X", 12, 9, 0.9)];
    coordinator
        .decide(&AgentId::new("D0"), GridPosition::new(12, 10), &entities, &zone(), 0)
        .unwrap();

    coordinator.end_tick(500, 0);
    let entry = coordinator.registry().entry(&TargetId::new("X")).unwrap();
    assert_eq!(entry.state(), EntryState::Locked);
}

#[test]
fn test_release_is_idempotent() {
    let mut coordinator = fleet(2, 20);
    let d0 = AgentId::new("D0");
    let x = TargetId::new("X");
    coordinator
        .decide(&d0, GridPosition::new(12, 10), &[person("X", 12, 9, 0.9)], &zone(), 1)
        .unwrap();

    assert!(coordinator.release(&d0, &x, 2).unwrap());
    let after = coordinator.registry().snapshot();

    assert!(!coordinator.release(&d0, &x, 3).unwrap());
    assert!(!coordinator.release(&AgentId::new("D1"), &x, 3).unwrap());
    assert_eq!(coordinator.registry().snapshot(), after);
}

#[tokio::test]
async fn test_target_subscription_sees_lock_lifecycle() {
    let mut coordinator = fleet(1, 20);
    let mut receiver = coordinator.event_bus().subscribe_target(TargetId::new("X"));
    let d0 = AgentId::new("D0");
    let mut entities = vec![person("Y", 2, 2, 0.9), person("X", 12, 9, 0.9)];

    coordinator.decide(&d0, GridPosition::new(3, 3), &entities, &zone(), 1).unwrap();
    coordinator.decide(&d0, GridPosition::new(12, 10), &entities, &zone(), 2).unwrap();
    coordinator.report_capture(&d0, &TargetId::new("X"), &mut entities, 3).unwrap();

    match receiver.recv().await.unwrap() {
        CoordinationEvent::TargetLocked { agent_id, tick, .. } => {
            assert_eq!(agent_id, d0);
            assert_eq!(tick, 2);
        }
        other => panic!("expected lock, got {:?}", other),
    }
    assert!(matches!(
        receiver.recv().await.unwrap(),
        CoordinationEvent::TargetCaptured { was_locked: true, .. }
    ));
}

/// Random world: persons wander, drones teleport, captures happen at random.
/// After every tick the registry must agree with every engine and hold each
/// agent at most once.
#[test]
fn test_randomized_lock_invariants() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut coordinator = fleet(4, 6);
    let agents: Vec<AgentId> = coordinator.agents().cloned().collect();
    let mut entities: Vec<ThreatEntity> = (0..10)
        .map(|i| {
            ThreatEntity::new(
                TargetId::indexed(i),
                GridPosition::new(rng.random_range(0..28), rng.random_range(0..20)),
                rng.random_range(0.0..1.0),
            )
            .unwrap()
        })
        .collect();

    for now in 1..=400u64 {
        for entity in entities.iter_mut() {
            let dx = rng.random_range(-1..=1);
            let dy = rng.random_range(-1..=1);
            entity.position = GridPosition::new(entity.position.x + dx, entity.position.y + dy)
                .clamped(28, 20);
        }
        coordinator.purge_captured(&entities, now);

        let positions: HashMap<AgentId, GridPosition> = agents
            .iter()
            .map(|agent| {
                let position = GridPosition::new(rng.random_range(0..28), rng.random_range(0..20));
                (agent.clone(), position)
            })
            .collect();
        let decisions = coordinator.decide_all(&positions, &entities, &zone(), now).unwrap();

        if rng.random_bool(0.05) {
            if let Some(target) = decisions.iter().find_map(|d| d.action.target().cloned()) {
                let agent = agents[rng.random_range(0..agents.len())].clone();
                coordinator.report_capture(&agent, &target, &mut entities, now).unwrap();
            }
        }
        if rng.random_bool(0.05) {
            let agent = &agents[rng.random_range(0..agents.len())];
            if let Some(held) = coordinator.held_target(agent).cloned() {
                assert!(coordinator.release(agent, &held, now).unwrap());
            }
        }

        let locked_before: HashSet<TargetId> = coordinator
            .registry()
            .snapshot()
            .into_iter()
            .filter(|entry| entry.holder().is_some())
            .map(|entry| entry.target_id().clone())
            .collect();
        coordinator.end_tick(now, decisions.len());

        let snapshot = coordinator.registry().snapshot();
        for target in &locked_before {
            assert!(
                snapshot.iter().any(|e| e.target_id() == target && e.holder().is_some()),
                "lock on {} lost at tick {}",
                target,
                now
            );
        }

        for agent in &agents {
            let held: Vec<&TargetId> = snapshot
                .iter()
                .filter(|entry| entry.holder() == Some(agent))
                .map(|entry| entry.target_id())
                .collect();
            assert!(held.len() <= 1, "{} holds {:?} at tick {}", agent, held, now);
            assert_eq!(held.first().copied(), coordinator.held_target(agent));
        }

        for entity in entities.iter().filter(|e| e.is_captured()) {
            assert!(coordinator.registry().entry(&entity.id).is_none());
        }
    }
}
