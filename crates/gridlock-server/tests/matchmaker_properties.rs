//! Property-based tests for matchmaking and match membership.
//!
//! These tests verify invariants that must hold for all inputs, using a
//! seeded environment for reproducibility.

use std::{collections::HashMap, sync::Arc, time::Duration};

use gridlock_core::{Environment, MatchPhase};
use gridlock_proto::{ClientMessage, Mark};
use gridlock_server::{DriverConfig, ServerDriver, ServerEvent};
use proptest::prelude::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Clone)]
struct TestEnv {
    rng: Arc<std::sync::Mutex<ChaCha8Rng>>,
}

impl TestEnv {
    fn with_seed(seed: u64) -> Self {
        Self { rng: Arc::new(std::sync::Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }
}

impl Environment for TestEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap().fill_bytes(buffer);
    }
}

/// One step of driver input, generated by proptest.
#[derive(Debug, Clone)]
enum Step {
    Connect(u64),
    Join { session: u64, target: Option<u64> },
    Move { session: u64, cell: u8, mark: Mark },
    Chat { session: u64 },
    Disconnect(u64),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let session = 1u64..8;
    prop_oneof![
        session.clone().prop_map(Step::Connect),
        (session.clone(), prop::option::of(100u64..104))
            .prop_map(|(session, target)| Step::Join { session, target }),
        (session.clone(), 0u8..12, prop::bool::ANY).prop_map(|(session, cell, x)| Step::Move {
            session,
            cell,
            mark: if x { Mark::X } else { Mark::O },
        }),
        session.clone().prop_map(|session| Step::Chat { session }),
        session.prop_map(Step::Disconnect),
    ]
}

/// Feed a step to the driver, skipping inputs the runtime would never
/// produce (messages from sessions that are not connected).
fn apply(server: &mut ServerDriver<TestEnv>, connected: &mut Vec<u64>, step: Step) {
    match step {
        Step::Connect(session) => {
            if !connected.contains(&session) {
                server.process_event(ServerEvent::ConnectionAccepted { session_id: session }).unwrap();
                connected.push(session);
            }
        },
        Step::Join { session, target } => {
            if connected.contains(&session) {
                server
                    .process_event(ServerEvent::MessageReceived {
                        session_id: session,
                        message: ClientMessage::Join {
                            name: format!("p{session}"),
                            match_id: target,
                        },
                    })
                    .unwrap();
            }
        },
        Step::Move { session, cell, mark } => {
            if connected.contains(&session) {
                server
                    .process_event(ServerEvent::MessageReceived {
                        session_id: session,
                        message: ClientMessage::Move { cell, mark },
                    })
                    .unwrap();
            }
        },
        Step::Chat { session } => {
            if connected.contains(&session) {
                server
                    .process_event(ServerEvent::MessageReceived {
                        session_id: session,
                        message: ClientMessage::Chat { text: "hi".to_string() },
                    })
                    .unwrap();
            }
        },
        Step::Disconnect(session) => {
            if let Some(pos) = connected.iter().position(|s| *s == session) {
                server
                    .process_event(ServerEvent::ConnectionClosed {
                        session_id: session,
                        reason: "test".to_string(),
                    })
                    .unwrap();
                connected.remove(pos);
            }
        },
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: under any event sequence, a session is subscribed to at
    /// most one match and every match holds at most two members.
    #[test]
    fn prop_membership_invariants(
        seed in any::<u64>(),
        steps in prop::collection::vec(step_strategy(), 1..60)
    ) {
        let env = TestEnv::with_seed(seed);
        let mut server = ServerDriver::new(env, DriverConfig::default());
        let mut connected = Vec::new();

        for step in steps {
            apply(&mut server, &mut connected, step);

            // Each session appears in at most one match
            let mut seen: HashMap<u64, u64> = HashMap::new();
            for &session in &connected {
                if let Some(match_id) = server.match_for_session(session) {
                    prop_assert!(seen.insert(session, match_id).is_none());
                    prop_assert!(
                        server.sessions_in_match(match_id).any(|s| s == session),
                        "forward and reverse maps must agree"
                    );
                }
            }

            // Each live match holds at most two members
            let match_ids: Vec<u64> = seen.values().copied().collect();
            for match_id in match_ids {
                let members = server.sessions_in_match(match_id).count();
                prop_assert!(members <= 2, "match {} has {} members", match_id, members);
            }
        }
    }

    /// Property: a concluded or abandoned match never lingers. Every match
    /// the server still knows about has at least one seated participant.
    #[test]
    fn prop_no_empty_matches_linger(
        seed in any::<u64>(),
        steps in prop::collection::vec(step_strategy(), 1..60)
    ) {
        let env = TestEnv::with_seed(seed);
        let mut server = ServerDriver::new(env, DriverConfig::default());
        let mut connected = Vec::new();

        for step in steps {
            apply(&mut server, &mut connected, step);

            let match_ids: Vec<u64> = connected
                .iter()
                .filter_map(|&s| server.match_for_session(s))
                .collect();

            for match_id in match_ids {
                let phase = server.matchmaker().phase(match_id);
                prop_assert!(
                    matches!(phase, Some(MatchPhase::WaitingForSecond | MatchPhase::InProgress)),
                    "subscribed match {} in phase {:?}", match_id, phase
                );
            }
        }
    }

    /// Property: moves from a session that holds no seat in the turn
    /// owner's match never change the board.
    #[test]
    fn prop_stray_moves_never_mutate_board(
        seed in any::<u64>(),
        cell in 0u8..9,
    ) {
        let env = TestEnv::with_seed(seed);
        let mut server = ServerDriver::new(env, DriverConfig::default());

        for session in [1u64, 2, 3] {
            server.process_event(ServerEvent::ConnectionAccepted { session_id: session }).unwrap();
        }
        for session in [1u64, 2] {
            server.process_event(ServerEvent::MessageReceived {
                session_id: session,
                message: ClientMessage::Join { name: format!("p{session}"), match_id: None },
            }).unwrap();
        }
        let match_id = server.match_for_session(1).unwrap();

        // Session 3 never joined; its move must be routed nowhere
        server.process_event(ServerEvent::MessageReceived {
            session_id: 3,
            message: ClientMessage::Move { cell, mark: Mark::X },
        }).unwrap();

        let state = server.matchmaker().match_state(match_id).unwrap();
        prop_assert!(
            (0..9).all(|c| state.board().cell(c) == Some(gridlock_core::board::Cell::Empty))
        );
    }
}
