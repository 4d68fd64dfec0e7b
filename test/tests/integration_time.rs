/// Time management across a live federation: grants, lookahead and
/// time-stamp-ordered delivery
use std::time::Duration;

use rti_client::{Callback, RtiError};
use rti_shared::TimeConfig;
use rti_test::TestRti;

#[test]
fn lone_federate_is_granted_its_request() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");

    one.time_advance_request(5.0).unwrap();
    assert!(one.time_status().is_in_advancing_state());
    assert_eq!(one.wait_for_grant(), Some(5.0));
    assert_eq!(one.query_logical_time(), 5.0);
    assert!(!one.time_status().is_in_advancing_state());
}

#[test]
fn advance_to_past_or_current_time_is_rejected() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    one.time_advance_request(5.0).unwrap();
    assert_eq!(one.wait_for_grant(), Some(5.0));

    assert!(matches!(
        one.time_advance_request(5.0),
        Err(RtiError::FederationTimeAlreadyPassed { .. })
    ));
    assert!(matches!(
        one.next_event_request(3.0),
        Err(RtiError::FederationTimeAlreadyPassed { .. })
    ));
}

#[test]
fn second_request_while_advancing_is_rejected() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");
    one.enable_time_regulation(0.0, 1.0).unwrap();
    two.enable_time_constrained().unwrap();

    two.time_advance_request(5.0).unwrap();
    assert_eq!(
        two.time_advance_request(6.0),
        Err(RtiError::AdvanceAlreadyInProgress)
    );
}

#[test]
fn lookahead_cannot_change_while_advancing() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");
    one.enable_time_regulation(0.0, 1.0).unwrap();
    two.enable_time_regulation(0.0, 1.0).unwrap();
    two.enable_time_constrained().unwrap();

    two.time_advance_request(5.0).unwrap();
    assert_eq!(
        two.modify_lookahead(3.0),
        Err(RtiError::AdvanceAlreadyInProgress)
    );
    assert_eq!(two.query_lookahead(), 1.0);
}

#[test]
fn nan_times_and_lookaheads_are_rejected() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");

    assert!(matches!(
        one.enable_time_regulation(0.0, f64::NAN),
        Err(RtiError::InvalidLookahead { .. })
    ));
    assert!(matches!(
        one.enable_time_regulation(f64::NAN, 1.0),
        Err(RtiError::InvalidFederationTime { .. })
    ));
    one.enable_time_regulation(0.0, 1.0).unwrap();
    assert!(matches!(
        one.modify_lookahead(f64::NAN),
        Err(RtiError::InvalidLookahead { .. })
    ));
    assert!(matches!(
        one.time_advance_request(f64::NAN),
        Err(RtiError::FederationTimeAlreadyPassed { .. })
    ));
    assert_eq!(one.query_lookahead(), 1.0);
    assert_eq!(one.query_logical_time(), 0.0);
}

#[test]
fn zero_lookahead_is_promoted_to_epsilon() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let fire = one.battle.fire;
    one.publish_interaction_class(fire).unwrap();

    let epsilon = TimeConfig::default().effective_lookahead(0.0);
    assert_eq!(one.enable_time_regulation(0.0, 0.0).unwrap(), 0.0);
    assert_eq!(one.query_lookahead(), epsilon);
    assert!(one.query_lbts() > one.query_logical_time());

    let target = one.battle.fire_at("bridge");
    assert!(matches!(
        one.send_interaction(fire, target.clone(), Vec::new(), Some(0.0)),
        Err(RtiError::InvalidFederationTime { .. })
    ));
    one.send_interaction(fire, target, Vec::new(), Some(epsilon))
        .unwrap();
}

#[test]
fn constrained_federate_waits_for_regulator() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut regulator = rti.join("regulator");
    let mut follower = rti.join("follower");
    regulator.enable_time_regulation(0.0, 1.0).unwrap();
    follower.enable_time_constrained().unwrap();

    follower.time_advance_request(5.0).unwrap();
    follower.idle(Duration::from_millis(100));
    assert!(!follower
        .seen()
        .iter()
        .any(|callback| matches!(callback, Callback::TimeAdvanceGrant { .. })));

    regulator.time_advance_request(10.0).unwrap();
    assert_eq!(regulator.wait_for_grant(), Some(10.0));
    assert_eq!(follower.wait_for_grant(), Some(5.0));
}

#[test]
fn timestamped_messages_are_held_until_granted() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut regulator = rti.join("regulator");
    let mut follower = rti.join("follower");
    let fire = regulator.battle.fire;
    regulator.publish_interaction_class(fire).unwrap();
    follower.subscribe_interaction_class(fire).unwrap();
    regulator.enable_time_regulation(0.0, 1.0).unwrap();
    follower.enable_time_constrained().unwrap();

    let battle = regulator.battle.clone();
    regulator
        .send_interaction(fire, battle.fire_at("late"), Vec::new(), Some(3.0))
        .unwrap();
    regulator
        .send_interaction(fire, battle.fire_at("early"), Vec::new(), Some(2.0))
        .unwrap();
    regulator
        .send_interaction(fire, battle.fire_at("now"), Vec::new(), None)
        .unwrap();

    assert!(follower
        .wait_for(|callback| matches!(
            callback,
            Callback::ReceiveInteraction { timestamp: None, .. }
        ))
        .is_some());
    follower.forget();

    follower.time_advance_request(5.0).unwrap();
    regulator.time_advance_request(10.0).unwrap();
    assert_eq!(follower.wait_for_grant(), Some(5.0));

    let delivered: Vec<String> = follower
        .seen()
        .iter()
        .filter_map(|callback| match callback {
            Callback::ReceiveInteraction {
                parameters,
                timestamp: Some(time),
                ..
            } => Some(format!(
                "{}@{time}",
                String::from_utf8_lossy(&parameters[&battle.target])
            )),
            Callback::TimeAdvanceGrant { time } => Some(format!("grant@{time}")),
            _ => None,
        })
        .collect();
    assert_eq!(delivered, vec!["early@2", "late@3", "grant@5"]);
}

#[test]
fn next_event_request_stops_at_the_first_queued_message() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut regulator = rti.join("regulator");
    let mut follower = rti.join("follower");
    let fire = regulator.battle.fire;
    regulator.publish_interaction_class(fire).unwrap();
    follower.subscribe_interaction_class(fire).unwrap();
    regulator.enable_time_regulation(0.0, 1.0).unwrap();
    follower.enable_time_constrained().unwrap();

    let target = regulator.battle.fire_at("ridge");
    regulator
        .send_interaction(fire, target, Vec::new(), Some(4.0))
        .unwrap();
    regulator.time_advance_request(20.0).unwrap();
    assert_eq!(regulator.wait_for_grant(), Some(20.0));

    // let the stamped message reach the follower's queue
    follower.idle(Duration::from_millis(50));
    follower.next_event_request(10.0).unwrap();
    assert_eq!(follower.wait_for_grant(), Some(4.0));
    assert!(follower.seen().iter().any(|callback| matches!(
        callback,
        Callback::ReceiveInteraction {
            timestamp: Some(time),
            ..
        } if *time == 4.0
    )));
}
