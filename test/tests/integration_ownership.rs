/// Ownership handshakes between live LRCs, negotiated entirely over the
/// network through a running RTI
use std::time::Duration;

use rti_client::Callback;
use rti_shared::ResignAction;
use rti_test::{assert_callback, assert_owner, attributes, TestRti};

#[test]
fn negotiated_divest_hands_attribute_to_acquirer() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");
    two.join_tank_crew();
    let tank = one.register_tank("tiger");
    let position = one.battle.position;

    assert_eq!(two.wait_for_discovery(), Some(tank));
    one.negotiated_divest(tank, &attributes(&[position]), b"yours".to_vec())
        .unwrap();
    assert_callback!(two, Callback::OwnershipOffered { .. });

    two.acquire(tank, &attributes(&[position]), Vec::new()).unwrap();
    assert_callback!(one, Callback::DivestitureConfirmed { .. });
    assert_callback!(two, Callback::OwnershipAcquired { .. });

    let owner = Some(two.handle());
    assert_owner!(one, tank, position, owner);
    assert!(two.is_attribute_owned_by_federate(tank, position).unwrap());
    assert!(!one.is_attribute_owned_by_federate(tank, position).unwrap());
}

#[test]
fn competing_acquirers_resolve_to_lower_handle() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");
    let mut three = rti.join("three");
    two.join_tank_crew();
    three.join_tank_crew();
    let tank = one.register_tank("tiger");
    let fuel = one.battle.fuel;
    assert!(two.wait_for_discovery().is_some());
    assert!(three.wait_for_discovery().is_some());

    three.acquire(tank, &attributes(&[fuel]), Vec::new()).unwrap();
    two.acquire(tank, &attributes(&[fuel]), Vec::new()).unwrap();
    assert!(one.wait_for_count(2, |callback| matches!(
        callback,
        Callback::ReleaseRequested { .. }
    )));

    let released = one.release_response(tank, &attributes(&[fuel])).unwrap();
    assert_eq!(released, attributes(&[fuel]));

    let winner = Some(two.handle());
    assert_owner!(one, tank, fuel, winner);
    assert_owner!(two, tank, fuel, winner);
    assert_owner!(three, tank, fuel, winner);
    assert!(!three
        .seen()
        .iter()
        .any(|callback| matches!(callback, Callback::OwnershipAcquired { .. })));
}

#[test]
fn unconditional_divest_goes_to_the_waiting_bidder() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");
    let mut three = rti.join("three");
    two.join_tank_crew();
    three.join_tank_crew();
    let tank = one.register_tank("tiger");
    let position = one.battle.position;
    assert!(two.wait_for_discovery().is_some());
    assert!(three.wait_for_discovery().is_some());

    two.acquire(tank, &attributes(&[position]), Vec::new()).unwrap();
    assert_callback!(one, Callback::ReleaseRequested { .. });

    one.unconditional_divest(tank, &attributes(&[position])).unwrap();
    assert_callback!(one, Callback::DivestitureConfirmed { .. });
    assert_callback!(two, Callback::OwnershipAcquired { .. });

    let bidder = Some(two.handle());
    assert_owner!(one, tank, position, bidder);
    assert_owner!(two, tank, position, bidder);
    assert_owner!(three, tank, position, bidder);
}

#[test]
fn acquire_if_available_takes_only_unowned_attributes() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");
    two.join_tank_crew();

    let (tank_class, position, fuel) = (one.battle.tank, one.battle.position, one.battle.fuel);
    one.publish_object_class(tank_class, &attributes(&[position]))
        .unwrap();
    let tank = one.register_object(tank_class, None).unwrap();
    assert_eq!(one.object_name(tank).unwrap(), format!("HLAobject{}", tank.value()));
    assert!(two.wait_for_discovery().is_some());

    let obtained = two
        .acquire_if_available(tank, &attributes(&[position, fuel]))
        .unwrap();
    assert_eq!(obtained, attributes(&[fuel]));
    two.tick();
    assert!(two.seen().contains(&Callback::OwnershipUnavailable {
        object: tank,
        attributes: attributes(&[position]),
    }));

    let owner = Some(two.handle());
    assert_owner!(one, tank, fuel, owner);
    assert_eq!(one.attribute_owner(tank, position).unwrap(), Some(one.handle()));
}

#[test]
fn resign_with_divest_leaves_attributes_unowned() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");
    two.join_tank_crew();
    let tank = one.register_tank("tiger");
    let all = one.battle.tank_attributes();
    let position = one.battle.position;
    assert!(two.wait_for_discovery().is_some());

    one.resign_federation(ResignAction::UnconditionallyDivestAttributes)
        .unwrap();
    assert_owner!(two, tank, position, None);
    assert_callback!(two, Callback::FederateResigned { .. });

    let obtained = two.acquire_if_available(tank, &all).unwrap();
    assert_eq!(obtained, all);
}

#[test]
fn cancelled_acquisition_is_confirmed() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");
    two.join_tank_crew();
    let tank = one.register_tank("tiger");
    let fuel = one.battle.fuel;
    assert!(two.wait_for_discovery().is_some());

    two.acquire(tank, &attributes(&[fuel]), Vec::new()).unwrap();
    assert_callback!(one, Callback::ReleaseRequested { .. });
    two.cancel_acquisition(tank, &attributes(&[fuel])).unwrap();
    // the owner answers the cancellation while ticking
    one.idle(Duration::from_millis(100));

    assert_callback!(two, Callback::AcquisitionCancellationConfirmed { .. });
    let released = one.release_response(tank, &attributes(&[fuel])).unwrap();
    assert!(released.is_empty());
    assert_eq!(one.attribute_owner(tank, fuel).unwrap(), Some(one.handle()));
}
