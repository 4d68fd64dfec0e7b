/// Object and interaction traffic between live federates
use std::collections::BTreeMap;

use rti_client::{Callback, RtiError};
use rti_test::{assert_callback, attributes, TestRti};

#[test]
fn updates_reach_subscribers_filtered_to_their_interest() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");
    let (class, position, fuel) = (two.battle.tank, two.battle.position, two.battle.fuel);
    two.subscribe_object_class(class, &attributes(&[position]))
        .unwrap();
    let tank = one.register_tank("tiger");

    assert_callback!(two, Callback::DiscoverObject { name, .. } if name == "tiger");
    let values = BTreeMap::from([
        (position, b"12,40".to_vec()),
        (fuel, b"half".to_vec()),
    ]);
    one.update_attributes(tank, values, b"move".to_vec(), None)
        .unwrap();

    let reflected = two.wait_for(|callback| matches!(callback, Callback::ReflectAttributes { .. }));
    let Some(Callback::ReflectAttributes { object, values, tag, .. }) = reflected else {
        panic!("no reflection arrived, saw {:?}", two.seen());
    };
    assert_eq!(object, tank);
    assert_eq!(tag, b"move");
    assert_eq!(values, BTreeMap::from([(position, b"12,40".to_vec())]));
}

#[test]
fn only_owners_update_and_only_registrars_delete() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");
    two.join_tank_crew();
    let tank = one.register_tank("tiger");
    assert_eq!(two.wait_for_discovery(), Some(tank));

    let position = two.battle.position;
    assert!(matches!(
        two.update_attributes(
            tank,
            BTreeMap::from([(position, b"0,0".to_vec())]),
            Vec::new(),
            None
        ),
        Err(RtiError::AttributeNotOwned { .. })
    ));
    assert_eq!(
        two.delete_object(tank, Vec::new(), None),
        Err(RtiError::DeletePrivilegeNotHeld { object: tank })
    );

    one.delete_object(tank, b"scrapped".to_vec(), None).unwrap();
    assert_callback!(two, Callback::RemoveObject { tag, .. } if tag == b"scrapped");
    assert!(matches!(
        two.attribute_owner(tank, position),
        Err(RtiError::ObjectNotKnown { .. })
    ));
}

#[test]
fn interactions_reach_subscribers_only() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut gunner = rti.join("gunner");
    let mut spotter = rti.join("spotter");
    let mut bystander = rti.join("bystander");
    let fire = gunner.battle.fire;

    let target = gunner.battle.fire_at("hill");
    assert_eq!(
        gunner.send_interaction(fire, target.clone(), Vec::new(), None),
        Err(RtiError::InteractionClassNotPublished { class: fire })
    );
    gunner.publish_interaction_class(fire).unwrap();
    spotter.subscribe_interaction_class(fire).unwrap();
    gunner
        .send_interaction(fire, target.clone(), b"salvo".to_vec(), None)
        .unwrap();

    assert_callback!(
        spotter,
        Callback::ReceiveInteraction { class, tag, .. } if *class == fire && tag == b"salvo"
    );
    bystander.idle(std::time::Duration::from_millis(50));
    assert!(!bystander
        .seen()
        .iter()
        .any(|callback| matches!(callback, Callback::ReceiveInteraction { .. })));
}

#[test]
fn register_needs_a_published_class() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let class = one.battle.tank;
    assert_eq!(
        one.register_object(class, None),
        Err(RtiError::ObjectClassNotPublished { class })
    );
}
