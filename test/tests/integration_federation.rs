/// Federation lifecycle, synchronization points and save/restore against a
/// live RTI
use rti_client::{Callback, RtiError};
use rti_shared::ResignAction;
use rti_test::{assert_callback, battle, TestRti, BATTLE};

#[test]
fn federation_lifecycle() {
    let rti = TestRti::start();
    let mut ambassador = rti.connect();
    ambassador.create_federation(BATTLE, battle().model).unwrap();
    assert!(matches!(
        ambassador.create_federation(BATTLE, battle().model),
        Err(RtiError::FederationExecutionAlreadyExists { .. })
    ));

    let federate = ambassador.join_federation("one", "test", BATTLE).unwrap();
    assert_eq!(ambassador.federate_handle(), Some(federate));
    assert!(matches!(
        ambassador.join_federation("again", "test", BATTLE),
        Err(RtiError::FederateAlreadyExecutionMember { .. })
    ));

    let mut other = rti.connect();
    assert!(matches!(
        other.destroy_federation(BATTLE),
        Err(RtiError::FederatesCurrentlyJoined { count: 1, .. })
    ));

    ambassador.resign_federation(ResignAction::NoAction).unwrap();
    assert_eq!(ambassador.federate_handle(), None);
    other.destroy_federation(BATTLE).unwrap();
    assert!(matches!(
        other.join_federation("one", "test", BATTLE),
        Err(RtiError::FederationExecutionDoesNotExist { .. })
    ));
}

#[test]
fn duplicate_federate_name_is_rejected() {
    let rti = TestRti::start();
    rti.create_battle();
    let _one = rti.join("tank");

    let mut ambassador = rti.connect();
    assert!(matches!(
        ambassador.join_federation("TANK", "test", BATTLE),
        Err(RtiError::FederateNameAlreadyInUse { .. })
    ));
}

#[test]
fn joins_and_resignations_are_announced() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let two = rti.join("two");
    let handle = two.handle();

    assert_callback!(one, Callback::FederateJoined { name, .. } if name == "two");
    drop(two);
    assert!(one
        .wait_for(|callback| matches!(
            callback,
            Callback::FederateResigned { federate, .. } if *federate == handle
        ))
        .is_some());
}

#[test]
fn sync_point_synchronizes_everyone() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");

    one.register_sync_point("ready", b"go".to_vec(), &Default::default())
        .unwrap();
    assert_callback!(one, Callback::SyncPointRegistered { .. });
    assert_callback!(one, Callback::AnnounceSyncPoint { .. });
    assert_callback!(two, Callback::AnnounceSyncPoint { tag, .. } if tag == b"go");

    one.sync_point_achieved("ready").unwrap();
    two.idle(std::time::Duration::from_millis(50));
    assert!(!two
        .seen()
        .iter()
        .any(|callback| matches!(callback, Callback::FederationSynchronized { .. })));

    two.sync_point_achieved("ready").unwrap();
    assert_callback!(one, Callback::FederationSynchronized { label } if label == "ready");
    assert_callback!(two, Callback::FederationSynchronized { label } if label == "ready");
}

#[test]
fn save_blocks_time_services_until_finished() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");
    let mut two = rti.join("two");

    one.request_federation_save("noon").unwrap();
    assert_callback!(one, Callback::InitiateSave { .. });
    assert_callback!(two, Callback::InitiateSave { .. });
    assert!(one.is_save_in_progress());
    assert_eq!(
        one.time_advance_request(1.0),
        Err(RtiError::SaveInProgress)
    );

    one.federate_save_complete(true).unwrap();
    two.federate_save_complete(true).unwrap();
    assert_callback!(one, Callback::FederationSaved { success: true, .. });
    assert_callback!(two, Callback::FederationSaved { success: true, .. });
    assert!(!one.is_save_in_progress());
    assert_eq!(
        one.federate_save_complete(true),
        Err(RtiError::SaveNotInitiated)
    );
}

#[test]
fn restore_rolls_time_back() {
    let rti = TestRti::start();
    rti.create_battle();
    let mut one = rti.join("one");

    one.time_advance_request(5.0).unwrap();
    assert_eq!(one.wait_for_grant(), Some(5.0));
    one.request_federation_save("five").unwrap();
    assert_callback!(one, Callback::InitiateSave { .. });
    one.federate_save_complete(true).unwrap();
    assert_callback!(one, Callback::FederationSaved { .. });

    one.forget();
    one.time_advance_request(8.0).unwrap();
    assert_eq!(one.wait_for_grant(), Some(8.0));

    assert!(matches!(
        one.request_federation_restore("noon"),
        Err(RtiError::SaveLabelNotFound { .. })
    ));
    one.request_federation_restore("five").unwrap();
    assert_callback!(one, Callback::InitiateRestore { .. });
    assert_eq!(one.query_logical_time(), 5.0);
    one.federate_restore_complete(true).unwrap();
    assert_callback!(one, Callback::FederationRestored { success: true, .. });

    one.forget();
    one.time_advance_request(6.0).unwrap();
    assert_eq!(one.wait_for_grant(), Some(6.0));
}
