#[cfg(test)]
mod federation_tests {
    use std::{
        collections::BTreeSet,
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };

    use parking_lot::Mutex;

    use rti_server::{build_federation_sink, FederateConnection, Federation};
    use rti_shared::{
        transport::TransportError, AdvanceKind, AttributeHandle, ConnectionId, FederateHandle,
        FederationHandle, MessageBody, ObjectClassHandle, ObjectHandle, ObjectModel, ResignAction,
        Response, ResponseBody, RtiError, RtiMessage, TimeConfig,
    };

    /// Keeps every message pushed to it
    struct Recorder {
        id: ConnectionId,
        received: Mutex<Vec<RtiMessage>>,
    }

    impl Recorder {
        fn new(id: u32) -> Arc<Self> {
            Arc::new(Self {
                id: ConnectionId::new(id),
                received: Mutex::new(Vec::new()),
            })
        }

        fn record(&self, payload: &[u8]) {
            if let Ok(message) = RtiMessage::from_bytes(payload) {
                self.received.lock().push(message);
            }
        }

        fn has(&self, matches: impl Fn(&RtiMessage) -> bool) -> bool {
            self.received.lock().iter().any(matches)
        }

        /// Waits for a message the drain thread has not delivered yet
        fn wait_for(&self, matches: impl Fn(&RtiMessage) -> bool) -> bool {
            let deadline = Instant::now() + Duration::from_secs(2);
            while Instant::now() < deadline {
                if self.has(&matches) {
                    return true;
                }
                thread::sleep(Duration::from_millis(5));
            }
            false
        }
    }

    impl FederateConnection for Recorder {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn send_control(&self, payload: &[u8]) -> Result<(), TransportError> {
            self.record(payload);
            Ok(())
        }

        fn send_data(&self, payload: &[u8]) -> Result<(), TransportError> {
            self.record(payload);
            Ok(())
        }
    }

    fn model() -> ObjectModel {
        ObjectModel::builder()
            .object_class("Tank", &["position", "fuel"])
            .interaction_class("Fire", &["target"])
            .build()
    }

    fn federation() -> Federation {
        Federation::new(
            FederationHandle::new(1),
            "battle",
            "1.0",
            model(),
            Arc::new(build_federation_sink()),
            TimeConfig::default(),
            64,
        )
        .unwrap()
    }

    fn request(federation: &mut Federation, source: FederateHandle, body: MessageBody) -> Response {
        let handle = federation.handle();
        federation.process_request(RtiMessage::new(source, handle, body))
    }

    fn tank(federation: &Federation) -> (ObjectClassHandle, AttributeHandle, AttributeHandle) {
        let model = federation.model();
        let class = model.object_class_handle("Tank").unwrap();
        let position = model.attribute_handle(&class, "position").unwrap();
        let fuel = model.attribute_handle(&class, "fuel").unwrap();
        (class, position, fuel)
    }

    fn register_tank(
        federation: &mut Federation,
        owner: FederateHandle,
        publish: BTreeSet<AttributeHandle>,
    ) -> ObjectHandle {
        let (class, _, _) = tank(federation);
        let published = request(
            federation,
            owner,
            MessageBody::PublishObjectClass {
                class,
                attributes: publish,
            },
        );
        assert!(published.is_success());
        let registered = request(
            federation,
            owner,
            MessageBody::RegisterObject {
                class,
                object: ObjectHandle::new(0),
                name: String::new(),
                attributes: BTreeSet::new(),
            },
        );
        match registered {
            Response::Success(ResponseBody::Object(object)) => object,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_federate_name_is_rejected() {
        let mut federation = federation();
        let first = Recorder::new(1);
        let second = Recorder::new(2);

        federation.join_federate("Alpha", "tank", first).unwrap();
        let result = federation.join_federate("alpha", "tank", second);

        assert_eq!(
            result,
            Err(RtiError::FederateNameAlreadyInUse {
                name: "alpha".to_string()
            })
        );
        assert_eq!(federation.federate_count(), 1);
    }

    #[test]
    fn test_data_skips_the_connection_it_came_from() {
        let mut federation = federation();
        let one = Recorder::new(1);
        let two = Recorder::new(2);
        let alpha = federation.join_federate("alpha", "tank", one.clone()).unwrap();
        federation.join_federate("bravo", "tank", two.clone()).unwrap();

        let (_, position, fuel) = tank(&federation);
        let object = register_tank(&mut federation, alpha, [position, fuel].into());
        assert!(two.wait_for(|message| matches!(
            message.body,
            MessageBody::RegisterObject { object: announced, .. } if announced == object
        )));

        let update = RtiMessage::new(
            alpha,
            federation.handle(),
            MessageBody::UpdateAttributes {
                object,
                values: [(position, vec![1, 2, 3])].into(),
                tag: Vec::new(),
            },
        );
        federation.queue_data_message(update, Some(one.id()));

        assert!(two.wait_for(|message| matches!(message.body, MessageBody::UpdateAttributes { .. })));
        assert!(!one.has(|message| matches!(message.body, MessageBody::UpdateAttributes { .. })));
        assert_eq!(federation.federate(alpha).unwrap().metrics.updates_sent, 1);
    }

    #[test]
    fn test_update_for_unknown_object_is_dropped() {
        let mut federation = federation();
        let one = Recorder::new(1);
        let two = Recorder::new(2);
        let alpha = federation.join_federate("alpha", "tank", one.clone()).unwrap();
        federation.join_federate("bravo", "tank", two.clone()).unwrap();

        let update = RtiMessage::new(
            alpha,
            federation.handle(),
            MessageBody::UpdateAttributes {
                object: ObjectHandle::new(99),
                values: Default::default(),
                tag: Vec::new(),
            },
        );
        federation.queue_data_message(update, Some(one.id()));

        thread::sleep(Duration::from_millis(50));
        assert!(!two.has(|message| matches!(message.body, MessageBody::UpdateAttributes { .. })));
    }

    #[test]
    fn test_resign_drops_an_unused_connection() {
        let mut federation = federation();
        let connection = Recorder::new(1);
        let alpha = federation.join_federate("alpha", "tank", connection).unwrap();
        assert_eq!(federation.connection_count(), 1);

        let response = request(
            &mut federation,
            alpha,
            MessageBody::ResignFederation {
                action: ResignAction::NoAction,
            },
        );

        assert!(response.is_success());
        assert_eq!(federation.federate_count(), 0);
        assert_eq!(federation.connection_count(), 0);
    }

    #[test]
    fn test_resign_without_action_fails_while_owning() {
        let mut federation = federation();
        let alpha = federation.join_federate("alpha", "tank", Recorder::new(1)).unwrap();
        let (_, position, _) = tank(&federation);
        register_tank(&mut federation, alpha, [position].into());

        let response = request(
            &mut federation,
            alpha,
            MessageBody::ResignFederation {
                action: ResignAction::NoAction,
            },
        );

        assert!(matches!(
            response,
            Response::Failure(RtiError::FederateOwnsAttributes { .. })
        ));
        assert_eq!(federation.federate_count(), 1);
    }

    #[test]
    fn test_if_available_takes_only_unowned_attributes() {
        let mut federation = federation();
        let alpha = federation.join_federate("alpha", "tank", Recorder::new(1)).unwrap();
        let bravo_connection = Recorder::new(2);
        let bravo = federation
            .join_federate("bravo", "tank", bravo_connection)
            .unwrap();
        let (class, position, fuel) = tank(&federation);
        let object = register_tank(&mut federation, alpha, [position].into());
        request(
            &mut federation,
            bravo,
            MessageBody::PublishObjectClass {
                class,
                attributes: [position, fuel].into(),
            },
        );

        let response = request(
            &mut federation,
            bravo,
            MessageBody::AttributeAcquire {
                object,
                attributes: [position, fuel].into(),
                if_available: true,
                tag: Vec::new(),
            },
        );

        assert_eq!(response, Response::Success(ResponseBody::Attributes([fuel].into())));
        let instance = federation.repository.get(&object).unwrap();
        assert_eq!(instance.owner(&fuel), Some(bravo));
        assert_eq!(instance.owner(&position), Some(alpha));
    }

    #[test]
    fn test_release_hands_attributes_to_the_requester() {
        let mut federation = federation();
        let alpha = federation.join_federate("alpha", "tank", Recorder::new(1)).unwrap();
        let bravo = federation.join_federate("bravo", "tank", Recorder::new(2)).unwrap();
        let (_, position, _) = tank(&federation);
        let object = register_tank(&mut federation, alpha, [position].into());
        let handle = federation.handle();

        let acquire = RtiMessage::new(
            bravo,
            handle,
            MessageBody::AttributeAcquire {
                object,
                attributes: [position].into(),
                if_available: false,
                tag: Vec::new(),
            },
        );
        federation.queue_data_message(acquire, None);
        let release = RtiMessage::new(
            alpha,
            handle,
            MessageBody::AttributeRelease {
                object,
                attributes: [position].into(),
            },
        );
        federation.queue_data_message(release, None);

        let instance = federation.repository.get(&object).unwrap();
        assert_eq!(instance.owner(&position), Some(bravo));
    }

    #[test]
    fn test_constrained_federate_is_granted_once_regulator_moves() {
        let mut federation = federation();
        let alpha = federation.join_federate("alpha", "sim", Recorder::new(1)).unwrap();
        let bravo_connection = Recorder::new(2);
        let bravo = federation
            .join_federate("bravo", "sim", bravo_connection.clone())
            .unwrap();

        let enabled = request(
            &mut federation,
            alpha,
            MessageBody::EnableTimeRegulation {
                time: 0.0,
                lookahead: 1.0,
            },
        );
        assert_eq!(
            enabled,
            Response::Success(ResponseBody::Time {
                time: 0.0,
                lookahead: 1.0
            })
        );
        assert!(request(&mut federation, bravo, MessageBody::EnableTimeConstrained).is_success());

        let advance = |time| MessageBody::TimeAdvanceRequest {
            time,
            kind: AdvanceKind::TimeAdvance,
        };
        assert!(request(&mut federation, bravo, advance(5.0)).is_success());
        thread::sleep(Duration::from_millis(50));
        assert!(!bravo_connection.has(|message| matches!(message.body, MessageBody::TimeAdvanceGrant { .. })));

        assert!(request(&mut federation, alpha, advance(10.0)).is_success());
        assert!(bravo_connection.wait_for(|message| {
            message.target == Some(bravo)
                && matches!(message.body, MessageBody::TimeAdvanceGrant { time } if time == 5.0)
        }));
    }

    #[test]
    fn test_advance_to_the_current_time_is_rejected() {
        let mut federation = federation();
        let alpha = federation.join_federate("alpha", "sim", Recorder::new(1)).unwrap();

        let response = request(
            &mut federation,
            alpha,
            MessageBody::TimeAdvanceRequest {
                time: 0.0,
                kind: AdvanceKind::TimeAdvance,
            },
        );

        assert!(matches!(
            response,
            Response::Failure(RtiError::FederationTimeAlreadyPassed { .. })
        ));
    }

    #[test]
    fn test_sync_point_completes_when_everyone_achieves() {
        let mut federation = federation();
        let one = Recorder::new(1);
        let two = Recorder::new(2);
        let alpha = federation.join_federate("alpha", "sim", one.clone()).unwrap();
        let bravo = federation.join_federate("bravo", "sim", two.clone()).unwrap();

        let registered = request(
            &mut federation,
            alpha,
            MessageBody::RegisterSyncPoint {
                label: "ready".to_string(),
                tag: Vec::new(),
                federates: BTreeSet::new(),
            },
        );
        assert!(registered.is_success());
        assert!(two.wait_for(|message| matches!(message.body, MessageBody::AnnounceSyncPoint { .. })));

        let achieve = || MessageBody::SyncPointAchieved {
            label: "ready".to_string(),
        };
        assert!(request(&mut federation, alpha, achieve()).is_success());
        assert!(request(&mut federation, bravo, achieve()).is_success());

        for connection in [&one, &two] {
            assert!(connection.wait_for(|message| matches!(
                &message.body,
                MessageBody::FederationSynchronized { label } if label == "ready"
            )));
        }
        assert!(federation.sync_points.get("ready").is_none());
    }

    #[test]
    fn test_duplicate_sync_label_is_rejected() {
        let mut federation = federation();
        let alpha = federation.join_federate("alpha", "sim", Recorder::new(1)).unwrap();
        let register = || MessageBody::RegisterSyncPoint {
            label: "ready".to_string(),
            tag: Vec::new(),
            federates: BTreeSet::new(),
        };

        assert!(request(&mut federation, alpha, register()).is_success());
        assert!(matches!(
            request(&mut federation, alpha, register()),
            Response::Failure(RtiError::SyncPointLabelNotUnique { .. })
        ));
    }

    #[test]
    fn test_save_finishes_after_every_report() {
        let mut federation = federation();
        let one = Recorder::new(1);
        let alpha = federation.join_federate("alpha", "sim", one.clone()).unwrap();
        let bravo = federation.join_federate("bravo", "sim", Recorder::new(2)).unwrap();

        let requested = request(
            &mut federation,
            alpha,
            MessageBody::RequestSave {
                label: "checkpoint".to_string(),
            },
        );
        assert!(requested.is_success());
        assert!(one.wait_for(|message| matches!(message.body, MessageBody::InitiateSave { .. })));

        let joined = federation.join_federate("charlie", "sim", Recorder::new(3));
        assert_eq!(joined, Err(RtiError::SaveInProgress));

        request(&mut federation, alpha, MessageBody::SaveComplete { success: true });
        assert!(federation.save_restore.is_save_in_progress());
        request(&mut federation, bravo, MessageBody::SaveComplete { success: true });

        assert!(!federation.save_restore.is_save_in_progress());
        assert!(one.wait_for(|message| matches!(
            message.body,
            MessageBody::FederationSaved { success: true, .. }
        )));
    }

    #[test]
    fn test_restore_of_unknown_label_fails() {
        let mut federation = federation();
        let alpha = federation.join_federate("alpha", "sim", Recorder::new(1)).unwrap();

        let response = request(
            &mut federation,
            alpha,
            MessageBody::RequestRestore {
                label: "never".to_string(),
            },
        );

        assert!(matches!(
            response,
            Response::Failure(RtiError::SaveLabelNotFound { .. })
        ));
    }
}
