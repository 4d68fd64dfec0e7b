#[cfg(test)]
mod ownership_manager_tests {
    use std::collections::{BTreeMap, BTreeSet};

    use proptest::prelude::*;

    use rti_shared::{
        AcquireStatus, AttributeHandle, ByteReader, ByteWriter, FederateHandle, ObjectHandle,
        OwnershipManager, SaveRestoreTarget,
    };

    const OBJECT: ObjectHandle = ObjectHandle::new(7);

    fn attrs(values: &[u32]) -> BTreeSet<AttributeHandle> {
        values.iter().map(|value| AttributeHandle::new(*value)).collect()
    }

    fn fed(value: u32) -> FederateHandle {
        FederateHandle::new(value)
    }

    #[test]
    fn test_firm_requests_keep_lowest_handle() {
        let mut manager = OwnershipManager::new();
        manager.request_acquisition(OBJECT, &attrs(&[1]), fed(3));
        manager.request_acquisition(OBJECT, &attrs(&[1]), fed(2));
        manager.request_acquisition(OBJECT, &attrs(&[1]), fed(4));

        assert_eq!(
            manager.request_for(OBJECT, &AttributeHandle::new(1)),
            Some((fed(2), AcquireStatus::Request))
        );
    }

    #[test]
    fn test_firm_request_overrides_if_available() {
        let mut manager = OwnershipManager::new();
        manager.request_acquisition_if_available(OBJECT, &attrs(&[1]), fed(1));
        manager.request_acquisition(OBJECT, &attrs(&[1]), fed(5));
        assert_eq!(
            manager.request_for(OBJECT, &AttributeHandle::new(1)),
            Some((fed(5), AcquireStatus::Request))
        );

        // and a later best-effort bid cannot take it back
        manager.request_acquisition_if_available(OBJECT, &attrs(&[1]), fed(1));
        assert_eq!(
            manager.request_for(OBJECT, &AttributeHandle::new(1)),
            Some((fed(5), AcquireStatus::Request))
        );
    }

    #[test]
    fn test_release_then_complete_hands_over_only_released() {
        let mut manager = OwnershipManager::new();
        manager.request_divestiture(OBJECT, &attrs(&[1, 2]), fed(1));
        manager.request_acquisition(OBJECT, &attrs(&[1, 2]), fed(2));

        let released = manager.release_attributes(OBJECT, &attrs(&[1]));
        assert_eq!(released.get(&AttributeHandle::new(1)), Some(&fed(2)));
        assert_eq!(manager.attributes_released_to_federate(OBJECT, fed(2)), attrs(&[1]));

        assert_eq!(manager.complete_acquisition(OBJECT, fed(2)), attrs(&[1]));
        assert_eq!(manager.complete_divest(OBJECT, &attrs(&[1])), attrs(&[1]));

        // attribute 2 is still being negotiated on both sides
        assert!(manager.is_attribute_under_acquisition_request(OBJECT, &AttributeHandle::new(2)));
        assert!(manager.is_attribute_under_divest_request(OBJECT, &AttributeHandle::new(2)));
        assert!(!manager.is_attribute_under_acquisition_request(OBJECT, &AttributeHandle::new(1)));
    }

    #[test]
    fn test_released_attribute_ignores_best_effort_bids() {
        let mut manager = OwnershipManager::new();
        manager.request_acquisition(OBJECT, &attrs(&[1]), fed(4));
        manager.release_attributes(OBJECT, &attrs(&[1]));
        manager.request_acquisition_if_available(OBJECT, &attrs(&[1]), fed(1));

        assert_eq!(
            manager.request_for(OBJECT, &AttributeHandle::new(1)),
            Some((fed(4), AcquireStatus::Released))
        );
    }

    #[test]
    fn test_firm_request_recovers_a_released_attribute() {
        let mut manager = OwnershipManager::new();
        manager.request_acquisition(OBJECT, &attrs(&[1]), fed(4));
        manager.release_attributes(OBJECT, &attrs(&[1]));
        manager.request_acquisition(OBJECT, &attrs(&[1]), fed(6));

        // a firm request replaces the release whatever its handle
        assert_eq!(
            manager.request_for(OBJECT, &AttributeHandle::new(1)),
            Some((fed(6), AcquireStatus::Request))
        );
        assert!(manager.attributes_released_to_federate(OBJECT, fed(4)).is_empty());
        assert!(manager.complete_acquisition(OBJECT, fed(4)).is_empty());
    }

    #[test]
    fn test_same_federate_can_request_a_released_attribute_again() {
        let mut manager = OwnershipManager::new();
        manager.request_acquisition(OBJECT, &attrs(&[1, 2]), fed(4));
        manager.release_attributes(OBJECT, &attrs(&[1]));
        manager.request_acquisition(OBJECT, &attrs(&[1]), fed(4));

        assert_eq!(
            manager.request_for(OBJECT, &AttributeHandle::new(1)),
            Some((fed(4), AcquireStatus::Request))
        );
        assert_eq!(
            manager.attributes_under_acquisition_request(OBJECT, &attrs(&[1, 2])),
            BTreeMap::from([(AttributeHandle::new(1), fed(4)), (AttributeHandle::new(2), fed(4))])
        );
    }

    #[test]
    fn test_if_available_completion_only_takes_own_best_effort_requests() {
        let mut manager = OwnershipManager::new();
        manager.request_acquisition_if_available(OBJECT, &attrs(&[1, 2]), fed(2));
        manager.request_acquisition(OBJECT, &attrs(&[2]), fed(3));

        assert_eq!(manager.complete_acquisition_if_available(OBJECT, fed(2)), attrs(&[1]));
        assert_eq!(manager.complete_acquisition_if_available(OBJECT, fed(3)), attrs(&[]));
        assert_eq!(
            manager.attributes_under_acquisition_request_by(OBJECT, &attrs(&[1, 2]), fed(3)),
            attrs(&[2])
        );
    }

    #[test]
    fn test_cancel_drops_empty_requests() {
        let mut manager = OwnershipManager::new();
        manager.request_acquisition(OBJECT, &attrs(&[1, 2]), fed(2));
        manager.cancel_acquisition(OBJECT, &attrs(&[1, 2]));
        manager.request_divestiture(OBJECT, &attrs(&[3]), fed(1));
        manager.cancel_divest(OBJECT, &attrs(&[3]));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_remove_federate_clears_its_bids_and_offers() {
        let mut manager = OwnershipManager::new();
        manager.request_acquisition(OBJECT, &attrs(&[1]), fed(2));
        manager.request_acquisition(OBJECT, &attrs(&[2]), fed(3));
        manager.request_divestiture(OBJECT, &attrs(&[1]), fed(2));

        manager.remove_federate(fed(2));
        assert!(manager.objects_with_requests_by(fed(2)).is_empty());
        assert_eq!(manager.objects_with_requests_by(fed(3)).len(), 1);
        assert!(!manager.is_attribute_under_divest_request(OBJECT, &AttributeHandle::new(1)));
    }

    #[test]
    fn test_snapshot_restores_identical_state() {
        let mut manager = OwnershipManager::new();
        manager.request_acquisition(OBJECT, &attrs(&[1, 2]), fed(2));
        manager.request_divestiture(ObjectHandle::new(9), &attrs(&[4]), fed(1));

        let bytes = manager.snapshot();
        let mut restored = OwnershipManager::new();
        restored.request_acquisition(ObjectHandle::new(1), &attrs(&[1]), fed(6));
        restored
            .restore_from(&mut ByteReader::new(&bytes))
            .expect("snapshot should decode");
        assert_eq!(restored, manager);
    }

    #[test]
    fn test_corrupt_snapshot_leaves_state_alone() {
        let mut manager = OwnershipManager::new();
        manager.request_acquisition(OBJECT, &attrs(&[1]), fed(2));
        let before = manager.clone();

        let mut writer = ByteWriter::new();
        writer.write_u32(3);
        let bytes = writer.to_bytes();
        assert!(manager.restore_from(&mut ByteReader::new(&bytes)).is_err());
        assert_eq!(manager, before);
    }

    proptest! {
        // Every replica sees the same bids in some order; they must agree
        #[test]
        fn test_winner_is_independent_of_arrival_order(
            bids in prop::collection::vec((1u32..6, any::<bool>()), 1..8).prop_shuffle(),
        ) {
            let mut forward = OwnershipManager::new();
            let mut backward = OwnershipManager::new();
            let apply = |manager: &mut OwnershipManager, (federate, firm): (u32, bool)| {
                if firm {
                    manager.request_acquisition(OBJECT, &attrs(&[1]), fed(federate));
                } else {
                    manager.request_acquisition_if_available(OBJECT, &attrs(&[1]), fed(federate));
                }
            };
            for bid in bids.iter() {
                apply(&mut forward, *bid);
            }
            for bid in bids.iter().rev() {
                apply(&mut backward, *bid);
            }

            let expected_firm = bids.iter().filter(|(_, firm)| *firm).map(|(federate, _)| *federate).min();
            let expected = match expected_firm {
                Some(federate) => (fed(federate), AcquireStatus::Request),
                None => {
                    let lowest = bids.iter().map(|(federate, _)| *federate).min().unwrap();
                    (fed(lowest), AcquireStatus::RequestAvailable)
                }
            };
            prop_assert_eq!(forward.request_for(OBJECT, &AttributeHandle::new(1)), Some(expected));
            prop_assert_eq!(backward.request_for(OBJECT, &AttributeHandle::new(1)), Some(expected));
        }
    }
}
