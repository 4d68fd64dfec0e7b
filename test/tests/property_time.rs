/// PROPERTY-BASED TESTS: time management invariants
///
/// 1. TSO messages leave the queue in timestamp order, ties in arrival order
/// 2. A grant never reaches the federation's lower bound
/// 3. Granted times only move forward
use std::collections::BTreeMap;

use proptest::prelude::*;
use rti_client::MessageQueue;
use rti_server::TimeManager;
use rti_shared::{
    AdvanceKind, FederateHandle, FederationHandle, InteractionClassHandle, MessageBody,
    RtiMessage, TimeConfig,
};

fn stamped(sequence: usize, timestamp: f64) -> RtiMessage {
    RtiMessage::new(
        FederateHandle::new(1),
        FederationHandle::new(1),
        MessageBody::SendInteraction {
            class: InteractionClassHandle::new(1),
            parameters: BTreeMap::new(),
            tag: sequence.to_be_bytes().to_vec(),
        },
    )
    .with_timestamp(Some(timestamp))
}

fn sequence_of(message: &RtiMessage) -> usize {
    let MessageBody::SendInteraction { tag, .. } = &message.body else {
        unreachable!("only interactions are queued");
    };
    let mut bytes = [0u8; std::mem::size_of::<usize>()];
    bytes.copy_from_slice(tag);
    usize::from_be_bytes(bytes)
}

// timestamps drawn from a small grid so that ties are common
fn timestamp_strategy() -> impl Strategy<Value = f64> {
    (0u32..20u32).prop_map(|step| f64::from(step) * 0.5)
}

proptest! {
    #[test]
    fn prop_tso_release_is_ordered_and_stable(
        timestamps in prop::collection::vec(timestamp_strategy(), 0..40),
        grant in timestamp_strategy(),
    ) {
        let mut queue = MessageQueue::new();
        for (sequence, timestamp) in timestamps.iter().enumerate() {
            queue.push_tso(stamped(sequence, *timestamp));
        }

        let released = queue.release_tso_up_to(grant);
        let keys: Vec<(f64, usize)> = released
            .iter()
            .map(|message| (message.timestamp.unwrap_or(f64::NAN), sequence_of(message)))
            .collect();
        prop_assert!(keys.iter().all(|(timestamp, _)| *timestamp <= grant));
        prop_assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));

        let expected = timestamps.iter().filter(|timestamp| **timestamp <= grant).count();
        prop_assert_eq!(released.len(), expected);
        prop_assert_eq!(queue.tso_len(), timestamps.len() - expected);
        if let Some(next) = queue.peek_tso() {
            prop_assert!(next > grant);
        }
    }

    #[test]
    fn prop_effective_lookahead_is_positive(lookahead in 0.0f64..100.0) {
        let effective = TimeConfig::default().effective_lookahead(lookahead);
        prop_assert!(effective > 0.0);
        if lookahead > 0.0 {
            prop_assert_eq!(effective, lookahead);
        }
    }

    #[test]
    fn prop_grants_stay_below_federation_lbts(
        lookaheads in prop::collection::vec(0.1f64..5.0, 2..5),
        requests in prop::collection::vec((0usize..5, 0.1f64..10.0), 1..30),
    ) {
        let mut manager = TimeManager::new(TimeConfig::default());
        let federates: Vec<FederateHandle> = (1..=lookaheads.len() as u32)
            .map(FederateHandle::new)
            .collect();
        for (federate, lookahead) in federates.iter().zip(&lookaheads) {
            manager.add_federate(*federate);
            manager.enable_regulation(*federate, 0.0, *lookahead).unwrap();
            manager.enable_constrained(*federate).unwrap();
        }

        let mut granted: BTreeMap<FederateHandle, f64> = BTreeMap::new();
        for (index, step) in requests {
            let federate = federates[index % federates.len()];
            let current = manager.status(federate).unwrap().current_time;
            let request = manager.time_advance_request(
                federate,
                current + step,
                AdvanceKind::TimeAdvance,
            );
            let Ok(grants) = request else {
                continue;
            };
            let lbts = manager.federation_lbts();
            for (federate, time) in grants {
                prop_assert!(time < lbts);
                let previous = granted.insert(federate, time).unwrap_or(0.0);
                prop_assert!(time > previous);
                prop_assert_eq!(manager.status(federate).unwrap().current_time, time);
            }
        }
    }
}
