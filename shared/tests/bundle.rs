#[cfg(test)]
mod bundle_tests {
    use proptest::prelude::*;

    use rti_shared::transport::{pack_bundle, unpack_bundle, Frame, FrameKind, FRAME_HEADER_LENGTH};

    fn frame_kind() -> impl Strategy<Value = FrameKind> {
        prop_oneof![
            Just(FrameKind::Welcome),
            Just(FrameKind::Ready),
            Just(FrameKind::DataMessage),
            Just(FrameKind::ControlSync),
            Just(FrameKind::ControlAsync),
            Just(FrameKind::ControlResponse),
        ]
    }

    fn frame() -> impl Strategy<Value = Frame> {
        (frame_kind(), prop::collection::vec(any::<u8>(), 0..300))
            .prop_map(|(kind, payload)| Frame::new(kind, payload))
    }

    #[test]
    fn test_empty_bundle_unpacks_to_nothing() {
        let bundle = pack_bundle(&[]);
        assert_eq!(bundle.kind, FrameKind::Bundle);
        assert!(bundle.payload.is_empty());
        assert_eq!(unpack_bundle(&bundle.payload).unwrap(), Vec::new());
    }

    proptest! {
        #[test]
        fn test_bundle_preserves_frames_in_order(
            frames in prop::collection::vec(frame(), 0..40),
        ) {
            let bundle = pack_bundle(&frames);
            let expected: usize = frames
                .iter()
                .map(|frame| FRAME_HEADER_LENGTH + frame.payload.len())
                .sum();
            prop_assert_eq!(bundle.payload.len(), expected);
            prop_assert_eq!(unpack_bundle(&bundle.payload).unwrap(), frames);
        }

        // Cutting a bundle anywhere inside a sub-frame must fail, never
        // yield a short payload
        #[test]
        fn test_truncated_bundle_is_rejected(
            frames in prop::collection::vec(frame(), 1..10),
            cut in any::<prop::sample::Index>(),
        ) {
            let payload = pack_bundle(&frames).payload;
            let boundaries: Vec<usize> = frames
                .iter()
                .scan(0, |offset, frame| {
                    *offset += FRAME_HEADER_LENGTH + frame.payload.len();
                    Some(*offset)
                })
                .collect();
            let cut = cut.index(payload.len());
            prop_assume!(!boundaries.contains(&cut) && cut != 0);
            prop_assert!(unpack_bundle(&payload[..cut]).is_err());
        }
    }
}
