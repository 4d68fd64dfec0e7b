/// Assert that a federate sees `attribute` of `object` owned by `owner`,
/// ticking until it does or the wait runs out
#[macro_export]
macro_rules! assert_owner {
    ($federate:expr, $object:expr, $attribute:expr, $owner:expr) => {
        let owner: Option<rti_shared::FederateHandle> = $owner;
        assert!(
            $federate.wait_until(|ambassador| {
                ambassador.attribute_owner($object, $attribute).ok() == Some(owner)
            }),
            "{:?} of {:?} never became owned by {:?}",
            $attribute,
            $object,
            owner
        );
    };
}

/// Assert that a federate receives a callback matching the pattern and
/// optional guard
#[macro_export]
macro_rules! assert_callback {
    ($federate:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $federate
                .wait_for(|callback| matches!(callback, $pattern $(if $guard)?))
                .is_some(),
            "callback {} never arrived, saw {:?}",
            stringify!($pattern),
            $federate.seen()
        );
    };
}
