use std::fmt;

use rti_serde::{ByteReader, ByteWriter, ConstByteLength, Serde, SerdeErr};

/// Simulated time. Federations use a floating point time line.
pub type LogicalTime = f64;

/// Which end of a channel this process is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostType {
    Rti,
    Lrc,
}

impl HostType {
    pub fn invert(self) -> Self {
        match self {
            HostType::Rti => HostType::Lrc,
            HostType::Lrc => HostType::Rti,
        }
    }
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $label:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $label, self.0)
            }
        }

        impl Serde for $name {
            fn ser(&self, writer: &mut ByteWriter) {
                writer.write_u32(self.0);
            }

            fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
                Ok(Self(reader.read_u32()?))
            }
        }

        impl ConstByteLength for $name {
            fn const_byte_length() -> usize {
                4
            }
        }
    };
}

define_handle!(
    /// Identifies one federate within its federation. Assigned on join,
    /// starting at 1.
    FederateHandle,
    "federate"
);
define_handle!(FederationHandle, "federation");
define_handle!(
    /// Identifies a registered object instance within a federation
    ObjectHandle,
    "object"
);
define_handle!(ObjectClassHandle, "object-class");
define_handle!(AttributeHandle, "attribute");
define_handle!(InteractionClassHandle, "interaction-class");
define_handle!(ParameterHandle, "parameter");
define_handle!(
    /// Identifies one accepted network connection on the RTI. Several
    /// federates may share a connection.
    ConnectionId,
    "connection"
);

impl FederateHandle {
    /// Source handle of messages generated by the RTI itself
    pub const RTI: FederateHandle = FederateHandle(0);

    pub fn is_rti(&self) -> bool {
        *self == Self::RTI
    }
}

impl FederationHandle {
    /// Placeholder used before a federate has joined anything
    pub const NONE: FederationHandle = FederationHandle(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_order_by_value() {
        let low = FederateHandle::new(2);
        let high = FederateHandle::new(3);
        assert!(low < high);
        assert_eq!(std::cmp::min(high, low), low);
    }

    #[test]
    fn display_names_the_kind() {
        assert_eq!(ObjectHandle::new(7).to_string(), "object(7)");
        assert_eq!(FederateHandle::RTI.to_string(), "federate(0)");
    }
}
