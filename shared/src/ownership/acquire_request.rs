use std::collections::{BTreeMap, BTreeSet};

use rti_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::types::{AttributeHandle, FederateHandle, ObjectHandle};

/// Where an outstanding transfer of one attribute stands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireStatus {
    /// Best effort: take the attribute only if nobody owns it
    RequestAvailable,
    /// Firm: the requester waits for the owner to release it
    Request,
    /// The owner has let go, the requester has not yet confirmed
    Released,
}

impl Serde for AcquireStatus {
    fn ser(&self, writer: &mut ByteWriter) {
        let tag: u8 = match self {
            AcquireStatus::RequestAvailable => 0,
            AcquireStatus::Request => 1,
            AcquireStatus::Released => 2,
        };
        writer.write_byte(tag);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(AcquireStatus::RequestAvailable),
            1 => Ok(AcquireStatus::Request),
            2 => Ok(AcquireStatus::Released),
            tag => Err(SerdeErr::UnknownTag {
                type_name: "AcquireStatus",
                tag: u32::from(tag),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct AttributeRequest {
    federate: FederateHandle,
    status: AcquireStatus,
}

/// All outstanding acquisition requests against the attributes of one
/// object instance.
///
/// Several federates may bid for the same attribute without any lock held
/// across the network, so every replica must settle on the same winner no
/// matter what order the bids arrive in:
///
/// * two bids of the same kind keep the lower federate handle
/// * a firm bid replaces a best-effort bid, never the reverse
/// * a released attribute stays released unless a firm bid arrives
#[derive(Clone, Debug, PartialEq)]
pub struct AcquireRequest {
    object: ObjectHandle,
    requests: BTreeMap<AttributeHandle, AttributeRequest>,
}

impl AcquireRequest {
    pub fn new(
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
        status: AcquireStatus,
    ) -> Self {
        let requests = attributes
            .iter()
            .map(|attribute| (*attribute, AttributeRequest { federate, status }))
            .collect();
        Self { object, requests }
    }

    pub fn object(&self) -> ObjectHandle {
        self.object
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Returns the requester and status recorded for `attribute`
    pub fn request_for(&self, attribute: &AttributeHandle) -> Option<(FederateHandle, AcquireStatus)> {
        self.requests
            .get(attribute)
            .map(|request| (request.federate, request.status))
    }

    pub fn update_request(
        &mut self,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
        incoming: AcquireStatus,
    ) {
        for attribute in attributes {
            let Some(existing) = self.requests.get_mut(attribute) else {
                self.requests.insert(
                    *attribute,
                    AttributeRequest {
                        federate,
                        status: incoming,
                    },
                );
                continue;
            };

            if existing.status == AcquireStatus::Released || incoming == AcquireStatus::Released {
                if incoming == AcquireStatus::Request {
                    existing.status = AcquireStatus::Request;
                    existing.federate = federate;
                }
                continue;
            }

            if existing.status == incoming {
                if federate < existing.federate {
                    existing.federate = federate;
                }
            } else if incoming == AcquireStatus::Request {
                existing.status = AcquireStatus::Request;
                existing.federate = federate;
            }
        }
    }

    pub fn cancel_transfer(&mut self, attributes: &BTreeSet<AttributeHandle>) {
        for attribute in attributes {
            self.requests.remove(attribute);
        }
    }

    /// Removes and returns every attribute `federate` may now take: those
    /// requested best-effort when `if_available`, otherwise those released
    /// to it
    pub fn complete_transfer(
        &mut self,
        federate: FederateHandle,
        if_available: bool,
    ) -> BTreeSet<AttributeHandle> {
        let wanted = if if_available {
            AcquireStatus::RequestAvailable
        } else {
            AcquireStatus::Released
        };
        let complete: BTreeSet<AttributeHandle> = self
            .requests
            .iter()
            .filter(|(_, request)| request.status == wanted && request.federate == federate)
            .map(|(attribute, _)| *attribute)
            .collect();
        for attribute in &complete {
            self.requests.remove(attribute);
        }
        complete
    }

    pub fn release_attributes(
        &mut self,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> BTreeMap<AttributeHandle, FederateHandle> {
        let mut released = BTreeMap::new();
        for attribute in attributes {
            if let Some(request) = self.requests.get_mut(attribute) {
                request.status = AcquireStatus::Released;
                released.insert(*attribute, request.federate);
            }
        }
        released
    }

    pub fn is_attribute_under_acquisition_request(&self, attribute: &AttributeHandle) -> bool {
        matches!(
            self.requests.get(attribute).map(|request| request.status),
            Some(AcquireStatus::Request) | Some(AcquireStatus::RequestAvailable)
        )
    }

    /// Attributes from `attributes` that `federate` holds a firm request on
    pub fn attributes_requested_by(
        &self,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
    ) -> BTreeSet<AttributeHandle> {
        attributes
            .iter()
            .filter(|attribute| {
                self.requests.get(attribute).is_some_and(|request| {
                    request.status == AcquireStatus::Request && request.federate == federate
                })
            })
            .copied()
            .collect()
    }

    /// Firm requests against `attributes`, with the federate that made each
    pub fn requesters_of(
        &self,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> BTreeMap<AttributeHandle, FederateHandle> {
        attributes
            .iter()
            .filter_map(|attribute| {
                self.requests
                    .get(attribute)
                    .filter(|request| request.status == AcquireStatus::Request)
                    .map(|request| (*attribute, request.federate))
            })
            .collect()
    }

    /// Every attribute with any kind of request from `federate`
    pub fn all_requested_by(&self, federate: FederateHandle) -> BTreeSet<AttributeHandle> {
        self.requests
            .iter()
            .filter(|(_, request)| request.federate == federate)
            .map(|(attribute, _)| *attribute)
            .collect()
    }

    pub fn released_to(&self, federate: FederateHandle) -> BTreeSet<AttributeHandle> {
        self.requests
            .iter()
            .filter(|(_, request)| {
                request.status == AcquireStatus::Released && request.federate == federate
            })
            .map(|(attribute, _)| *attribute)
            .collect()
    }

    /// Drops every entry made by `federate`, returning what was dropped
    pub fn remove_federate(&mut self, federate: FederateHandle) -> BTreeSet<AttributeHandle> {
        let removed = self.all_requested_by(federate);
        for attribute in &removed {
            self.requests.remove(attribute);
        }
        removed
    }
}

impl Serde for AcquireRequest {
    fn ser(&self, writer: &mut ByteWriter) {
        self.object.ser(writer);
        writer.write_u32(self.requests.len() as u32);
        for (attribute, request) in &self.requests {
            attribute.ser(writer);
            request.federate.ser(writer);
            request.status.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let object = ObjectHandle::de(reader)?;
        let count = reader.read_u32()?;
        let mut requests = BTreeMap::new();
        for _ in 0..count {
            let attribute = AttributeHandle::de(reader)?;
            let federate = FederateHandle::de(reader)?;
            let status = AcquireStatus::de(reader)?;
            requests.insert(attribute, AttributeRequest { federate, status });
        }
        Ok(Self { object, requests })
    }
}
