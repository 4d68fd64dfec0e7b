use std::collections::{BTreeMap, BTreeSet};

use rti_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::types::{AttributeHandle, FederateHandle, ObjectHandle};

/// Attributes of one object instance currently offered up by their owner.
/// Being present in the map is what "offered" means.
#[derive(Clone, Debug, PartialEq)]
pub struct DivestRequest {
    object: ObjectHandle,
    offers: BTreeMap<AttributeHandle, FederateHandle>,
}

impl DivestRequest {
    pub fn new(
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
    ) -> Self {
        let offers = attributes
            .iter()
            .map(|attribute| (*attribute, federate))
            .collect();
        Self { object, offers }
    }

    pub fn object(&self) -> ObjectHandle {
        self.object
    }

    pub fn update_request(&mut self, attributes: &BTreeSet<AttributeHandle>, federate: FederateHandle) {
        for attribute in attributes {
            self.offers.insert(*attribute, federate);
        }
    }

    pub fn offered_by(
        &self,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
    ) -> BTreeSet<AttributeHandle> {
        attributes
            .iter()
            .filter(|attribute| self.offers.get(attribute) == Some(&federate))
            .copied()
            .collect()
    }

    pub fn complete_divest(&mut self, attributes: &BTreeSet<AttributeHandle>) -> BTreeSet<AttributeHandle> {
        attributes
            .iter()
            .filter(|attribute| self.offers.remove(attribute).is_some())
            .copied()
            .collect()
    }

    pub fn cancel_divest(&mut self, attributes: &BTreeSet<AttributeHandle>) {
        for attribute in attributes {
            self.offers.remove(attribute);
        }
    }

    pub fn is_attribute_under_divest_request(&self, attribute: &AttributeHandle) -> bool {
        self.offers.contains_key(attribute)
    }

    pub fn remove_federate(&mut self, federate: FederateHandle) {
        self.offers.retain(|_, offering| *offering != federate);
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

impl Serde for DivestRequest {
    fn ser(&self, writer: &mut ByteWriter) {
        self.object.ser(writer);
        self.offers.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            object: ObjectHandle::de(reader)?,
            offers: BTreeMap::de(reader)?,
        })
    }
}
