use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::trace;

use rti_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::{
    ownership::{AcquireRequest, AcquireStatus, DivestRequest},
    snapshot::SaveRestoreTarget,
    types::{AttributeHandle, FederateHandle, ObjectHandle},
};

/// Outstanding divestitures and acquisitions for every object instance in a
/// federation. Every federate's LRC keeps one, and so does the RTI. All
/// operations are plain map mutations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OwnershipManager {
    acquisitions: HashMap<ObjectHandle, AcquireRequest>,
    divestitures: HashMap<ObjectHandle, DivestRequest>,
}

impl OwnershipManager {
    pub fn new() -> Self {
        Self::default()
    }

    // Acquisition

    pub fn request_acquisition_if_available(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
    ) {
        self.record_request(object, attributes, federate, AcquireStatus::RequestAvailable);
    }

    pub fn request_acquisition(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
    ) {
        self.record_request(object, attributes, federate, AcquireStatus::Request);
    }

    fn record_request(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
        status: AcquireStatus,
    ) {
        trace!("Acquisition {status:?} on {object} {attributes:?} from {federate}");
        match self.acquisitions.get_mut(&object) {
            Some(request) => request.update_request(attributes, federate, status),
            None => {
                self.acquisitions
                    .insert(object, AcquireRequest::new(object, attributes, federate, status));
            }
        }
    }

    pub fn cancel_acquisition(&mut self, object: ObjectHandle, attributes: &BTreeSet<AttributeHandle>) {
        let Some(request) = self.acquisitions.get_mut(&object) else {
            return;
        };
        request.cancel_transfer(attributes);
        if request.is_empty() {
            self.acquisitions.remove(&object);
        }
    }

    pub fn complete_acquisition_if_available(
        &mut self,
        object: ObjectHandle,
        federate: FederateHandle,
    ) -> BTreeSet<AttributeHandle> {
        self.complete(object, federate, true)
    }

    pub fn complete_acquisition(
        &mut self,
        object: ObjectHandle,
        federate: FederateHandle,
    ) -> BTreeSet<AttributeHandle> {
        self.complete(object, federate, false)
    }

    fn complete(
        &mut self,
        object: ObjectHandle,
        federate: FederateHandle,
        if_available: bool,
    ) -> BTreeSet<AttributeHandle> {
        let Some(request) = self.acquisitions.get_mut(&object) else {
            return BTreeSet::new();
        };
        let obtained = request.complete_transfer(federate, if_available);
        if request.is_empty() {
            self.acquisitions.remove(&object);
        }
        obtained
    }

    /// Marks the attributes released and returns who each one goes to.
    /// Attributes nobody asked for are skipped.
    pub fn release_attributes(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> BTreeMap<AttributeHandle, FederateHandle> {
        match self.acquisitions.get_mut(&object) {
            Some(request) => request.release_attributes(attributes),
            None => BTreeMap::new(),
        }
    }

    // Acquisition queries

    pub fn is_attribute_under_acquisition_request(
        &self,
        object: ObjectHandle,
        attribute: &AttributeHandle,
    ) -> bool {
        self.acquisitions
            .get(&object)
            .is_some_and(|request| request.is_attribute_under_acquisition_request(attribute))
    }

    /// Attributes from `attributes` that `federate` holds a firm request on
    pub fn attributes_under_acquisition_request_by(
        &self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
    ) -> BTreeSet<AttributeHandle> {
        self.acquisitions
            .get(&object)
            .map(|request| request.attributes_requested_by(attributes, federate))
            .unwrap_or_default()
    }

    /// Firm requests against `attributes`, keyed to the requester
    pub fn attributes_under_acquisition_request(
        &self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> BTreeMap<AttributeHandle, FederateHandle> {
        self.acquisitions
            .get(&object)
            .map(|request| request.requesters_of(attributes))
            .unwrap_or_default()
    }

    /// Every attribute of `object` with any request from `federate`
    pub fn all_attributes_requested_by(
        &self,
        object: ObjectHandle,
        federate: FederateHandle,
    ) -> BTreeSet<AttributeHandle> {
        self.acquisitions
            .get(&object)
            .map(|request| request.all_requested_by(federate))
            .unwrap_or_default()
    }

    /// The status and requester recorded for one attribute, if any
    pub fn request_for(
        &self,
        object: ObjectHandle,
        attribute: &AttributeHandle,
    ) -> Option<(FederateHandle, AcquireStatus)> {
        self.acquisitions
            .get(&object)
            .and_then(|request| request.request_for(attribute))
    }

    pub fn attributes_released_to_federate(
        &self,
        object: ObjectHandle,
        federate: FederateHandle,
    ) -> BTreeSet<AttributeHandle> {
        self.acquisitions
            .get(&object)
            .map(|request| request.released_to(federate))
            .unwrap_or_default()
    }

    /// Objects on which `federate` has any outstanding acquisition
    pub fn objects_with_requests_by(&self, federate: FederateHandle) -> BTreeSet<ObjectHandle> {
        self.acquisitions
            .iter()
            .filter(|(_, request)| !request.all_requested_by(federate).is_empty())
            .map(|(object, _)| *object)
            .collect()
    }

    // Divestiture

    pub fn request_divestiture(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
    ) {
        match self.divestitures.get_mut(&object) {
            Some(request) => request.update_request(attributes, federate),
            None => {
                self.divestitures
                    .insert(object, DivestRequest::new(object, attributes, federate));
            }
        }
    }

    pub fn attributes_offered_for_divest(
        &self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
    ) -> BTreeSet<AttributeHandle> {
        self.divestitures
            .get(&object)
            .map(|request| request.offered_by(attributes, federate))
            .unwrap_or_default()
    }

    pub fn complete_divest(
        &mut self,
        object: ObjectHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> BTreeSet<AttributeHandle> {
        let Some(request) = self.divestitures.get_mut(&object) else {
            return BTreeSet::new();
        };
        let completed = request.complete_divest(attributes);
        if request.is_empty() {
            self.divestitures.remove(&object);
        }
        completed
    }

    pub fn cancel_divest(&mut self, object: ObjectHandle, attributes: &BTreeSet<AttributeHandle>) {
        let Some(request) = self.divestitures.get_mut(&object) else {
            return;
        };
        request.cancel_divest(attributes);
        if request.is_empty() {
            self.divestitures.remove(&object);
        }
    }

    pub fn is_attribute_under_divest_request(
        &self,
        object: ObjectHandle,
        attribute: &AttributeHandle,
    ) -> bool {
        self.divestitures
            .get(&object)
            .is_some_and(|request| request.is_attribute_under_divest_request(attribute))
    }

    // Housekeeping

    /// Forgets everything about an object, as when it is deleted
    pub fn remove_object(&mut self, object: ObjectHandle) {
        self.acquisitions.remove(&object);
        self.divestitures.remove(&object);
    }

    /// Drops every request and offer made by a federate that has resigned
    pub fn remove_federate(&mut self, federate: FederateHandle) {
        for request in self.acquisitions.values_mut() {
            request.remove_federate(federate);
        }
        self.acquisitions.retain(|_, request| !request.is_empty());
        for request in self.divestitures.values_mut() {
            request.remove_federate(federate);
        }
        self.divestitures.retain(|_, request| !request.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        self.acquisitions.is_empty() && self.divestitures.is_empty()
    }
}

impl SaveRestoreTarget for OwnershipManager {
    fn save_to(&self, writer: &mut ByteWriter) {
        let acquisitions: Vec<AcquireRequest> = self.acquisitions.values().cloned().collect();
        let divestitures: Vec<DivestRequest> = self.divestitures.values().cloned().collect();
        acquisitions.ser(writer);
        divestitures.ser(writer);
    }

    fn restore_from(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        let acquisitions = Vec::<AcquireRequest>::de(reader)?;
        let divestitures = Vec::<DivestRequest>::de(reader)?;

        // Decode fully before touching state so a bad snapshot changes nothing
        self.acquisitions = acquisitions
            .into_iter()
            .map(|request| (request.object(), request))
            .collect();
        self.divestitures = divestitures
            .into_iter()
            .map(|request| (request.object(), request))
            .collect();
        Ok(())
    }
}
