use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::{AttributeHandle, FederateHandle, ObjectClassHandle, ObjectHandle};

/// One registered object instance and the current owner of each of its
/// attributes
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectInstance {
    handle: ObjectHandle,
    class: ObjectClassHandle,
    name: String,
    registrar: FederateHandle,
    owners: BTreeMap<AttributeHandle, Option<FederateHandle>>,
    discovered: bool,
}

impl ObjectInstance {
    /// Creates an instance of `class`. The registrar starts out owning
    /// `owned`, every other attribute in `all` is unowned.
    pub fn new(
        handle: ObjectHandle,
        class: ObjectClassHandle,
        name: String,
        registrar: FederateHandle,
        all: &BTreeSet<AttributeHandle>,
        owned: &BTreeSet<AttributeHandle>,
    ) -> Self {
        let owners = all
            .iter()
            .map(|attribute| {
                let owner = owned.contains(attribute).then_some(registrar);
                (*attribute, owner)
            })
            .collect();
        Self {
            handle,
            class,
            name,
            registrar,
            owners,
            discovered: false,
        }
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn class(&self) -> ObjectClassHandle {
        self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registrar(&self) -> FederateHandle {
        self.registrar
    }

    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    pub fn set_discovered(&mut self, discovered: bool) {
        self.discovered = discovered;
    }

    pub fn has_attribute(&self, attribute: &AttributeHandle) -> bool {
        self.owners.contains_key(attribute)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeHandle> {
        self.owners.keys()
    }

    pub fn owner(&self, attribute: &AttributeHandle) -> Option<FederateHandle> {
        self.owners.get(attribute).copied().flatten()
    }

    pub fn is_owned_by(&self, attribute: &AttributeHandle, federate: FederateHandle) -> bool {
        self.owner(attribute) == Some(federate)
    }

    pub fn is_unowned(&self, attribute: &AttributeHandle) -> bool {
        matches!(self.owners.get(attribute), Some(None))
    }

    /// Records a new owner for each listed attribute the instance has.
    /// Unknown attributes are skipped.
    pub fn set_owner<'a>(
        &mut self,
        attributes: impl IntoIterator<Item = &'a AttributeHandle>,
        owner: Option<FederateHandle>,
    ) {
        for attribute in attributes {
            if let Some(slot) = self.owners.get_mut(attribute) {
                *slot = owner;
            }
        }
    }

    /// Attributes out of `attributes` held by `federate`
    pub fn owned_by(
        &self,
        attributes: &BTreeSet<AttributeHandle>,
        federate: FederateHandle,
    ) -> BTreeSet<AttributeHandle> {
        attributes
            .iter()
            .filter(|attribute| self.is_owned_by(attribute, federate))
            .copied()
            .collect()
    }

    pub fn all_owned_by(&self, federate: FederateHandle) -> BTreeSet<AttributeHandle> {
        self.owners
            .iter()
            .filter(|(_, owner)| **owner == Some(federate))
            .map(|(attribute, _)| *attribute)
            .collect()
    }
}

/// Every object instance a host knows about
#[derive(Clone, Debug, Default)]
pub struct Repository {
    objects: HashMap<ObjectHandle, ObjectInstance>,
    names: HashMap<String, ObjectHandle>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, instance: ObjectInstance) {
        self.names.insert(instance.name.clone(), instance.handle);
        self.objects.insert(instance.handle, instance);
    }

    pub fn remove(&mut self, object: &ObjectHandle) -> Option<ObjectInstance> {
        let removed = self.objects.remove(object)?;
        self.names.remove(&removed.name);
        Some(removed)
    }

    pub fn get(&self, object: &ObjectHandle) -> Option<&ObjectInstance> {
        self.objects.get(object)
    }

    pub fn get_mut(&mut self, object: &ObjectHandle) -> Option<&mut ObjectInstance> {
        self.objects.get_mut(object)
    }

    pub fn contains(&self, object: &ObjectHandle) -> bool {
        self.objects.contains_key(object)
    }

    pub fn handle_for_name(&self, name: &str) -> Option<ObjectHandle> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectInstance> {
        self.objects.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ObjectInstance> {
        self.objects.values_mut()
    }

    pub fn instances_of_class(&self, class: ObjectClassHandle) -> Vec<ObjectHandle> {
        self.objects
            .values()
            .filter(|instance| instance.class == class)
            .map(|instance| instance.handle)
            .collect()
    }

    pub fn registered_by(&self, federate: FederateHandle) -> Vec<ObjectHandle> {
        let mut registered: Vec<ObjectHandle> = self
            .objects
            .values()
            .filter(|instance| instance.registrar == federate)
            .map(|instance| instance.handle)
            .collect();
        registered.sort();
        registered
    }

    /// Clears every attribute `federate` holds, returning what it held
    pub fn release_all_owned_by(
        &mut self,
        federate: FederateHandle,
    ) -> BTreeMap<ObjectHandle, BTreeSet<AttributeHandle>> {
        let mut released = BTreeMap::new();
        for instance in self.objects.values_mut() {
            let owned = instance.all_owned_by(federate);
            if owned.is_empty() {
                continue;
            }
            instance.set_owner(&owned, None);
            released.insert(instance.handle, owned);
        }
        released
    }
}
