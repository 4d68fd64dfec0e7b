use std::collections::{BTreeSet, HashMap};

use crate::types::{AttributeHandle, FederateHandle, InteractionClassHandle, ObjectClassHandle};

#[derive(Clone, Debug, Default)]
struct FederateInterests {
    published_objects: HashMap<ObjectClassHandle, BTreeSet<AttributeHandle>>,
    subscribed_objects: HashMap<ObjectClassHandle, BTreeSet<AttributeHandle>>,
    published_interactions: BTreeSet<InteractionClassHandle>,
    subscribed_interactions: BTreeSet<InteractionClassHandle>,
}

/// Publication and subscription declarations, per federate
#[derive(Clone, Debug, Default)]
pub struct InterestManager {
    federates: HashMap<FederateHandle, FederateInterests>,
}

impl InterestManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, federate: FederateHandle) -> &mut FederateInterests {
        self.federates.entry(federate).or_default()
    }

    // Object classes

    /// Replaces the federate's published attribute set for the class
    pub fn publish_object_class(
        &mut self,
        federate: FederateHandle,
        class: ObjectClassHandle,
        attributes: BTreeSet<AttributeHandle>,
    ) {
        self.entry(federate).published_objects.insert(class, attributes);
    }

    pub fn unpublish_object_class(&mut self, federate: FederateHandle, class: ObjectClassHandle) -> bool {
        self.entry(federate).published_objects.remove(&class).is_some()
    }

    pub fn subscribe_object_class(
        &mut self,
        federate: FederateHandle,
        class: ObjectClassHandle,
        attributes: BTreeSet<AttributeHandle>,
    ) {
        self.entry(federate).subscribed_objects.insert(class, attributes);
    }

    pub fn unsubscribe_object_class(&mut self, federate: FederateHandle, class: ObjectClassHandle) -> bool {
        self.entry(federate).subscribed_objects.remove(&class).is_some()
    }

    pub fn is_object_class_published(&self, federate: FederateHandle, class: ObjectClassHandle) -> bool {
        self.published_attributes(federate, class).is_some()
    }

    pub fn published_attributes(
        &self,
        federate: FederateHandle,
        class: ObjectClassHandle,
    ) -> Option<&BTreeSet<AttributeHandle>> {
        self.federates
            .get(&federate)
            .and_then(|interests| interests.published_objects.get(&class))
    }

    pub fn is_object_class_subscribed(&self, federate: FederateHandle, class: ObjectClassHandle) -> bool {
        self.subscribed_attributes(federate, class).is_some()
    }

    pub fn subscribed_attributes(
        &self,
        federate: FederateHandle,
        class: ObjectClassHandle,
    ) -> Option<&BTreeSet<AttributeHandle>> {
        self.federates
            .get(&federate)
            .and_then(|interests| interests.subscribed_objects.get(&class))
    }

    /// The subset of `attributes` that `federate` publishes for `class`
    pub fn publishable(
        &self,
        federate: FederateHandle,
        class: ObjectClassHandle,
        attributes: &BTreeSet<AttributeHandle>,
    ) -> BTreeSet<AttributeHandle> {
        match self.published_attributes(federate, class) {
            Some(published) => attributes.intersection(published).copied().collect(),
            None => BTreeSet::new(),
        }
    }

    pub fn subscribers_of(&self, class: ObjectClassHandle) -> BTreeSet<FederateHandle> {
        self.federates
            .iter()
            .filter(|(_, interests)| interests.subscribed_objects.contains_key(&class))
            .map(|(federate, _)| *federate)
            .collect()
    }

    // Interaction classes

    pub fn publish_interaction_class(&mut self, federate: FederateHandle, class: InteractionClassHandle) {
        self.entry(federate).published_interactions.insert(class);
    }

    pub fn unpublish_interaction_class(
        &mut self,
        federate: FederateHandle,
        class: InteractionClassHandle,
    ) -> bool {
        self.entry(federate).published_interactions.remove(&class)
    }

    pub fn subscribe_interaction_class(&mut self, federate: FederateHandle, class: InteractionClassHandle) {
        self.entry(federate).subscribed_interactions.insert(class);
    }

    pub fn unsubscribe_interaction_class(
        &mut self,
        federate: FederateHandle,
        class: InteractionClassHandle,
    ) -> bool {
        self.entry(federate).subscribed_interactions.remove(&class)
    }

    pub fn is_interaction_class_published(
        &self,
        federate: FederateHandle,
        class: InteractionClassHandle,
    ) -> bool {
        self.federates
            .get(&federate)
            .is_some_and(|interests| interests.published_interactions.contains(&class))
    }

    pub fn is_interaction_class_subscribed(
        &self,
        federate: FederateHandle,
        class: InteractionClassHandle,
    ) -> bool {
        self.federates
            .get(&federate)
            .is_some_and(|interests| interests.subscribed_interactions.contains(&class))
    }

    pub fn remove_federate(&mut self, federate: FederateHandle) {
        self.federates.remove(&federate);
    }
}
