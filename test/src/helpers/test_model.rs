use std::collections::{BTreeMap, BTreeSet};

use rti_shared::{
    AttributeHandle, InteractionClassHandle, ObjectClassHandle, ObjectModel, ParameterHandle,
};

/// Federation every scenario runs in
pub const BATTLE: &str = "battle";

/// A tank class and a fire interaction, with handles resolved up front
#[derive(Clone, Debug)]
pub struct Battle {
    pub model: ObjectModel,
    pub tank: ObjectClassHandle,
    pub position: AttributeHandle,
    pub fuel: AttributeHandle,
    pub fire: InteractionClassHandle,
    pub target: ParameterHandle,
}

pub fn battle() -> Battle {
    let model = ObjectModel::builder()
        .object_class("Tank", &["position", "fuel"])
        .interaction_class("Fire", &["target"])
        .build();
    let tank = model.object_class_handle("Tank").expect("Tank is defined");
    let position = model
        .attribute_handle(&tank, "position")
        .expect("position is defined");
    let fuel = model.attribute_handle(&tank, "fuel").expect("fuel is defined");
    let fire = model
        .interaction_class_handle("Fire")
        .expect("Fire is defined");
    let target = model
        .parameter_handle(&fire, "target")
        .expect("target is defined");
    Battle {
        model,
        tank,
        position,
        fuel,
        fire,
        target,
    }
}

impl Battle {
    pub fn tank_attributes(&self) -> BTreeSet<AttributeHandle> {
        [self.position, self.fuel].into_iter().collect()
    }

    pub fn fire_at(&self, target: &str) -> BTreeMap<ParameterHandle, Vec<u8>> {
        BTreeMap::from([(self.target, target.as_bytes().to_vec())])
    }
}

/// Shorthand for a set of attributes
pub fn attributes(handles: &[AttributeHandle]) -> BTreeSet<AttributeHandle> {
    handles.iter().copied().collect()
}
