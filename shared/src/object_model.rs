use std::collections::{BTreeMap, BTreeSet, HashMap};

use rti_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::{
    error::RtiError,
    types::{AttributeHandle, InteractionClassHandle, ObjectClassHandle, ParameterHandle},
};

/// One object class: its name and the attributes it declares
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectClass {
    pub handle: ObjectClassHandle,
    pub name: String,
    pub attributes: BTreeMap<AttributeHandle, String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InteractionClass {
    pub handle: InteractionClassHandle,
    pub name: String,
    pub parameters: BTreeMap<ParameterHandle, String>,
}

/// The class metadata a federation was created with.
///
/// Handle and name lookups are all the RTI needs from an object model, so
/// this is built in code rather than parsed from a file. Attribute handles
/// are unique across the whole model, which lets an attribute handle alone
/// identify its class.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ObjectModel {
    object_classes: BTreeMap<ObjectClassHandle, ObjectClass>,
    interaction_classes: BTreeMap<InteractionClassHandle, InteractionClass>,
    class_names: HashMap<String, ObjectClassHandle>,
    interaction_names: HashMap<String, InteractionClassHandle>,
    attribute_classes: HashMap<AttributeHandle, ObjectClassHandle>,
}

impl ObjectModel {
    pub fn builder() -> ObjectModelBuilder {
        ObjectModelBuilder::default()
    }

    // Object classes

    pub fn object_class(&self, handle: &ObjectClassHandle) -> Option<&ObjectClass> {
        self.object_classes.get(handle)
    }

    pub fn object_classes(&self) -> impl Iterator<Item = &ObjectClass> {
        self.object_classes.values()
    }

    pub fn object_class_handle(&self, name: &str) -> Result<ObjectClassHandle, RtiError> {
        self.class_names
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| RtiError::ObjectClassNotDefined {
                name: name.to_string(),
            })
    }

    pub fn attribute_handle(
        &self,
        class: &ObjectClassHandle,
        name: &str,
    ) -> Result<AttributeHandle, RtiError> {
        let Some(object_class) = self.object_classes.get(class) else {
            return Err(RtiError::ObjectClassNotDefined {
                name: class.to_string(),
            });
        };
        object_class
            .attributes
            .iter()
            .find(|(_, attribute_name)| attribute_name.eq_ignore_ascii_case(name))
            .map(|(handle, _)| *handle)
            .ok_or_else(|| RtiError::ObjectClassNotDefined {
                name: format!("{}.{}", object_class.name, name),
            })
    }

    pub fn attributes_of(&self, class: &ObjectClassHandle) -> BTreeSet<AttributeHandle> {
        self.object_classes
            .get(class)
            .map(|object_class| object_class.attributes.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn class_of_attribute(&self, attribute: &AttributeHandle) -> Option<ObjectClassHandle> {
        self.attribute_classes.get(attribute).copied()
    }

    /// Checks that every attribute belongs to `class`
    pub fn validate_attributes<'a>(
        &self,
        class: &ObjectClassHandle,
        attributes: impl IntoIterator<Item = &'a AttributeHandle>,
    ) -> Result<(), RtiError> {
        for attribute in attributes {
            if self.attribute_classes.get(attribute) != Some(class) {
                return Err(RtiError::AttributeNotDefined {
                    attribute: *attribute,
                });
            }
        }
        Ok(())
    }

    // Interaction classes

    pub fn interaction_class(
        &self,
        handle: &InteractionClassHandle,
    ) -> Option<&InteractionClass> {
        self.interaction_classes.get(handle)
    }

    pub fn interaction_class_handle(
        &self,
        name: &str,
    ) -> Result<InteractionClassHandle, RtiError> {
        self.interaction_names
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| RtiError::InteractionClassNotDefined {
                name: name.to_string(),
            })
    }

    pub fn parameter_handle(
        &self,
        class: &InteractionClassHandle,
        name: &str,
    ) -> Result<ParameterHandle, RtiError> {
        self.interaction_classes
            .get(class)
            .and_then(|interaction| {
                interaction
                    .parameters
                    .iter()
                    .find(|(_, parameter)| parameter.eq_ignore_ascii_case(name))
                    .map(|(handle, _)| *handle)
            })
            .ok_or_else(|| RtiError::InteractionClassNotDefined {
                name: format!("{class}.{name}"),
            })
    }

    pub fn has_interaction_class(&self, class: &InteractionClassHandle) -> bool {
        self.interaction_classes.contains_key(class)
    }

    fn index(&mut self) {
        self.class_names.clear();
        self.interaction_names.clear();
        self.attribute_classes.clear();
        for object_class in self.object_classes.values() {
            self.class_names
                .insert(object_class.name.to_lowercase(), object_class.handle);
            for attribute in object_class.attributes.keys() {
                self.attribute_classes.insert(*attribute, object_class.handle);
            }
        }
        for interaction in self.interaction_classes.values() {
            self.interaction_names
                .insert(interaction.name.to_lowercase(), interaction.handle);
        }
    }
}

/// Assigns handles in declaration order, starting at 1
#[derive(Default)]
pub struct ObjectModelBuilder {
    model: ObjectModel,
    next_class: u32,
    next_attribute: u32,
    next_interaction: u32,
    next_parameter: u32,
}

impl ObjectModelBuilder {
    pub fn object_class(mut self, name: &str, attributes: &[&str]) -> Self {
        self.next_class += 1;
        let handle = ObjectClassHandle::new(self.next_class);
        let mut declared = BTreeMap::new();
        for attribute in attributes {
            self.next_attribute += 1;
            declared.insert(
                AttributeHandle::new(self.next_attribute),
                attribute.to_string(),
            );
        }
        self.model.object_classes.insert(
            handle,
            ObjectClass {
                handle,
                name: name.to_string(),
                attributes: declared,
            },
        );
        self
    }

    pub fn interaction_class(mut self, name: &str, parameters: &[&str]) -> Self {
        self.next_interaction += 1;
        let handle = InteractionClassHandle::new(self.next_interaction);
        let mut declared = BTreeMap::new();
        for parameter in parameters {
            self.next_parameter += 1;
            declared.insert(
                ParameterHandle::new(self.next_parameter),
                parameter.to_string(),
            );
        }
        self.model.interaction_classes.insert(
            handle,
            InteractionClass {
                handle,
                name: name.to_string(),
                parameters: declared,
            },
        );
        self
    }

    pub fn build(mut self) -> ObjectModel {
        self.model.index();
        self.model
    }
}

impl Serde for ObjectModel {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.object_classes.len() as u32);
        for object_class in self.object_classes.values() {
            object_class.handle.ser(writer);
            object_class.name.ser(writer);
            object_class.attributes.ser(writer);
        }
        writer.write_u32(self.interaction_classes.len() as u32);
        for interaction in self.interaction_classes.values() {
            interaction.handle.ser(writer);
            interaction.name.ser(writer);
            interaction.parameters.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let mut model = ObjectModel::default();
        let class_count = reader.read_u32()?;
        for _ in 0..class_count {
            let handle = ObjectClassHandle::de(reader)?;
            let name = String::de(reader)?;
            let attributes = BTreeMap::de(reader)?;
            model.object_classes.insert(
                handle,
                ObjectClass {
                    handle,
                    name,
                    attributes,
                },
            );
        }
        let interaction_count = reader.read_u32()?;
        for _ in 0..interaction_count {
            let handle = InteractionClassHandle::de(reader)?;
            let name = String::de(reader)?;
            let parameters = BTreeMap::de(reader)?;
            model.interaction_classes.insert(
                handle,
                InteractionClass {
                    handle,
                    name,
                    parameters,
                },
            );
        }
        model.index();
        Ok(model)
    }
}
