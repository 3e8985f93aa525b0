//! Object and enumerated type registry.

use std::collections::HashMap;
use std::sync::Arc;

/// Index of an object type in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectTypeId(pub usize);

/// Index of an enumerated type in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumTypeId(pub usize);

/// An object type: a name and its ordered set of object constants.
///
/// Non-fluents and instance blocks may extend the object set; extensions are
/// appended, so existing indices stay stable.
#[derive(Debug, Clone)]
pub struct ObjectTypeDef {
    pub name: Arc<str>,
    pub objects: Vec<Arc<str>>,
}

impl ObjectTypeDef {
    pub fn object_index(&self, name: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.as_ref() == name)
    }
}

/// An enumerated type: a name and its ordered labels.
#[derive(Debug, Clone)]
pub struct EnumTypeDef {
    pub name: Arc<str>,
    pub labels: Vec<Arc<str>>,
}

impl EnumTypeDef {
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l.as_ref() == label)
    }
}

/// Registry of object and enum types.
///
/// Adds are infallible; duplicate names across the two namespaces are
/// rejected during the build phase, not here.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    object_types: Vec<ObjectTypeDef>,
    enum_types: Vec<EnumTypeDef>,
    object_indices: HashMap<Arc<str>, usize>,
    enum_indices: HashMap<Arc<str>, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object_type(
        &mut self,
        name: impl Into<Arc<str>>,
        objects: impl IntoIterator<Item = impl Into<Arc<str>>>,
    ) -> ObjectTypeId {
        let name = name.into();
        let idx = self.object_types.len();
        self.object_indices.insert(name.clone(), idx);
        self.object_types.push(ObjectTypeDef {
            name,
            objects: objects.into_iter().map(Into::into).collect(),
        });
        ObjectTypeId(idx)
    }

    pub fn add_enum_type(
        &mut self,
        name: impl Into<Arc<str>>,
        labels: impl IntoIterator<Item = impl Into<Arc<str>>>,
    ) -> EnumTypeId {
        let name = name.into();
        let idx = self.enum_types.len();
        self.enum_indices.insert(name.clone(), idx);
        self.enum_types.push(EnumTypeDef {
            name,
            labels: labels.into_iter().map(Into::into).collect(),
        });
        EnumTypeId(idx)
    }

    /// Appends objects to an existing object type.
    pub fn extend_objects(
        &mut self,
        id: ObjectTypeId,
        objects: impl IntoIterator<Item = impl Into<Arc<str>>>,
    ) {
        self.object_types[id.0]
            .objects
            .extend(objects.into_iter().map(Into::into));
    }

    pub fn object_type_id(&self, name: &str) -> Option<ObjectTypeId> {
        self.object_indices.get(name).copied().map(ObjectTypeId)
    }

    pub fn enum_type_id(&self, name: &str) -> Option<EnumTypeId> {
        self.enum_indices.get(name).copied().map(EnumTypeId)
    }

    pub fn object_type(&self, id: ObjectTypeId) -> &ObjectTypeDef {
        &self.object_types[id.0]
    }

    pub fn enum_type(&self, id: EnumTypeId) -> &EnumTypeDef {
        &self.enum_types[id.0]
    }

    pub fn object_types(&self) -> &[ObjectTypeDef] {
        &self.object_types
    }

    pub fn enum_types(&self) -> &[EnumTypeDef] {
        &self.enum_types
    }

    pub fn domain_size(&self, id: ObjectTypeId) -> usize {
        self.object_types[id.0].objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_lookup() {
        let mut reg = TypeRegistry::new();
        let computer = reg.add_object_type("computer", ["c1", "c2"]);
        assert_eq!(reg.object_type_id("computer"), Some(computer));
        assert_eq!(reg.object_type(computer).object_index("c2"), Some(1));
        assert_eq!(reg.domain_size(computer), 2);
    }

    #[test]
    fn test_extend_objects_keeps_indices() {
        let mut reg = TypeRegistry::new();
        let computer = reg.add_object_type("computer", ["c1"]);
        reg.extend_objects(computer, ["c2", "c3"]);
        assert_eq!(reg.object_type(computer).object_index("c1"), Some(0));
        assert_eq!(reg.object_type(computer).object_index("c3"), Some(2));
        assert_eq!(reg.domain_size(computer), 3);
    }

    #[test]
    fn test_enum_type_lookup() {
        let mut reg = TypeRegistry::new();
        let status = reg.add_enum_type("status", ["poor", "good", "excellent"]);
        assert_eq!(reg.enum_type_id("status"), Some(status));
        assert_eq!(reg.enum_type(status).label_index("good"), Some(1));
        assert_eq!(reg.enum_type(status).labels.len(), 3);
    }
}
