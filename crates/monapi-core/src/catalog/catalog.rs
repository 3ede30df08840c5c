//! Registry of entity descriptors.

use super::entity::EntityDescriptor;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Entity descriptors by name. Built once at process start and read-only
/// afterwards.
#[derive(Debug, Default)]
pub struct Catalog {
    entities: BTreeMap<String, EntityDescriptor>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every monitoring entity registered.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for entity in crate::entities::all() {
            // Names are distinct by construction.
            if catalog.register(entity).is_err() {
                tracing::error!("duplicate entity in the standard catalog");
            }
        }
        catalog
    }

    /// Register a descriptor.
    pub fn register(&mut self, entity: EntityDescriptor) -> Result<()> {
        if self.entities.contains_key(&entity.name) {
            return Err(Error::internal(format!(
                "entity \"{}\" is already registered",
                entity.name
            )));
        }
        self.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    /// Get a descriptor.
    pub fn get(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    /// Get a descriptor or fail with `InvalidParameter`.
    pub fn entity(&self, name: &str) -> Result<&EntityDescriptor> {
        self.get(name)
            .ok_or_else(|| Error::invalid(format!("Unknown entity \"{}\".", name)))
    }

    /// Registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ChildKind;

    #[test]
    fn test_register_rejects_duplicates() {
        let mut catalog = Catalog::new();
        catalog
            .register(EntityDescriptor::new("task", "Task", "task", "t"))
            .unwrap();
        assert!(catalog
            .register(EntityDescriptor::new("task", "Task", "task", "t"))
            .is_err());
        assert!(catalog.entity("nope").is_err());
    }

    #[test]
    fn test_standard_catalog_is_consistent() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.len(), 16);

        for name in catalog.names() {
            let entity = catalog.entity(name).unwrap();
            for resolver in &entity.resolvers {
                if let Some(target) = resolver.target() {
                    assert!(catalog.get(target).is_some(), "{} -> {}", name, target);
                }
                for field in resolver.required_fields() {
                    assert!(entity.field(&field).is_some(), "{}.{}", name, field);
                }
            }
            for field in &entity.fields {
                if let Some(target) = &field.references {
                    assert!(catalog.get(target).is_some(), "{}.{}", name, field.name);
                }
                if let Some(alias) = &field.joined {
                    assert!(entity.left_join(alias).is_some(), "{}.{}", name, field.name);
                }
            }
            for child in &entity.children {
                if let ChildKind::Links { target, .. } = &child.kind {
                    assert!(catalog.get(target).is_some());
                }
            }
            for column in &entity.sort_columns {
                assert!(entity.field(column).is_some(), "{} sorts by {}", name, column);
            }
        }
    }
}
