//! Annotation classes and the registry that owns them.

use serde::{Deserialize, Serialize};

use crate::color::{self, DEFAULT_CLASS_COLOR};
use crate::error::ValidationError;
use crate::model::ShapeStore;

/// Stable identifier of a class within a registry.
pub type ClassId = u32;

/// An annotation class with a name and color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Unique identifier, assigned at creation and never reused
    pub id: ClassId,
    /// Display name, unique within the registry
    pub name: String,
    /// Color as `#rrggbb`
    pub color: String,
}

/// Ordered set of annotation classes.
///
/// Ids start at 0 and are handed out from a counter, so they stay stable
/// when other classes are removed. Iteration order is creation order, which
/// is also the order COCO category ids follow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassRegistry {
    classes: Vec<ClassDef>,
    next_id: ClassId,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the single default class "Class 1".
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.classes.push(ClassDef {
            id: 0,
            name: "Class 1".to_string(),
            color: DEFAULT_CLASS_COLOR.to_string(),
        });
        registry.next_id = 1;
        registry
    }

    /// Add a class with an explicit `#rrggbb` color.
    pub fn add(&mut self, name: &str, color: &str) -> Result<ClassId, ValidationError> {
        let name = self.check_name(name, None)?;
        let color = color::normalize_hex(color).ok_or_else(|| ValidationError::InvalidColor {
            value: color.to_string(),
        })?;

        let id = self.next_id;
        self.next_id += 1;
        log::debug!("Added class {} '{}' ({})", id, name, color);
        self.classes.push(ClassDef { id, name, color });
        Ok(id)
    }

    /// Add a class, picking the next palette color.
    pub fn add_with_palette_color(&mut self, name: &str) -> Result<ClassId, ValidationError> {
        let color = color::palette_color(self.next_id as usize);
        self.add(name, &color)
    }

    /// Rename a class. Names stay unique.
    pub fn rename(&mut self, id: ClassId, name: &str) -> Result<(), ValidationError> {
        let name = self.check_name(name, Some(id))?;
        let class = self.get_mut(id)?;
        class.name = name;
        Ok(())
    }

    /// Change a class color.
    pub fn set_color(&mut self, id: ClassId, color: &str) -> Result<(), ValidationError> {
        let color = color::normalize_hex(color).ok_or_else(|| ValidationError::InvalidColor {
            value: color.to_string(),
        })?;
        self.get_mut(id)?.color = color;
        Ok(())
    }

    /// Remove a class that no shape references.
    ///
    /// `stores` must cover every store that can reference this registry.
    /// Deletion is refused with [`ValidationError::ClassInUse`] while any
    /// shape still carries the class; shapes are never reassigned silently.
    pub fn remove<'a>(
        &mut self,
        id: ClassId,
        stores: impl IntoIterator<Item = &'a ShapeStore>,
    ) -> Result<ClassDef, ValidationError> {
        let index = self
            .position(id)
            .ok_or(ValidationError::UnknownClass { class_id: id })?;

        let shape_count: usize = stores.into_iter().map(|s| s.count_class(id)).sum();
        if shape_count > 0 {
            return Err(ValidationError::ClassInUse {
                class_id: id,
                shape_count,
            });
        }

        let removed = self.classes.remove(index);
        log::debug!("Removed class {} '{}'", removed.id, removed.name);
        Ok(removed)
    }

    /// Look up a class by id.
    pub fn get(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Look up a class by exact name.
    pub fn by_name(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Whether `id` names a class in this registry.
    pub fn contains(&self, id: ClassId) -> bool {
        self.get(id).is_some()
    }

    /// Fail with [`ValidationError::UnknownClass`] unless `id` exists.
    pub fn require(&self, id: ClassId) -> Result<&ClassDef, ValidationError> {
        self.get(id)
            .ok_or(ValidationError::UnknownClass { class_id: id })
    }

    /// Position of a class in registry order.
    pub fn position(&self, id: ClassId) -> Option<usize> {
        self.classes.iter().position(|c| c.id == id)
    }

    /// Iterate classes in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter()
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the registry has no classes.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn get_mut(&mut self, id: ClassId) -> Result<&mut ClassDef, ValidationError> {
        self.classes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ValidationError::UnknownClass { class_id: id })
    }

    fn check_name(&self, name: &str, exclude: Option<ClassId>) -> Result<String, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyClassName);
        }
        let taken = self
            .classes
            .iter()
            .any(|c| c.name == name && Some(c.id) != exclude);
        if taken {
            return Err(ValidationError::DuplicateClassName {
                name: name.to_string(),
            });
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_zero_and_are_stable() {
        let mut registry = ClassRegistry::new();
        let car = registry.add("car", "#ff0000").unwrap();
        let person = registry.add("person", "#0000ff").unwrap();
        assert_eq!(car, 0);
        assert_eq!(person, 1);

        registry.remove(car, []).unwrap();
        let bike = registry.add("bike", "#00ff00").unwrap();
        assert_eq!(bike, 2, "ids are never reused");
        assert_eq!(registry.position(person), Some(0));
    }

    #[test]
    fn test_defaults() {
        let registry = ClassRegistry::with_defaults();
        assert_eq!(registry.len(), 1);
        let class = registry.get(0).unwrap();
        assert_eq!(class.name, "Class 1");
        assert_eq!(class.color, "#00ff00");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ClassRegistry::new();
        registry.add("car", "#ff0000").unwrap();
        let err = registry.add(" car ", "#00ff00").unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateClassName {
                name: "car".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_color_rejected() {
        let mut registry = ClassRegistry::new();
        assert!(matches!(
            registry.add("car", "red"),
            Err(ValidationError::InvalidColor { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_rename_keeps_own_name() {
        let mut registry = ClassRegistry::new();
        let car = registry.add("car", "#ff0000").unwrap();
        let truck = registry.add("truck", "#00ff00").unwrap();

        registry.rename(car, "car").unwrap();
        assert!(registry.rename(truck, "car").is_err());
        registry.rename(truck, "lorry").unwrap();
        assert_eq!(registry.get(truck).unwrap().name, "lorry");
        assert_eq!(registry.by_name("lorry").map(|c| c.id), Some(truck));
    }

    #[test]
    fn test_remove_refused_while_referenced() {
        let mut registry = ClassRegistry::new();
        let car = registry.add("car", "#ff0000").unwrap();
        let mut store = ShapeStore::new(100, 100);
        store.add_bbox(&registry, 10, 10, 20, 20, car).unwrap();

        let err = registry.remove(car, [&store]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ClassInUse {
                class_id: car,
                shape_count: 1
            }
        );
        assert!(registry.contains(car));
    }

    #[test]
    fn test_palette_color_assignment() {
        let mut registry = ClassRegistry::new();
        let a = registry.add_with_palette_color("a").unwrap();
        let b = registry.add_with_palette_color("b").unwrap();
        assert_ne!(registry.get(a).unwrap().color, registry.get(b).unwrap().color);
    }
}
