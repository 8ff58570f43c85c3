//! Editable annotation session.
//!
//! A [`Session`] owns the class registry and every loaded image with its
//! shapes. Class edits go through the session so a class still used by
//! any image cannot be removed. [`Session::snapshot`] hands out an
//! immutable copy for background export.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;

use crate::error::ValidationError;
use crate::format::{ExportError, ExportItem, ImageMeta, read_annotations};
use crate::model::{ClassDef, ClassId, ClassRegistry, ShapeStore};

/// Immutable view of a session taken at one point in time.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub registry: ClassRegistry,
    pub items: Vec<ExportItem>,
}

/// Classes plus images with their shapes.
#[derive(Debug, Clone, Default)]
pub struct Session {
    registry: ClassRegistry,
    images: Vec<ExportItem>,
}

impl Session {
    pub fn new(registry: ClassRegistry) -> Self {
        Self {
            registry,
            images: Vec::new(),
        }
    }

    /// Session with the default class and no images.
    pub fn with_defaults() -> Self {
        Self::new(ClassRegistry::with_defaults())
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn images(&self) -> &[ExportItem] {
        &self.images
    }

    pub fn image(&self, index: usize) -> Option<&ExportItem> {
        self.images.get(index)
    }

    /// Add an image with an empty store. Returns its index.
    pub fn add_image(
        &mut self,
        meta: ImageMeta,
        width: u32,
        height: u32,
        pixels: Option<Arc<DynamicImage>>,
    ) -> usize {
        log::debug!("Adding image '{}' ({}x{})", meta.file_name, width, height);
        self.images.push(ExportItem {
            meta,
            store: ShapeStore::new(width, height),
            pixels,
        });
        self.images.len() - 1
    }

    /// Add an image from a JSON annotation file's contents.
    ///
    /// Unknown class names are added to the registry.
    pub fn import_json(
        &mut self,
        bytes: &[u8],
        source: Option<&Path>,
        pixels: Option<Arc<DynamicImage>>,
    ) -> Result<usize, ExportError> {
        let (doc, store) = read_annotations(bytes, &mut self.registry)?;
        let mut meta = ImageMeta::new(doc.image);
        if let Some(source) = source {
            meta = meta.with_source(source);
        }
        self.images.push(ExportItem {
            meta,
            store,
            pixels,
        });
        Ok(self.images.len() - 1)
    }

    /// Attach pixel data to an image.
    pub fn set_pixels(&mut self, index: usize, pixels: Arc<DynamicImage>) -> bool {
        match self.images.get_mut(index) {
            Some(item) => {
                item.pixels = Some(pixels);
                true
            }
            None => false,
        }
    }

    /// Registry for validation plus a mutable store, for shape edits.
    pub fn store_and_registry(
        &mut self,
        index: usize,
    ) -> Option<(&ClassRegistry, &mut ShapeStore)> {
        let item = self.images.get_mut(index)?;
        Some((&self.registry, &mut item.store))
    }

    pub fn add_class(&mut self, name: &str, color: &str) -> Result<ClassId, ValidationError> {
        self.registry.add(name, color)
    }

    pub fn rename_class(&mut self, id: ClassId, name: &str) -> Result<(), ValidationError> {
        self.registry.rename(id, name)
    }

    pub fn set_class_color(&mut self, id: ClassId, color: &str) -> Result<(), ValidationError> {
        self.registry.set_color(id, color)
    }

    /// Remove a class, refused while any image still uses it.
    pub fn remove_class(&mut self, id: ClassId) -> Result<ClassDef, ValidationError> {
        self.registry
            .remove(id, self.images.iter().map(|item| &item.store))
    }

    /// Copy the current state for a background export.
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        Arc::new(SessionSnapshot {
            registry: self.registry.clone(),
            items: self.images.clone(),
        })
    }
}
