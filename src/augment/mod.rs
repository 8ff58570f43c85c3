//! Augmentation engine.
//!
//! An [`AugmentationSpec`] is turned into a [`VariantPlan`]: a finite list of
//! transform combinations. Running the plan over an image and its
//! [`ShapeStore`] yields [`Variant`]s lazily; calling
//! [`VariantPlan::variants`] again restarts the sequence from the top.
//!
//! Geometric variants are the cross product of the rotation axis, the
//! horizontal flip axis and the vertical flip axis, always applied in that
//! order (rotation first, then flips). Each enabled photometric parameter
//! contributes one extra variant on top of the original geometry, or one
//! per geometric variant in [`CombinationMode::Full`].

mod geometry;
mod photometric;

pub use geometry::{GeometricOp, apply_all, apply_all_to_store};
pub use photometric::PhotometricOp;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::model::ShapeStore;

/// Clockwise rotation choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "90")]
    Cw90,
    #[serde(rename = "180")]
    Cw180,
    #[serde(rename = "270")]
    Cw270,
}

impl Rotation {
    /// Label used in variant names.
    pub fn label(&self) -> &'static str {
        match self {
            Rotation::None => "original",
            Rotation::Cw90 => "rot90",
            Rotation::Cw180 => "rot180",
            Rotation::Cw270 => "rot270",
        }
    }

    /// Parse `none`, `90`, `180` or `270`.
    pub fn from_degrees(value: &str) -> Option<Self> {
        match value.trim() {
            "none" | "0" => Some(Rotation::None),
            "90" => Some(Rotation::Cw90),
            "180" => Some(Rotation::Cw180),
            "270" => Some(Rotation::Cw270),
            _ => None,
        }
    }
}

/// How photometric variants combine with geometric ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinationMode {
    /// One photometric variant each, on the original geometry
    #[default]
    Additive,
    /// Every photometric variant on every geometric variant
    Full,
}

/// Which augmentations to generate.
///
/// A field at its default value is disabled. Every enabled field adds
/// variants to the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AugmentationSpec {
    pub rotate: Rotation,
    /// Sweep every rotation (90, 180, 270) instead of just `rotate`
    pub all_rotations: bool,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    /// Added to each RGB channel; 0 disables
    pub brightness_delta: f32,
    /// 1 disables
    pub contrast_factor: f32,
    /// Gaussian sigma; 0 disables
    pub blur_radius: f32,
    /// Gaussian noise sigma; 0 disables
    pub noise_sigma: f32,
    /// 1 disables
    pub saturation_factor: f32,
    /// 1 disables
    pub sharpness_factor: f32,
    pub mode: CombinationMode,
    /// Seed for the noise generator
    pub seed: u64,
}

impl Default for AugmentationSpec {
    fn default() -> Self {
        Self {
            rotate: Rotation::None,
            all_rotations: false,
            flip_horizontal: false,
            flip_vertical: false,
            brightness_delta: 0.0,
            contrast_factor: 1.0,
            blur_radius: 0.0,
            noise_sigma: 0.0,
            saturation_factor: 1.0,
            sharpness_factor: 1.0,
            mode: CombinationMode::Additive,
            seed: 0,
        }
    }
}

impl AugmentationSpec {
    /// Whether any field is enabled.
    pub fn is_enabled(&self) -> bool {
        VariantPlan::new(self).len() > 1
    }

    fn rotation_axis(&self) -> Vec<Rotation> {
        if self.all_rotations {
            vec![
                Rotation::None,
                Rotation::Cw90,
                Rotation::Cw180,
                Rotation::Cw270,
            ]
        } else if self.rotate != Rotation::None {
            vec![Rotation::None, self.rotate]
        } else {
            vec![Rotation::None]
        }
    }

    fn photometric_ops(&self) -> Vec<PhotometricOp> {
        let mut ops = Vec::new();
        if self.brightness_delta != 0.0 {
            ops.push(PhotometricOp::Brightness(self.brightness_delta));
        }
        if self.contrast_factor != 1.0 {
            ops.push(PhotometricOp::Contrast(self.contrast_factor));
        }
        if self.blur_radius > 0.0 {
            ops.push(PhotometricOp::Blur(self.blur_radius));
        }
        if self.noise_sigma > 0.0 {
            ops.push(PhotometricOp::Noise {
                sigma: self.noise_sigma,
                seed: self.seed,
            });
        }
        if self.saturation_factor != 1.0 {
            ops.push(PhotometricOp::Saturation(self.saturation_factor));
        }
        if self.sharpness_factor != 1.0 {
            ops.push(PhotometricOp::Sharpness(self.sharpness_factor));
        }
        ops
    }
}

/// One transform combination in a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    /// Human-readable name, e.g. `rot90+flipH+bright+1`
    pub label: String,
    /// Geometric ops in application order
    pub geometric: Vec<GeometricOp>,
    pub photometric: Option<PhotometricOp>,
}

impl Combination {
    /// Whether this is the untouched original.
    pub fn is_identity(&self) -> bool {
        self.geometric.is_empty() && self.photometric.is_none()
    }

    /// Transform shapes only.
    pub fn apply_to_store(&self, store: &ShapeStore) -> ShapeStore {
        apply_all_to_store(&self.geometric, store)
    }

    /// Transform pixels and shapes together.
    pub fn apply(&self, image: &DynamicImage, store: &ShapeStore) -> Variant {
        let (image, store) = apply_all(&self.geometric, image, store);
        let image = match &self.photometric {
            Some(op) => op.apply(&image),
            None => image,
        };
        Variant {
            label: self.label.clone(),
            image,
            store,
        }
    }
}

/// One augmented image with its transformed shapes.
#[derive(Debug, Clone)]
pub struct Variant {
    pub label: String,
    pub image: DynamicImage,
    /// Shapes sized to `image`
    pub store: ShapeStore,
}

/// Finite, restartable list of transform combinations.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPlan {
    combinations: Vec<Combination>,
}

impl VariantPlan {
    /// Build the plan for a spec. The first combination is always `original`.
    pub fn new(spec: &AugmentationSpec) -> Self {
        let flips_h: &[bool] = if spec.flip_horizontal {
            &[false, true]
        } else {
            &[false]
        };
        let flips_v: &[bool] = if spec.flip_vertical {
            &[false, true]
        } else {
            &[false]
        };

        let mut geometric = Vec::new();
        for rotation in spec.rotation_axis() {
            for &flip_h in flips_h {
                for &flip_v in flips_v {
                    let mut ops = Vec::new();
                    if rotation != Rotation::None {
                        ops.push(GeometricOp::Rotate(rotation));
                    }
                    if flip_h {
                        ops.push(GeometricOp::FlipHorizontal);
                    }
                    if flip_v {
                        ops.push(GeometricOp::FlipVertical);
                    }
                    geometric.push(ops);
                }
            }
        }

        let photometric = spec.photometric_ops();
        let mut combinations: Vec<Combination> =
            geometric.iter().map(|ops| combination(ops, None)).collect();

        match spec.mode {
            CombinationMode::Additive => {
                combinations.extend(photometric.iter().map(|op| combination(&[], Some(*op))));
            }
            CombinationMode::Full => {
                for ops in &geometric {
                    for op in &photometric {
                        combinations.push(combination(ops, Some(*op)));
                    }
                }
            }
        }

        Self { combinations }
    }

    /// Number of variants, including the original.
    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.combinations.iter().map(|c| c.label.as_str())
    }

    /// Lazily produce every variant of `image` and `store`.
    ///
    /// `store` must describe `image` (same dimensions).
    pub fn variants<'a>(
        &'a self,
        image: &'a DynamicImage,
        store: &'a ShapeStore,
    ) -> impl Iterator<Item = Variant> + 'a {
        self.combinations
            .iter()
            .map(move |combination| combination.apply(image, store))
    }
}

fn combination(geometric: &[GeometricOp], photometric: Option<PhotometricOp>) -> Combination {
    let mut parts: Vec<String> = geometric.iter().map(|op| op.label().to_string()).collect();
    if let Some(op) = &photometric {
        parts.push(op.label());
    }
    let label = if parts.is_empty() {
        "original".to_string()
    } else {
        parts.join("+")
    };
    Combination {
        label,
        geometric: geometric.to_vec(),
        photometric,
    }
}

/// Run a spec over one image and its shapes.
pub fn augment(spec: &AugmentationSpec, image: &DynamicImage, store: &ShapeStore) -> Vec<Variant> {
    let plan = VariantPlan::new(spec);
    log::debug!(
        "Augmenting {}x{} image into {} variants",
        store.width(),
        store.height(),
        plan.len()
    );
    plan.variants(image, store).collect()
}
