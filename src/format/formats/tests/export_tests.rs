//! Tests for the exporter: validation, failure isolation, cancellation,
//! augmentation variants and crops.

use std::cell::RefCell;

use super::{FailingSink, WATER, item, item_with_pixels, read_json, registry};
use crate::augment::{AugmentationSpec, Rotation};
use crate::format::formats::coco::COCO_FILE_NAME;
use crate::format::{
    ConfigError, CropMode, ExportError, ExportFormat, ExportOptions, Exporter, ImageMeta,
};
use crate::model::{ShapeStore, TileLabel};
use crate::task::CancelToken;

fn small_store(x: i64) -> ShapeStore {
    let registry = registry();
    let mut store = ShapeStore::new(100, 100);
    store.add_bbox(&registry, x, 10, 20, 20, 0).unwrap();
    store
}

fn three_items() -> Vec<crate::format::ExportItem> {
    vec![
        item("a.png", small_store(0)),
        item("b.png", small_store(10)),
        item("c.png", small_store(20)),
    ]
}

#[test]
fn test_failed_image_does_not_stop_export() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let sink = FailingSink {
        fail_on: "b_annotations",
    };
    let result = Exporter::new(ExportFormat::Json, &registry)
        .sink(&sink)
        .run(&three_items(), dir.path())
        .unwrap();

    assert_eq!(result.images_exported, 2);
    assert_eq!(result.failures.len(), 1);
    let failure = &result.failures[0];
    assert_eq!(failure.image.as_deref(), Some("b.png"));
    assert_eq!(
        failure.path.as_deref(),
        Some(dir.path().join("b_annotations.json").as_path())
    );
    assert!(matches!(failure.error, ExportError::Io { .. }));

    assert_eq!(
        result.written,
        vec![
            dir.path().join("a_annotations.json"),
            dir.path().join("c_annotations.json"),
        ]
    );
    assert!(dir.path().join("a_annotations.json").exists());
    assert!(!dir.path().join("b_annotations.json").exists());
    assert!(dir.path().join("c_annotations.json").exists());
}

#[test]
fn test_coco_keeps_images_written_successfully() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let items: Vec<_> = ["a.png", "b.png", "c.png"]
        .iter()
        .enumerate()
        .map(|(i, name)| item_with_pixels(name, small_store(i as i64 * 10)))
        .collect();
    let sink = FailingSink { fail_on: "b.png" };

    let result = Exporter::new(ExportFormat::Coco, &registry)
        .options(ExportOptions {
            write_images: true,
            ..Default::default()
        })
        .sink(&sink)
        .run(&items, dir.path())
        .unwrap();

    assert_eq!(result.failures.len(), 1);
    assert!(matches!(result.failures[0].error, ExportError::Io { .. }));
    assert!(dir.path().join("images").join("a.png").exists());

    let coco = read_json(&dir.path().join(COCO_FILE_NAME));
    let names: Vec<&str> = coco["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["file_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.png", "c.png"]);
    assert_eq!(coco["images"][1]["id"], 2);
    assert_eq!(coco["annotations"].as_array().unwrap().len(), 2);
}

#[test]
fn test_aggregate_write_failure_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let sink = FailingSink {
        fail_on: "classes.txt",
    };
    let result = Exporter::new(ExportFormat::Yolo, &registry)
        .sink(&sink)
        .run(&three_items(), dir.path())
        .unwrap();

    assert_eq!(result.images_exported, 3);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].image, None);
}

#[test]
fn test_cancel_between_images() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let token = CancelToken::new();
    let cancel = token.clone();

    let err = Exporter::new(ExportFormat::Coco, &registry)
        .cancel_token(token)
        .on_progress(move |progress| {
            if progress.completed == 1 {
                cancel.cancel();
            }
        })
        .run(&three_items(), dir.path())
        .unwrap_err();

    match err {
        ExportError::Cancelled { partial } => {
            assert_eq!(partial.images_exported, 1);
            assert!(partial.failures.is_empty());
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert!(!dir.path().join(COCO_FILE_NAME).exists());
}

#[test]
fn test_cancel_keeps_files_already_written() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let token = CancelToken::new();
    let cancel = token.clone();

    let err = Exporter::new(ExportFormat::Json, &registry)
        .cancel_token(token)
        .on_progress(move |progress| {
            if progress.completed == 2 {
                cancel.cancel();
            }
        })
        .run(&three_items(), dir.path())
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(dir.path().join("a_annotations.json").exists());
    assert!(dir.path().join("b_annotations.json").exists());
    assert!(!dir.path().join("c_annotations.json").exists());
}

#[test]
fn test_progress_reported_per_image() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let seen = RefCell::new(Vec::new());

    Exporter::new(ExportFormat::Json, &registry)
        .on_progress(|progress| seen.borrow_mut().push(progress))
        .run(&three_items(), dir.path())
        .unwrap();

    let seen = seen.into_inner();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2].completed, 3);
    assert_eq!(seen[2].total, 3);
    assert_eq!(seen[1].image, "b.png");
}

#[test]
fn test_config_errors_before_io() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();

    let err = Exporter::new(ExportFormat::Json, &registry)
        .run(&[], dir.path())
        .unwrap_err();
    assert!(matches!(err, ExportError::Config(ConfigError::NoImages)));

    let err = Exporter::new(ExportFormat::Json, &registry)
        .options(ExportOptions {
            write_images: true,
            ..Default::default()
        })
        .run(&three_items(), dir.path())
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Config(ConfigError::MissingPixels { .. })
    ));

    let mut mismatched = item_with_pixels("a.png", small_store(0));
    mismatched.store = ShapeStore::new(50, 50);
    let err = Exporter::new(ExportFormat::Json, &registry)
        .run(&[mismatched], dir.path())
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Config(ConfigError::DimensionMismatch { .. })
    ));

    let err = Exporter::new(ExportFormat::Json, &registry)
        .options(ExportOptions {
            crops: CropMode::Tiles(0),
            ..Default::default()
        })
        .run(&[item_with_pixels("a.png", small_store(0))], dir.path())
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Config(ConfigError::InvalidTileSize)
    ));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_unknown_format_name() {
    let err = "tfrecord".parse::<ExportFormat>().unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnknownFormat {
            name: "tfrecord".to_string()
        }
    );
    assert_eq!("Pascal-VOC".parse::<ExportFormat>().unwrap(), ExportFormat::Voc);
    for format in ExportFormat::ALL {
        assert_eq!(format.to_string().parse::<ExportFormat>().unwrap(), format);
    }
}

#[test]
fn test_augmented_variants_are_exported() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let mut store = ShapeStore::new(40, 20);
    store.add_bbox(&registry, 2, 3, 10, 5, 0).unwrap();

    let result = Exporter::new(ExportFormat::Json, &registry)
        .options(ExportOptions {
            augmentation: AugmentationSpec {
                rotate: Rotation::Cw90,
                ..Default::default()
            },
            ..Default::default()
        })
        .run(&[item_with_pixels("photo.jpg", store)], dir.path())
        .unwrap();

    assert_eq!(result.images_exported, 2);
    assert!(dir.path().join("images").join("photo_original.png").exists());
    assert!(dir.path().join("images").join("photo_rot90.png").exists());

    let rotated = read_json(&dir.path().join("photo_rot90_annotations.json"));
    assert_eq!(rotated["image"], "photo_rot90.png");
    assert_eq!(rotated["image_width"], 20);
    assert_eq!(rotated["image_height"], 40);
    assert_eq!(rotated["bboxes"][0]["width"], 5);
    assert_eq!(rotated["bboxes"][0]["height"], 10);

    let saved = image::open(dir.path().join("images").join("photo_rot90.png")).unwrap();
    assert_eq!((saved.width(), saved.height()), (20, 40));
}

#[test]
fn test_written_image_renamed_to_png() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let result = Exporter::new(ExportFormat::Coco, &registry)
        .options(ExportOptions {
            write_images: true,
            ..Default::default()
        })
        .run(&[item_with_pixels("scan.tif", small_store(0))], dir.path())
        .unwrap();

    assert_eq!(result.written[0], dir.path().join("images").join("scan.png"));
    let coco = read_json(&dir.path().join(COCO_FILE_NAME));
    assert_eq!(coco["images"][0]["file_name"], "scan.png");
}

#[test]
fn test_shape_crops() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let mut store = ShapeStore::new(100, 100);
    store.add_bbox(&registry, 10, 10, 20, 30, 0).unwrap();
    store
        .add_polygon(&registry, &[(50, 50), (80, 50), (60, 90)], WATER)
        .unwrap();

    Exporter::new(ExportFormat::Json, &registry)
        .options(ExportOptions {
            crops: CropMode::Shapes,
            ..Default::default()
        })
        .run(&[item_with_pixels("field.png", store)], dir.path())
        .unwrap();

    let crops = dir.path().join("crops");
    let shape = image::open(crops.join("field_shape_1.png")).unwrap();
    assert_eq!((shape.width(), shape.height()), (20, 30));
    let polygon = image::open(crops.join("field_polygon_1.png")).unwrap();
    assert_eq!((polygon.width(), polygon.height()), (41, 51));
}

#[test]
fn test_tile_crops_sorted_by_label() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry();
    let mut store = ShapeStore::new(64, 32);
    let labelled = store.add_bbox(&registry, 32, 0, 32, 32, WATER).unwrap();
    store
        .set_tile_label(
            labelled.value(),
            Some(TileLabel {
                category: "Water".to_string(),
                color: "#0000ff".to_string(),
            }),
        )
        .unwrap();

    let result = Exporter::new(ExportFormat::Json, &registry)
        .options(ExportOptions {
            crops: CropMode::Tiles(32),
            ..Default::default()
        })
        .run(&[item_with_pixels("map.png", store)], dir.path())
        .unwrap();

    let crops = dir.path().join("crops");
    assert!(crops.join("map_tile_r0_c0.png").exists());
    assert!(crops.join("Water").join("map_tile_r0_c1.png").exists());
    assert!(result.failures.is_empty());
}

#[test]
fn test_image_meta_stem() {
    assert_eq!(ImageMeta::new("dir.v2/photo.final.jpg").stem(), "photo.final");
    assert_eq!(ImageMeta::new("noext").stem(), "noext");
}
