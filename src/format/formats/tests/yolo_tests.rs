//! Tests for the YOLO format.

use super::{WATER, item, read_string, reference_store, registry};
use crate::format::formats::RectEntry;
use crate::format::formats::yolo::format_line;
use crate::format::{ConfigError, ExportError, ExportFormat, export};
use crate::model::{ClassRegistry, ShapeStore};

fn fields(line: &str) -> Vec<f64> {
    line.split_whitespace()
        .skip(1)
        .map(|v| v.parse().unwrap())
        .collect()
}

#[test]
fn test_yolo_reference_bbox() {
    let dir = tempfile::tempdir().unwrap();
    let result = export(
        ExportFormat::Yolo,
        &[item("photo.jpg", reference_store())],
        &registry(),
        dir.path(),
    )
    .unwrap();

    let labels = dir.path().join("labels").join("photo.txt");
    let classes = dir.path().join("classes.txt");
    assert_eq!(result.written, vec![labels.clone(), classes.clone()]);

    assert_eq!(
        read_string(&labels),
        "0 0.068750 0.214815 0.033333 0.059259\n"
    );
    assert_eq!(read_string(&classes), "Class 1\n");
}

#[test]
fn test_yolo_class_order_is_first_appearance() {
    let registry = registry();
    let mut first = ShapeStore::new(100, 100);
    first.add_bbox(&registry, 0, 0, 10, 10, WATER).unwrap();
    first.add_bbox(&registry, 20, 20, 10, 10, 0).unwrap();
    let mut second = ShapeStore::new(100, 100);
    second.add_bbox(&registry, 40, 40, 20, 20, 0).unwrap();

    let dir = tempfile::tempdir().unwrap();
    export(
        ExportFormat::Yolo,
        &[item("a.png", first), item("b.png", second)],
        &registry,
        dir.path(),
    )
    .unwrap();

    assert_eq!(read_string(&dir.path().join("classes.txt")), "Water\nClass 1\n");

    let a = read_string(&dir.path().join("labels").join("a.txt"));
    let indices: Vec<&str> = a.lines().map(|l| &l[..1]).collect();
    assert_eq!(indices, vec!["0", "1"]);

    let b = read_string(&dir.path().join("labels").join("b.txt"));
    assert!(b.starts_with("1 "));
}

#[test]
fn test_yolo_unused_classes_not_listed() {
    let registry = registry();
    let mut store = ShapeStore::new(50, 50);
    store.add_bbox(&registry, 0, 0, 10, 10, WATER).unwrap();

    let dir = tempfile::tempdir().unwrap();
    export(
        ExportFormat::Yolo,
        &[item("a.png", store)],
        &registry,
        dir.path(),
    )
    .unwrap();

    assert_eq!(read_string(&dir.path().join("classes.txt")), "Water\n");
}

#[test]
fn test_yolo_polygon_uses_bounding_rect() {
    let registry = registry();
    let mut store = ShapeStore::new(100, 50);
    store
        .add_polygon(&registry, &[(10, 10), (30, 10), (30, 40), (10, 40)], 0)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let result = export(
        ExportFormat::Yolo,
        &[item("a.png", store)],
        &registry,
        dir.path(),
    )
    .unwrap();

    assert_eq!(result.warnings.len(), 1);
    assert_eq!(
        read_string(&dir.path().join("labels").join("a.txt")),
        "0 0.200000 0.500000 0.200000 0.600000\n"
    );
}

#[test]
fn test_yolo_fields_stay_normalized_at_edges() {
    let rect = RectEntry {
        x: 1856,
        y: 1016,
        width: 64,
        height: 64,
        class_id: 0,
    };
    let line = format_line(3, &rect, (1920, 1080));
    assert!(line.starts_with("3 "));
    assert!(line.ends_with('\n'));
    for value in fields(&line) {
        assert!((0.0..=1.0).contains(&value), "{} out of range", value);
    }

    let full = RectEntry {
        x: 0,
        y: 0,
        width: 640,
        height: 480,
        class_id: 0,
    };
    assert_eq!(
        format_line(0, &full, (640, 480)),
        "0 0.500000 0.500000 1.000000 1.000000\n"
    );
}

#[test]
fn test_yolo_empty_image_writes_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    export(
        ExportFormat::Yolo,
        &[item("empty.png", ShapeStore::new(10, 10))],
        &registry(),
        dir.path(),
    )
    .unwrap();

    assert_eq!(read_string(&dir.path().join("labels").join("empty.txt")), "");
    assert_eq!(read_string(&dir.path().join("classes.txt")), "");
}

#[test]
fn test_yolo_empty_registry_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = export(
        ExportFormat::Yolo,
        &[item("a.png", ShapeStore::new(10, 10))],
        &ClassRegistry::new(),
        dir.path(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Config(ConfigError::EmptyRegistry { .. })
    ));
}
