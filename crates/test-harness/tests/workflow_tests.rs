//! Tests for the ModelBuilder workflow API.

use approx::assert_relative_eq;
use brep_kernel::{Kernel, KernelIntrospect};
use feature_engine::{CombineMode, EngineError, FeatureKind, PrimitiveShape};
use shape_naming::topology_index::face_index_of;
use shape_naming::ShapeReference;
use test_harness::helpers::extreme_face;
use test_harness::{HarnessError, ModelBuilder};

const UP: [f64; 3] = [0.0, 0.0, 1.0];

#[test]
fn add_box_creates_named_feature() {
    let mut m = ModelBuilder::mock();
    let id = m.add_box("base", [0.0; 3], [10.0; 3]).unwrap();
    assert_eq!(m.feature_count(), 1);
    assert_eq!(m.feature_id("base").unwrap(), id);
    m.assert_volume(1000.0, 1e-9, "box").unwrap();
    m.assert_counts(6, 12, "box").unwrap();
}

#[test]
fn push_pull_by_direction() {
    let mut m = ModelBuilder::mock();
    m.add_box("base", [0.0; 3], [10.0; 3]).unwrap();
    m.push_pull("up", UP, 2.0).unwrap();
    m.push_pull("left", [-1.0, 0.0, 0.0], 1.0).unwrap();
    m.assert_volume(10.0 * 11.0 * 12.0, 1e-9, "pulled").unwrap();
    let bbox = m.signature().unwrap().bbox;
    assert_relative_eq!(bbox.min[0], -1.0, epsilon = 1e-9);
    assert_relative_eq!(bbox.max[2], 12.0, epsilon = 1e-9);
    m.assert_history(
        &[("base", "Primitive"), ("up", "PushPull"), ("left", "PushPull")],
        "history",
    )
    .unwrap();
}

#[test]
fn unknown_name_is_an_error() {
    let m = ModelBuilder::mock();
    assert!(matches!(
        m.feature_id("nope"),
        Err(HarnessError::FeatureNotFound { .. })
    ));
}

#[test]
fn duplicate_name_is_rejected() {
    let mut m = ModelBuilder::mock();
    m.add_box("base", [0.0; 3], [1.0; 3]).unwrap();
    assert!(matches!(
        m.add_box("base", [2.0; 3], [1.0; 3]),
        Err(HarnessError::DuplicateName { .. })
    ));
    assert_eq!(m.feature_count(), 1);
}

#[test]
fn push_pull_without_solid_fails() {
    let mut m = ModelBuilder::mock();
    assert!(matches!(
        m.push_pull("up", UP, 1.0),
        Err(HarnessError::NoSolid)
    ));
}

#[test]
fn engine_errors_surface() {
    let mut m = ModelBuilder::mock();
    m.add_box("base", [0.0; 3], [10.0; 3]).unwrap();
    m.kernel.fail_next_operation("boom");
    match m.push_pull("up", UP, 2.0) {
        Err(HarnessError::Engine(EngineError::FeatureFailed { feature, .. })) => {
            assert!(feature.status_message.unwrap_or_default().contains("boom"));
        }
        other => panic!("expected FeatureFailed, got {other:?}"),
    }
    assert_eq!(m.feature_count(), 1);
    assert!(m.feature_id("up").is_err());
}

#[test]
fn auto_check_catches_index_fallback() {
    let mut m = ModelBuilder::mock().with_auto_check();
    m.add_box("base", [0.0; 3], [10.0; 3]).unwrap();

    // A reference to a face far from the body only resolves by index.
    let stray = m.kernel.make_box([500.0; 3], [10.0; 3]).unwrap();
    let stray_top = extreme_face(&m.kernel, &stray, UP).unwrap();
    let solid = m.solid().unwrap();
    let top = extreme_face(&m.kernel, &solid, UP).unwrap();
    let kind = FeatureKind::PushPull {
        face: ShapeReference::from_face(&m.kernel, stray_top).unwrap(),
        face_index: face_index_of(&m.kernel, &solid, top),
        distance: 2.0,
    };

    match m.add("pull", kind) {
        Err(HarnessError::OracleFailure { oracle, detail }) => {
            assert_eq!(oracle, "body_health");
            assert!(detail.contains("pull"));
        }
        other => panic!("expected OracleFailure, got {other:?}"),
    }
    // The feature itself applied.
    assert_eq!(m.feature_count(), 2);
    assert_eq!(m.health().unwrap().broken_total(), 1);
}

#[test]
fn undo_and_redo_round_trip() {
    let mut m = ModelBuilder::mock();
    m.add_box("base", [0.0; 3], [10.0; 3]).unwrap();
    m.push_pull("up", UP, 2.0).unwrap();
    m.undo().unwrap();
    m.assert_volume(1000.0, 1e-9, "after undo").unwrap();
    m.redo().unwrap();
    m.assert_volume(1200.0, 1e-9, "after redo").unwrap();
    assert!(m.undo().is_ok());
    assert!(m.undo().is_ok());
    assert!(matches!(m.undo(), Err(HarnessError::Engine(_))));
    let ops: Vec<&str> = m.history().iter().map(|(op, _)| op.as_str()).collect();
    assert_eq!(ops, ["Primitive", "PushPull", "Undo", "Redo", "Undo", "Undo"]);
}

#[test]
fn edit_by_name_rebuilds_downstream() {
    let mut m = ModelBuilder::mock();
    m.add_box("base", [0.0; 3], [10.0; 3]).unwrap();
    m.push_pull("up", UP, 2.0).unwrap();

    let base = FeatureKind::Primitive {
        shape: PrimitiveShape::Box {
            corner: [0.0; 3],
            size: [10.0, 10.0, 12.0],
        },
        mode: CombineMode::Join,
    };
    m.edit("base", base).unwrap();
    m.assert_volume(1400.0, 1e-9, "edited").unwrap();
    m.assert_healthy("edited").unwrap();
}

#[test]
fn tessellation_goes_through_the_cache() {
    let mut m = ModelBuilder::mock();
    m.add_box("base", [0.0; 3], [1.0, 2.0, 3.0]).unwrap();
    let first = m.tessellate().unwrap();
    let second = m.tessellate().unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(first.triangle_count(), 12);
    assert_eq!(m.cache.stats().mesh_hits, 1);

    let (_, edges) = m.tessellate_with_edges(0.1).unwrap();
    assert_eq!(edges.unwrap().edge_ranges.len(), 12);
}

#[test]
fn stl_export_matches_mesh() {
    let mut m = ModelBuilder::mock();
    m.add_box("base", [0.0; 3], [1.0; 3]).unwrap();
    let bytes = m.export_stl("cube").unwrap();
    assert_eq!(bytes.len(), 84 + 12 * 50);
}

#[test]
fn reload_keeps_names_and_geometry() {
    let mut m = ModelBuilder::mock();
    m.add_box("base", [0.0; 3], [10.0; 3]).unwrap();
    m.push_pull("up", UP, 2.0).unwrap();
    let before = m.signature().unwrap();

    let reloaded = m.reload().unwrap();
    assert!(reloaded.signature().unwrap().approx_eq(&before, 1e-9));
    assert_eq!(reloaded.feature_id("up").unwrap(), m.feature_id("up").unwrap());
    reloaded.assert_healthy("reloaded").unwrap();
    assert!(!reloaded.doc.can_undo());
    assert_eq!(
        reloaded.kernel.list_faces(&reloaded.solid().unwrap()).len(),
        6
    );
}
