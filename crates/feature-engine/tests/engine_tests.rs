use approx::assert_relative_eq;
use brep_kernel::{Kernel, KernelId, KernelIntrospect, KernelSolidHandle, MockKernel};
use feature_engine::{
    CombineMode, Document, EngineError, Feature, FeatureError, FeatureKind, HealthStatus,
    PrimitiveShape, ResolvedVia,
};
use feature_engine::{get_health_report, resolve_reference, Body, EngineConfig};
use shape_naming::topology_index::face_index_of;
use shape_naming::ShapeReference;
use tnp_types::{status_codes, FeatureStatus, StatusDetails, Transform};
use uuid::Uuid;

fn box_kind(corner: [f64; 3], size: [f64; 3]) -> FeatureKind {
    FeatureKind::Primitive {
        shape: PrimitiveShape::Box { corner, size },
        mode: CombineMode::Join,
    }
}

fn solid_of(doc: &Document, body_id: Uuid) -> KernelSolidHandle {
    doc.body(body_id)
        .and_then(|b| b.solid.clone())
        .expect("body has a solid")
}

fn top_face(kernel: &MockKernel, solid: &KernelSolidHandle) -> KernelId {
    kernel
        .list_faces(solid)
        .into_iter()
        .filter(|f| {
            kernel
                .face_geometry(*f)
                .ok()
                .and_then(|g| g.normal)
                .map_or(false, |n| n[2] > 0.999)
        })
        .max_by(|a, b| {
            let za = kernel.face_geometry(*a).map_or(f64::MIN, |g| g.center[2]);
            let zb = kernel.face_geometry(*b).map_or(f64::MIN, |g| g.center[2]);
            za.total_cmp(&zb)
        })
        .expect("solid has an upward face")
}

fn push_top(kernel: &MockKernel, solid: &KernelSolidHandle, distance: f64) -> FeatureKind {
    let face = top_face(kernel, solid);
    FeatureKind::PushPull {
        face: ShapeReference::from_face(kernel, face).unwrap(),
        face_index: face_index_of(kernel, solid, face),
        distance,
    }
}

fn chamfer_top_loop(kernel: &MockKernel, solid: &KernelSolidHandle, distance: f64) -> FeatureKind {
    let edges = kernel.face_edges(top_face(kernel, solid));
    FeatureKind::Chamfer {
        edges: edges
            .iter()
            .map(|e| ShapeReference::from_edge(kernel, *e).unwrap())
            .collect(),
        edge_indices: Vec::new(),
        distance,
    }
}

fn volume(doc: &Document, kernel: &MockKernel, body_id: Uuid) -> f64 {
    kernel
        .mass_properties(&solid_of(doc, body_id))
        .unwrap()
        .volume
}

/// Box of 10mm with its top pulled up 2mm.
fn pulled_box(kernel: &mut MockKernel) -> (Document, Uuid) {
    let mut doc = Document::default();
    let body = doc.add_body("Body");
    doc.add_feature(kernel, body, "Base", box_kind([0.0; 3], [10.0; 3]))
        .unwrap();
    let kind = push_top(kernel, &solid_of(&doc, body), 2.0);
    doc.add_feature(kernel, body, "Pull", kind).unwrap();
    (doc, body)
}

// ── Applying Features ──────────────────────────────────────────────────────

#[test]
fn first_box_becomes_the_body_solid() {
    let mut kernel = MockKernel::new();
    let mut doc = Document::default();
    let body = doc.add_body("Body");
    assert_eq!(doc.active_body().map(|b| b.id), Some(body));

    let id = doc
        .add_feature(&mut kernel, body, "Base", box_kind([0.0; 3], [2.0, 3.0, 4.0]))
        .unwrap();

    let b = doc.body(body).unwrap();
    assert_eq!(b.features.len(), 1);
    assert_eq!(b.features[0].id, id);
    assert_eq!(b.features[0].status, FeatureStatus::Ok);
    assert_eq!(b.generation, 1);
    assert_eq!(b.mesh_generation, 1);
    assert_eq!(b.shape_ids().len(), 6 + 12);
    assert_relative_eq!(volume(&doc, &kernel, body), 24.0, epsilon = 1e-9);
    assert_eq!(doc.registry().shape_count(), 6 + 12);
    assert_eq!(doc.registry().operation_count(), 1);
}

#[test]
fn push_pull_grows_the_body() {
    let mut kernel = MockKernel::new();
    let (doc, body) = pulled_box(&mut kernel);
    assert_relative_eq!(volume(&doc, &kernel, body), 1200.0, epsilon = 1e-9);
    let b = doc.body(body).unwrap();
    assert_eq!(b.generation, 2);
    assert_eq!(b.features[1].resolution.by_reference, 1);
}

#[test]
fn second_box_joins_the_first() {
    let mut kernel = MockKernel::new();
    let mut doc = Document::default();
    let body = doc.add_body("Body");
    doc.add_feature(&mut kernel, body, "A", box_kind([0.0; 3], [2.0; 3]))
        .unwrap();
    doc.add_feature(&mut kernel, body, "B", box_kind([1.0; 3], [2.0; 3]))
        .unwrap();
    assert_relative_eq!(volume(&doc, &kernel, body), 15.0, epsilon = 1e-9);
    let op = doc.registry().operations().last().unwrap();
    assert_eq!(op.operation_type.as_str(), "BOOLEAN_FUSE");
}

#[test]
fn chamfer_on_top_loop_keeps_bounding_box() {
    let mut kernel = MockKernel::new();
    let (mut doc, body) = pulled_box(&mut kernel);
    let kind = chamfer_top_loop(&kernel, &solid_of(&doc, body), 0.7);
    doc.add_feature(&mut kernel, body, "Chamfer", kind).unwrap();

    let solid = solid_of(&doc, body);
    assert_eq!(kernel.list_faces(&solid).len(), 10);
    let bbox = kernel.bounding_box(&solid).unwrap();
    assert_relative_eq!(bbox.max[2], 12.0, epsilon = 1e-9);
    assert!(doc.health_report(body).unwrap().is_healthy());
}

#[test]
fn operation_metadata_names_the_feature() {
    let mut kernel = MockKernel::new();
    let (doc, _) = pulled_box(&mut kernel);
    let op = doc.registry().operations().last().unwrap();
    assert_eq!(op.metadata["feature_type"], "PushPull");
    assert_eq!(op.metadata["feature_name"], "Pull");
    assert!(op.metadata.contains_key("kernel_time_ms"));
    assert!(!op.lineage.is_empty(), "push/pull links old faces to new ones");
}

// ── Failed Features ────────────────────────────────────────────────────────

#[test]
fn kernel_failure_leaves_body_untouched() {
    let mut kernel = MockKernel::new();
    let (mut doc, body) = pulled_box(&mut kernel);
    let before = doc.signature(&kernel, body).unwrap();
    let shapes = doc.registry().shape_count();
    let generation = doc.body(body).unwrap().generation;

    let kind = push_top(&kernel, &solid_of(&doc, body), 3.0);
    kernel.fail_next_operation("boom");
    let err = doc.add_feature(&mut kernel, body, "Pull again", kind).unwrap_err();

    match err {
        EngineError::FeatureFailed { feature, source } => {
            assert_eq!(feature.status, FeatureStatus::Error);
            let details = feature.status_details.unwrap();
            assert_eq!(details.code, status_codes::KERNEL_OPERATION_FAILED);
            assert_eq!(source.code(), status_codes::KERNEL_OPERATION_FAILED);
            assert!(feature.status_message.unwrap().contains("boom"));
        }
        other => panic!("expected FeatureFailed, got {other:?}"),
    }

    let b = doc.body(body).unwrap();
    assert_eq!(b.features.len(), 2);
    assert_eq!(b.generation, generation);
    assert!(doc.signature(&kernel, body).unwrap().approx_eq(&before, 1e-9));
    assert_eq!(doc.registry().shape_count(), shapes);
    assert!(!doc.can_redo());
}

#[test]
fn invalid_result_is_a_transaction_regression() {
    let mut kernel = MockKernel::new();
    let (mut doc, body) = pulled_box(&mut kernel);
    let before = doc.signature(&kernel, body).unwrap();

    kernel.corrupt_next_result();
    let err = doc
        .add_feature(
            &mut kernel,
            body,
            "Move",
            FeatureKind::Transform {
                transform: Transform::Translate {
                    vector: [5.0, 0.0, 0.0],
                },
            },
        )
        .unwrap_err();

    let EngineError::FeatureFailed { feature, source } = err else {
        panic!("expected FeatureFailed");
    };
    assert!(matches!(source, FeatureError::Regression { .. }));
    assert_eq!(
        feature.status_details.unwrap().code,
        status_codes::TRANSACTION_REGRESSION
    );
    assert!(doc.signature(&kernel, body).unwrap().approx_eq(&before, 1e-9));
    assert!(kernel.is_valid(&solid_of(&doc, body)));
}

#[test]
fn runaway_chamfer_is_rolled_back_as_scale_drift() {
    let mut kernel = MockKernel::new();
    // Validity checks off so the bounding-box guard is what catches it.
    let mut doc = Document::new(EngineConfig::unchecked());
    let body = doc.add_body("Body");
    doc.add_feature(&mut kernel, body, "Base", box_kind([0.0; 3], [10.0; 3]))
        .unwrap();
    let kind = push_top(&kernel, &solid_of(&doc, body), 2.0);
    doc.add_feature(&mut kernel, body, "Pull", kind).unwrap();

    let solid_before = solid_of(&doc, body);
    let before = doc.signature(&kernel, body).unwrap();
    let shapes = doc.registry().shape_count();
    let operations = doc.registry().operation_count();
    let generation = doc.body(body).unwrap().generation;

    let kind = chamfer_top_loop(&kernel, &solid_before, 0.5);
    kernel.corrupt_next_result();
    let err = doc.add_feature(&mut kernel, body, "Chamfer", kind).unwrap_err();

    let EngineError::FeatureFailed { feature, source } = err else {
        panic!("expected FeatureFailed");
    };
    assert_eq!(source.code(), status_codes::LOCAL_MODIFIER_SCALE_DRIFT);
    assert!(source.is_drift());
    assert_eq!(feature.status, FeatureStatus::Error);
    let details = feature.status_details.unwrap();
    assert_eq!(details.code, status_codes::LOCAL_MODIFIER_SCALE_DRIFT);
    assert!(details.is_drift());
    assert!(feature.status_message.unwrap().contains("shrank"));

    let b = doc.body(body).unwrap();
    assert_eq!(b.features.len(), 2);
    assert_eq!(b.generation, generation);
    assert_eq!(solid_of(&doc, body), solid_before);
    assert!(doc.signature(&kernel, body).unwrap().approx_eq(&before, 1e-12));
    assert_eq!(doc.registry().shape_count(), shapes);
    assert_eq!(doc.registry().operation_count(), operations);
    assert!(doc.health_report(body).unwrap().is_healthy());
    assert!(!doc.can_redo());
}

#[test]
fn cut_on_empty_body_is_invalid_parameter() {
    let mut kernel = MockKernel::new();
    let mut doc = Document::default();
    let body = doc.add_body("Body");
    let err = doc
        .add_feature(
            &mut kernel,
            body,
            "Pocket",
            FeatureKind::Primitive {
                shape: PrimitiveShape::Box {
                    corner: [0.0; 3],
                    size: [1.0; 3],
                },
                mode: CombineMode::Cut,
            },
        )
        .unwrap_err();
    let EngineError::FeatureFailed { source, .. } = err else {
        panic!("expected FeatureFailed");
    };
    assert_eq!(source.code(), status_codes::INVALID_PARAMETER);
    let b = doc.body(body).unwrap();
    assert!(b.solid.is_none());
    assert!(b.features.is_empty());
    assert_eq!(doc.registry().shape_count(), 0);
}

#[test]
fn push_pull_without_solid_fails() {
    let mut kernel = MockKernel::new();
    let scratch = kernel.make_box([0.0; 3], [1.0; 3]).unwrap();
    let kind = push_top(&kernel, &scratch, 1.0);

    let mut doc = Document::default();
    let body = doc.add_body("Body");
    let err = doc.add_feature(&mut kernel, body, "Pull", kind).unwrap_err();
    let EngineError::FeatureFailed { source, .. } = err else {
        panic!("expected FeatureFailed");
    };
    assert!(matches!(source, FeatureError::NoSolid { .. }));
}

#[test]
fn unknown_body_is_reported() {
    let mut kernel = MockKernel::new();
    let mut doc = Document::default();
    let missing = Uuid::new_v4();
    let err = doc
        .add_feature(&mut kernel, missing, "Base", box_kind([0.0; 3], [1.0; 3]))
        .unwrap_err();
    assert!(matches!(err, EngineError::BodyNotFound { id } if id == missing));
}

// ── Reference Resolution ───────────────────────────────────────────────────

#[test]
fn reference_resolves_directly_in_same_solid() {
    let mut kernel = MockKernel::new();
    let (doc, body) = pulled_box(&mut kernel);
    let solid = solid_of(&doc, body);
    let face = top_face(&kernel, &solid);
    let reference = ShapeReference::from_face(&kernel, face).unwrap();
    let resolved = resolve_reference(&kernel, doc.registry(), &solid, &reference, None);
    assert_eq!(resolved, Some((face, ResolvedVia::Reference)));
}

#[test]
fn unresolvable_reference_falls_back_to_index() {
    let mut kernel = MockKernel::new();
    let (doc, body) = pulled_box(&mut kernel);
    let solid = solid_of(&doc, body);

    let far = kernel.make_box([500.0; 3], [10.0; 3]).unwrap();
    let far_top = top_face(&kernel, &far);
    let reference = ShapeReference::from_face(&kernel, far_top).unwrap();

    assert_eq!(
        resolve_reference(&kernel, doc.registry(), &solid, &reference, None),
        None
    );
    let (_, via) =
        resolve_reference(&kernel, doc.registry(), &solid, &reference, Some(0)).unwrap();
    assert_eq!(via, ResolvedVia::Index);
}

#[test]
fn references_survive_upstream_edit() {
    let mut kernel = MockKernel::new();
    let mut doc = Document::default();
    let body = doc.add_body("Body");
    let base = doc
        .add_feature(&mut kernel, body, "Base", box_kind([0.0; 3], [10.0; 3]))
        .unwrap();
    let kind = push_top(&kernel, &solid_of(&doc, body), 2.0);
    doc.add_feature(&mut kernel, body, "Pull", kind).unwrap();
    let kind = chamfer_top_loop(&kernel, &solid_of(&doc, body), 0.7);
    doc.add_feature(&mut kernel, body, "Chamfer", kind).unwrap();

    doc.edit_feature(
        &mut kernel,
        body,
        base,
        box_kind([0.0; 3], [10.0, 10.0, 12.0]),
    )
    .unwrap();

    let solid = solid_of(&doc, body);
    let bbox = kernel.bounding_box(&solid).unwrap();
    assert_relative_eq!(bbox.max[2], 14.0, epsilon = 1e-9);
    assert_eq!(kernel.list_faces(&solid).len(), 10);

    let report = doc.health_report(body).unwrap();
    assert!(report.is_healthy(), "{report:?}");
    assert_eq!(report.broken_total(), 0);
    let b = doc.body(body).unwrap();
    assert!(b.features.iter().all(|f| f.resolution.by_index == 0));
}

// ── Undo / Redo ────────────────────────────────────────────────────────────

#[test]
fn undo_redo_restores_signatures() {
    let mut kernel = MockKernel::new();
    let mut doc = Document::default();
    let body = doc.add_body("Body");
    doc.add_feature(&mut kernel, body, "Base", box_kind([0.0; 3], [40.0, 28.0, 18.0]))
        .unwrap();
    for i in 0..5 {
        let kind = push_top(&kernel, &solid_of(&doc, body), 2.0);
        doc.add_feature(&mut kernel, body, format!("Pull {}", i + 1), kind)
            .unwrap();
    }
    let before_chamfer = doc.signature(&kernel, body).unwrap();
    let shapes_before = doc.registry().shape_count();

    let kind = chamfer_top_loop(&kernel, &solid_of(&doc, body), 0.7);
    doc.add_feature(&mut kernel, body, "Chamfer", kind).unwrap();
    let after_chamfer = doc.signature(&kernel, body).unwrap();
    let shapes_after = doc.registry().shape_count();
    assert_eq!(after_chamfer.face_count, 10);

    doc.undo(&mut kernel).unwrap();
    assert!(doc.signature(&kernel, body).unwrap().approx_eq(&before_chamfer, 1e-6));
    assert_eq!(doc.registry().shape_count(), shapes_before);
    assert_eq!(doc.body(body).unwrap().features.len(), 6);

    doc.redo(&mut kernel).unwrap();
    assert!(doc.signature(&kernel, body).unwrap().approx_eq(&after_chamfer, 1e-6));
    assert_eq!(doc.registry().shape_count(), shapes_after);

    doc.undo(&mut kernel).unwrap();
    doc.redo(&mut kernel).unwrap();
    assert!(doc.signature(&kernel, body).unwrap().approx_eq(&after_chamfer, 1e-6));
    assert_eq!(doc.registry().shape_count(), shapes_after);
    assert_eq!(doc.health_report(body).unwrap().broken_total(), 0);
}

#[test]
fn undo_on_empty_history_errors() {
    let mut kernel = MockKernel::new();
    let mut doc = Document::default();
    assert!(matches!(doc.undo(&mut kernel), Err(EngineError::NothingToUndo)));
    assert!(matches!(doc.redo(&mut kernel), Err(EngineError::NothingToRedo)));
}

#[test]
fn new_command_clears_redo() {
    let mut kernel = MockKernel::new();
    let (mut doc, body) = pulled_box(&mut kernel);
    doc.undo(&mut kernel).unwrap();
    assert!(doc.can_redo());
    let kind = push_top(&kernel, &solid_of(&doc, body), 1.0);
    doc.add_feature(&mut kernel, body, "Pull small", kind).unwrap();
    assert!(!doc.can_redo());
    assert_relative_eq!(volume(&doc, &kernel, body), 1100.0, epsilon = 1e-9);
}

#[test]
fn remove_last_feature_is_undoable() {
    let mut kernel = MockKernel::new();
    let (mut doc, body) = pulled_box(&mut kernel);
    let removed = doc.remove_last_feature(&mut kernel, body).unwrap();
    assert_eq!(removed.name, "Pull");
    assert_relative_eq!(volume(&doc, &kernel, body), 1000.0, epsilon = 1e-9);

    doc.undo(&mut kernel).unwrap();
    let b = doc.body(body).unwrap();
    assert_eq!(b.features.len(), 2);
    assert_eq!(b.features[1].id, removed.id);
    assert_relative_eq!(volume(&doc, &kernel, body), 1200.0, epsilon = 1e-9);
}

#[test]
fn undoing_transform_applies_inverse() {
    let mut kernel = MockKernel::new();
    let mut doc = Document::default();
    let body = doc.add_body("Body");
    doc.add_feature(&mut kernel, body, "Base", box_kind([0.0; 3], [2.0; 3]))
        .unwrap();
    doc.add_feature(
        &mut kernel,
        body,
        "Move",
        FeatureKind::Transform {
            transform: Transform::Translate {
                vector: [10.0, 0.0, 0.0],
            },
        },
    )
    .unwrap();
    let mesh_generation = doc.body(body).unwrap().mesh_generation;

    doc.undo(&mut kernel).unwrap();

    let b = doc.body(body).unwrap();
    assert_eq!(b.features.len(), 1);
    // a replay would bump twice: once for the feature, once for the rebuild
    assert_eq!(b.mesh_generation, mesh_generation + 1);
    let bbox = kernel.bounding_box(&solid_of(&doc, body)).unwrap();
    assert_relative_eq!(bbox.min[0], 0.0, epsilon = 1e-9);
    assert_eq!(doc.registry().operation_count(), 1);
    let owner = b.features[0].id;
    assert_eq!(doc.registry().shapes_of_feature(owner).len(), 6 + 12);
}

// ── Editing ────────────────────────────────────────────────────────────────

#[test]
fn edit_rebuilds_and_undo_restores() {
    let mut kernel = MockKernel::new();
    let (mut doc, body) = pulled_box(&mut kernel);
    let pull = doc.body(body).unwrap().features[1].clone();
    let FeatureKind::PushPull {
        face, face_index, ..
    } = pull.kind.clone()
    else {
        panic!("second feature is a push/pull");
    };

    doc.edit_feature(
        &mut kernel,
        body,
        pull.id,
        FeatureKind::PushPull {
            face,
            face_index,
            distance: 4.0,
        },
    )
    .unwrap();
    assert_relative_eq!(volume(&doc, &kernel, body), 1400.0, epsilon = 1e-9);

    doc.undo(&mut kernel).unwrap();
    assert_relative_eq!(volume(&doc, &kernel, body), 1200.0, epsilon = 1e-9);
    assert_eq!(doc.body(body).unwrap().features[1].kind, pull.kind);
}

#[test]
fn edit_that_breaks_history_rolls_back() {
    let mut kernel = MockKernel::new();
    let (mut doc, body) = pulled_box(&mut kernel);
    let before = doc.signature(&kernel, body).unwrap();
    let base = doc.body(body).unwrap().features[0].clone();

    let err = doc
        .edit_feature(
            &mut kernel,
            body,
            base.id,
            FeatureKind::Primitive {
                shape: PrimitiveShape::Box {
                    corner: [0.0; 3],
                    size: [10.0; 3],
                },
                mode: CombineMode::Cut,
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::EditRolledBack { ref name, .. } if name == "Base"));

    let b = doc.body(body).unwrap();
    assert_eq!(b.features[0].kind, base.kind);
    assert!(b.features.iter().all(|f| f.status == FeatureStatus::Ok));
    assert!(b.error_feature_ids.is_empty());
    assert!(doc.signature(&kernel, body).unwrap().approx_eq(&before, 1e-9));
    assert!(!doc.can_redo());
}

#[test]
fn edit_of_unknown_feature_errors() {
    let mut kernel = MockKernel::new();
    let (mut doc, body) = pulled_box(&mut kernel);
    let missing = Uuid::new_v4();
    let err = doc
        .edit_feature(&mut kernel, body, missing, box_kind([0.0; 3], [1.0; 3]))
        .unwrap_err();
    assert!(matches!(err, EngineError::FeatureNotFound { id } if id == missing));
}

// ── Rebuild ────────────────────────────────────────────────────────────────

#[test]
fn rebuild_keeps_failed_features_in_history() {
    let mut kernel = MockKernel::new();
    let stray = kernel.make_box([500.0; 3], [10.0; 3]).unwrap();
    let lost = FeatureKind::PushPull {
        face: ShapeReference::from_face(&kernel, top_face(&kernel, &stray)).unwrap(),
        face_index: None,
        distance: 1.0,
    };

    let base = Feature::new("Base", box_kind([0.0; 3], [10.0; 3]));
    let broken = Feature::new("Lost pull", lost);
    let extra = Feature::new("Extra", box_kind([20.0, 0.0, 0.0], [5.0, 10.0, 10.0]));
    let broken_id = broken.id;
    let body = Body::with_features(Uuid::new_v4(), "Loaded", vec![base, broken, extra]);
    let body_id = body.id;
    let mut doc = Document::from_bodies(vec![body], Some(body_id), EngineConfig::default());

    let outcomes = doc.rebuild_all(&mut kernel);
    assert_eq!(outcomes.len(), 1);
    let (_, outcome) = &outcomes[0];
    assert_eq!(outcome.applied, 2);
    assert_eq!(outcome.failed, vec![broken_id]);
    assert!(outcome.drifted.is_empty());

    let b = doc.body(body_id).unwrap();
    assert_eq!(b.features.len(), 3);
    assert!(b.error_feature_ids.contains(&broken_id));
    let failed = b.feature(broken_id).unwrap();
    assert_eq!(failed.status, FeatureStatus::Error);
    assert_eq!(
        failed.status_details.as_ref().unwrap().code,
        status_codes::REFERENCE_UNRESOLVED
    );
    assert_relative_eq!(volume(&doc, &kernel, body_id), 1500.0, epsilon = 1e-9);

    let report = doc.health_report(body_id).unwrap();
    assert_eq!(report.features[1].status, HealthStatus::Broken);
    assert_eq!(report.features[1].broken_count, 1);
    assert_eq!(report.features[0].status, HealthStatus::Ok);
    assert!(!report.is_healthy());
}

#[test]
fn rebuild_is_repeatable() {
    let mut kernel = MockKernel::new();
    let (mut doc, body) = pulled_box(&mut kernel);
    let before = doc.signature(&kernel, body).unwrap();
    let shapes = doc.registry().shape_count();
    let ops = doc.registry().operation_count();

    for _ in 0..3 {
        let outcome = doc.rebuild_body(&mut kernel, body).unwrap();
        assert_eq!(outcome.applied, 2);
        assert!(outcome.failed.is_empty());
    }
    assert!(doc.signature(&kernel, body).unwrap().approx_eq(&before, 1e-9));
    assert_eq!(doc.registry().shape_count(), shapes);
    assert_eq!(doc.registry().operation_count(), ops);
}

// ── Health Report ──────────────────────────────────────────────────────────

#[test]
fn drift_code_marks_resolvable_feature_broken() {
    let mut kernel = MockKernel::new();
    let (mut doc, body) = pulled_box(&mut kernel);
    let kind = chamfer_top_loop(&kernel, &solid_of(&doc, body), 0.5);
    doc.add_feature(&mut kernel, body, "Chamfer", kind).unwrap();
    assert!(doc.health_report(body).unwrap().is_healthy());

    let mut drifted = doc.body(body).unwrap().clone();
    let chamfer = &mut drifted.features[2];
    assert_eq!(chamfer.status, FeatureStatus::Ok);
    assert_eq!(chamfer.resolution.unresolved, 0);
    assert_eq!(chamfer.resolution.by_index, 0);
    chamfer.status_details = Some(StatusDetails::new(
        status_codes::SELF_HEAL_ROLLBACK_GEOMETRY_DRIFT,
        "restored after drift",
    ));

    let report = get_health_report(&drifted);
    let statuses: Vec<HealthStatus> = report.features.iter().map(|f| f.status).collect();
    assert_eq!(
        statuses,
        [HealthStatus::Ok, HealthStatus::Ok, HealthStatus::Broken]
    );
    assert_eq!(report.features[2].broken_count, 0);
    assert!(!report.is_healthy());

    // Codes that are not drift leave an Ok feature healthy.
    drifted.features[2].status_details =
        Some(StatusDetails::new(status_codes::INVALID_PARAMETER, "stale"));
    assert!(get_health_report(&drifted).is_healthy());
}

// ── Serialization ──────────────────────────────────────────────────────────

#[test]
fn feature_json_is_tagged_and_skips_runtime_state() {
    let mut kernel = MockKernel::new();
    let (doc, body) = pulled_box(&mut kernel);
    let pull = doc.body(body).unwrap().features[1].clone();

    let json = serde_json::to_value(&pull).unwrap();
    assert_eq!(json["kind"]["type"], "PushPull");
    assert_eq!(json["status"], "OK");
    assert!(json.get("resolution").is_none());

    let back: Feature = serde_json::from_value(json).unwrap();
    assert_eq!(back.id, pull.id);
    assert_eq!(back.kind, pull.kind);
    assert_eq!(back.resolution.by_reference, 0);
}
