use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use approx::assert_relative_eq;
use brep_kernel::{Kernel, KernelId, KernelIntrospect, KernelSolidHandle, MockKernel, RenderMesh};
use feature_engine::{CombineMode, Document, EngineConfig, FeatureKind, PrimitiveShape};
use file_format::{
    load_project, open_project, save_project, spawn_stl_export, spawn_stl_export_with_cancel,
    write_binary_stl, ExportError, ExportEvent, LoadError, ProjectMetadata, FORMAT_ID,
    FORMAT_VERSION,
};
use shape_naming::topology_index::face_index_of;
use shape_naming::ShapeReference;
use uuid::Uuid;

// ── Helper Functions ─────────────────────────────────────────────────────

fn box_kind(corner: [f64; 3], size: [f64; 3]) -> FeatureKind {
    FeatureKind::Primitive {
        shape: PrimitiveShape::Box { corner, size },
        mode: CombineMode::Join,
    }
}

fn solid_of(doc: &Document, body: Uuid) -> KernelSolidHandle {
    doc.body(body)
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

fn volume(doc: &Document, kernel: &MockKernel, body: Uuid) -> f64 {
    kernel
        .mass_properties(&solid_of(doc, body))
        .unwrap()
        .volume
}

/// 10mm box with two 2mm pulls on top.
fn sample_document(kernel: &mut MockKernel) -> (Document, Uuid) {
    let mut doc = Document::default();
    let body = doc.add_body("Part");
    doc.add_feature(kernel, body, "Base", box_kind([0.0; 3], [10.0; 3]))
        .unwrap();
    for name in ["Pull 1", "Pull 2"] {
        let kind = push_top(kernel, &solid_of(&doc, body), 2.0);
        doc.add_feature(kernel, body, name, kind).unwrap();
    }
    (doc, body)
}

fn box_mesh() -> RenderMesh {
    let mut kernel = MockKernel::new();
    let solid = kernel.make_box([0.0; 3], [1.0, 2.0, 3.0]).unwrap();
    kernel.tessellate(&solid, 0.1).unwrap()
}

fn triangle_mesh(indices: Vec<u32>) -> RenderMesh {
    RenderMesh {
        vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        normals: vec![0.0, 0.0, 1.0].repeat(3),
        indices,
        face_ranges: Vec::new(),
    }
}

// ── Save / Load ──────────────────────────────────────────────────────────

#[test]
fn save_writes_format_header_and_recipe_only() {
    let mut kernel = MockKernel::new();
    let (doc, _) = sample_document(&mut kernel);
    let json = save_project(&doc, &ProjectMetadata::new("Bracket")).unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["format"], FORMAT_ID);
    assert_eq!(value["version"], FORMAT_VERSION);
    assert_eq!(value["project"]["name"], "Bracket");
    let features = value["document"]["bodies"][0]["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);
    assert_eq!(features[1]["kind"]["type"], "PushPull");
    assert!(features[1].get("resolution").is_none());
    assert!(value["document"]["bodies"][0].get("solid").is_none());
}

#[test]
fn load_round_trips_bodies_and_metadata() {
    let mut kernel = MockKernel::new();
    let (doc, body) = sample_document(&mut kernel);
    let metadata = ProjectMetadata::new("Bracket");
    let json = save_project(&doc, &metadata).unwrap();

    let (data, loaded_meta) = load_project(&json).unwrap();
    assert_eq!(loaded_meta, metadata);
    assert_eq!(data.active_body, Some(body));
    assert_eq!(data.bodies.len(), 1);
    let original = &doc.body(body).unwrap().features;
    let loaded = &data.bodies[0].features;
    assert_eq!(loaded.len(), original.len());
    for (a, b) in original.iter().zip(loaded) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.name, b.name);
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.status, b.status);
    }
}

#[test]
fn metadata_touch_never_precedes_created() {
    let mut metadata = ProjectMetadata::new("Touched");
    let created = metadata.created;
    metadata.touch();
    assert_eq!(metadata.created, created);
    assert!(metadata.modified >= created);
}

// ── Load Errors ──────────────────────────────────────────────────────────

fn saved_value() -> serde_json::Value {
    let mut kernel = MockKernel::new();
    let (doc, _) = sample_document(&mut kernel);
    let json = save_project(&doc, &ProjectMetadata::new("P")).unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn garbage_is_a_parse_error() {
    assert!(matches!(
        load_project("{ not json"),
        Err(LoadError::ParseError(_))
    ));
}

#[test]
fn foreign_format_is_rejected() {
    let mut value = saved_value();
    value["format"] = "something-else".into();
    match load_project(&value.to_string()) {
        Err(LoadError::UnknownFormat(name)) => assert_eq!(name, "something-else"),
        other => panic!("expected UnknownFormat, got {other:?}"),
    }
}

#[test]
fn newer_version_is_rejected() {
    let mut value = saved_value();
    value["version"] = (FORMAT_VERSION + 1).into();
    assert!(matches!(
        load_project(&value.to_string()),
        Err(LoadError::FutureVersion {
            supported_version: FORMAT_VERSION,
            ..
        })
    ));
}

#[test]
fn older_version_without_migration_fails() {
    let mut value = saved_value();
    value["version"] = 0.into();
    assert!(matches!(
        load_project(&value.to_string()),
        Err(LoadError::MigrationFailed { from: 0, .. })
    ));
}

#[test]
fn duplicate_body_ids_are_invalid() {
    let mut value = saved_value();
    let body = value["document"]["bodies"][0].clone();
    value["document"]["bodies"].as_array_mut().unwrap().push(body);
    assert!(matches!(
        load_project(&value.to_string()),
        Err(LoadError::InvalidDocument(_))
    ));
}

#[test]
fn dangling_active_body_is_invalid() {
    let mut value = saved_value();
    value["document"]["active_body"] = Uuid::new_v4().to_string().into();
    match load_project(&value.to_string()) {
        Err(LoadError::InvalidDocument(msg)) => assert!(msg.contains("active body")),
        other => panic!("expected InvalidDocument, got {other:?}"),
    }
}

// ── Open / Replay ────────────────────────────────────────────────────────

#[test]
fn open_replays_history_on_a_fresh_kernel() {
    let mut kernel = MockKernel::new();
    let (doc, body) = sample_document(&mut kernel);
    let before = doc.signature(&kernel, body).unwrap();
    let json = save_project(&doc, &ProjectMetadata::new("Bracket")).unwrap();

    let mut fresh = MockKernel::new();
    let opened = open_project(&json, &mut fresh, EngineConfig::default()).unwrap();
    assert!(opened.is_clean());
    assert_eq!(opened.rebuilds.len(), 1);
    assert_eq!(opened.rebuilds[0].1.applied, 3);

    let reopened = &opened.document;
    let after = reopened.signature(&fresh, body).unwrap();
    assert!(after.approx_eq(&before, 1e-6));
    assert_relative_eq!(volume(reopened, &fresh, body), 1400.0, epsilon = 1e-9);

    let report = reopened.health_report(body).unwrap();
    assert!(report.is_healthy());
    assert_eq!(report.broken_total(), 0);
    assert!(reopened.registry().shape_count() > 0);
}

#[test]
fn reopened_document_accepts_new_features() {
    let mut kernel = MockKernel::new();
    let (doc, body) = sample_document(&mut kernel);
    let json = save_project(&doc, &ProjectMetadata::new("Bracket")).unwrap();

    let mut fresh = MockKernel::new();
    let mut opened = open_project(&json, &mut fresh, EngineConfig::default()).unwrap();
    let kind = push_top(&fresh, &solid_of(&opened.document, body), 2.0);
    opened
        .document
        .add_feature(&mut fresh, body, "Pull 3", kind)
        .unwrap();
    assert_relative_eq!(
        volume(&opened.document, &fresh, body),
        1600.0,
        epsilon = 1e-9
    );
    assert!(opened.document.can_undo());
}

#[test]
fn empty_document_round_trips() {
    let doc = Document::default();
    let json = save_project(&doc, &ProjectMetadata::new("Empty")).unwrap();
    let mut kernel = MockKernel::new();
    let opened = open_project(&json, &mut kernel, EngineConfig::default()).unwrap();
    assert!(opened.document.bodies.is_empty());
    assert!(opened.rebuilds.is_empty());
    assert!(opened.is_clean());
}

// ── STL Export ───────────────────────────────────────────────────────────

#[test]
fn binary_stl_layout() {
    let mesh = box_mesh();
    let bytes = write_binary_stl(&mesh, "box", None, |_| {}).unwrap();
    assert_eq!(bytes.len(), 84 + 12 * 50);
    assert!(bytes[..80].starts_with(b"binary STL: box"));
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]);
    assert_eq!(count, 12);

    for tri in 0..12 {
        let base = 84 + tri * 50;
        let read = |offset: usize| {
            let at = base + offset;
            f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let normal = [read(0), read(4), read(8)];
        let len = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        assert_relative_eq!(len, 1.0, epsilon = 1e-5);
        assert_eq!(&bytes[base + 48..base + 50], &[0, 0]);
    }
}

#[test]
fn long_names_are_truncated_to_the_header() {
    let mesh = box_mesh();
    let name = "x".repeat(200);
    let bytes = write_binary_stl(&mesh, &name, None, |_| {}).unwrap();
    assert_eq!(bytes.len(), 84 + 12 * 50);
}

#[test]
fn progress_ends_at_one_hundred() {
    let mesh = box_mesh();
    let mut seen = Vec::new();
    write_binary_stl(&mesh, "box", None, |p| seen.push(p)).unwrap();
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn empty_mesh_is_rejected() {
    let mesh = triangle_mesh(Vec::new());
    assert_eq!(
        write_binary_stl(&mesh, "e", None, |_| {}),
        Err(ExportError::EmptyMesh)
    );
}

#[test]
fn out_of_range_index_is_rejected() {
    let mesh = triangle_mesh(vec![0, 1, 9]);
    assert_eq!(
        write_binary_stl(&mesh, "bad", None, |_| {}),
        Err(ExportError::IndexOutOfRange {
            index: 9,
            vertex_count: 3
        })
    );
}

#[test]
fn set_flag_cancels_inline_export() {
    let mesh = box_mesh();
    let flag = AtomicBool::new(true);
    assert_eq!(
        write_binary_stl(&mesh, "box", Some(&flag), |_| {}),
        Err(ExportError::Cancelled)
    );
}

// ── Background Export ────────────────────────────────────────────────────

#[test]
fn worker_reports_progress_then_bytes() {
    let mesh = Arc::new(box_mesh());
    let expected = write_binary_stl(&mesh, "box", None, |_| {}).unwrap();

    let job = spawn_stl_export(Arc::clone(&mesh), "box");
    let events: Vec<ExportEvent> = job.events.iter().collect();
    assert_eq!(events.last(), Some(&ExportEvent::Completed(expected)));
    assert!(events.contains(&ExportEvent::Progress(100)));
    assert_eq!(
        events
            .iter()
            .filter(|e| !matches!(e, ExportEvent::Progress(_)))
            .count(),
        1
    );
}

#[test]
fn worker_wait_returns_bytes() {
    let job = spawn_stl_export(Arc::new(box_mesh()), "box");
    assert_eq!(job.wait().unwrap().len(), 84 + 12 * 50);
}

#[test]
fn preset_cancel_flag_cancels_worker() {
    let flag = Arc::new(AtomicBool::new(true));
    let job = spawn_stl_export_with_cancel(Arc::new(box_mesh()), "box", flag);
    let events: Vec<ExportEvent> = job.events.iter().collect();
    assert_eq!(events, vec![ExportEvent::Cancelled]);
}

#[test]
fn worker_failure_carries_the_reason() {
    let job = spawn_stl_export(Arc::new(triangle_mesh(Vec::new())), "empty");
    match job.wait() {
        Err(ExportError::Failed(reason)) => assert!(reason.contains("no triangles")),
        other => panic!("expected Failed, got {other:?}"),
    }
}
