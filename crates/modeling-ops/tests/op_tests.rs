use approx::assert_relative_eq;
use brep_kernel::{Kernel, KernelId, KernelIntrospect, KernelSolidHandle, MockKernel, SplitKeep};
use modeling_ops::diff::{self, TopoSnapshot};
use modeling_ops::{
    execute_boolean, execute_box, execute_chamfer, execute_combine, execute_cylinder,
    execute_extrude, execute_fillet, execute_loft, execute_pattern, execute_push_pull,
    execute_shell, execute_split, execute_sweep, execute_transform, BooleanKind, HistorySource,
    OpError, PatternSpec,
};
use tnp_types::Transform;

fn make_box(kernel: &mut MockKernel, corner: [f64; 3], size: [f64; 3]) -> KernelSolidHandle {
    execute_box(kernel, corner, size).unwrap().handle
}

fn top_face(kernel: &MockKernel, solid: &KernelSolidHandle) -> KernelId {
    kernel
        .list_faces(solid)
        .into_iter()
        .find(|f| {
            kernel
                .face_geometry(*f)
                .ok()
                .and_then(|g| g.normal)
                .map(|n| n[2] > 0.999)
                .unwrap_or(false)
        })
        .expect("box has a top face")
}

fn volume(kernel: &MockKernel, solid: &KernelSolidHandle) -> f64 {
    kernel.mass_properties(solid).unwrap().volume
}

fn square(z: f64) -> Vec<[f64; 3]> {
    vec![[0.0, 0.0, z], [2.0, 0.0, z], [2.0, 3.0, z], [0.0, 3.0, z]]
}

// ── Topology Diff Tests ────────────────────────────────────────────────────

#[test]
fn diff_empty_before_nothing_deleted() {
    let mut kernel = MockKernel::new();
    let handle = make_box(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]);
    let after = diff::snapshot(&kernel, &handle);
    let history = diff::diff(&TopoSnapshot::default(), &after, &[]);
    assert!(history.is_empty(), "no predecessors and no seeds means no lineage");
}

#[test]
fn diff_identical_snapshots_all_modified() {
    let mut kernel = MockKernel::new();
    let handle = make_box(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]);
    let snap = diff::snapshot(&kernel, &handle);
    let history = diff::diff(&snap, &snap, &[]);
    assert_eq!(history.modified.len(), 6 + 12);
    assert!(history.deleted.is_empty());
    for (from, to) in &history.modified {
        assert_eq!(vec![*from], *to, "identical geometry pairs with itself");
    }
}

#[test]
fn snapshot_captures_correct_entity_counts() {
    let mut kernel = MockKernel::new();
    let handle = make_box(&mut kernel, [0.0; 3], [1.0, 2.0, 3.0]);
    let snap = diff::snapshot(&kernel, &handle);
    assert_eq!(snap.faces.len(), 6);
    assert_eq!(snap.edges.len(), 12);
}

#[test]
fn face_similarity_prefers_same_plane() {
    let mut kernel = MockKernel::new();
    let handle = make_box(&mut kernel, [0.0; 3], [4.0, 4.0, 4.0]);
    let snap = diff::snapshot(&kernel, &handle);
    let (_, a) = &snap.faces[0];
    let (_, b) = &snap.faces[1];
    assert_relative_eq!(modeling_ops::face_similarity(a, a), 1.0, epsilon = 1e-12);
    assert!(modeling_ops::face_similarity(a, b) < modeling_ops::face_similarity(a, a));
}

// ── Primitive / Profile Tests ──────────────────────────────────────────────

#[test]
fn box_rejects_non_positive_size() {
    let mut kernel = MockKernel::new();
    let result = execute_box(&mut kernel, [0.0; 3], [1.0, -1.0, 1.0]);
    assert!(matches!(result, Err(OpError::InvalidParameter { .. })));
}

#[test]
fn cylinder_volume_close_to_analytic() {
    let mut kernel = MockKernel::new();
    let result = execute_cylinder(&mut kernel, [0.0; 3], [0.0, 0.0, 1.0], 1.0, 2.0).unwrap();
    let v = volume(&kernel, &result.handle);
    // 24-gon prism: 12 * sin(15°) * r² * h
    let expected = 12.0 * (std::f64::consts::PI / 12.0).sin() * 2.0 * 2.0 / 2.0;
    assert_relative_eq!(v, expected, epsilon = 1e-9);
}

#[test]
fn extrude_produces_prism() {
    let mut kernel = MockKernel::new();
    let result = execute_extrude(&mut kernel, &square(0.0), [0.0, 0.0, 1.0], 5.0).unwrap();
    assert_eq!(kernel.list_faces(&result.handle).len(), 6);
    assert_relative_eq!(volume(&kernel, &result.handle), 30.0, epsilon = 1e-9);
    assert_eq!(result.history_source, HistorySource::Derived);
}

#[test]
fn extrude_rejects_zero_depth_and_short_profile() {
    let mut kernel = MockKernel::new();
    assert!(execute_extrude(&mut kernel, &square(0.0), [0.0, 0.0, 1.0], 0.0).is_err());
    assert!(execute_extrude(&mut kernel, &square(0.0)[..2], [0.0, 0.0, 1.0], 1.0).is_err());
}

#[test]
fn sweep_and_loft() {
    let mut kernel = MockKernel::new();
    let swept = execute_sweep(&mut kernel, &square(0.0), &[[0.0; 3], [0.0, 0.0, 2.0]]).unwrap();
    assert_relative_eq!(volume(&kernel, &swept.handle), 12.0, epsilon = 1e-9);

    let lofted = execute_loft(&mut kernel, &[square(0.0), square(1.0)]).unwrap();
    assert_relative_eq!(volume(&kernel, &lofted.handle), 6.0, epsilon = 1e-9);

    let multi = execute_sweep(
        &mut kernel,
        &square(0.0),
        &[[0.0; 3], [0.0, 0.0, 1.0], [1.0, 0.0, 2.0]],
    );
    assert!(matches!(multi, Err(OpError::Kernel(_))));
}

// ── Push/Pull Tests ────────────────────────────────────────────────────────

#[test]
fn push_pull_uses_kernel_history() {
    let mut kernel = MockKernel::new();
    let solid = make_box(&mut kernel, [0.0; 3], [4.0, 4.0, 4.0]);
    let top = top_face(&kernel, &solid);
    let result = execute_push_pull(&mut kernel, &solid, top, 2.0).unwrap();

    assert_eq!(result.history_source, HistorySource::Kernel);
    assert!(result.kernel_history().is_some());
    let successors = result.history.successors_of(top);
    assert_eq!(successors.len(), 1);
    assert_relative_eq!(volume(&kernel, &result.handle), 96.0, epsilon = 1e-9);
}

#[test]
fn push_pull_kernel_failure_propagates() {
    let mut kernel = MockKernel::new();
    let solid = make_box(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]);
    let top = top_face(&kernel, &solid);
    kernel.fail_next_operation("injected");
    let result = execute_push_pull(&mut kernel, &solid, top, 1.0);
    assert!(matches!(result, Err(OpError::Kernel(_))));
}

// ── Boolean Tests ──────────────────────────────────────────────────────────

#[test]
fn boolean_union_volume_and_lineage() {
    let mut kernel = MockKernel::new();
    let a = make_box(&mut kernel, [0.0; 3], [2.0, 2.0, 2.0]);
    let b = make_box(&mut kernel, [5.0, 0.0, 0.0], [2.0, 2.0, 2.0]);
    let result = execute_boolean(&mut kernel, &a, &b, BooleanKind::Union).unwrap();
    assert_relative_eq!(volume(&kernel, &result.handle), 16.0, epsilon = 1e-9);
    // disjoint operands survive untouched
    assert_eq!(result.history.modified.len(), 2 * (6 + 12));
    assert!(result.history.deleted.is_empty());
}

#[test]
fn boolean_subtract_removes_material() {
    let mut kernel = MockKernel::new();
    let a = make_box(&mut kernel, [0.0; 3], [4.0, 4.0, 4.0]);
    let b = make_box(&mut kernel, [1.0, 1.0, 2.0], [2.0, 2.0, 4.0]);
    let result = execute_boolean(&mut kernel, &a, &b, BooleanKind::Subtract).unwrap();
    assert_relative_eq!(volume(&kernel, &result.handle), 64.0 - 8.0, epsilon = 1e-9);
    assert!(kernel.is_valid(&result.handle));
}

#[test]
fn combine_on_empty_body() {
    let mut kernel = MockKernel::new();
    let tool = execute_box(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]).unwrap();
    let tool_handle = tool.handle.clone();
    let joined = execute_combine(&mut kernel, None, tool.clone(), BooleanKind::Union).unwrap();
    assert_eq!(joined.handle, tool_handle);

    let cut = execute_combine(&mut kernel, None, tool, BooleanKind::Subtract);
    assert!(matches!(cut, Err(OpError::InvalidParameter { .. })));
}

#[test]
fn combine_cuts_existing_body() {
    let mut kernel = MockKernel::new();
    let body = make_box(&mut kernel, [0.0; 3], [4.0, 4.0, 4.0]);
    let tool = execute_box(&mut kernel, [0.0, 0.0, 3.0], [4.0, 4.0, 2.0]).unwrap();
    let result = execute_combine(&mut kernel, Some(&body), tool, BooleanKind::Subtract).unwrap();
    assert_relative_eq!(volume(&kernel, &result.handle), 48.0, epsilon = 1e-9);
}

// ── Local Modifier Tests ───────────────────────────────────────────────────

#[test]
fn chamfer_generates_faces_from_edges() {
    let mut kernel = MockKernel::new();
    let solid = make_box(&mut kernel, [0.0; 3], [4.0, 4.0, 4.0]);
    let top = top_face(&kernel, &solid);
    let loop_edges = kernel.face_edges(top);
    let result = execute_chamfer(&mut kernel, &solid, &loop_edges, 0.5).unwrap();

    assert_eq!(kernel.list_faces(&result.handle).len(), 10);
    assert_eq!(result.history_source, HistorySource::Derived);
    assert_eq!(result.history.generated.len(), loop_edges.len());
    // original six faces all carry forward
    let faces = kernel.list_faces(&solid);
    for face in faces {
        assert_eq!(result.history.successors_of(face).len(), 1, "face {:?}", face);
    }
}

#[test]
fn chamfer_requires_edges() {
    let mut kernel = MockKernel::new();
    let solid = make_box(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]);
    let result = execute_chamfer(&mut kernel, &solid, &[], 0.1);
    assert!(matches!(result, Err(OpError::EmptySelection { .. })));
}

#[test]
fn fillet_single_edge() {
    let mut kernel = MockKernel::new();
    let solid = make_box(&mut kernel, [0.0; 3], [2.0, 2.0, 2.0]);
    let edge = kernel.list_edges(&solid)[0];
    let result = execute_fillet(&mut kernel, &solid, &[edge], 0.25).unwrap();
    assert_eq!(kernel.list_faces(&result.handle).len(), 7);
    assert!(execute_fillet(&mut kernel, &solid, &[edge], 0.0).is_err());
}

#[test]
fn shell_open_top() {
    let mut kernel = MockKernel::new();
    let solid = make_box(&mut kernel, [0.0; 3], [4.0, 4.0, 4.0]);
    let top = top_face(&kernel, &solid);
    let result = execute_shell(&mut kernel, &solid, &[top], 0.5).unwrap();
    assert_relative_eq!(volume(&kernel, &result.handle), 64.0 - 31.5, epsilon = 1e-9);
}

// ── Transform / Split / Pattern Tests ──────────────────────────────────────

#[test]
fn transform_history_is_positional() {
    let mut kernel = MockKernel::new();
    let solid = make_box(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]);
    let t = Transform::Translate {
        vector: [100.0, 0.0, 0.0],
    };
    let result = execute_transform(&mut kernel, &solid, &t).unwrap();
    let before = kernel.list_faces(&solid);
    let after = kernel.list_faces(&result.handle);
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(result.history.successors_of(*old), vec![*new]);
    }
}

#[test]
fn transform_rejects_zero_scale() {
    let mut kernel = MockKernel::new();
    let solid = make_box(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]);
    let t = Transform::Scale {
        center: [0.0; 3],
        factor: 0.0,
    };
    assert!(matches!(
        execute_transform(&mut kernel, &solid, &t),
        Err(OpError::InvalidParameter { .. })
    ));
}

#[test]
fn split_keeps_back_half() {
    let mut kernel = MockKernel::new();
    let solid = make_box(&mut kernel, [0.0; 3], [4.0, 2.0, 2.0]);
    let result =
        execute_split(&mut kernel, &solid, [1.0, 0.0, 0.0], [1.0, 0.0, 0.0], SplitKeep::Back)
            .unwrap();
    assert_relative_eq!(volume(&kernel, &result.handle), 4.0, epsilon = 1e-9);
}

#[test]
fn linear_pattern_unions_copies() {
    let mut kernel = MockKernel::new();
    let solid = make_box(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]);
    let spec = PatternSpec::Linear {
        direction: [1.0, 0.0, 0.0],
        spacing: 3.0,
        count: 3,
    };
    let result = execute_pattern(&mut kernel, &solid, &spec).unwrap();
    assert_relative_eq!(volume(&kernel, &result.handle), 3.0, epsilon = 1e-9);
    assert_eq!(kernel.list_faces(&result.handle).len(), 18);
    let bbox = kernel.bounding_box(&result.handle).unwrap();
    assert_relative_eq!(bbox.max[0], 7.0, epsilon = 1e-9);
    assert!(result.diagnostics.kernel_time_ms >= 0.0);
    assert!(result.diagnostics.kernel_time_ms.is_finite());
}
