//! Property-based tests for kernel invariants using the `proptest` crate.

use proptest::prelude::*;

use brep_kernel::{Kernel, KernelIntrospect, MockKernel, Transform};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_corner() -> impl Strategy<Value = [f64; 3]> {
    (-100.0f64..100.0, -100.0f64..100.0, -100.0f64..100.0).prop_map(|(x, y, z)| [x, y, z])
}

/// Box extents away from zero.
fn arb_size() -> impl Strategy<Value = [f64; 3]> {
    (0.5f64..50.0, 0.5f64..50.0, 0.5f64..50.0).prop_map(|(x, y, z)| [x, y, z])
}

const TOL: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Boxes
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn box_mass_properties_match_extents(corner in arb_corner(), size in arb_size()) {
        let mut k = MockKernel::new();
        let solid = k.make_box(corner, size).unwrap();
        let props = k.mass_properties(&solid).unwrap();
        let [x, y, z] = size;
        prop_assert!((props.volume - x * y * z).abs() < TOL * (1.0 + x * y * z));
        let area = 2.0 * (x * y + y * z + x * z);
        prop_assert!((props.area - area).abs() < TOL * (1.0 + area));
        for i in 0..3 {
            let mid = corner[i] + size[i] / 2.0;
            prop_assert!((props.center_of_mass[i] - mid).abs() < TOL * (1.0 + mid.abs()));
        }
    }

    #[test]
    fn box_topology_is_closed(corner in arb_corner(), size in arb_size()) {
        let mut k = MockKernel::new();
        let solid = k.make_box(corner, size).unwrap();
        let v = k.list_vertices(&solid).len();
        let e = k.list_edges(&solid).len();
        let f = k.list_faces(&solid).len();
        prop_assert_eq!((v, e, f), (8, 12, 6));
        for edge in k.list_edges(&solid) {
            prop_assert_eq!(k.edge_faces(edge).len(), 2);
        }
        prop_assert!(k.validate(&solid).is_ok());
    }
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn translation_preserves_volume_and_shifts_bbox(
        corner in arb_corner(),
        size in arb_size(),
        offset in arb_corner(),
    ) {
        let mut k = MockKernel::new();
        let solid = k.make_box(corner, size).unwrap();
        let moved = k.transform(&solid, &Transform::Translate { vector: offset }).unwrap();
        let before = k.mass_properties(&solid).unwrap().volume;
        let after = k.mass_properties(&moved).unwrap().volume;
        prop_assert!((before - after).abs() < TOL * (1.0 + before));

        let a = k.bounding_box(&solid).unwrap();
        let b = k.bounding_box(&moved).unwrap();
        for i in 0..3 {
            prop_assert!((b.min[i] - a.min[i] - offset[i]).abs() < TOL * 100.0);
            prop_assert!((b.max[i] - a.max[i] - offset[i]).abs() < TOL * 100.0);
        }
        // The input solid is untouched.
        prop_assert_eq!(k.list_faces(&solid).len(), 6);
    }

    #[test]
    fn push_pull_adds_face_area_times_distance(size in arb_size(), distance in 0.1f64..10.0) {
        let mut k = MockKernel::new();
        let solid = k.make_box([0.0; 3], size).unwrap();
        let top = k
            .list_faces(&solid)
            .into_iter()
            .find(|f| {
                k.face_geometry(*f)
                    .ok()
                    .and_then(|g| g.normal)
                    .is_some_and(|n| n[2] > 0.999)
            })
            .unwrap();
        let area = k.face_geometry(top).unwrap().area;
        let (pulled, _) = k.push_pull_face(&solid, top, distance).unwrap();
        let before = k.mass_properties(&solid).unwrap().volume;
        let after = k.mass_properties(&pulled).unwrap().volume;
        let expected = before + area * distance;
        prop_assert!((after - expected).abs() < TOL * (1.0 + expected));
        prop_assert_eq!(k.list_faces(&pulled).len(), 6);
    }

    #[test]
    fn tessellation_has_one_range_per_face(corner in arb_corner(), size in arb_size()) {
        let mut k = MockKernel::new();
        let solid = k.make_box(corner, size).unwrap();
        let mesh = k.tessellate(&solid, 0.1).unwrap();
        prop_assert_eq!(mesh.face_ranges.len(), 6);
        prop_assert_eq!(mesh.indices.len(), 36);
        let vertex_count = (mesh.vertices.len() / 3) as u32;
        prop_assert!(mesh.indices.iter().all(|i| *i < vertex_count));
    }
}
