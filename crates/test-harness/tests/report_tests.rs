//! Tests for the report module.

use test_harness::ModelBuilder;

#[test]
fn empty_model_report() {
    let mut m = ModelBuilder::mock();
    let report = m.report().unwrap();
    let text = report.to_text();
    assert!(text.contains("Feature History (0 features, 0 broken)"));
    assert!(text.contains("Solid: none"));
    assert!(report.oracle_results.is_empty());
}

#[test]
fn box_report_has_topology_and_mesh() {
    let mut m = ModelBuilder::mock();
    m.add_box("box", [0.0; 3], [10.0; 3]).unwrap();
    let report = m.report().unwrap();
    let text = report.to_string();
    assert!(text.contains("Primitive \"box\" Ok"), "{text}");
    assert!(text.contains("V=8 E=12 F=6"), "{text}");
    assert!(text.contains("Volume: 1000.000"), "{text}");
    assert!(text.contains("Mesh: 12 triangles"), "{text}");
    assert!(text.contains("Registry: 18 shapes, 1 operations"), "{text}");
    assert!(
        report.oracle_results.iter().all(|v| v.passed),
        "{text}"
    );
    assert!(!text.contains("FAIL"));
}

#[test]
fn report_shows_reference_resolution() {
    let mut m = ModelBuilder::mock();
    m.add_box("box", [0.0; 3], [10.0; 3]).unwrap();
    m.push_pull("up", [0.0, 0.0, 1.0], 2.0).unwrap();
    let report = m.report().unwrap();
    assert_eq!(report.feature_entries.len(), 2);
    assert_eq!(report.feature_entries[1].resolution.by_reference, 1);
    assert_eq!(report.broken_features().count(), 0);
    assert!(report
        .to_text()
        .contains("References: 1 direct, 0 history, 0 index, 0 unresolved"));
}
