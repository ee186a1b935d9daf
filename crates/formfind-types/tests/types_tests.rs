//! Integration tests for formfind-types.

use formfind_types::{Arity, ConstraintId, ConstraintKind, ForceId, FormfindError, ScalarLayout};

// ─── ID Tests ──────────────────────────────────────────────────

#[test]
fn constraint_id_index() {
    let id = ConstraintId(42);
    assert_eq!(id.index(), 42);
}

#[test]
fn force_id_index() {
    let id = ForceId::from(7);
    assert_eq!(id.index(), 7);
}

#[test]
fn ids_are_serializable() {
    let id = ConstraintId(100);
    let json = serde_json::to_string(&id).unwrap();
    let deserialized: ConstraintId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, deserialized);
}

// ─── Kind Tests ───────────────────────────────────────────────

#[test]
fn kind_names_round_trip() {
    for kind in ConstraintKind::ALL {
        let parsed: ConstraintKind = kind.name().parse().unwrap();
        assert_eq!(parsed, kind);
    }
}

#[test]
fn angle_constraint_alias() {
    let parsed: ConstraintKind = "AngleConstraint".parse().unwrap();
    assert_eq!(parsed, ConstraintKind::Angle);

    let json: ConstraintKind = serde_json::from_str("\"AngleConstraint\"").unwrap();
    assert_eq!(json, ConstraintKind::Angle);
}

#[test]
fn unknown_kind_is_rejected() {
    let err = "Torus".parse::<ConstraintKind>().unwrap_err();
    assert!(matches!(err, FormfindError::UnknownConstraintKind(ref s) if s == "Torus"));
}

#[test]
fn arity_table() {
    assert_eq!(ConstraintKind::Closeness.arity(), Arity::Exactly(1));
    assert_eq!(ConstraintKind::EdgeStrain.arity(), Arity::Exactly(2));
    assert_eq!(ConstraintKind::Bending.arity(), Arity::Exactly(4));
    assert_eq!(ConstraintKind::Sphere.arity(), Arity::AtLeast(4));
    assert_eq!(ConstraintKind::Laplacian.arity(), Arity::AtLeast(2));

    assert!(ConstraintKind::Plane.check_arity(5).is_ok());
    assert!(ConstraintKind::Plane.check_arity(2).is_err());
    assert!(ConstraintKind::EdgeStrain.check_arity(3).is_err());
}

#[test]
fn scalar_layouts() {
    assert!(ScalarLayout::Fixed(3).accepts(3, 2));
    assert!(!ScalarLayout::Fixed(3).accepts(2, 2));

    // Two candidate shapes over four points.
    assert!(ScalarLayout::CandidateShapes.accepts(24, 4));
    assert!(!ScalarLayout::CandidateShapes.accepts(0, 4));
    assert!(!ScalarLayout::CandidateShapes.accepts(13, 4));

    assert!(ConstraintKind::Line.check_scalar_count(0, 3).is_ok());
    assert!(ConstraintKind::Line.check_scalar_count(1, 3).is_err());
}

// ─── Error Tests ──────────────────────────────────────────────

#[test]
fn arity_error_display() {
    let err = ConstraintKind::Bending.check_arity(3).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Bending"));
    assert!(msg.contains("exactly 4"));
    assert!(msg.contains('3'));
}

#[test]
fn scalar_count_error_display() {
    let err = ConstraintKind::Similarity.check_scalar_count(5, 2).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Similarity"));
    assert!(msg.contains("multiple of 6"));
}
