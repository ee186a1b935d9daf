//! Integration tests for formfind-math.

use formfind_math::decomposition::{procrustes, Svd2, Svd3};
use formfind_math::fit::{centroid, fit_circle, fit_sphere, principal_axes};
use formfind_math::mat3x2::Mat3x2;
use formfind_math::sparse::CsrMatrix;
use formfind_math::{DMat2, DMat3, DVec2, DVec3};

// ─── Mat3x2 Tests ─────────────────────────────────────────────

#[test]
fn frobenius_norm_identity() {
    let f = Mat3x2::IDENTITY;
    assert!((f.frobenius_norm_sq() - 2.0).abs() < 1e-12);
}

#[test]
fn mul_mat2_identity() {
    let f = Mat3x2::from_cols(DVec3::new(1.0, 2.0, 3.0), DVec3::new(4.0, 5.0, 6.0));
    let result = f.mul_mat2(DMat2::IDENTITY);
    assert_eq!(result, f);
}

#[test]
fn orthonormal_frame_of_tilted_triangle() {
    let e0 = DVec3::new(2.0, 0.0, 0.0);
    let e1 = DVec3::new(1.0, 3.0, 0.0);
    let frame = Mat3x2::orthonormal_frame(e0, e1, 1e-9).unwrap();
    assert!((frame.col0 - DVec3::X).length() < 1e-12);
    assert!((frame.col1 - DVec3::Y).length() < 1e-12);

    // Edges expressed in the frame
    let local = frame.transpose_mul(e0, e1);
    assert!((local.x_axis - DVec2::new(2.0, 0.0)).length() < 1e-12);
    assert!((local.y_axis - DVec2::new(1.0, 3.0)).length() < 1e-12);
}

#[test]
fn orthonormal_frame_degenerate() {
    let e0 = DVec3::new(1.0, 0.0, 0.0);
    assert!(Mat3x2::orthonormal_frame(e0, e0 * 2.0, 1e-9).is_none());
    assert!(Mat3x2::orthonormal_frame(DVec3::ZERO, e0, 1e-9).is_none());
}

// ─── Decomposition Tests ──────────────────────────────────────

#[test]
fn svd3_recomposes() {
    let m = DMat3::from_cols(
        DVec3::new(2.0, 0.5, 0.0),
        DVec3::new(-0.3, 1.0, 0.2),
        DVec3::new(0.1, 0.0, 3.0),
    );
    let svd = Svd3::new(m).unwrap();
    let back = svd.compose(svd.singular);
    for c in 0..3 {
        assert!((back.col(c) - m.col(c)).length() < 1e-10);
    }
    assert!(svd.singular.min_element() >= 0.0);
}

#[test]
fn svd3_smallest_index() {
    let m = DMat3::from_diagonal(DVec3::new(3.0, 0.5, 2.0));
    let svd = Svd3::new(m).unwrap();
    let smallest = svd.smallest();
    assert!((svd.singular[smallest] - 0.5).abs() < 1e-12);
}

#[test]
fn svd2_clamping_rebuilds_rotation() {
    // Pure rotation scaled by 2: clamping singular values to 1 yields the rotation.
    let angle: f64 = 0.4;
    let rot = DMat2::from_angle(angle);
    let svd = Svd2::new(rot * 2.0).unwrap();
    let clamped = svd.compose(svd.singular.clamp(DVec2::ONE, DVec2::ONE));
    assert!((clamped.x_axis - rot.x_axis).length() < 1e-10);
    assert!((clamped.y_axis - rot.y_axis).length() < 1e-10);
}

#[test]
fn procrustes_recovers_rotation() {
    let source = [
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(-1.0, 0.0, 0.0),
        DVec3::new(0.0, 2.0, 0.0),
        DVec3::new(0.0, -2.0, 0.0),
    ];
    let rot = DMat3::from_rotation_z(0.7);
    let target: Vec<DVec3> = source.iter().map(|&p| rot * p).collect();

    let alignment = procrustes(&source, &target, false).unwrap();
    assert!((alignment.scale - 1.0).abs() < 1e-12);
    assert!(alignment.residual < 1e-18);
    assert!((alignment.rotation.determinant() - 1.0).abs() < 1e-10);
}

#[test]
fn procrustes_recovers_scale() {
    let source = [
        DVec3::new(1.0, 1.0, 0.0),
        DVec3::new(-1.0, 1.0, 0.0),
        DVec3::new(0.0, -2.0, 0.5),
        DVec3::new(0.0, 0.0, -0.5),
    ];
    let target: Vec<DVec3> = source.iter().map(|&p| p * 3.0).collect();

    let alignment = procrustes(&source, &target, true).unwrap();
    assert!((alignment.scale - 3.0).abs() < 1e-10);
    assert!(alignment.residual < 1e-16);
}

#[test]
fn procrustes_rejects_reflection() {
    // Mirror image: best proper rotation cannot reach it exactly.
    let source = [
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(0.0, 1.0, 0.0),
        DVec3::new(0.0, 0.0, 1.0),
        DVec3::new(-1.0, -1.0, -1.0),
    ];
    let target: Vec<DVec3> = source.iter().map(|&p| DVec3::new(-p.x, p.y, p.z)).collect();

    let alignment = procrustes(&source, &target, false).unwrap();
    assert!((alignment.rotation.determinant() - 1.0).abs() < 1e-10);
    assert!(alignment.residual > 1e-3);
}

// ─── Fit Tests ────────────────────────────────────────────────

#[test]
fn centroid_of_points() {
    let pts = [DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0), DVec3::new(0.0, 4.0, 2.0)];
    assert!((centroid(&pts) - DVec3::new(2.0 / 3.0, 4.0 / 3.0, 2.0 / 3.0)).length() < 1e-12);
    assert_eq!(centroid(&[]), DVec3::ZERO);
}

#[test]
fn principal_axes_of_plane() {
    let pts = [
        DVec3::new(0.0, 0.0, 1.0),
        DVec3::new(4.0, 0.0, 1.0),
        DVec3::new(4.0, 1.0, 1.0),
        DVec3::new(0.0, 1.0, 1.0),
    ];
    let axes = principal_axes(&pts);
    assert!(axes.axes[0].x.abs() > 0.999);
    assert!(axes.axes[2].z.abs() > 0.999);
    assert!(axes.variances[2] < 1e-12);
    assert!((axes.centroid - DVec3::new(2.0, 0.5, 1.0)).length() < 1e-12);
}

#[test]
fn circle_fit_exact() {
    let pts: Vec<DVec2> = (0..6)
        .map(|i| {
            let t = i as f64;
            DVec2::new(1.0 + 2.0 * t.cos(), -1.0 + 2.0 * t.sin())
        })
        .collect();
    let (center, radius) = fit_circle(&pts).unwrap();
    assert!((center - DVec2::new(1.0, -1.0)).length() < 1e-9);
    assert!((radius - 2.0).abs() < 1e-9);
}

#[test]
fn sphere_fit_exact() {
    let c = DVec3::new(0.5, 1.0, -2.0);
    let pts = [
        c + DVec3::X * 3.0,
        c - DVec3::X * 3.0,
        c + DVec3::Y * 3.0,
        c + DVec3::Z * 3.0,
        c - DVec3::Z * 3.0,
    ];
    let (center, radius) = fit_sphere(&pts).unwrap();
    assert!((center - c).length() < 1e-9);
    assert!((radius - 3.0).abs() < 1e-9);
}

#[test]
fn fits_need_enough_points() {
    assert!(fit_circle(&[DVec2::ZERO, DVec2::X]).is_none());
    assert!(fit_sphere(&[DVec3::ZERO, DVec3::X, DVec3::Y]).is_none());
}

// ─── Sparse Matrix Tests ─────────────────────────────────────

#[test]
fn empty_csr() {
    let m = CsrMatrix::new(3, 3);
    assert_eq!(m.nnz(), 0);
    assert_eq!(m.rows, 3);
    assert_eq!(m.cols, 3);
    assert_eq!(m.row_ptr.len(), 4);
}

#[test]
fn csr_from_triplets() {
    let triplets = vec![(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)];
    let m = CsrMatrix::from_triplets(3, 3, &triplets);
    assert_eq!(m.nnz(), 3);
    assert_eq!(m.row_ptr, vec![0, 1, 2, 3]);
    assert_eq!(m.col_idx, vec![0, 1, 2]);
    assert_eq!(m.values, vec![1.0, 1.0, 1.0]);
}

#[test]
fn csr_from_triplets_unordered() {
    let triplets = vec![(0, 2, 3.0), (0, 0, 1.0), (0, 1, 2.0)];
    let m = CsrMatrix::from_triplets(1, 3, &triplets);
    assert_eq!(m.col_idx, vec![0, 1, 2]);
    assert_eq!(m.values, vec![1.0, 2.0, 3.0]);
}

#[test]
fn csr_duplicates_are_summed() {
    let triplets = vec![(0, 1, 1.5), (0, 1, 2.5), (1, 0, -1.0)];
    let m = CsrMatrix::from_triplets(2, 2, &triplets);
    assert_eq!(m.nnz(), 2);
    assert_eq!(m.get(0, 1), 4.0);
    assert_eq!(m.get(1, 0), -1.0);
    assert_eq!(m.get(1, 1), 0.0);
}

#[test]
fn normal_matrix_of_difference_operator() {
    // A = [-1 1 0; 0 -1 1] → AᵀA = [1 -1 0; -1 2 -1; 0 -1 1]
    let a = CsrMatrix::from_triplets(
        2,
        3,
        &[(0, 0, -1.0), (0, 1, 1.0), (1, 1, -1.0), (1, 2, 1.0)],
    );
    let n = a.normal_matrix(0.0);
    assert_eq!(n.rows, 3);
    assert_eq!(n.get(0, 0), 1.0);
    assert_eq!(n.get(0, 1), -1.0);
    assert_eq!(n.get(1, 1), 2.0);
    assert_eq!(n.get(0, 2), 0.0);

    let shifted = a.normal_matrix(0.5);
    assert_eq!(shifted.get(1, 1), 2.5);
    assert_eq!(shifted.get(2, 2), 1.5);
}

#[test]
fn transpose_mul_and_mul() {
    let a = CsrMatrix::from_triplets(2, 3, &[(0, 0, -1.0), (0, 1, 1.0), (1, 2, 2.0)]);
    let x = [DVec3::new(1.0, 2.0, 3.0), DVec3::new(0.5, 0.0, -1.0)];
    let atx = a.transpose_mul(&x);
    assert_eq!(atx.len(), 3);
    assert_eq!(atx[0], DVec3::new(-1.0, -2.0, -3.0));
    assert_eq!(atx[1], DVec3::new(1.0, 2.0, 3.0));
    assert_eq!(atx[2], DVec3::new(1.0, 0.0, -2.0));

    let p = [DVec3::ZERO, DVec3::ONE, DVec3::X];
    let ap = a.mul(&p);
    assert_eq!(ap, vec![DVec3::ONE, DVec3::new(2.0, 0.0, 0.0)]);
}

// ─── FaerSolver Tests ────────────────────────────────────────

use formfind_math::faer_solver::FaerSolver;
use formfind_math::sparse::SparseSolver;

/// Operator of a 3-point chain: an anchor row on point 0 plus two
/// difference rows.
fn anchored_chain() -> CsrMatrix {
    CsrMatrix::from_triplets(
        3,
        3,
        &[(0, 0, 1.0), (1, 0, -1.0), (1, 1, 1.0), (2, 1, -1.0), (2, 2, 1.0)],
    )
}

fn max_residual(matrix: &CsrMatrix, x: &[DVec3], b: &[DVec3]) -> f64 {
    matrix
        .mul(x)
        .iter()
        .zip(b)
        .map(|(ax, b)| (*ax - *b).abs().max_element())
        .fold(0.0_f64, f64::max)
}

#[test]
fn faer_solves_each_axis_independently() {
    let system = anchored_chain().normal_matrix(0.0);
    let mut solver = FaerSolver::new();
    assert!(!solver.is_factorized());
    solver.factorize(&system).unwrap();
    assert!(solver.is_factorized());
    assert_eq!(solver.dimension(), 3);

    let rhs = [
        DVec3::new(1.0, 0.0, -2.0),
        DVec3::new(0.0, 4.0, 0.5),
        DVec3::new(-3.0, 1.0, 0.0),
    ];
    let mut x = [DVec3::ZERO; 3];
    solver.solve(&rhs, &mut x).unwrap();
    let r = max_residual(&system, &x, &rhs);
    assert!(r < 1e-10, "residual {r}");
}

#[test]
fn faer_normal_equations_recover_chain_positions() {
    // Targets: anchor at the origin, unit steps along X.
    let a = anchored_chain();
    let targets = [DVec3::ZERO, DVec3::X, DVec3::X];
    let mut solver = FaerSolver::new();
    solver.factorize(&a.normal_matrix(0.0)).unwrap();

    let mut x = [DVec3::ZERO; 3];
    solver.solve(&a.transpose_mul(&targets), &mut x).unwrap();
    assert!((x[0] - DVec3::ZERO).length() < 1e-12);
    assert!((x[1] - DVec3::X).length() < 1e-12);
    assert!((x[2] - DVec3::new(2.0, 0.0, 0.0)).length() < 1e-12);
}

#[test]
fn faer_reuses_factor_for_new_rhs() {
    let system = CsrMatrix::from_triplets(3, 3, &[(0, 0, 2.0), (1, 1, 4.0), (2, 2, 5.0)]);
    let mut solver = FaerSolver::new();
    solver.factorize(&system).unwrap();

    let mut x = [DVec3::ZERO; 3];
    solver
        .solve(&[DVec3::splat(4.0), DVec3::splat(8.0), DVec3::splat(25.0)], &mut x)
        .unwrap();
    assert!((x[2] - DVec3::splat(5.0)).length() < 1e-12);

    solver.solve(&[DVec3::ONE; 3], &mut x).unwrap();
    assert!((x[0].x - 0.5).abs() < 1e-12);
    assert!((x[1].y - 0.25).abs() < 1e-12);
    assert!((x[2].z - 0.2).abs() < 1e-12);
}

#[test]
fn faer_inertia_shift_regularises_long_chain() {
    // 200 difference rows and no anchor: singular until m/h² is added.
    let n = 200;
    let triplets: Vec<_> = (0..n - 1)
        .flat_map(|i| [(i, i, -1.0), (i, i + 1, 1.0)])
        .collect();
    let a = CsrMatrix::from_triplets(n - 1, n, &triplets);
    let system = a.normal_matrix(100.0);

    let mut solver = FaerSolver::new();
    solver.factorize(&system).unwrap();
    let rhs: Vec<DVec3> = (0..n).map(|i| DVec3::new(i as f64, 1.0, -0.5)).collect();
    let mut x = vec![DVec3::ZERO; n];
    solver.solve(&rhs, &mut x).unwrap();
    let r = max_residual(&system, &x, &rhs);
    assert!(r < 1e-9, "residual {r}");
}

#[test]
fn faer_translation_null_space_fails() {
    let a = CsrMatrix::from_triplets(1, 2, &[(0, 0, -1.0), (0, 1, 1.0)]);
    let mut solver = FaerSolver::new();
    assert!(solver.factorize(&a.normal_matrix(0.0)).is_err());
    assert!(!solver.is_factorized());
}

#[test]
fn faer_failed_factorize_drops_previous_factor() {
    let mut solver = FaerSolver::new();
    solver.factorize(&anchored_chain().normal_matrix(0.0)).unwrap();
    assert!(solver.factorize(&CsrMatrix::new(2, 3)).is_err());
    assert!(!solver.is_factorized());
    assert_eq!(solver.dimension(), 0);
}

#[test]
fn faer_release_then_solve_fails() {
    let mut solver = FaerSolver::new();
    solver.factorize(&CsrMatrix::from_triplets(1, 1, &[(0, 0, 1.0)])).unwrap();
    solver.release();
    assert!(!solver.is_factorized());
    let mut x = [DVec3::ZERO];
    assert!(solver.solve(&[DVec3::ONE], &mut x).is_err());
}

#[test]
fn faer_rejects_bad_shapes() {
    let mut solver = FaerSolver::new();
    assert!(solver.factorize(&CsrMatrix::new(0, 0)).is_err());
    assert!(solver.solve(&[DVec3::ONE; 3], &mut [DVec3::ZERO; 3]).is_err());

    solver.factorize(&anchored_chain().normal_matrix(0.0)).unwrap();
    let mut x = [DVec3::ZERO; 2];
    assert!(solver.solve(&[DVec3::ONE; 2], &mut x).is_err());
}
