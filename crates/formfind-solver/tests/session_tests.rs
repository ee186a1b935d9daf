//! Integration tests for runtime settings and the static/live drivers.

use formfind_solver::{
    run_static, ConstraintKind, ConstraintSignature, Dynamics, FormfindError, LiveSession,
    LiveSettings, RuntimeSettings, StaticSettings, DVec3,
};

fn two_points() -> Vec<DVec3> {
    vec![DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0)]
}

/// Edge with fixed length `rest` plus an anchor on point 0. The range
/// bounds are multipliers of the rest length.
fn anchored_edge(rest: f64) -> Vec<ConstraintSignature> {
    vec![
        ConstraintSignature::new(ConstraintKind::EdgeStrain, vec![vec![0, 1]])
            .with_scalars(vec![vec![rest, 1.0, 1.0]]),
        ConstraintSignature::new(ConstraintKind::Closeness, vec![vec![0]]),
    ]
}

fn static_live(reset: bool) -> LiveSettings {
    LiveSettings {
        dynamic: false,
        reset,
        ..Default::default()
    }
}

fn assert_near(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() < tol, "{a} vs {b}");
}

// ─── Settings ─────────────────────────────────────────────────

#[test]
fn setting_defaults() {
    let s = StaticSettings::default();
    assert_eq!(s.iterations, 50);

    let l = LiveSettings::default();
    assert_eq!(l.iterations, 5);
    assert!(l.dynamic);
    assert!(l.reset);
    assert!(!l.pause);
    assert!(l.unary_force.is_none());
    assert_eq!(l.dynamics(), Dynamics::default());
}

#[test]
fn dynamics_inertia_and_preset() {
    let d = Dynamics::default();
    assert_near(d.inertia(), 100.0, 1e-9);
    assert_eq!(Dynamics::settling().damping, 0.5);
    assert!(Dynamics::settling().validate().is_ok());
}

#[test]
fn invalid_settings_rejected() {
    let s = StaticSettings { iterations: 0 };
    assert!(matches!(s.validate(), Err(FormfindError::InvalidConfig(_))));

    let l = LiveSettings {
        damping: 1.5,
        ..Default::default()
    };
    assert!(matches!(l.validate(), Err(FormfindError::InvalidConfig(_))));

    let d = Dynamics {
        mass: 0.0,
        ..Default::default()
    };
    assert!(matches!(d.validate(), Err(FormfindError::InvalidConfig(_))));
}

#[test]
fn runtime_settings_from_json() {
    let json = r#"{
        "mode": "live",
        "iterations": 10,
        "timeStep": 0.05,
        "unaryForceVector": [0.0, 0.0, -9.81]
    }"#;
    let settings: RuntimeSettings = serde_json::from_str(json).unwrap();
    let RuntimeSettings::Live(live) = settings else {
        panic!("expected live settings, got {settings:?}");
    };
    assert_eq!(live.iterations, 10);
    assert_eq!(live.time_step, 0.05);
    assert_eq!(live.unary_force, Some([0.0, 0.0, -9.81]));
    assert_eq!(live.mass, 1.0);
    assert!(live.reset);
    assert_eq!(settings.iterations(), 10);

    let fallback: RuntimeSettings = serde_json::from_str(r#"{"mode": "static"}"#).unwrap();
    assert_eq!(fallback, RuntimeSettings::default());
    assert_eq!(fallback.iterations(), 50);
}

#[test]
fn runtime_settings_from_json_validates() {
    let ok = RuntimeSettings::from_json(r#"{"mode": "static", "iterations": 20}"#).unwrap();
    assert_eq!(ok.iterations(), 20);

    let err = RuntimeSettings::from_json(r#"{"mode": "live", "damping": 2.0}"#).unwrap_err();
    assert!(matches!(err, FormfindError::InvalidConfig(_)));

    let err = RuntimeSettings::from_json(r#"{"mode": "interactive"}"#).unwrap_err();
    assert!(matches!(err, FormfindError::Serialization(_)));
}

#[test]
fn live_settings_toml_roundtrip() {
    let settings = LiveSettings {
        iterations: 12,
        damping: 0.8,
        pause: true,
        unary_force: Some([0.0, -1.0, 0.0]),
        ..Default::default()
    };
    let text = toml::to_string(&settings).unwrap();
    assert!(text.contains("timeStep"));
    assert!(text.contains("unaryForceVector"));
    let back: LiveSettings = toml::from_str(&text).unwrap();
    assert_eq!(back, settings);
}

#[test]
fn dynamics_toml_partial() {
    let d: Dynamics = toml::from_str("damping = 0.25").unwrap();
    assert_eq!(d.damping, 0.25);
    assert_eq!(d.mass, 1.0);
    assert_eq!(d.time_step, 0.1);
    let back: Dynamics = toml::from_str(&toml::to_string(&d).unwrap()).unwrap();
    assert_eq!(back, d);
}

// ─── Static runs ──────────────────────────────────────────────

#[test]
fn static_run_reaches_rest_length() {
    let out = run_static(&anchored_edge(1.0), two_points(), &StaticSettings::default()).unwrap();
    assert_eq!(out.iterations, 50);
    assert_eq!(out.constraint_count, 2);
    assert_near(out.points[0].length(), 0.0, 1e-9);
    assert_near(out.points[0].distance(out.points[1]), 1.0, 1e-9);
}

#[test]
fn static_run_reports_unconstrained_point() {
    let signatures = vec![ConstraintSignature::new(ConstraintKind::Closeness, vec![vec![0]])];
    let err = run_static(&signatures, two_points(), &StaticSettings::default()).unwrap_err();
    assert!(matches!(err, FormfindError::UnconstrainedPoint { index: 1 }));
}

#[test]
fn static_run_rejects_zero_iterations() {
    let err = run_static(
        &anchored_edge(1.0),
        two_points(),
        &StaticSettings { iterations: 0 },
    )
    .unwrap_err();
    assert!(matches!(err, FormfindError::InvalidConfig(_)));
}

// ─── Live sessions ────────────────────────────────────────────

#[test]
fn first_live_step_only_builds() {
    let mut session = LiveSession::new();
    assert!(!session.is_running());

    let out = session
        .step(&anchored_edge(1.0), &two_points(), &static_live(true))
        .unwrap();
    assert!(session.is_running());
    assert_eq!(out.iterations, 0);
    assert_eq!(out.constraint_count, 2);
    assert_eq!(out.points, two_points());
    assert!(out.reschedule);
    assert_eq!(session.slots().len(), 2);
}

#[test]
fn live_steps_accumulate_iterations() {
    let mut session = LiveSession::new();
    let signatures = anchored_edge(1.0);
    session.step(&signatures, &two_points(), &static_live(true)).unwrap();

    let out = session.step(&signatures, &two_points(), &static_live(false)).unwrap();
    assert_eq!(out.iterations, 5);
    assert_near(out.points[0].distance(out.points[1]), 1.0, 1e-9);

    let out = session.step(&signatures, &two_points(), &static_live(false)).unwrap();
    assert_eq!(out.iterations, 10);
}

#[test]
fn live_scalar_edits_take_effect() {
    let mut session = LiveSession::new();
    session
        .step(&anchored_edge(1.0), &two_points(), &static_live(true))
        .unwrap();
    let out = session
        .step(&anchored_edge(1.5), &two_points(), &static_live(false))
        .unwrap();
    assert_near(out.points[0].distance(out.points[1]), 1.5, 1e-9);

    let solver = session.solver().unwrap();
    let edge = session.slots()[0].id;
    assert_eq!(solver.constraint(edge).unwrap().scalars(), vec![1.5, 1.0, 1.0]);
}

#[test]
fn live_range_scales_rest_length() {
    // rest 1.5 with range [1.5, 1.5] allows only 2.25.
    let mut signatures = anchored_edge(1.5);
    let mut session = LiveSession::new();
    session.step(&signatures, &two_points(), &static_live(true)).unwrap();
    signatures[0].scalars = vec![vec![1.5, 1.5, 1.5]];
    let out = session.step(&signatures, &two_points(), &static_live(false)).unwrap();
    assert_near(out.points[0].distance(out.points[1]), 2.25, 1e-9);
}

#[test]
fn pause_stops_rescheduling() {
    let mut session = LiveSession::new();
    let signatures = anchored_edge(1.0);
    session.step(&signatures, &two_points(), &static_live(true)).unwrap();

    let paused = LiveSettings {
        pause: true,
        ..static_live(false)
    };
    let out = session.step(&signatures, &two_points(), &paused).unwrap();
    assert!(!out.reschedule);
    assert_eq!(out.iterations, 5);
}

#[test]
fn reset_rebuilds_from_new_points() {
    let mut session = LiveSession::new();
    let signatures = anchored_edge(1.0);
    session.step(&signatures, &two_points(), &static_live(true)).unwrap();
    session.step(&signatures, &two_points(), &static_live(false)).unwrap();

    let moved = vec![DVec3::new(0.0, 3.0, 0.0), DVec3::new(0.0, 7.0, 0.0)];
    let out = session.step(&signatures, &moved, &static_live(true)).unwrap();
    assert_eq!(out.iterations, 0);
    assert_eq!(out.points, moved);
}

#[test]
fn removed_signature_needs_reset() {
    let mut session = LiveSession::new();
    let signatures = anchored_edge(1.0);
    session.step(&signatures, &two_points(), &static_live(true)).unwrap();

    let err = session
        .step(&signatures[..1], &two_points(), &static_live(false))
        .unwrap_err();
    assert!(matches!(err, FormfindError::InvalidConfig(_)));
    assert!(session.is_running());
}

#[test]
fn live_unary_force_drives_dynamic_steps() {
    let signatures = vec![
        ConstraintSignature::new(ConstraintKind::Closeness, vec![vec![0]]).with_weights(vec![0.0]),
    ];
    let points = vec![DVec3::ZERO];
    let settings = LiveSettings {
        iterations: 3,
        unary_force: Some([0.0, 0.0, -1.0]),
        ..Default::default()
    };

    let mut session = LiveSession::new();
    session.step(&signatures, &points, &settings).unwrap();
    let out = session
        .step(&signatures, &points, &LiveSettings { reset: false, ..settings })
        .unwrap();
    assert_eq!(out.iterations, 3);
    assert_near(out.points[0].z, -0.01, 1e-12);
}

#[test]
fn stop_disposes_the_solver() {
    let mut session = LiveSession::new();
    session
        .step(&anchored_edge(1.0), &two_points(), &static_live(true))
        .unwrap();
    session.stop().unwrap();
    assert!(!session.is_running());
    assert!(session.slots().is_empty());
    assert!(session.stop().is_ok());
}
