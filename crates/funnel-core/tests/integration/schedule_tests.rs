use funnel_core::{AppError, DelayAlgorithm, DelayConfig, calculate_delays};

#[test]
fn every_curve_starts_immediately() {
    for algorithm in [
        DelayAlgorithm::Constant,
        DelayAlgorithm::Linear,
        DelayAlgorithm::Sigmoid,
    ] {
        let config = DelayConfig::new(algorithm, 3.0).with_min_duration(0.5);
        let delays = calculate_delays(25, &config).unwrap();
        assert_eq!(delays.len(), 25);
        assert_eq!(delays[0], 0.0);
        assert!(delays[1..].iter().all(|d| *d >= 0.5), "{algorithm}: {delays:?}");
        assert!(delays.iter().all(|d| *d <= 3.0), "{algorithm}: {delays:?}");
    }
}

#[test]
fn schedule_from_json_config() {
    let config: DelayConfig = serde_json::from_str(
        r#"{"algorithm": "constant", "max_duration": 10.0, "min_duration": 0.0}"#,
    )
    .unwrap();
    let delays = calculate_delays(20, &config).unwrap();
    assert_eq!(delays[0], 0.0);
    assert_eq!(delays[1], 8.6);
    assert!(delays[8..].iter().all(|d| *d == 10.0));
}

#[test]
fn unknown_algorithm_tag_produces_no_schedule() {
    let err = DelayConfig::default()
        .with_algorithm_tag("exponential")
        .unwrap_err();
    assert!(matches!(err, AppError::UnsupportedAlgorithm(_)));
}

#[test]
fn inconsistent_config_is_rejected_before_scheduling() {
    let config = DelayConfig::new(DelayAlgorithm::Sigmoid, 2.0).with_min_duration(3.0);
    let err = calculate_delays(5, &config).unwrap_err();
    assert!(matches!(err, AppError::ConfigError(_)));
}

#[test]
fn random_converging_schedule_stays_under_ceiling() {
    let config = DelayConfig::new(DelayAlgorithm::Linear, 2.0).with_converge();
    for _ in 0..10 {
        let delays = calculate_delays(30, &config).unwrap();
        assert_eq!(delays[0], 0.0);
        assert!(delays.iter().all(|d| (0.0..=2.0).contains(d)));
    }
}
