use fitdesk::models::Gender;
use fitdesk::services::body_composition::*;
use proptest::prelude::*;

use crate::common::MockDataGenerator;

fn gender() -> impl Strategy<Value = Gender> {
    prop_oneof![Just(Gender::Male), Just(Gender::Female)]
}

proptest! {
    #[test]
    fn bmi_never_panics_and_is_never_negative(weight in any::<f64>(), height in any::<f64>()) {
        let bmi = calculate_bmi(weight, height);
        prop_assert!(bmi.is_finite());
        prop_assert!(bmi >= 0.0);
    }

    #[test]
    fn bmi_grows_with_weight(weight in 30.0..200.0f64, extra in 1.0..50.0f64, height in 140.0..210.0f64) {
        prop_assert!(calculate_bmi(weight + extra, height) >= calculate_bmi(weight, height));
    }

    #[test]
    fn bmi_shrinks_with_height(weight in 30.0..200.0f64, height in 140.0..200.0f64, extra in 1.0..30.0f64) {
        prop_assert!(calculate_bmi(weight, height + extra) <= calculate_bmi(weight, height));
    }

    #[test]
    fn navy_estimate_is_finite_or_absent(
        g in gender(),
        height in any::<f64>(),
        waist in any::<f64>(),
        neck in any::<f64>(),
        hip in proptest::option::of(any::<f64>()),
    ) {
        if let Some(body_fat) = calculate_body_fat_navy(g, height, waist, neck, hip) {
            prop_assert!(body_fat.is_finite());
        }
    }

    #[test]
    fn rcq_is_zero_or_positive(waist in any::<f64>(), hip in any::<f64>()) {
        let ratio = calculate_rcq(waist, hip);
        prop_assert!(ratio.is_finite());
        prop_assert!(ratio >= 0.0);
    }

    #[test]
    fn ideal_weight_range_is_ordered(height in 100.0..230.0f64, g in gender()) {
        let weight = calculate_ideal_weight(height, g);
        prop_assert!(weight.min > 0.0);
        prop_assert!(weight.min <= weight.ideal && weight.ideal <= weight.max);
    }

    #[test]
    fn bmi_classes_are_ordered(a in 10.0..60.0f64, b in 10.0..60.0f64) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(classify_bmi(low).tier <= classify_bmi(high).tier);
    }
}

#[test]
fn test_metrics_for_random_measurements() {
    for _ in 0..50 {
        let measurements = MockDataGenerator::measurements();
        let metrics = AssessmentMetrics::compute(Some(Gender::Male), &measurements);

        assert!(metrics.bmi > 0.0);
        assert_eq!(metrics.bmi_class, Some(classify_bmi(metrics.bmi)));
        assert!(metrics.waist_hip_ratio.is_some());
        assert_eq!(metrics.body_fat_class.is_some(), metrics.body_fat_percent.is_some());
    }
}

#[test]
fn test_metrics_without_gender_only_report_bmi() {
    let metrics = AssessmentMetrics::compute(None, &MockDataGenerator::measurements());

    assert!(metrics.bmi > 0.0);
    assert_eq!(metrics.body_fat_percent, None);
    assert_eq!(metrics.body_fat_class, None);
    assert_eq!(metrics.waist_hip_class, None);
    assert!(!metrics.warnings.is_empty());
}

#[test]
fn test_female_reference_values() {
    let measurements = Measurements {
        weight_kg: 62.0,
        height_cm: 165.0,
        waist_cm: Some(72.0),
        hip_cm: Some(98.0),
        neck_cm: Some(33.0),
    };

    let metrics = AssessmentMetrics::compute(Some(Gender::Female), &measurements);
    assert_eq!(metrics.bmi, 22.77);
    assert_eq!(metrics.bmi_class.map(|c| c.label), Some("Normal weight"));
    assert_eq!(metrics.waist_hip_ratio, Some(0.73));
    assert_eq!(metrics.waist_hip_class.map(|c| c.label), Some("Low risk"));

    let body_fat = metrics.body_fat_percent.unwrap();
    assert!(body_fat > 20.0 && body_fat < 35.0, "got {body_fat}");
}

#[test]
fn test_missing_height_is_not_classified_as_underweight() {
    let measurements = Measurements {
        height_cm: 0.0,
        ..MockDataGenerator::measurements()
    };

    let metrics = AssessmentMetrics::compute(Some(Gender::Female), &measurements);
    assert_eq!(metrics.bmi, 0.0);
    assert_eq!(metrics.bmi_class, None);
    assert!(metrics.warnings.contains(&"Weight and height are required to compute BMI".to_string()));
}
