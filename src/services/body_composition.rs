//! Body composition calculators used by physical assessments.
//!
//! Everything here is pure and total: a measurement that is zero, negative or
//! not finite is treated as missing, and missing inputs produce `0.0` or
//! `None` instead of an error.

use serde::Serialize;

use crate::models::Gender;

const CM_PER_INCH: f64 = 2.54;
const ROBINSON_BASE_HEIGHT_IN: f64 = 60.0;
const BASELINE_BMI: f64 = 22.0;

/// Raw circumference and mass inputs, metric units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurements {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub waist_cm: Option<f64>,
    pub hip_cm: Option<f64>,
    pub neck_cm: Option<f64>,
}

/// A band from one of the reference tables. `tier` grows with the measured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub label: &'static str,
    pub tier: u8,
    pub color: &'static str,
}

impl Classification {
    const fn new(label: &'static str, tier: u8, color: &'static str) -> Self {
        Self { label, tier, color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdealWeight {
    pub min: f64,
    pub ideal: f64,
    pub max: f64,
}

fn present(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

fn present_opt(value: Option<f64>) -> Option<f64> {
    value.and_then(present)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if scaled.is_finite() {
        scaled.round() / factor
    } else {
        value
    }
}

/// Body mass index, rounded to two decimals. `0.0` when weight or height is missing.
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let (Some(weight), Some(height)) = (present(weight_kg), present(height_cm)) else {
        return 0.0;
    };

    let height_m = height_cm_to_m(height);
    let bmi = weight / (height_m * height_m);
    if bmi.is_finite() {
        round_to(bmi, 2)
    } else {
        0.0
    }
}

/// US Navy circumference method, metric form, rounded to two decimals.
///
/// The female variant needs the hip circumference; without it, or whenever the
/// logarithm argument is not positive, the estimate is `None`.
pub fn calculate_body_fat_navy(
    gender: Gender,
    height_cm: f64,
    waist_cm: f64,
    neck_cm: f64,
    hip_cm: Option<f64>,
) -> Option<f64> {
    let height = present(height_cm)?;
    let waist = present(waist_cm)?;
    let neck = present(neck_cm)?;

    let density = match gender {
        Gender::Male => {
            let girth = waist - neck;
            if girth <= 0.0 {
                return None;
            }
            1.0324 - 0.19077 * girth.log10() + 0.15456 * height.log10()
        }
        Gender::Female => {
            let hip = present_opt(hip_cm)?;
            let girth = waist + hip - neck;
            if girth <= 0.0 {
                return None;
            }
            1.29579 - 0.35004 * girth.log10() + 0.22100 * height.log10()
        }
    };

    let body_fat = 495.0 / density - 450.0;
    body_fat.is_finite().then(|| round_to(body_fat, 2))
}

/// Waist to hip ratio (RCQ), rounded to two decimals. `0.0` when either is missing.
pub fn calculate_rcq(waist_cm: f64, hip_cm: f64) -> f64 {
    let (Some(waist), Some(hip)) = (present(waist_cm), present(hip_cm)) else {
        return 0.0;
    };

    let ratio = waist / hip;
    if ratio.is_finite() {
        round_to(ratio, 2)
    } else {
        0.0
    }
}

/// WHO adult BMI bands.
pub fn classify_bmi(bmi: f64) -> Classification {
    if bmi < 18.5 {
        Classification::new("Underweight", 0, "blue")
    } else if bmi < 25.0 {
        Classification::new("Normal weight", 1, "green")
    } else if bmi < 30.0 {
        Classification::new("Overweight", 2, "yellow")
    } else if bmi < 35.0 {
        Classification::new("Obesity class I", 3, "orange")
    } else if bmi < 40.0 {
        Classification::new("Obesity class II", 4, "red")
    } else {
        Classification::new("Obesity class III", 5, "darkred")
    }
}

/// ACE body fat categories.
pub fn classify_body_fat(gender: Gender, percent: f64) -> Classification {
    let bounds: [f64; 4] = match gender {
        Gender::Male => [6.0, 14.0, 18.0, 25.0],
        Gender::Female => [14.0, 21.0, 25.0, 32.0],
    };

    if percent < bounds[0] {
        Classification::new("Essential fat", 0, "blue")
    } else if percent < bounds[1] {
        Classification::new("Athletes", 1, "green")
    } else if percent < bounds[2] {
        Classification::new("Fitness", 2, "green")
    } else if percent < bounds[3] {
        Classification::new("Average", 3, "yellow")
    } else {
        Classification::new("Obese", 4, "red")
    }
}

/// Cardiometabolic risk from the waist to hip ratio (WHO cut-offs).
pub fn classify_rcq(gender: Gender, ratio: f64) -> Classification {
    let (low, moderate) = match gender {
        Gender::Male => (0.90, 1.00),
        Gender::Female => (0.80, 0.85),
    };

    if ratio < low {
        Classification::new("Low risk", 0, "green")
    } else if ratio < moderate {
        Classification::new("Moderate risk", 1, "yellow")
    } else {
        Classification::new("High risk", 2, "red")
    }
}

/// Robinson formula with a +/-10% range. Below five feet the formula does not
/// apply and the BMI 22 weight for the height is used instead.
pub fn calculate_ideal_weight(height_cm: f64, gender: Gender) -> IdealWeight {
    let Some(height) = present(height_cm) else {
        return IdealWeight { min: 0.0, ideal: 0.0, max: 0.0 };
    };

    let height_in = height / CM_PER_INCH;
    let raw = if height_in >= ROBINSON_BASE_HEIGHT_IN {
        let (base, per_inch) = match gender {
            Gender::Male => (52.0, 1.9),
            Gender::Female => (49.0, 1.7),
        };
        base + per_inch * (height_in - ROBINSON_BASE_HEIGHT_IN)
    } else {
        let height_m = height_cm_to_m(height);
        BASELINE_BMI * height_m * height_m
    };

    if !raw.is_finite() {
        return IdealWeight { min: 0.0, ideal: 0.0, max: 0.0 };
    }

    let ideal = round_to(raw, 1);
    IdealWeight {
        min: ideal * 0.9,
        ideal,
        max: ideal * 1.1,
    }
}

fn height_cm_to_m(height_cm: f64) -> f64 {
    height_cm / 100.0
}

/// Metrics derived from one set of measurements, as stored with an assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentMetrics {
    /// `0.0` when weight or height is missing
    pub bmi: f64,
    pub bmi_class: Option<Classification>,
    pub body_fat_percent: Option<f64>,
    pub body_fat_class: Option<Classification>,
    pub waist_hip_ratio: Option<f64>,
    pub waist_hip_class: Option<Classification>,
    /// Why an optional metric could not be computed
    pub warnings: Vec<String>,
}

impl AssessmentMetrics {
    pub fn compute(gender: Option<Gender>, m: &Measurements) -> Self {
        let mut warnings = Vec::new();

        let bmi = calculate_bmi(m.weight_kg, m.height_cm);
        let bmi_class = if bmi > 0.0 {
            Some(classify_bmi(bmi))
        } else {
            warnings.push("Weight and height are required to compute BMI".to_string());
            None
        };

        let waist_hip_ratio = match (m.waist_cm, m.hip_cm) {
            (Some(waist), Some(hip)) => Some(calculate_rcq(waist, hip)).filter(|r| *r > 0.0),
            _ => None,
        };

        let body_fat_percent = match (gender, present_opt(m.waist_cm), present_opt(m.neck_cm)) {
            (None, _, _) => {
                warnings.push("Gender is not set; body fat and waist-hip risk were not classified".to_string());
                None
            }
            (Some(_), None, _) | (Some(_), _, None) => {
                warnings.push("Waist and neck circumferences are required to estimate body fat".to_string());
                None
            }
            (Some(Gender::Female), Some(_), Some(_)) if present_opt(m.hip_cm).is_none() => {
                warnings.push("Hip circumference is required to estimate body fat for women".to_string());
                None
            }
            (Some(g), Some(waist), Some(neck)) => {
                let estimate = calculate_body_fat_navy(g, m.height_cm, waist, neck, m.hip_cm);
                if estimate.is_none() {
                    warnings.push("Body fat could not be estimated from these circumferences".to_string());
                }
                estimate
            }
        };

        Self {
            bmi,
            bmi_class,
            body_fat_percent,
            body_fat_class: gender
                .zip(body_fat_percent)
                .map(|(g, pct)| classify_body_fat(g, pct)),
            waist_hip_ratio,
            waist_hip_class: gender
                .zip(waist_hip_ratio)
                .map(|(g, ratio)| classify_rcq(g, ratio)),
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmi_reference_value() {
        assert_eq!(calculate_bmi(70.0, 175.0), 22.86);
    }

    #[test]
    fn test_bmi_missing_inputs() {
        assert_eq!(calculate_bmi(0.0, 175.0), 0.0);
        assert_eq!(calculate_bmi(70.0, 0.0), 0.0);
        assert_eq!(calculate_bmi(f64::NAN, 175.0), 0.0);
        assert_eq!(calculate_bmi(70.0, -1.0), 0.0);
    }

    #[test]
    fn test_navy_male() {
        let body_fat = calculate_body_fat_navy(Gender::Male, 175.0, 90.0, 38.0, None).unwrap();
        assert!((body_fat - 20.65).abs() < 0.05, "got {body_fat}");
    }

    #[test]
    fn test_navy_female_requires_hip() {
        assert_eq!(calculate_body_fat_navy(Gender::Female, 165.0, 80.0, 34.0, None), None);

        let body_fat = calculate_body_fat_navy(Gender::Female, 165.0, 80.0, 34.0, Some(100.0)).unwrap();
        assert!(body_fat > 20.0 && body_fat < 40.0, "got {body_fat}");
    }

    #[test]
    fn test_navy_non_positive_girth() {
        assert_eq!(calculate_body_fat_navy(Gender::Male, 175.0, 38.0, 38.0, None), None);
        assert_eq!(calculate_body_fat_navy(Gender::Male, 175.0, 30.0, 38.0, None), None);
    }

    #[test]
    fn test_rcq() {
        assert_eq!(calculate_rcq(80.0, 100.0), 0.8);
        assert_eq!(calculate_rcq(80.0, 0.0), 0.0);
    }

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(classify_bmi(18.49).label, "Underweight");
        assert_eq!(classify_bmi(18.5).label, "Normal weight");
        assert_eq!(classify_bmi(24.99).label, "Normal weight");
        assert_eq!(classify_bmi(25.0).label, "Overweight");
        assert_eq!(classify_bmi(40.0).label, "Obesity class III");

        assert_eq!(classify_body_fat(Gender::Male, 13.9).label, "Athletes");
        assert_eq!(classify_body_fat(Gender::Female, 13.9).label, "Essential fat");
        assert_eq!(classify_body_fat(Gender::Female, 32.0).label, "Obese");

        assert_eq!(classify_rcq(Gender::Male, 0.89).label, "Low risk");
        assert_eq!(classify_rcq(Gender::Female, 0.82).label, "Moderate risk");
        assert_eq!(classify_rcq(Gender::Female, 0.85).label, "High risk");
    }

    #[test]
    fn test_ideal_weight_spread() {
        let weight = calculate_ideal_weight(175.0, Gender::Male);
        assert!(weight.min < weight.ideal && weight.ideal < weight.max);
        assert_eq!(weight.min, weight.ideal * 0.9);
        assert_eq!(weight.max, weight.ideal * 1.1);
        assert_eq!(weight.ideal, 68.9);
    }

    #[test]
    fn test_ideal_weight_short_height_uses_bmi_baseline() {
        // 140 cm is below five feet
        let weight = calculate_ideal_weight(140.0, Gender::Female);
        assert_eq!(weight.ideal, 43.1);
    }

    #[test]
    fn test_ideal_weight_missing_height() {
        let weight = calculate_ideal_weight(0.0, Gender::Female);
        assert_eq!(weight, IdealWeight { min: 0.0, ideal: 0.0, max: 0.0 });
    }

    #[test]
    fn test_metrics_warn_on_missing_hip_for_women() {
        let measurements = Measurements {
            weight_kg: 60.0,
            height_cm: 165.0,
            waist_cm: Some(80.0),
            hip_cm: None,
            neck_cm: Some(34.0),
        };

        let metrics = AssessmentMetrics::compute(Some(Gender::Female), &measurements);
        assert_eq!(metrics.body_fat_percent, None);
        assert_eq!(metrics.waist_hip_ratio, None);
        assert_eq!(metrics.warnings.len(), 1);
        assert!(metrics.bmi > 0.0);
    }

    #[test]
    fn test_metrics_leave_bmi_unclassified_without_weight() {
        let measurements = Measurements {
            weight_kg: 0.0,
            height_cm: 170.0,
            waist_cm: None,
            hip_cm: None,
            neck_cm: None,
        };

        let metrics = AssessmentMetrics::compute(Some(Gender::Male), &measurements);
        assert_eq!(metrics.bmi, 0.0);
        assert_eq!(metrics.bmi_class, None);
        assert!(metrics.warnings.iter().any(|w| w.contains("BMI")));
    }

    #[test]
    fn test_metrics_full_male() {
        let measurements = Measurements {
            weight_kg: 82.0,
            height_cm: 180.0,
            waist_cm: Some(88.0),
            hip_cm: Some(98.0),
            neck_cm: Some(39.0),
        };

        let metrics = AssessmentMetrics::compute(Some(Gender::Male), &measurements);
        assert!(metrics.body_fat_percent.is_some());
        assert_eq!(metrics.waist_hip_ratio, Some(0.9));
        assert_eq!(metrics.waist_hip_class.map(|c| c.label), Some("Moderate risk"));
        assert!(metrics.warnings.is_empty());
    }
}
