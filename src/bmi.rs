//! BMI calculation and classification on the Vietnamese/Asian scale.

use std::fmt;

/// Body-mass index from weight in kilograms and height in centimetres.
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some(weight_kg / (height_m * height_m))
}

/// Parse a BMI value as stored alongside a health record.
///
/// Stored values are strings; anything non-numeric or outside `(0, 100)` is
/// treated as absent.
pub fn parse_bmi(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (value > 0.0 && value < 100.0).then_some(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmiClass {
    Underweight,
    Normal,
    Fit,
    ObeseI,
    ObeseII,
    ObeseIII,
}

impl BmiClass {
    pub fn from_value(bmi: f64) -> Self {
        match bmi {
            v if v < 18.5 => BmiClass::Underweight,
            v if v < 22.9 => BmiClass::Normal,
            v if v < 24.9 => BmiClass::Fit,
            v if v < 29.9 => BmiClass::ObeseI,
            v if v < 35.0 => BmiClass::ObeseII,
            _ => BmiClass::ObeseIII,
        }
    }
}

impl fmt::Display for BmiClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BmiClass::Underweight => "Gầy",
            BmiClass::Normal => "Bình thường",
            BmiClass::Fit => "Thể chất tốt",
            BmiClass::ObeseI => "Béo phì độ I",
            BmiClass::ObeseII => "Béo phì độ II",
            BmiClass::ObeseIII => "Béo phì độ III",
        };
        f.write_str(label)
    }
}
