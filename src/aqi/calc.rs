//! US EPA PM2.5 air quality index.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AqiError {
    #[error("pm2.5 concentration must be a finite, non-negative number (got {0})")]
    InvalidInput(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Aqi {
    pub value: u32,
    pub category: AqiCategory,
}

struct Breakpoint {
    conc_low: f64,
    conc_high: f64,
    aqi_low: f64,
    aqi_high: f64,
    category: AqiCategory,
}

const fn bp(
    conc_low: f64,
    conc_high: f64,
    aqi_low: f64,
    aqi_high: f64,
    category: AqiCategory,
) -> Breakpoint {
    Breakpoint {
        conc_low,
        conc_high,
        aqi_low,
        aqi_high,
        category,
    }
}

// Segments are not continuous at the joins (12.0 -> 12.1, 50 -> 51, ...);
// this is the published table, left as is. The last segment is extrapolated
// past its upper bound.
static BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 12.0, 0.0, 50.0, AqiCategory::Good),
    bp(12.1, 35.4, 51.0, 100.0, AqiCategory::Moderate),
    bp(35.5, 55.4, 101.0, 150.0, AqiCategory::UnhealthyForSensitiveGroups),
    bp(55.5, 150.4, 151.0, 200.0, AqiCategory::Unhealthy),
    bp(150.5, 250.4, 201.0, 300.0, AqiCategory::VeryUnhealthy),
    bp(250.5, 500.0, 301.0, 400.0, AqiCategory::Hazardous),
];

/// AQI for a PM2.5 concentration in µg/m³.
///
/// A value sitting exactly on a breakpoint belongs to the lower segment.
pub fn compute(pm25: f64) -> Result<Aqi, AqiError> {
    if !pm25.is_finite() || pm25 < 0.0 {
        return Err(AqiError::InvalidInput(pm25));
    }

    let last = &BREAKPOINTS[BREAKPOINTS.len() - 1];
    let seg = BREAKPOINTS
        .iter()
        .find(|b| pm25 <= b.conc_high)
        .unwrap_or(last);

    let slope = (seg.aqi_high - seg.aqi_low) / (seg.conc_high - seg.conc_low);
    let raw = slope * (pm25 - seg.conc_low) + seg.aqi_low;

    Ok(Aqi {
        // Gap values (e.g. 12.05) land slightly below aqi_low of their
        // segment; rounding still keeps the sequence non-decreasing.
        value: raw.round().max(0.0) as u32,
        category: seg.category,
    })
}
