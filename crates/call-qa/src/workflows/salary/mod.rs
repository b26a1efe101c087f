//! KPI-based operator salary: points from monthly indicators, a premium on top of the
//! hourly base, and fixed bonuses.

mod payload;
pub mod router;

pub use payload::SalaryResultPayload;
pub use router::salary_router;

use serde::{Deserialize, Serialize};

pub const HOURLY_RATE: f64 = 700.0;
pub const TRAINING_BONUS: f64 = 6000.0;
pub const REFERRAL_BONUS: f64 = 5000.0;
pub const FILMING_BONUS: f64 = 5000.0;

/// Share of the hours norm below which the premium is cut.
const FULL_PREMIUM_HOURS_PERCENT: f64 = 90.0;
const REDUCED_PREMIUM_COEFFICIENT: f64 = 0.75;
const MAX_MONTH_HOURS: f64 = 744.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceBand {
    #[serde(rename = "0-2")]
    UpToTwoMonths,
    #[serde(rename = "3-5")]
    ThreeToFiveMonths,
    #[serde(rename = "6-9")]
    SixToNineMonths,
    #[serde(rename = "10-12")]
    TenToTwelveMonths,
    #[serde(rename = "13-17")]
    ThirteenToSeventeenMonths,
    #[serde(rename = "18+")]
    EighteenMonthsPlus,
}

impl ExperienceBand {
    pub fn from_months(months: u32) -> Self {
        match months {
            0..=2 => Self::UpToTwoMonths,
            3..=5 => Self::ThreeToFiveMonths,
            6..=9 => Self::SixToNineMonths,
            10..=12 => Self::TenToTwelveMonths,
            13..=17 => Self::ThirteenToSeventeenMonths,
            _ => Self::EighteenMonthsPlus,
        }
    }

    pub const fn points(self) -> f64 {
        match self {
            Self::UpToTwoMonths => 5.0,
            Self::ThreeToFiveMonths => 10.0,
            Self::SixToNineMonths => 15.0,
            Self::TenToTwelveMonths => 25.0,
            Self::ThirteenToSeventeenMonths => 35.0,
            Self::EighteenMonthsPlus => 50.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::UpToTwoMonths => "0-2",
            Self::ThreeToFiveMonths => "3-5",
            Self::SixToNineMonths => "6-9",
            Self::TenToTwelveMonths => "10-12",
            Self::ThirteenToSeventeenMonths => "13-17",
            Self::EighteenMonthsPlus => "18+",
        }
    }
}

/// Monthly indicators feeding the KPI points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiInputs {
    pub experience: ExperienceBand,
    pub quality_percent: f64,
    pub average_score: f64,
    pub response_minutes: f64,
    pub chats_per_hour: f64,
    pub hours_norm: f64,
    pub hours_worked: f64,
}

/// Fixed bonuses; a flagged referral or filming bonus carries its count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BonusInputs {
    #[serde(default)]
    pub training: bool,
    #[serde(default)]
    pub referrals: Option<u32>,
    #[serde(default)]
    pub filming: Option<u32>,
}

impl BonusInputs {
    pub fn total(&self) -> f64 {
        let mut total = 0.0;
        if self.training {
            total += TRAINING_BONUS;
        }
        total += REFERRAL_BONUS * f64::from(self.referrals.unwrap_or(0));
        total += FILMING_BONUS * f64::from(self.filming.unwrap_or(0));
        total
    }
}

/// Calculation result in its normalized shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SalaryBreakdown {
    pub kpi_points: f64,
    pub premium_coefficient: f64,
    pub hours_norm: f64,
    pub hours_percentage: f64,
    pub hours_worked: f64,
    pub base_salary: f64,
    pub premium_part: f64,
    pub bonuses: f64,
    pub final_salary: f64,
}

pub fn kpi_points(inputs: &KpiInputs) -> f64 {
    inputs.experience.points()
        + quality_points(inputs.quality_percent)
        + score_points(inputs.average_score)
        + response_points(inputs.response_minutes)
        + chat_points(inputs.chats_per_hour)
}

fn quality_points(percent: f64) -> f64 {
    match percent {
        p if p >= 97.0 => 25.0,
        p if p >= 94.0 => 20.0,
        p if p >= 90.0 => 15.0,
        p if p >= 86.0 => 10.0,
        p if p >= 80.0 => 5.0,
        _ => 0.0,
    }
}

fn score_points(average: f64) -> f64 {
    match average {
        s if s >= 4.9 => 30.0,
        s if s >= 4.8 => 25.0,
        s if s >= 4.7 => 20.0,
        s if s >= 4.6 => 10.0,
        s if s >= 4.5 => 5.0,
        _ => 0.0,
    }
}

fn response_points(minutes: f64) -> f64 {
    match minutes {
        m if m <= 2.0 => 20.0,
        m if m <= 3.0 => 15.0,
        m if m <= 4.0 => 10.0,
        m if m <= 4.5 => 5.0,
        _ => 0.0,
    }
}

fn chat_points(per_hour: f64) -> f64 {
    match per_hour {
        c if c >= 25.0 => 25.0,
        c if c >= 20.0 => 15.0,
        c if c >= 15.0 => 10.0,
        c if c >= 10.0 => 5.0,
        _ => 0.0,
    }
}

/// Premium coefficient for a share of the hours norm, in percent.
pub fn premium_coefficient(hours_percentage: f64) -> f64 {
    if hours_percentage >= FULL_PREMIUM_HOURS_PERCENT {
        1.0
    } else {
        REDUCED_PREMIUM_COEFFICIENT
    }
}

pub fn calculate(
    inputs: &KpiInputs,
    bonuses: &BonusInputs,
) -> Result<SalaryBreakdown, SalaryInputError> {
    check_range("quality_percent", inputs.quality_percent, 0.0, 100.0)?;
    check_range("average_score", inputs.average_score, 0.0, 5.0)?;
    check_range("response_minutes", inputs.response_minutes, 0.0, 60.0)?;
    check_range("chats_per_hour", inputs.chats_per_hour, 0.0, 100.0)?;
    check_range("hours_norm", inputs.hours_norm, 0.0, MAX_MONTH_HOURS)?;
    check_range("hours_worked", inputs.hours_worked, 0.0, MAX_MONTH_HOURS)?;
    check_count("referrals", bonuses.referrals)?;
    check_count("filming", bonuses.filming)?;

    let kpi_points = kpi_points(inputs);
    let hours_percentage = if inputs.hours_norm > 0.0 {
        inputs.hours_worked / inputs.hours_norm * 100.0
    } else {
        0.0
    };
    let premium_coefficient = premium_coefficient(hours_percentage);
    let base_salary = HOURLY_RATE * inputs.hours_worked;
    let premium_part = base_salary * kpi_points / 100.0 * premium_coefficient;
    let bonuses = bonuses.total();

    Ok(SalaryBreakdown {
        kpi_points,
        premium_coefficient,
        hours_norm: inputs.hours_norm,
        hours_percentage,
        hours_worked: inputs.hours_worked,
        base_salary,
        premium_part,
        bonuses,
        final_salary: base_salary + premium_part + bonuses,
    })
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), SalaryInputError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SalaryInputError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn check_count(field: &'static str, count: Option<u32>) -> Result<(), SalaryInputError> {
    match count {
        Some(0) => Err(SalaryInputError::EmptyBonusCount { field }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SalaryInputError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} bonus is selected but its count is zero")]
    EmptyBonusCount { field: &'static str },
}
