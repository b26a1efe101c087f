use serde::Deserialize;

use super::{premium_coefficient, SalaryBreakdown, HOURLY_RATE};

/// Salary result as stored by earlier calculator versions, which used both
/// camelCase and snake_case names for the same figures.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SalaryResultPayload {
    #[serde(default, alias = "kpi_points")]
    pub points: Option<f64>,
    #[serde(default, rename = "premiumCoefficient", alias = "premium_coefficient")]
    pub premium_coefficient: Option<f64>,
    #[serde(default, rename = "hoursNorm", alias = "hours_norm")]
    pub hours_norm: Option<f64>,
    #[serde(default, rename = "hoursPercentage", alias = "hours_percentage")]
    pub hours_percentage: Option<f64>,
    #[serde(default, rename = "hoursWorked", alias = "hours_worked", alias = "hours")]
    pub hours_worked: Option<f64>,
    #[serde(default, rename = "baseSalary", alias = "base_salary")]
    pub base_salary: Option<f64>,
    #[serde(default, rename = "premiumPart", alias = "premium_part")]
    pub premium_part: Option<f64>,
    #[serde(default, alias = "bonuses_amount", alias = "bonus")]
    pub bonuses: Option<f64>,
    #[serde(default, rename = "finalSalary", alias = "final_salary")]
    pub final_salary: Option<f64>,
}

impl SalaryResultPayload {
    /// Fill the gaps the way the result card does: hours worked default to the norm,
    /// a missing or zero base and premium are recomputed, and the coefficient drops to
    /// 0.75 whenever the norm was not met.
    pub fn normalize(&self) -> SalaryBreakdown {
        let kpi_points = finite(self.points).unwrap_or(0.0);
        let hours_norm = finite(self.hours_norm).unwrap_or(0.0);
        let hours_percentage = finite(self.hours_percentage).unwrap_or(0.0);
        let hours_worked = finite(self.hours_worked).unwrap_or(hours_norm);

        let premium_coefficient = match premium_coefficient(hours_percentage) {
            full if full >= 1.0 => nonzero(self.premium_coefficient).unwrap_or(full),
            reduced => reduced,
        };

        let base_salary = nonzero(self.base_salary).unwrap_or(hours_worked * HOURLY_RATE);
        let premium_part = nonzero(self.premium_part)
            .unwrap_or(base_salary * kpi_points / 100.0 * premium_coefficient);
        let bonuses = finite(self.bonuses).unwrap_or(0.0);
        let final_salary =
            nonzero(self.final_salary).unwrap_or(base_salary + premium_part + bonuses);

        SalaryBreakdown {
            kpi_points,
            premium_coefficient,
            hours_norm,
            hours_percentage,
            hours_worked,
            base_salary,
            premium_part,
            bonuses,
            final_salary,
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn nonzero(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v != 0.0)
}
