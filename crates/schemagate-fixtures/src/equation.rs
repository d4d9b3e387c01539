//! Fixture rows for the `equation` table
//!
//! Each row is a small arithmetic problem with its answer. Operands are drawn
//! from `[0.1, 100.0]` and, like the result, rounded to two decimals. An
//! operation that is undefined for the drawn operands falls back to addition
//! so that no invalid row is ever written.

use crate::generator::{round_to_two_decimal_places, FixtureError, FixtureRefresher, RowGenerator};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use schemagate_db::{TableHandle, TableStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const EQUATION_TABLE: &str = "equation";
pub const DEFAULT_SEED: u64 = 1;
pub const DEFAULT_ROWS: usize = 25;

const OPERAND_MIN: f64 = 0.1;
const OPERAND_MAX: f64 = 100.0;
const MILLIS_PER_YEAR: i64 = 365 * 24 * 60 * 60 * 1000;

/// Arithmetic operation, stored as its symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [Self::Add, Self::Subtract, Self::Multiply, Self::Divide];

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }

    /// `None` when the operation is undefined for these operands
    pub fn apply(&self, a: f64, b: f64) -> Option<f64> {
        match self {
            Self::Add => Some(a + b),
            Self::Subtract => Some(a - b),
            Self::Multiply => Some(a * b),
            Self::Divide if b == 0.0 => None,
            Self::Divide => Some(a / b),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One `equation` row; decimals are carried as strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationRow {
    /// Existing databases name this column `date`, which `check-identifiers`
    /// would reject in a new schema; fixtures keep writing to it as is
    pub date: DateTime<Utc>,

    #[serde(rename = "varA")]
    pub var_a: String,

    pub operation: Operation,

    #[serde(rename = "varB")]
    pub var_b: String,

    pub result: String,
}

/// Generates [`EquationRow`]s dated within the year before `reference`
#[derive(Debug, Clone)]
pub struct EquationGenerator {
    reference: DateTime<Utc>,
}

impl EquationGenerator {
    pub fn new(reference: DateTime<Utc>) -> Self {
        Self { reference }
    }

    /// Resolve the operation and result, falling back to addition when the
    /// drawn operation is undefined
    pub fn solve(operation: Operation, a: f64, b: f64) -> (Operation, f64) {
        match operation.apply(a, b) {
            Some(result) => (operation, result),
            None => (Operation::Add, a + b),
        }
    }
}

impl RowGenerator for EquationGenerator {
    type Row = EquationRow;

    fn generate_row(&mut self, rng: &mut ChaCha8Rng) -> EquationRow {
        let offset = rng.random_range(1..=MILLIS_PER_YEAR);
        let date = self.reference - Duration::milliseconds(offset);

        let var_a = round_to_two_decimal_places(rng.random_range(OPERAND_MIN..=OPERAND_MAX));
        let var_b = round_to_two_decimal_places(rng.random_range(OPERAND_MIN..=OPERAND_MAX));
        let drawn = Operation::ALL[rng.random_range(0..Operation::ALL.len())];

        let (operation, result) = Self::solve(drawn, var_a, var_b);

        EquationRow {
            date,
            var_a: format_decimal(var_a),
            operation,
            var_b: format_decimal(var_b),
            result: format_decimal(round_to_two_decimal_places(result)),
        }
    }
}

/// Shortest round-trip decimal text; negative zero is written as `0`
pub fn format_decimal(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

/// Parse a reference time given as RFC 3339 or as a `YYYY-MM-DD` date
/// (midnight UTC)
pub fn parse_reference_time(value: &str) -> Result<DateTime<Utc>, FixtureError> {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        FixtureError::InvalidReferenceTime {
            value: value.to_string(),
            message: e.to_string(),
        }
    })?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Refresher for the `equation` table
pub fn equation_refresher(
    seed: u64,
    row_count: usize,
    reference: DateTime<Utc>,
    store: Arc<dyn TableStore>,
) -> FixtureRefresher<EquationGenerator> {
    FixtureRefresher::new(
        seed,
        TableHandle::new(EQUATION_TABLE),
        row_count,
        EquationGenerator::new(reference),
        store,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn reference() -> DateTime<Utc> {
        parse_reference_time("2024-06-01T00:00:00Z").unwrap()
    }

    #[test]
    fn division_by_zero_falls_back_to_addition() {
        assert_eq!(EquationGenerator::solve(Operation::Divide, 4.5, 0.0), (Operation::Add, 4.5));
        assert_eq!(EquationGenerator::solve(Operation::Divide, 5.0, 2.0), (Operation::Divide, 2.5));
    }

    #[test]
    fn rows_stay_in_range() {
        let mut generator = EquationGenerator::new(reference());
        let mut rng = ChaCha8Rng::seed_from_u64(DEFAULT_SEED);
        let year_before = reference() - Duration::days(365);

        for _ in 0..200 {
            let row = generator.generate_row(&mut rng);
            let a: f64 = row.var_a.parse().unwrap();
            let b: f64 = row.var_b.parse().unwrap();

            assert!((OPERAND_MIN..=OPERAND_MAX).contains(&a));
            assert!((OPERAND_MIN..=OPERAND_MAX).contains(&b));
            assert!(row.date < reference() && row.date >= year_before);
        }
    }

    #[test]
    fn serialized_column_names() {
        let mut generator = EquationGenerator::new(reference());
        let row = generator.generate_row(&mut ChaCha8Rng::seed_from_u64(3));
        let value = serde_json::to_value(&row).unwrap();

        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["date", "operation", "result", "varA", "varB"]);
        assert!(["+", "-", "*", "/"].contains(&value["operation"].as_str().unwrap()));
    }

    #[test]
    fn decimal_text() {
        assert_eq!(format_decimal(12.5), "12.5");
        assert_eq!(format_decimal(3.0), "3");
        assert_eq!(format_decimal(-0.0), "0");
        assert_eq!(format_decimal(-4.25), "-4.25");
    }

    #[test]
    fn reference_time_formats() {
        assert_eq!(parse_reference_time("2024-06-01").unwrap(), reference());
        assert!(matches!(
            parse_reference_time("June 1st"),
            Err(FixtureError::InvalidReferenceTime { .. })
        ));
    }
}
