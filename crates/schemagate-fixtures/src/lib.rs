//! Deterministic fixture data for schema modules
//!
//! Every schema module with test data contributes a [`RowGenerator`]. A
//! [`FixtureRefresher`] clears the module's table and writes a freshly
//! generated, seeded set of rows; [`refresh_all`] does that for every module
//! at once.
//!
//! ## Example
//!
//! ```rust,ignore
//! use schemagate_fixtures::{all_units, refresh_all, FixtureOptions};
//!
//! let options = FixtureOptions::new(chrono::Utc::now());
//! let reports = refresh_all(all_units(&options, store)).await;
//! ```

pub mod batch;
pub mod equation;
pub mod generator;

pub use batch::{refresh_all, RefreshUnit, UnitReport};
pub use equation::{
    equation_refresher, format_decimal, parse_reference_time, EquationGenerator, EquationRow,
    Operation,
};
pub use generator::{
    round_to_two_decimal_places, FixtureError, FixtureRefresher, RefreshOutcome, RowGenerator,
};

use chrono::{DateTime, Utc};
use schemagate_db::TableStore;
use std::sync::Arc;

/// Overrides applied to every fixture module
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureOptions {
    /// Seed for every module instead of its own default
    pub seed: Option<u64>,

    /// Row count for every module instead of its own default
    pub rows: Option<usize>,

    /// Generated timestamps fall in the year before this instant
    pub reference: DateTime<Utc>,
}

impl FixtureOptions {
    pub fn new(reference: DateTime<Utc>) -> Self {
        Self {
            seed: None,
            rows: None,
            reference,
        }
    }
}

/// One refresh unit per schema module with fixtures
pub fn all_units(options: &FixtureOptions, store: Arc<dyn TableStore>) -> Vec<Box<dyn RefreshUnit>> {
    vec![Box::new(equation_refresher(
        options.seed.unwrap_or(equation::DEFAULT_SEED),
        options.rows.unwrap_or(equation::DEFAULT_ROWS),
        options.reference,
        store,
    ))]
}
