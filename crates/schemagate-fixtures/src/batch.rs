//! Concurrent refresh of every fixture module
//!
//! Each unit targets its own table, so units run as independent tokio tasks
//! with no ordering between them. A failing unit is logged and reported; it
//! never cancels its siblings.

use crate::generator::{FixtureError, FixtureRefresher, RefreshOutcome, RowGenerator};
use schemagate_db::TableHandle;
use tokio::task::JoinHandle;

/// A refresh that can be scheduled alongside refreshes of other row types
#[async_trait::async_trait]
pub trait RefreshUnit: Send {
    fn table(&self) -> &TableHandle;

    async fn refresh(&mut self) -> Result<RefreshOutcome, FixtureError>;
}

#[async_trait::async_trait]
impl<G> RefreshUnit for FixtureRefresher<G>
where
    G: RowGenerator + 'static,
{
    fn table(&self) -> &TableHandle {
        FixtureRefresher::table(self)
    }

    async fn refresh(&mut self) -> Result<RefreshOutcome, FixtureError> {
        FixtureRefresher::refresh(self).await
    }
}

/// Result of one unit in a batch
#[derive(Debug)]
pub struct UnitReport {
    pub table: TableHandle,
    pub result: Result<RefreshOutcome, FixtureError>,
}

impl UnitReport {
    /// True when the table now holds freshly generated rows
    pub fn is_success(&self) -> bool {
        matches!(self.result, Ok(RefreshOutcome::Refreshed { .. }))
    }
}

/// Refresh every unit concurrently; reports come back in the order the
/// units were given
pub async fn refresh_all(units: Vec<Box<dyn RefreshUnit>>) -> Vec<UnitReport> {
    let handles: Vec<(TableHandle, JoinHandle<Result<RefreshOutcome, FixtureError>>)> = units
        .into_iter()
        .map(|mut unit| {
            let table = unit.table().clone();
            (table, tokio::spawn(async move { unit.refresh().await }))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (table, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(FixtureError::Task {
                table: table.to_string(),
                message: e.to_string(),
            }),
        };

        match &result {
            Ok(outcome) => tracing::debug!(table = %table, ?outcome, "refresh unit finished"),
            Err(e) => tracing::error!(table = %table, error = %e, "refresh unit failed"),
        }
        reports.push(UnitReport { table, result });
    }

    reports
}
