//! Spreadsheet sync: read once, plan the upsert, then update and append.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::info;

use ads_core::upsert::{data_range, plan_upsert, FIRST_DATA_ROW, SHEET_HEADERS};
use ads_core::{AdRecord, SyncContext};

use crate::sheets::{RangeValues, SheetStore, SheetsError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub updated: usize,
    pub added: usize,
}

pub fn sync_timestamp(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Merge `records` into `sheet`.
///
/// Steps run strictly in order: the read completes before any write, and
/// the batch update completes before the append, so appended rows never
/// land inside a range computed from the read. Nothing is rolled back if a
/// later step fails.
pub async fn sync_records(
    store: &dyn SheetStore,
    sheet: &str,
    records: &[AdRecord],
    ctx: &SyncContext<'_>,
) -> Result<SyncOutcome, SheetsError> {
    let range = data_range(sheet);

    let existing = match store.read_rows(&range).await? {
        Some(rows) => rows,
        None => {
            store.create_sheet(sheet, &SHEET_HEADERS).await?;
            Vec::new()
        }
    };

    let plan = plan_upsert(&existing, FIRST_DATA_ROW, records, ctx);
    info!(
        sheet,
        existing_rows = existing.len(),
        updates = plan.updates.len(),
        appends = plan.appends.len(),
        written = plan.records_written(),
        "sync planned"
    );

    if plan.is_empty() {
        return Ok(SyncOutcome::default());
    }

    if !plan.updates.is_empty() {
        let updates: Vec<RangeValues> = plan
            .updates
            .iter()
            .map(|update| RangeValues {
                range: update.range(sheet),
                values: vec![update.row.to_cells()],
            })
            .collect();
        store.batch_update(&updates).await?;
    }

    if !plan.appends.is_empty() {
        let rows: Vec<_> = plan.appends.iter().map(|row| row.to_cells()).collect();
        store.append(&range, &rows).await?;
    }

    Ok(SyncOutcome {
        updated: plan.updates.len(),
        added: plan.appends.len(),
    })
}
