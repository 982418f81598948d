//! Name-keyed upsert of ad records into spreadsheet rows.
//!
//! Existing rows are indexed by ad name (column C). For every incoming
//! record the additive metrics (reach, impressions, clicks, spend) are
//! summed with the stored row while the rates (CPC, CTR) and descriptive
//! cells are overwritten. Rows whose name is already stored become targeted
//! updates; the rest are appended.
//!
//! The key is the display name, not the ad id: two different ads sharing a
//! name are merged into one row.

use std::collections::HashMap;

use serde_json::Value;

use crate::metric::{parse_amount, parse_count, round2};
use crate::model::AdRecord;

pub const SHEET_HEADERS: [&str; 11] = [
    "Last Sync",
    "Account ID",
    "Ad Name",
    "Status",
    "Reach",
    "Impressions",
    "Clicks",
    "CPC",
    "CTR",
    "Spend",
    "Image URL",
];

/// Sheet row number of the first data row (row 1 holds the headers).
pub const FIRST_DATA_ROW: usize = 2;

pub const FIRST_COLUMN: char = 'A';
pub const LAST_COLUMN: char = 'K';

const NAME_COLUMN: usize = 2;
static NULL_CELL: Value = Value::Null;
const UNNAMED: &str = "Unnamed";
const UNKNOWN_STATUS: &str = "UNKNOWN";

/// Values stamped onto every row written by one sync call.
#[derive(Debug, Clone, Copy)]
pub struct SyncContext<'a> {
    pub synced_at: &'a str,
    pub account_id: Option<&'a str>,
}

/// One spreadsheet row, columns A..K.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    pub synced_at: String,
    pub account_id: String,
    pub ad_name: String,
    pub status: String,
    pub reach: u64,
    pub impressions: u64,
    pub clicks: u64,
    pub cpc: f64,
    pub ctr: f64,
    pub spend: f64,
    pub image_url: String,
}

impl SheetRow {
    fn named(ad_name: &str) -> Self {
        Self {
            ad_name: ad_name.to_string(),
            ..Self::default()
        }
    }

    /// Read a stored row. Short rows and unparsable cells read as empty / zero.
    pub fn from_cells(cells: &[Value]) -> Self {
        let cell = |idx: usize| cells.get(idx).unwrap_or(&NULL_CELL);
        Self {
            synced_at: cell_text(cell(0)),
            account_id: cell_text(cell(1)),
            ad_name: cell_text(cell(2)),
            status: cell_text(cell(3)),
            reach: parse_count(cell(4)),
            impressions: parse_count(cell(5)),
            clicks: parse_count(cell(6)),
            cpc: parse_amount(cell(7)),
            ctr: parse_amount(cell(8)),
            spend: non_negative(parse_amount(cell(9))),
            image_url: cell_text(cell(10)),
        }
    }

    pub fn to_cells(&self) -> Vec<Value> {
        vec![
            Value::from(self.synced_at.as_str()),
            Value::from(self.account_id.as_str()),
            Value::from(self.ad_name.as_str()),
            Value::from(self.status.as_str()),
            Value::from(self.reach),
            Value::from(self.impressions),
            Value::from(self.clicks),
            Value::from(round2(self.cpc)),
            Value::from(round2(self.ctr)),
            Value::from(round2(self.spend)),
            Value::from(self.image_url.as_str()),
        ]
    }

    /// Fold one fetched record into this row.
    fn absorb(&mut self, record: &AdRecord, ctx: &SyncContext<'_>) {
        self.synced_at = ctx.synced_at.to_string();
        if let Some(account_id) = ctx.account_id {
            self.account_id = account_id.to_string();
        }
        self.status = record
            .current_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string());

        self.reach = self.reach.saturating_add(record.reach);
        self.impressions = self.impressions.saturating_add(record.impressions);
        self.clicks = self.clicks.saturating_add(record.clicks);
        self.spend = round2(non_negative(self.spend) + non_negative(record.spend));

        self.cpc = round2(finite(record.cpc));
        self.ctr = round2(finite(record.ctr));

        if let Some(url) = record.image_url.as_deref().filter(|u| !u.is_empty()) {
            self.image_url = url.to_string();
        }
    }
}

/// A full-row write to an existing sheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    /// 1-based sheet row number.
    pub row_number: usize,
    pub row: SheetRow,
}

impl RowUpdate {
    /// A1 range covering the row, e.g. `'Meta Ads Data'!A5:K5`.
    pub fn range(&self, sheet: &str) -> String {
        row_range(sheet, self.row_number)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertPlan {
    pub updates: Vec<RowUpdate>,
    pub appends: Vec<SheetRow>,
}

impl UpsertPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.appends.is_empty()
    }

    pub fn records_written(&self) -> usize {
        self.updates.len() + self.appends.len()
    }
}

/// Map ad name -> position in `existing`. First occurrence wins.
pub fn index_by_name(existing: &[Vec<Value>]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(existing.len());
    for (pos, cells) in existing.iter().enumerate() {
        let name = cells.get(NAME_COLUMN).map(cell_text).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        index.entry(name).or_insert(pos);
    }
    index
}

enum Target {
    Existing(usize),
    New,
}

/// Decide, per incoming record, between accumulating into a stored row and
/// appending a new one.
///
/// `existing` is the data range as read (row 0 is sheet row
/// `first_data_row`). Records repeating a name within one call fold into the
/// same pending row, so a single call never writes two rows for one name.
pub fn plan_upsert(
    existing: &[Vec<Value>],
    first_data_row: usize,
    incoming: &[AdRecord],
    ctx: &SyncContext<'_>,
) -> UpsertPlan {
    let index = index_by_name(existing);

    let mut pending: Vec<(Target, SheetRow)> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for record in incoming {
        let name = display_name(record);

        let slot = match by_name.get(name) {
            Some(&slot) => slot,
            None => {
                let entry = match index.get(name) {
                    Some(&pos) => (Target::Existing(pos), SheetRow::from_cells(&existing[pos])),
                    None => (Target::New, SheetRow::named(name)),
                };
                pending.push(entry);
                by_name.insert(name.to_string(), pending.len() - 1);
                pending.len() - 1
            }
        };

        pending[slot].1.absorb(record, ctx);
    }

    let mut plan = UpsertPlan::default();
    for (target, row) in pending {
        match target {
            Target::Existing(pos) => plan.updates.push(RowUpdate {
                row_number: first_data_row + pos,
                row,
            }),
            Target::New => plan.appends.push(row),
        }
    }
    plan
}

/// Quote a sheet title for A1 notation: `Meta Ads Data` -> `'Meta Ads Data'`.
pub fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// Range holding every data row of the sheet.
pub fn data_range(sheet: &str) -> String {
    format!(
        "{}!{FIRST_COLUMN}{FIRST_DATA_ROW}:{LAST_COLUMN}",
        quote_sheet(sheet)
    )
}

pub fn row_range(sheet: &str, row_number: usize) -> String {
    format!(
        "{}!{FIRST_COLUMN}{row_number}:{LAST_COLUMN}{row_number}",
        quote_sheet(sheet)
    )
}

pub fn header_range(sheet: &str) -> String {
    format!("{}!{FIRST_COLUMN}1", quote_sheet(sheet))
}

fn display_name(record: &AdRecord) -> &str {
    let name = record.ad_name.trim();
    if name.is_empty() {
        UNNAMED
    } else {
        name
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Accumulated amounts never go down: negative or non-finite input counts as 0.
fn non_negative(value: f64) -> f64 {
    finite(value).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AdStatus;
    use serde_json::json;

    const CTX: SyncContext<'static> = SyncContext {
        synced_at: "2026-10-15 09:00:00",
        account_id: Some("123"),
    };

    fn make_record(name: &str, reach: u64, clicks: u64, spend: f64, cpc: f64, ctr: f64) -> AdRecord {
        AdRecord {
            ad_id: format!("id-{name}"),
            ad_name: name.to_string(),
            effective_status: Some(AdStatus::Active),
            reach,
            impressions: reach * 2,
            clicks,
            spend,
            cpc,
            ctr,
            ..AdRecord::default()
        }
    }

    /// Apply a plan to an in-memory table the way the spreadsheet would.
    fn apply(table: &mut Vec<Vec<Value>>, plan: &UpsertPlan) {
        for update in &plan.updates {
            table[update.row_number - FIRST_DATA_ROW] = update.row.to_cells();
        }
        for row in &plan.appends {
            table.push(row.to_cells());
        }
    }

    #[test]
    fn test_new_name_always_appends() {
        let existing = vec![SheetRow::named("Other").to_cells()];
        let plan = plan_upsert(&existing, FIRST_DATA_ROW, &[make_record("Fresh", 10, 1, 1.0, 1.0, 2.0)], &CTX);

        assert!(plan.updates.is_empty());
        assert_eq!(plan.appends.len(), 1);
        assert_eq!(plan.appends[0].ad_name, "Fresh");
        assert_eq!(plan.appends[0].account_id, "123");
        assert_eq!(plan.appends[0].status, "ACTIVE");
    }

    #[test]
    fn test_second_sync_doubles_accumulating_metrics() {
        let record = make_record("Summer", 100, 4, 5.5, 1.38, 2.5);
        let mut table: Vec<Vec<Value>> = Vec::new();

        let first = plan_upsert(&table, FIRST_DATA_ROW, &[record.clone()], &CTX);
        apply(&mut table, &first);
        assert_eq!(table.len(), 1);

        let second = plan_upsert(&table, FIRST_DATA_ROW, &[record], &CTX);
        assert!(second.appends.is_empty());
        assert_eq!(second.updates.len(), 1);
        assert_eq!(second.updates[0].row_number, 2);
        apply(&mut table, &second);

        assert_eq!(table.len(), 1);
        let row = SheetRow::from_cells(&table[0]);
        assert_eq!(row.ad_name, "Summer");
        assert_eq!(row.reach, 200);
        assert_eq!(row.impressions, 400);
        assert_eq!(row.clicks, 8);
        assert!((row.spend - 11.0).abs() < 1e-9);
        // rates are overwritten, not summed
        assert!((row.cpc - 1.38).abs() < 1e-9);
        assert!((row.ctr - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_rates_take_latest_value() {
        let existing = vec![json!([
            "old", "123", "Summer", "PAUSED", 10, 20, 1, 9.99, 7.5, 3.0, "https://img/old"
        ])
        .as_array()
        .unwrap()
        .clone()];

        let plan = plan_upsert(&existing, FIRST_DATA_ROW, &[make_record("Summer", 5, 1, 1.0, 0.25, 1.2)], &CTX);
        let row = &plan.updates[0].row;

        assert_eq!(row.status, "ACTIVE");
        assert_eq!(row.reach, 15);
        assert!((row.spend - 4.0).abs() < 1e-9);
        assert!((row.cpc - 0.25).abs() < 1e-9);
        assert!((row.ctr - 1.2).abs() < 1e-9);
        assert_eq!(row.synced_at, CTX.synced_at);
        // no new image -> keep the stored one
        assert_eq!(row.image_url, "https://img/old");
    }

    #[test]
    fn test_negative_spend_never_lowers_stored_total() {
        let existing = vec![json!(["t", "123", "Summer", "ACTIVE", 10, 20, 1, 1.0, 1.0, 10.0, ""])
            .as_array()
            .unwrap()
            .clone()];
        let record: AdRecord =
            serde_json::from_value(json!({ "ad_name": "Summer", "spend": "-7.5" })).unwrap();

        let plan = plan_upsert(&existing, FIRST_DATA_ROW, &[record], &CTX);

        assert!((plan.updates[0].row.spend - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_stored_spend_reads_as_zero() {
        let existing = vec![json!(["t", "123", "Summer", "ACTIVE", 0, 0, 0, 0, 0, -4.0, ""])
            .as_array()
            .unwrap()
            .clone()];

        let plan = plan_upsert(&existing, FIRST_DATA_ROW, &[make_record("Summer", 1, 1, 2.0, 2.0, 1.0)], &CTX);

        assert!((plan.updates[0].row.spend - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_numeric_cells_read_as_zero() {
        let existing = vec![vec![
            json!("t"),
            json!("123"),
            json!("Summer"),
            json!("ACTIVE"),
            json!("lots"),
            json!(null),
            json!(""),
            json!("$1"),
            json!("1.5%"),
            json!("NaN"),
        ]];

        let plan = plan_upsert(&existing, FIRST_DATA_ROW, &[make_record("Summer", 7, 2, 2.0, 1.0, 3.0)], &CTX);
        let row = &plan.updates[0].row;

        assert_eq!(row.reach, 7);
        assert_eq!(row.impressions, 14);
        assert_eq!(row.clicks, 2);
        assert!((row.spend - 2.0).abs() < 1e-9);
        assert!(row.to_cells().iter().all(|c| !c.is_null()));
    }

    #[test]
    fn test_duplicate_stored_names_first_occurrence_wins() {
        let existing = vec![
            SheetRow::named("Dup").to_cells(),
            SheetRow::named("Other").to_cells(),
            SheetRow::named("Dup").to_cells(),
        ];

        let index = index_by_name(&existing);
        assert_eq!(index.get("Dup"), Some(&0));

        let plan = plan_upsert(&existing, FIRST_DATA_ROW, &[make_record("Dup", 1, 0, 0.0, 0.0, 0.0)], &CTX);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].row_number, 2);
    }

    #[test]
    fn test_repeated_name_in_one_call_folds_into_one_row() {
        let plan = plan_upsert(
            &[],
            FIRST_DATA_ROW,
            &[
                make_record("Twin", 10, 1, 1.0, 1.0, 1.0),
                make_record("Twin", 5, 1, 0.5, 0.5, 0.7),
            ],
            &CTX,
        );

        assert_eq!(plan.appends.len(), 1);
        assert_eq!(plan.appends[0].reach, 15);
        assert!((plan.appends[0].ctr - 0.7).abs() < 1e-9);
        assert_eq!(plan.records_written(), 1);
    }

    #[test]
    fn test_blank_name_and_status_defaults() {
        let record = AdRecord {
            ad_name: "  ".to_string(),
            ..AdRecord::default()
        };
        let ctx = SyncContext {
            synced_at: "now",
            account_id: None,
        };

        let plan = plan_upsert(&[], FIRST_DATA_ROW, &[record], &ctx);

        assert_eq!(plan.appends[0].ad_name, "Unnamed");
        assert_eq!(plan.appends[0].status, "UNKNOWN");
        assert_eq!(plan.appends[0].account_id, "");
    }

    #[test]
    fn test_update_row_numbers_follow_read_offset() {
        let existing = vec![
            SheetRow::named("A").to_cells(),
            SheetRow::named("B").to_cells(),
            SheetRow::named("C").to_cells(),
        ];

        let plan = plan_upsert(
            &existing,
            FIRST_DATA_ROW,
            &[
                make_record("C", 1, 0, 0.0, 0.0, 0.0),
                make_record("New", 1, 0, 0.0, 0.0, 0.0),
                make_record("A", 1, 0, 0.0, 0.0, 0.0),
            ],
            &CTX,
        );

        let rows: Vec<usize> = plan.updates.iter().map(|u| u.row_number).collect();
        assert_eq!(rows, vec![4, 2]);
        assert_eq!(plan.updates[0].range("Meta Ads Data"), "'Meta Ads Data'!A4:K4");
        assert_eq!(plan.appends.len(), 1);
    }

    #[test]
    fn test_ranges_quote_sheet_titles() {
        assert_eq!(data_range("Meta Ads Data"), "'Meta Ads Data'!A2:K");
        assert_eq!(header_range("Bob's"), "'Bob''s'!A1");
        assert_eq!(row_range("S", 7), "'S'!A7:K7");
    }
}
