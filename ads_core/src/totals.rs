use serde::Serialize;

use crate::metric::round2;
use crate::model::AdRecord;

/// Dashboard KPIs over a batch of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub reach: u64,
    pub impressions: u64,
    pub clicks: u64,
    pub spend: f64,
    /// `spend / clicks`, or 0 when there were no clicks.
    pub avg_cpc: f64,
}

impl Totals {
    /// `None` for an empty batch; the dashboard shows no KPIs then.
    pub fn from_records(records: &[AdRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let mut totals = records.iter().fold(Self::default(), |mut acc, ad| {
            acc.reach = acc.reach.saturating_add(ad.reach);
            acc.impressions = acc.impressions.saturating_add(ad.impressions);
            acc.clicks = acc.clicks.saturating_add(ad.clicks);
            acc.spend += ad.spend;
            acc
        });

        totals.avg_cpc = if totals.clicks > 0 {
            round2(totals.spend / totals.clicks as f64)
        } else {
            0.0
        };
        totals.spend = round2(totals.spend);
        Some(totals)
    }
}
