//! Reconcile the ad listing with insight rows.

use std::collections::HashMap;

use crate::model::{AdRecord, AdStatus, Insight, ListedAd};

/// Index insight rows by ad id. The first row for an id wins; rows without
/// an id are skipped.
pub fn index_insights(insights: &[Insight]) -> HashMap<&str, &Insight> {
    let mut index = HashMap::with_capacity(insights.len());
    for insight in insights {
        if let Some(ad_id) = insight.ad_id.as_deref() {
            index.entry(ad_id).or_insert(insight);
        }
    }
    index
}

/// Merge the listing with insights, keyed by ad id, without enrichment.
///
/// The listing drives the output: every listed ad appears exactly once, in
/// listing order, with zeroed metrics when it has no insight. Insights for
/// ads missing from the listing are dropped.
pub fn merge_listing(listing: &[ListedAd], insights: &[Insight]) -> Vec<AdRecord> {
    let index = index_insights(insights);
    listing
        .iter()
        .map(|ad| AdRecord::from_parts(ad, index.get(ad.id.as_str()).copied(), None))
        .collect()
}

/// Counts reported alongside a fetched batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub active: usize,
    pub paused: usize,
    pub with_image: usize,
}

impl BatchSummary {
    pub fn from_records(records: &[AdRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            match record.effective_status {
                Some(AdStatus::Active) => summary.active += 1,
                Some(AdStatus::Paused) => summary.paused += 1,
                _ => {}
            }
            if record.has_creative {
                summary.with_image += 1;
            }
        }
        summary
    }

    pub fn message(&self) -> String {
        format!(
            "{} ads ({} active, {} paused, {} with image)",
            self.total, self.active, self.paused, self.with_image
        )
    }
}
