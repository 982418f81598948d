//! Aggregation handler core: listing + insights + per-ad enrichment.

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use ads_core::{index_insights, AdRecord, BatchSummary, Insight, ListedAd};

use crate::meta::{normalize_account_id, AdPlatform, MetaError, ReportWindow};

pub const NO_ADS_MESSAGE: &str = "No ads were found in this account.";

#[derive(Debug, Clone, PartialEq)]
pub struct AdsReport {
    pub records: Vec<AdRecord>,
    pub message: String,
}

/// Fetch insights and the full ad listing, then enrich every listed ad.
///
/// Only the two account-level calls can fail the batch. Per-ad lookups run
/// at most `concurrency` at a time and a failed lookup degrades that single
/// record (zero metrics, no image). Output keeps listing order.
pub async fn collect_ads(
    platform: &dyn AdPlatform,
    token: &str,
    account_id: &str,
    window: &ReportWindow,
    concurrency: usize,
) -> Result<AdsReport, MetaError> {
    let account_id = normalize_account_id(account_id);
    info!(account_id, since = %window.since, until = %window.until, "fetching insights");

    let insights = platform.fetch_insights(token, account_id, window).await?;
    info!(count = insights.len(), "insights fetched");

    let listing = platform.fetch_ads(token, account_id).await?;
    info!(count = listing.len(), "ads listed");

    if listing.is_empty() {
        return Ok(AdsReport {
            records: Vec::new(),
            message: NO_ADS_MESSAGE.to_string(),
        });
    }

    let index = index_insights(&insights);

    let records: Vec<AdRecord> = stream::iter(listing)
        .map(|ad| {
            let indexed = index.get(ad.id.as_str()).map(|insight| (*insight).clone());
            enrich(platform, token, window, ad, indexed)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let summary = BatchSummary::from_records(&records);
    info!(
        total = summary.total,
        active = summary.active,
        paused = summary.paused,
        with_image = summary.with_image,
        "ads processed"
    );

    Ok(AdsReport {
        records,
        message: summary.message(),
    })
}

async fn enrich(
    platform: &dyn AdPlatform,
    token: &str,
    window: &ReportWindow,
    ad: ListedAd,
    indexed: Option<Insight>,
) -> AdRecord {
    let insight = match indexed {
        found @ Some(_) => found,
        None => match platform.fetch_ad_insight(token, &ad.id, window).await {
            Ok(insight) => insight,
            Err(err) => {
                debug!(ad_id = %ad.id, ad_name = %ad.name, error = %err, "no insights for ad");
                None
            }
        },
    };

    let image_url = match platform.fetch_creative(token, &ad.id).await {
        Ok(creative) => creative.resolve_image_url(),
        Err(err) => {
            debug!(ad_id = %ad.id, ad_name = %ad.name, error = %err, "no image for ad");
            None
        }
    };

    AdRecord::from_parts(&ad, insight.as_ref(), image_url)
}
