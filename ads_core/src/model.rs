use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::metric::{deserialize_amount, deserialize_count, deserialize_text};

/// CDN prefix for creatives that only expose an image hash.
pub const CREATIVE_CDN_PREFIX: &str = "https://scontent.xx.fbcdn.net/v/t45.1600-4/";

/// Lifecycle status of an ad, as reported by the ad platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AdStatus {
    Active,
    Paused,
    /// Anything else (`ARCHIVED`, `DISAPPROVED`, `CAMPAIGN_PAUSED`, ...), kept verbatim.
    Other(String),
}

impl AdStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ACTIVE" => Self::Active,
            "PAUSED" => Self::Paused,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for AdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AdStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AdStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One ad with its identity, status and metrics for the reporting window.
///
/// Every metric deserializes leniently (number, numeric string, null or
/// absent), so records posted back by clients never carry NaN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdRecord {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub ad_id: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub ad_name: String,
    #[serde(default)]
    pub status: Option<AdStatus>,
    #[serde(default)]
    pub effective_status: Option<AdStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub reach: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub impressions: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub clicks: u64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub cpc: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub spend: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub ctr: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub has_creative: bool,
}

impl AdRecord {
    /// Build a record from a listed ad, its insight row (if any) and its
    /// resolved creative image.
    pub fn from_parts(ad: &ListedAd, insight: Option<&Insight>, image_url: Option<String>) -> Self {
        let mut record = Self::zeroed(ad);
        if let Some(insight) = insight {
            record.reach = insight.reach;
            record.impressions = insight.impressions;
            record.clicks = insight.clicks;
            record.cpc = insight.cpc;
            record.spend = insight.spend;
            record.ctr = insight.ctr;
        }
        record.has_creative = image_url.is_some();
        record.image_url = image_url;
        record
    }

    /// Identity and status only; every metric zero and no creative.
    pub fn zeroed(ad: &ListedAd) -> Self {
        Self {
            ad_id: ad.id.clone(),
            ad_name: ad.name.clone(),
            status: ad.status.clone(),
            effective_status: ad.effective_status.clone(),
            created_time: ad.created_time.clone(),
            updated_time: ad.updated_time.clone(),
            ..Self::default()
        }
    }

    /// Delivery status if known, configured status otherwise.
    pub fn current_status(&self) -> Option<&AdStatus> {
        self.effective_status.as_ref().or(self.status.as_ref())
    }
}

/// A row from the ad listing endpoint (`/act_{id}/ads`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListedAd {
    #[serde(alias = "ad_id", deserialize_with = "deserialize_text")]
    pub id: String,
    #[serde(default, alias = "ad_name", deserialize_with = "deserialize_text")]
    pub name: String,
    #[serde(default)]
    pub status: Option<AdStatus>,
    #[serde(default)]
    pub effective_status: Option<AdStatus>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub updated_time: Option<String>,
}

/// A performance row from the insights endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub ad_id: Option<String>,
    #[serde(default)]
    pub ad_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub reach: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub impressions: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub clicks: u64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub cpc: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub spend: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub ctr: f64,
    #[serde(default)]
    pub date_start: Option<String>,
    #[serde(default)]
    pub date_stop: Option<String>,
}

/// Reply of `/{ad_id}?fields=creative{...}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Creative {
    #[serde(default)]
    pub creative: Option<CreativeAsset>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreativeAsset {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub image_hash: Option<String>,
}

impl Creative {
    /// Full image, then thumbnail, then a CDN URL built from the image hash.
    pub fn resolve_image_url(&self) -> Option<String> {
        let asset = self.creative.as_ref()?;
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

        non_empty(&asset.image_url)
            .or_else(|| non_empty(&asset.thumbnail_url))
            .or_else(|| non_empty(&asset.image_hash).map(|hash| format!("{CREATIVE_CDN_PREFIX}{hash}")))
    }
}
