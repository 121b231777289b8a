use chrono::{NaiveDateTime, Timelike};
use serde::Deserialize;

/// Timestamp layout of the history log, second precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One reading of the channel's counters, as stored in the history log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    pub timestamp: NaiveDateTime,
    pub subscribers: u64,
    pub views: u64,
    pub videos: u64,
    pub playlists: u64,
}

impl MetricSample {
    pub fn new(timestamp: NaiveDateTime, stats: &ChannelStatistics, playlists: u64) -> Self {
        MetricSample {
            // drop sub-second precision so the stored row reads back equal
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            subscribers: stats.subscribers,
            views: stats.views,
            videos: stats.videos,
            playlists,
        }
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelStatistics {
    pub subscribers: u64,
    pub views: u64,
    pub videos: u64,
}

/// Statistics block of a `channels` resource. The API encodes counts as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatisticsPayload {
    #[serde(default)]
    pub subscriber_count: Option<String>,
    #[serde(default)]
    pub view_count: Option<String>,
    #[serde(default)]
    pub video_count: Option<String>,
    #[serde(default)]
    pub hidden_subscriber_count: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChannelItem {
    pub id: Option<String>,
    pub statistics: Option<ChannelStatisticsPayload>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistListResponse {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    pub next_page_token: Option<String>,
}

/// Outcome of comparing the newest sample with the one before it.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityVerdict {
    pub passed: bool,
    pub message: Option<String>,
}

impl IntegrityVerdict {
    pub fn pass() -> Self {
        IntegrityVerdict {
            passed: true,
            message: None,
        }
    }

    pub fn fail(message: String) -> Self {
        IntegrityVerdict {
            passed: false,
            message: Some(message),
        }
    }
}
