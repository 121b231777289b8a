use crate::error::{Result, StatsError};
use crate::models::{ChannelListResponse, ChannelStatistics, PlaylistListResponse};
use crate::services::fetcher::{HttpTransport, RetryingFetcher};
use crate::utils::parse_count;
use log::{info, warn};
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

/// Read-only client for the two YouTube Data API endpoints the collector uses.
pub struct YouTubeClient<T> {
    fetcher: RetryingFetcher<T>,
    api_base: Url,
    api_key: String,
}

impl<T: HttpTransport> YouTubeClient<T> {
    pub fn new(fetcher: RetryingFetcher<T>, api_base: Url, api_key: impl Into<String>) -> Self {
        YouTubeClient {
            fetcher,
            api_base,
            api_key: api_key.into(),
        }
    }

    // Documentation: https://developers.google.com/youtube/v3/docs/channels
    pub async fn channel_statistics(&self, channel_id: &str) -> Result<ChannelStatistics> {
        let url = self.endpoint("channels", &[("part", "statistics"), ("id", channel_id)])?;

        let response = self.fetcher.fetch(&url).await?;
        check_api_error(&response)?;

        let parsed: ChannelListResponse = serde_json::from_value(response)
            .map_err(|e| StatsError::Response(format!("channel listing: {e}")))?;
        let statistics = parsed
            .items
            .into_iter()
            .next()
            .and_then(|item| item.statistics)
            .ok_or_else(|| StatsError::Response(format!("no statistics for channel {channel_id}")))?;

        let count = |field: &str, raw: Option<String>| {
            parse_count(raw.as_deref())
                .ok_or_else(|| StatsError::Response(format!("{field} is not a number: {raw:?}")))
        };

        let subscribers = if statistics.hidden_subscriber_count {
            info!("Channel {channel_id} hides its subscriber count, recording 0");
            0
        } else {
            count("subscriberCount", statistics.subscriber_count)?
        };

        Ok(ChannelStatistics {
            subscribers,
            views: count("viewCount", statistics.view_count)?,
            videos: count("videoCount", statistics.video_count)?,
        })
    }

    // Documentation: https://developers.google.com/youtube/v3/docs/playlists
    pub async fn playlist_count(&self, channel_id: &str) -> Result<u64> {
        let mut total = 0u64;
        let mut next_page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut params = vec![
                ("part", "snippet"),
                ("channelId", channel_id),
                ("maxResults", "50"),
            ];
            if let Some(token) = &next_page_token {
                params.push(("pageToken", token.as_str()));
            }
            let url = self.endpoint("playlists", &params)?;

            let response = self.fetcher.fetch(&url).await?;
            check_api_error(&response)?;

            let page: PlaylistListResponse = serde_json::from_value(response)
                .map_err(|e| StatsError::Response(format!("playlist listing: {e}")))?;
            total += page.items.len() as u64;

            match page.next_page_token {
                Some(token) if token.is_empty() => break,
                // a token seen before would page forever
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    warn!("Playlist paging repeated token {token}, stopping at {total}");
                    break;
                }
                Some(token) => next_page_token = Some(token),
                None => break,
            }
        }

        Ok(total)
    }

    fn endpoint(&self, resource: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .api_base
            .join(resource)
            .map_err(|e| StatsError::Config(format!("invalid API base URL: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().copied())
            .append_pair("key", &self.api_key);
        Ok(url)
    }
}

/// An `error` object in a successful response is an application failure; it is not retried.
fn check_api_error(response: &Value) -> Result<()> {
    match response.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(error) => {
            let message = error["message"]
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| error.to_string());
            Err(StatsError::Api { message })
        }
    }
}
