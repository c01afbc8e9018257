//! REST metadata client for BBC radio streams
//!
//! BBC streams carry no usable in-band metadata; the current programme
//! segment comes from the RMS API instead, keyed by a station identifier
//! embedded in the stream URL's query string. The redirector URLs the
//! station catalog stores (`lsn.lv` / `lstn.lv`) are how this family is
//! recognized.

use crate::error::{Error, Result};
use crate::models::NowPlaying;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Default RMS API base URL
pub const DEFAULT_RMS_API_BASE: &str = "https://rms.api.bbc.co.uk/v2";

/// Default timeout for segment requests
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// URL prefixes identifying the BBC redirector streams
pub const BBC_STREAM_PREFIXES: &[&str] = &[
    "http://lsn.lv/",
    "https://lsn.lv/",
    "http://lstn.lv/",
    "https://lstn.lv/",
];

/// Whether a stream URL belongs to the BBC polling family.
pub fn is_bbc_stream(stream_url: &str) -> bool {
    BBC_STREAM_PREFIXES
        .iter()
        .any(|prefix| stream_url.starts_with(prefix))
}

/// Extract the station identifier from a BBC stream URL.
///
/// The identifier lives in the `station` query parameter. A URL that does
/// not parse or carries no (non-empty) identifier is an error: without it
/// there is nothing to poll.
pub fn extract_station_id(stream_url: &str) -> Result<String> {
    let parsed = Url::parse(stream_url)?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "station")
        .map(|(_, value)| value.into_owned())
        .filter(|station| !station.is_empty())
        .ok_or_else(|| Error::MissingStationId(stream_url.to_string()))
}

/// BBC RMS HTTP client
///
/// Fetches the single most recent programme segment for a station and
/// normalizes its title fields.
///
/// # Example
///
/// ```no_run
/// use castmeta::BbcClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = BbcClient::new()?;
///     if let Some(now) = client.fetch_latest_segment("bbc_radio_two").await? {
///         println!("Now playing: {}", now.raw);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BbcClient {
    client: Client,
    api_base: String,
    timeout: Duration,
}

impl BbcClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> BbcClientBuilder {
        BbcClientBuilder::default()
    }

    /// Fetch the most recent programme segment for a station.
    ///
    /// Returns `Ok(None)` when the latest segment carries no title fields
    /// (talk programming, continuity announcements); that is an empty
    /// poll, not a failure. A non-success HTTP status is an error.
    pub async fn fetch_latest_segment(&self, station_id: &str) -> Result<Option<NowPlaying>> {
        let url = format!("{}/services/{}/segments/latest", self.api_base, station_id);

        let response = self
            .client
            .get(&url)
            .query(&[("experience", "domestic"), ("offset", "0"), ("limit", "1")])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::ApiStatus(response.status()));
        }

        let payload: SegmentsResponse = response.json().await?;
        Ok(payload
            .data
            .into_iter()
            .next()
            .and_then(Segment::into_now_playing))
    }
}

/// Builder for configuring a [`BbcClient`]
#[derive(Debug)]
pub struct BbcClientBuilder {
    client: Option<Client>,
    api_base: String,
    timeout: Duration,
    user_agent: String,
}

impl Default for BbcClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            api_base: DEFAULT_RMS_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: crate::icy::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl BbcClientBuilder {
    /// Set a custom HTTP client (shared connection pool)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the API base URL
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<BbcClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder().user_agent(&self.user_agent).build()?,
        };

        Ok(BbcClient {
            client,
            api_base: self.api_base,
            timeout: self.timeout,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SegmentsResponse {
    #[serde(default)]
    data: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    titles: Option<SegmentTitles>,
}

#[derive(Debug, Deserialize)]
struct SegmentTitles {
    #[serde(default)]
    primary: Option<String>,
    #[serde(default)]
    secondary: Option<String>,
}

impl Segment {
    /// Normalize a segment into a poll result.
    ///
    /// `primary` is the artist, `secondary` the title; blank fields count
    /// as absent, and a segment with neither yields nothing.
    fn into_now_playing(self) -> Option<NowPlaying> {
        let titles = self.titles?;
        let artist = normalize(titles.primary);
        let title = normalize(titles.secondary);

        let raw = match (artist.as_deref(), title.as_deref()) {
            (Some(a), Some(t)) => format!("{a} - {t}"),
            (Some(a), None) => a.to_string(),
            (None, Some(t)) => t.to_string(),
            (None, None) => return None,
        };

        Some(NowPlaying { artist, title, raw })
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_bbc_stream() {
        assert!(is_bbc_stream("http://lsn.lv/radio?station=bbc_radio_two"));
        assert!(is_bbc_stream("https://lstn.lv/r?station=bbc_6music"));
        assert!(!is_bbc_stream("http://ice.somafm.com/groovesalad"));
        assert!(!is_bbc_stream("https://example.org/lsn.lv/"));
    }

    #[test]
    fn test_extract_station_id() {
        let id = extract_station_id("https://lstn.lv/stream?station=bbc_radio_two&bitrate=320")
            .unwrap();
        assert_eq!(id, "bbc_radio_two");
    }

    #[test]
    fn test_extract_station_id_missing() {
        assert!(matches!(
            extract_station_id("https://lstn.lv/stream?bitrate=320"),
            Err(Error::MissingStationId(_))
        ));
        assert!(matches!(
            extract_station_id("https://lstn.lv/stream?station="),
            Err(Error::MissingStationId(_))
        ));
    }

    #[test]
    fn test_extract_station_id_invalid_url() {
        assert!(matches!(
            extract_station_id("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_segment_with_both_titles() {
        let segment = Segment {
            titles: Some(SegmentTitles {
                primary: Some("Kate Bush".to_string()),
                secondary: Some("Cloudbusting".to_string()),
            }),
        };
        let now = segment.into_now_playing().unwrap();
        assert_eq!(now.artist.as_deref(), Some("Kate Bush"));
        assert_eq!(now.title.as_deref(), Some("Cloudbusting"));
        assert_eq!(now.raw, "Kate Bush - Cloudbusting");
    }

    #[test]
    fn test_segment_with_secondary_only() {
        let segment = Segment {
            titles: Some(SegmentTitles {
                primary: Some("  ".to_string()),
                secondary: Some("Shipping Forecast".to_string()),
            }),
        };
        let now = segment.into_now_playing().unwrap();
        assert_eq!(now.artist, None);
        assert_eq!(now.title.as_deref(), Some("Shipping Forecast"));
        assert_eq!(now.raw, "Shipping Forecast");
    }

    #[test]
    fn test_segment_without_titles() {
        assert!(Segment { titles: None }.into_now_playing().is_none());
        let blank = Segment {
            titles: Some(SegmentTitles {
                primary: None,
                secondary: None,
            }),
        };
        assert!(blank.into_now_playing().is_none());
    }
}
