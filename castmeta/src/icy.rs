//! In-band metadata client for ICY (SHOUTcast/Icecast) streams
//!
//! The stream interleaves metadata with the audio payload: when the request
//! carries `Icy-MetaData: 1`, the server advertises a byte interval in the
//! `icy-metaint` response header, and after every interval of audio bytes
//! inserts one length byte (x16) followed by that many bytes of
//! `Key='value';` text, NUL-padded to the declared length.
//!
//! One poll opens the stream, reads a single metadata block and drops the
//! connection. Holding the stream open between polls would keep the station
//! serving audio to nobody.

use crate::error::{Error, Result};
use crate::models::NowPlaying;
use futures::TryStreamExt;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;
use tracing::debug;

/// Default timeout for one poll, covering the body reads
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent sent to stations
pub const DEFAULT_USER_AGENT: &str = "CastNow/0.1";

/// Upper bound accepted for the advertised meta-interval.
///
/// Real stations advertise 1-64 KiB; anything past this is a framing
/// violation rather than a buffer to allocate.
const MAX_META_INTERVAL: usize = 1 << 20;

/// ICY metadata client
///
/// One instance is shared by every monitor worker of the in-band family;
/// it holds only the HTTP client and the per-poll timeout.
///
/// # Example
///
/// ```no_run
/// use castmeta::IcyClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = IcyClient::new()?;
///     if let Some(now) = client.fetch_now_playing("http://ice.example.org/radio").await? {
///         println!("Now playing: {}", now.raw);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct IcyClient {
    client: Client,
    timeout: Duration,
}

impl IcyClient {
    /// Create a client with the default User-Agent and poll timeout
    pub fn new() -> Result<Self> {
        let client = Client::builder().user_agent(DEFAULT_USER_AGENT).build()?;
        Ok(Self::with_client(client))
    }

    /// Create a client with a custom `reqwest::Client`
    ///
    /// Useful for sharing an HTTP connection pool with the other pollers.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }

    /// Override the per-poll timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll a stream once for its current metadata block.
    ///
    /// Returns `Ok(None)` when the stream does not advertise in-band
    /// metadata or when the block at this poll is empty (no update). The
    /// connection is closed before returning, success or not.
    pub async fn fetch_now_playing(&self, stream_url: &str) -> Result<Option<NowPlaying>> {
        let response = self
            .client
            .get(stream_url)
            .header("Icy-MetaData", "1")
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::ApiStatus(response.status()));
        }

        let meta_interval = match response
            .headers()
            .get("icy-metaint")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            Some(interval) => interval,
            None => {
                debug!(stream = %stream_url, "stream does not advertise in-band metadata");
                return Ok(None);
            }
        };

        if meta_interval > MAX_META_INTERVAL {
            return Err(Error::Framing(format!(
                "advertised meta-interval {meta_interval} exceeds {MAX_META_INTERVAL}"
            )));
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = StreamReader::new(Box::pin(body));

        // Audio payload up to the metadata block; discarded.
        let mut audio = vec![0u8; meta_interval];
        reader.read_exact(&mut audio).await?;

        let mut length_byte = [0u8; 1];
        reader.read_exact(&mut length_byte).await?;
        let block_len = length_byte[0] as usize * 16;
        if block_len == 0 {
            // No update at this poll.
            return Ok(None);
        }

        let mut block = vec![0u8; block_len];
        reader.read_exact(&mut block).await?;

        parse_metadata_block(&block)
    }
}

/// Extract the stream title from a raw metadata block.
///
/// The block is decoded leniently (undecodable bytes replaced), stripped of
/// its NUL padding, and searched for the `StreamTitle='...'` field. Returns
/// `Ok(None)` when the field is absent or empty.
pub fn parse_metadata_block(block: &[u8]) -> Result<Option<NowPlaying>> {
    let text = String::from_utf8_lossy(block);
    let text = text.trim_end_matches('\0');

    let re = Regex::new(r"StreamTitle='([^']+)'")?;
    Ok(re
        .captures(text)
        .map(|cap| NowPlaying::from_stream_title(&cap[1])))
}
