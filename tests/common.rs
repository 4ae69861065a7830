//! Common test utilities and fixtures
//!
//! Shared functionality used across all test modules: a scripted origin
//! transport that counts requests, a manually driven clock and RSS fixtures.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
pub use tansaku::Config;
use tansaku::error::{Error, Result};
use tansaku::keyword_cache::Clock;
use tansaku::net::{FetchOptions, Transport};
use tansaku::search::Indexers;

/// What the mock origin answers for a matching URL.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum MockResponse {
    Body(Vec<u8>),
    Status(u16),
    Network,
}

impl MockResponse {
    #[allow(dead_code)]
    pub fn feed(xml: &str) -> Self {
        MockResponse::Body(xml.as_bytes().to_vec())
    }
}

/// Scripted origin. Routes match when the needle is a substring of the URL;
/// unmatched URLs answer 404.
pub struct MockTransport {
    routes: Mutex<Vec<(String, MockResponse)>>,
    requests: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Duration,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    /// Adds or replaces the response for `needle`.
    pub fn route(&self, needle: &str, response: MockResponse) {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|(existing, _)| existing == needle) {
            Some(route) => route.1 = response,
            None => routes.push((needle.to_string(), response)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|url| url.contains(needle))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, _options: &FetchOptions) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(url.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = self
            .routes
            .lock()
            .iter()
            .find(|(needle, _)| url.contains(needle.as_str()))
            .map(|(_, response)| response.clone());

        match response {
            Some(MockResponse::Body(body)) => Ok(Bytes::from(body)),
            Some(MockResponse::Status(status)) => Err(Error::http_status(url, status)),
            Some(MockResponse::Network) => Err(Error::network(url, "connection reset by peer")),
            None => Err(Error::http_status(url, 404)),
        }
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[allow(dead_code)]
pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// Default configuration with fetch caching disabled, so every keyword refresh
/// reaches the mock origin.
#[allow(dead_code)]
pub fn uncached_config() -> Config {
    let mut config = Config::new();
    config.dmhy.fetch_cache_secs = 0;
    config.acgrip.fetch_cache_secs = 0;
    config
}

#[allow(dead_code)]
pub fn indexers(config: &Config, transport: Arc<MockTransport>, clock: Arc<ManualClock>) -> Indexers {
    Indexers::from_config_with_clock(config, transport, clock).unwrap()
}

#[allow(dead_code)]
pub const DMHY_ONE_PIECE: &str = "keyword=One%20Piece";
#[allow(dead_code)]
pub const DMHY_NARUTO: &str = "keyword=Naruto";
#[allow(dead_code)]
pub const DMHY_BLEACH: &str = "keyword=Bleach";
#[allow(dead_code)]
pub const ACGRIP_FRIEREN: &str = "term=Frieren";

/// One Piece search results. Episode 1151 appears twice (bracketed and
/// parenthesized), one item has no resource and one has no episode.
#[allow(dead_code)]
pub const ONE_PIECE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title><![CDATA[動漫花園資源網]]></title>
    <link>https://share.dmhy.org</link>
    <item>
      <title><![CDATA[[Skymoon-Raws] One Piece [1151][ViuTV][WEB-DL][1080p]]]></title>
      <link>https://share.dmhy.org/topics/view/1</link>
      <pubDate>Sun, 19 Oct 2025 10:00:00 +0800</pubDate>
      <description><![CDATA[<img src="cover.jpg"/><p>One Piece 1151</p>]]></description>
      <enclosure url="magnet:?xt=urn:btih:AAAA1151" length="1" type="application/x-bittorrent"/>
      <author><![CDATA[Skymoon-Raws]]></author>
      <guid isPermaLink="true">https://share.dmhy.org/topics/view/1</guid>
      <category domain="https://share.dmhy.org/topics/list/sort_id/2"><![CDATA[動畫]]></category>
    </item>
    <item>
      <title><![CDATA[【字幕组】海贼王 第1150話 1080p]]></title>
      <link>https://share.dmhy.org/topics/view/2</link>
      <pubDate>Sun, 12 Oct 2025 10:00:00 +0800</pubDate>
      <enclosure url="magnet:?xt=urn:btih:BBBB1150" length="1" type="application/x-bittorrent"/>
      <guid isPermaLink="true">https://share.dmhy.org/topics/view/2</guid>
    </item>
    <item>
      <title><![CDATA[[Group] One Piece - Missing Torrent [1151]]]></title>
      <link>https://share.dmhy.org/topics/view/3</link>
      <guid isPermaLink="true">https://share.dmhy.org/topics/view/3</guid>
    </item>
    <item>
      <title><![CDATA[[Group] One Piece (1151) [720p]]]></title>
      <link>https://share.dmhy.org/topics/view/4</link>
      <pubDate>Sun, 19 Oct 2025 12:00:00 +0800</pubDate>
      <enclosure url="magnet:?xt=urn:btih:CCCC1151" length="1" type="application/x-bittorrent"/>
      <guid isPermaLink="true">https://share.dmhy.org/topics/view/4</guid>
    </item>
    <item>
      <title><![CDATA[[Group] One Piece Movie Collection [1080p]]]></title>
      <link>https://share.dmhy.org/topics/view/5</link>
      <enclosure url="magnet:?xt=urn:btih:DDDDMOVIE" length="1" type="application/x-bittorrent"/>
      <guid isPermaLink="true">https://share.dmhy.org/topics/view/5</guid>
    </item>
  </channel>
</rss>"#;

#[allow(dead_code)]
pub const NARUTO_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>dmhy</title>
    <item>
      <title>[Group][Naruto][220][1080p]</title>
      <link>https://share.dmhy.org/topics/view/10</link>
      <enclosure url="magnet:?xt=urn:btih:NARUTO220" length="1" type="application/x-bittorrent"/>
    </item>
  </channel>
</rss>"#;

/// ACG.RIP results with a regular episode, a special and a parenthesized episode.
#[allow(dead_code)]
pub const FRIEREN_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>ACG.RIP</title>
    <item>
      <title>[Erai-raws] Sousou no Frieren - 12 [1080p]</title>
      <link>https://acg.rip/t/1</link>
      <pubDate>Fri, 17 Oct 2025 18:00:00 +0800</pubDate>
      <enclosure url="https://acg.rip/t/1.torrent" length="734003200" type="application/x-bittorrent"/>
      <guid>https://acg.rip/t/1</guid>
    </item>
    <item>
      <title>[Erai-raws] Sousou no Frieren - SP12 [1080p]</title>
      <link>https://acg.rip/t/2</link>
      <enclosure url="https://acg.rip/t/2.torrent" length="104857600" type="application/x-bittorrent"/>
      <guid>https://acg.rip/t/2</guid>
    </item>
    <item>
      <title>[SubsPlease] Sousou no Frieren - 12 (1080p) [ABCD1234].mkv</title>
      <link>https://acg.rip/t/3</link>
      <enclosure url="https://acg.rip/t/3.torrent" length="1468006400" type="application/x-bittorrent"/>
      <guid>https://acg.rip/t/3</guid>
    </item>
  </channel>
</rss>"#;

/// Bleach results where the middle item carries an HTML entity that XML does
/// not define.
#[allow(dead_code)]
pub const BLEACH_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>dmhy</title>
    <item>
      <title>[Group][Bleach][01][1080p]</title>
      <enclosure url="magnet:?xt=urn:btih:BLEACH01" length="1" type="application/x-bittorrent"/>
    </item>
    <item>
      <title>[Group][Bleach &hellip; Thousand-Year Blood War][02][1080p]</title>
      <enclosure url="magnet:?xt=urn:btih:BLEACH02" length="1" type="application/x-bittorrent"/>
    </item>
    <item>
      <title>[Group][Bleach][03][1080p]</title>
      <enclosure url="magnet:?xt=urn:btih:BLEACH03" length="1" type="application/x-bittorrent"/>
    </item>
  </channel>
</rss>"#;

/// Feed whose `<title>` is closed by `</item>`.
#[allow(dead_code)]
pub const TRUNCATED_FEED: &str = "<rss><channel><item><title>x</item></channel></rss>";
