//! Browser identity profile sent with every request.
//!
//! The host rejects requests that do not look like they come from a desktop
//! browser, so each session picks a Chrome user agent and carries the
//! matching client-hint and fetch-metadata headers.

use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

const USER_AGENTS: &[(&str, &str)] = &[
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "\"Windows\"",
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        "\"Windows\"",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "\"macOS\"",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        "\"macOS\"",
    ),
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "\"Linux\"",
    ),
];

const SEC_CH_UA: &str = "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"";

/// A user agent string and the platform hint that goes with it.
#[derive(Clone, Copy, Debug)]
pub struct Identity {
    pub user_agent: &'static str,
    pub platform: &'static str,
}

/// Picks one of the bundled desktop Chrome identities at random.
pub fn get_identity() -> Identity {
    let (user_agent, platform) = USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0]);
    Identity {
        user_agent,
        platform,
    }
}

pub fn get_user_agent() -> &'static str {
    get_identity().user_agent
}

/// Default headers for a session bound to `origin`.
pub fn browser_headers(identity: &Identity, origin: &str) -> HeaderMap {
    let origin = origin.trim_end_matches('/');
    let mut headers = HeaderMap::new();
    let mut put = |name: &'static str, value: &str| {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    };
    put(
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    );
    put("accept-language", "en-US,en;q=0.9");
    put("referer", &format!("{}/", origin));
    put("sec-ch-ua", SEC_CH_UA);
    put("sec-ch-ua-mobile", "?0");
    put("sec-ch-ua-platform", identity.platform);
    put("sec-fetch-dest", "empty");
    put("sec-fetch-mode", "cors");
    put("sec-fetch-site", "same-origin");
    headers
}
