//! Decorative "vibe" captions for the status line.
//!
//! A `CaptionService` never fails: every problem is folded into one of the
//! fixed status strings below.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use deck_proto::config::CaptionsConfig;
use deck_proto::protocol::Station;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const CAPTION_LINK_LOST: &str = "LINK: RE-ESTABLISHING...";
pub const CAPTION_EMPTY: &str = "SYSTEM: ONLINE";

pub const FALLBACK_CAPTIONS: [&str; 4] = [
    "SIGNAL: OPTIMAL // UPLINK ESTABLISHED",
    "VIBE DETECTED: NEON NIGHTS",
    "SYSTEM: AUDIO STREAM SYNCHRONIZED",
    "MOOD: ELECTRIC DREAMS DETECTED",
];

const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[async_trait]
pub trait CaptionService: Send + Sync {
    async fn caption(&self, station: &Station) -> String;
}

/// Offline caption, stable for a given station id.
pub fn fallback_caption(station: &Station) -> &'static str {
    // FNV-1a
    let hash = station
        .id
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    FALLBACK_CAPTIONS[(hash % FALLBACK_CAPTIONS.len() as u64) as usize]
}

fn prompt_for(station: &Station) -> String {
    format!(
        "You are the interface of a futuristic cyberpunk radio. \
         Write a very short \"System Log\" status line (at most 6 words) \
         based on the genre \"{}\". \
         Style: technical, cryptic, atmospheric, sci-fi. \
         Examples: \"ANALYZING BASS FREQUENCIES...\", \"UPLINK SECURE: JAZZ PROTOCOL\", \
         \"DETECTING HIGH ENERGY WAVES\". No quotes.",
        station.genre
    )
}

/// Trimmed and uppercased; blank replies become `SYSTEM: ONLINE`.
pub fn normalize_reply(text: &str) -> String {
    let line = text.trim().trim_matches('"').trim();
    if line.is_empty() {
        CAPTION_EMPTY.to_string()
    } else {
        line.to_uppercase()
    }
}

// ── Gemini ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Text-generation backed captions.
pub struct GeminiCaptions {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiCaptions {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build caption HTTP client")?;
        Ok(Self {
            client,
            endpoint: ENDPOINT.to_string(),
            api_key,
            model,
        })
    }

    async fn request(&self, station: &Station) -> Result<String> {
        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt_for(station),
                }],
            }],
        };
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("Failed to reach caption service")?;

        if !response.status().is_success() {
            anyhow::bail!("caption service returned status: {}", response.status());
        }

        let data: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse caption response")?;
        Ok(data.text())
    }
}

#[async_trait]
impl CaptionService for GeminiCaptions {
    async fn caption(&self, station: &Station) -> String {
        match self.request(station).await {
            Ok(text) => normalize_reply(&text),
            Err(e) => {
                warn!("caption request failed: {:#}", e);
                CAPTION_LINK_LOST.to_string()
            }
        }
    }
}

/// Offline captions only.
#[derive(Debug, Default)]
pub struct StaticCaptions;

#[async_trait]
impl CaptionService for StaticCaptions {
    async fn caption(&self, station: &Station) -> String {
        fallback_caption(station).to_string()
    }
}

/// Pick the service from config and environment. Without a key, or with
/// captions disabled, the offline table is used.
pub fn from_config(config: &CaptionsConfig, enabled: bool) -> Box<dyn CaptionService> {
    if !(enabled && config.enabled) {
        debug!("captions disabled, using offline table");
        return Box::new(StaticCaptions);
    }
    let key = std::env::var(&config.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty());
    let Some(key) = key else {
        debug!("{} not set, using offline captions", config.api_key_env);
        return Box::new(StaticCaptions);
    };
    match GeminiCaptions::new(
        key,
        config.model.clone(),
        Duration::from_secs(config.timeout_secs.max(1)),
    ) {
        Ok(svc) => Box::new(svc),
        Err(e) => {
            warn!("{:#}, using offline captions", e);
            Box::new(StaticCaptions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str) -> Station {
        Station {
            id: id.into(),
            genre: "Jazz".into(),
            ..Station::default()
        }
    }

    #[test]
    fn test_fallback_is_stable_per_station() {
        let a = fallback_caption(&station("radio-monk"));
        assert_eq!(a, fallback_caption(&station("radio-monk")));
        assert!(FALLBACK_CAPTIONS.contains(&a));
    }

    #[test]
    fn test_fallback_spreads_over_table() {
        let seen: std::collections::HashSet<&str> = (0..64)
            .map(|i| fallback_caption(&station(&format!("s{i}"))))
            .collect();
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_normalize_reply() {
        assert_eq!(normalize_reply("  uplink secure: jazz \n"), "UPLINK SECURE: JAZZ");
        assert_eq!(normalize_reply("\"bass detected\""), "BASS DETECTED");
        assert_eq!(normalize_reply("   "), CAPTION_EMPTY);
    }

    #[test]
    fn test_response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"DEEP "},{"text":"SIGNAL"}]}}]}"#;
        let resp: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.text(), "DEEP SIGNAL");
        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn test_prompt_names_genre() {
        assert!(prompt_for(&station("x")).contains("\"Jazz\""));
    }

    #[tokio::test]
    async fn test_unreachable_service_degrades() {
        let mut svc =
            GeminiCaptions::new("k".into(), "m".into(), Duration::from_millis(300)).unwrap();
        // nothing listens on the discard port
        svc.endpoint = "http://127.0.0.1:9".into();
        assert_eq!(svc.caption(&station("x")).await, CAPTION_LINK_LOST);
    }

    #[tokio::test]
    async fn test_disabled_config_uses_offline_table() {
        let cfg = CaptionsConfig {
            enabled: false,
            ..CaptionsConfig::default()
        };
        let svc = from_config(&cfg, true);
        let s = station("abc");
        assert_eq!(svc.caption(&s).await, fallback_caption(&s));
    }
}
