// News Feed Service
// Live security/deepfake headlines from NewsData.io with a file cache and
// built-in sample articles when the live feed is unavailable

use crate::models::NewsItem;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1677442136019-21780ecad995?w=800&q=80";
/// NewsData free tier rejects page sizes above 10.
pub const MAX_PAGE_SIZE: usize = 10;
const SUMMARY_CHARS: usize = 200;
const FALLBACK_ALL_LIMIT: usize = 20;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("News API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("News API reported failure: {0}")]
    Unsuccessful(String),
    #[error("News API returned no articles")]
    NoResults,
    #[error("News API key not configured")]
    MissingApiKey,
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ============ Categories ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    Deepfake,
    Cybercrime,
    Ai,
    Government,
    Cases,
    Social,
    All,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deepfake => "deepfake",
            Self::Cybercrime => "cybercrime",
            Self::Ai => "ai",
            Self::Government => "government",
            Self::Cases => "cases",
            Self::Social => "social",
            Self::All => "all",
        }
    }

    /// Unknown or missing categories mean `All`.
    pub fn parse(val: Option<&str>) -> Self {
        match val.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("deepfake") => Self::Deepfake,
            Some("cybercrime") => Self::Cybercrime,
            Some("ai") => Self::Ai,
            Some("government") => Self::Government,
            Some("cases") => Self::Cases,
            Some("social") => Self::Social,
            _ => Self::All,
        }
    }

    /// NewsData query for this category. Kept short: long queries are rejected.
    pub fn query(&self) -> &'static str {
        match self {
            Self::Deepfake => r#""deepfake celebrity" OR "deepfake viral" OR "celebrity face swap" OR "AI impersonation""#,
            Self::Cybercrime => r#""cybercrime" OR "cyber attack" OR "ransomware" OR "data breach""#,
            Self::Ai => r#""AI fraud" OR "deepfake scam" OR "voice cloning" OR "AI misinformation""#,
            Self::Government => r#""cyber law" OR "digital safety act" OR "deepfake regulation""#,
            Self::Cases => r#""deepfake arrest" OR "cyberstalking case" OR "celebrity lawsuit AI""#,
            Self::Social => r#""social media hack" OR "Instagram account hacked" OR "X deepfake""#,
            Self::All => r#""deepfake celebrity" OR "AI fraud" OR "cybercrime" OR "deepfake scandal""#,
        }
    }

    pub fn matches(&self, item: &NewsItem) -> bool {
        *self == Self::All || item.category == self.as_str()
    }
}

// Checked in order; the first group with a hit decides.
const DETECTION_ORDER: [NewsCategory; 5] = [
    NewsCategory::Government,
    NewsCategory::Cases,
    NewsCategory::Social,
    NewsCategory::Deepfake,
    NewsCategory::Cybercrime,
];

fn detection_keywords(category: NewsCategory) -> &'static [&'static str] {
    match category {
        NewsCategory::Government => &["cyber law", "data protection", "privacy law", "regulation", "government policy", "digital act"],
        NewsCategory::Cases => &["case", "arrest", "caught", "convicted", "sentenced", "prosecution", "lawsuit"],
        NewsCategory::Social => &["facebook", "twitter", "instagram", "tiktok", "whatsapp", "social media", "linkedin"],
        NewsCategory::Deepfake => &["deepfake", "synthetic media", "manipulated", "face swap", "ai-generated"],
        NewsCategory::Cybercrime => &["cybercrime", "cyber attack", "breach", "ransomware", "hacker", "phishing", "malware"],
        NewsCategory::Ai | NewsCategory::All => &[],
    }
}

/// Classify an article by keyword containment; `Ai` when nothing matches.
pub fn detect_category(title: &str, description: &str) -> NewsCategory {
    let text = format!("{} {}", title, description).to_lowercase();
    DETECTION_ORDER
        .into_iter()
        .find(|category| detection_keywords(*category).iter().any(|w| text.contains(w)))
        .unwrap_or(NewsCategory::Ai)
}

// ============ Articles ============

/// Article as NewsData returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsArticle {
    #[serde(default)]
    pub article_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsDataResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    results: Vec<NewsArticle>,
}

fn non_empty(val: &Option<String>) -> Option<&str> {
    val.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn summarize(description: &str) -> String {
    if description.is_empty() {
        return String::new();
    }
    let head: String = description.chars().take(SUMMARY_CHARS).collect();
    format!("{}...", head)
}

fn to_item(article: &NewsArticle, summary: String, default_source: &str, now: DateTime<Utc>) -> NewsItem {
    let title = article.title.clone().unwrap_or_default();
    let description = article.description.as_deref().unwrap_or_default();
    NewsItem {
        id: article.article_id.clone().unwrap_or_default(),
        category: detect_category(&title, description).as_str().to_string(),
        title,
        summary,
        source: non_empty(&article.source_id).unwrap_or(default_source).to_string(),
        published_at: non_empty(&article.pub_date)
            .map(str::to_string)
            .unwrap_or_else(|| now.to_rfc3339()),
        image_url: non_empty(&article.image_url).unwrap_or(DEFAULT_IMAGE_URL).to_string(),
        url: non_empty(&article.link).unwrap_or("#").to_string(),
        is_live: true,
    }
}

fn live_item(article: &NewsArticle, now: DateTime<Utc>) -> NewsItem {
    let summary = summarize(article.description.as_deref().unwrap_or_default());
    to_item(article, summary, "Unknown", now)
}

fn items_from_response(data: NewsDataResponse, limit: usize) -> Result<Vec<NewsItem>, NewsError> {
    if data.status.as_deref() != Some("success") {
        let message = match data.message {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => "unknown error".to_string(),
        };
        return Err(NewsError::Unsuccessful(message));
    }
    if data.results.is_empty() {
        return Err(NewsError::NoResults);
    }

    let now = Utc::now();
    Ok(data
        .results
        .iter()
        .map(|article| live_item(article, now))
        .take(limit)
        .collect())
}

struct SampleArticle {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    source: &'static str,
    hours_ago: i64,
    image: &'static str,
    link: &'static str,
}

const IMG_SECURITY: &str = "https://images.unsplash.com/photo-1563986768609-322da13575f3?w=800&q=80";
const IMG_LAW: &str = "https://images.unsplash.com/photo-1589829545856-d10d557cf95f?w=800&q=80";

const SAMPLE_ARTICLES: [SampleArticle; 12] = [
    SampleArticle {
        id: "fb1",
        title: "Major Deepfake Scam Uncovered in Financial Sector - CEO Impersonation Led to $25M Fraud",
        description: "Federal investigators have exposed a sophisticated deepfake operation where criminals used AI-generated videos to impersonate company executives, resulting in unauthorized wire transfers totaling $25 million across multiple corporations.",
        source: "CyberSecurity Today",
        hours_ago: 2,
        image: IMG_SECURITY,
        link: "https://example.com/deepfake-scam",
    },
    SampleArticle {
        id: "fb2",
        title: "Government Introduces Strict AI Regulation Bill with Heavy Penalties for Misuse",
        description: "Parliament has tabled comprehensive AI regulation legislation imposing fines up to $10 million for companies deploying AI systems without proper safety audits. The bill mandates transparency in AI decision-making across critical sectors.",
        source: "PolicyWatch",
        hours_ago: 5,
        image: IMG_LAW,
        link: "https://example.com/ai-regulation",
    },
    SampleArticle {
        id: "fb3",
        title: "Ransomware Attack Cripples Hospital Network - Patient Data Compromised",
        description: "A coordinated ransomware attack has affected 15 hospitals across three states, encrypting patient records and disrupting critical healthcare services. Cybersecurity experts warn this represents a new escalation in healthcare-targeted cybercrime.",
        source: "Healthcare Security News",
        hours_ago: 8,
        image: IMG_SECURITY,
        link: "https://example.com/hospital-ransomware",
    },
    SampleArticle {
        id: "fb4",
        title: "International Cybercrime Ring Dismantled - 47 Arrests Across 12 Countries",
        description: "Interpol announces the successful takedown of a global cybercrime syndicate responsible for over $200 million in cryptocurrency theft and identity fraud. The coordinated operation involved law enforcement from 12 nations.",
        source: "Global Crime Watch",
        hours_ago: 12,
        image: "https://images.unsplash.com/photo-1550751827-4bd374c3f58b?w=800&q=80",
        link: "https://example.com/arrests",
    },
    SampleArticle {
        id: "fb5",
        title: "Social Media Giant Fined $500M for Privacy Violations - Data of 100M Users Exposed",
        description: "Regulators have imposed a record $500 million fine on a major social media platform after discovering inadequate protection of user data, affecting over 100 million accounts globally. The breach included sensitive personal information and location data.",
        source: "Tech Accountability",
        hours_ago: 15,
        image: "https://images.unsplash.com/photo-1611162617213-7d7a39e9b1d7?w=800&q=80",
        link: "https://example.com/social-media-fine",
    },
    SampleArticle {
        id: "fb6",
        title: "New Cyber Law Mandates Real-Time Deepfake Detection on All Video Platforms",
        description: "Legislation now requires all video streaming and social media platforms to implement AI-powered deepfake detection systems, with platforms facing suspension if they fail to flag manipulated content within 24 hours of upload.",
        source: "Digital Law Review",
        hours_ago: 18,
        image: IMG_LAW,
        link: "https://example.com/deepfake-law",
    },
    SampleArticle {
        id: "fb7",
        title: "AI-Powered Phishing Attacks Surge 340% - Personalized Scams Harder to Detect",
        description: "Cybersecurity firms report a dramatic 340% increase in AI-generated phishing emails that use personalized information scraped from social media, making them significantly more convincing than traditional spam campaigns.",
        source: "CyberThreat Intelligence",
        hours_ago: 24,
        image: IMG_SECURITY,
        link: "https://example.com/ai-phishing",
    },
    SampleArticle {
        id: "fb8",
        title: "Instagram Deepfake Scandal: Celebrities Sue Platform Over Fake Endorsements",
        description: "A class-action lawsuit filed by 30 celebrities claims Instagram failed to remove AI-generated deepfake videos showing them endorsing cryptocurrency scams, resulting in millions of dollars in fraudulent transactions.",
        source: "Entertainment & Tech Law",
        hours_ago: 30,
        image: "https://images.unsplash.com/photo-1611162616305-c69b3fa7fbe0?w=800&q=80",
        link: "https://example.com/celebrity-deepfakes",
    },
    SampleArticle {
        id: "fb9",
        title: "Data Protection Authority Launches Investigation into TikTok's AI Recommendation Algorithm",
        description: "Regulators are investigating whether TikTok's AI-driven content recommendation system violates data privacy laws by collecting excessive user information without proper consent, particularly from minors.",
        source: "Privacy Watchdog",
        hours_ago: 36,
        image: "https://images.unsplash.com/photo-1611926653458-09294b3142bf?w=800&q=80",
        link: "https://example.com/tiktok-investigation",
    },
    SampleArticle {
        id: "fb10",
        title: "Banking Trojan Steals $15M Through AI Voice Cloning - Customers Tricked into Transfers",
        description: "A new malware campaign uses AI to clone bank customers' voices from social media videos, then calls victims pretending to be their relatives in emergency situations, convincing them to authorize large wire transfers.",
        source: "Financial Security Alert",
        hours_ago: 48,
        image: IMG_SECURITY,
        link: "https://example.com/voice-cloning-scam",
    },
    SampleArticle {
        id: "fb11",
        title: "EU Passes Landmark AI Act - First Comprehensive Regulation of Artificial Intelligence",
        description: "The European Union has approved groundbreaking legislation categorizing AI applications by risk level, banning high-risk uses like social scoring and live facial recognition, while requiring transparency for generative AI systems.",
        source: "EU Tech Policy",
        hours_ago: 60,
        image: IMG_LAW,
        link: "https://example.com/eu-ai-act",
    },
    SampleArticle {
        id: "fb12",
        title: "WhatsApp Encryption Backdoor Controversy - Government Demands Access to Messages",
        description: "Privacy advocates raise alarms as government agencies push for backdoor access to WhatsApp's end-to-end encryption, claiming it's necessary for national security while civil liberties groups warn of mass surveillance risks.",
        source: "Digital Rights Now",
        hours_ago: 72,
        image: "https://images.unsplash.com/photo-1611162618071-b39a2ec055fb?w=800&q=80",
        link: "https://example.com/whatsapp-encryption",
    },
];

/// Built-in articles for `category`, timestamped relative to `now`.
pub fn fallback_news(category: NewsCategory, now: DateTime<Utc>) -> Vec<NewsItem> {
    let items = SAMPLE_ARTICLES.iter().map(|sample| {
        let article = NewsArticle {
            article_id: Some(sample.id.to_string()),
            title: Some(sample.title.to_string()),
            description: Some(sample.description.to_string()),
            source_id: Some(sample.source.to_string()),
            pub_date: Some((now - ChronoDuration::hours(sample.hours_ago)).to_rfc3339()),
            image_url: Some(sample.image.to_string()),
            link: Some(sample.link.to_string()),
        };
        to_item(&article, sample.description.to_string(), "News Source", now)
    });

    match category {
        NewsCategory::All => items.take(FALLBACK_ALL_LIMIT).collect(),
        _ => items.filter(|item| category.matches(item)).collect(),
    }
}

// ============ Cache ============

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    timestamp: String,
    data: Vec<NewsItem>,
}

pub struct NewsCache {
    path: PathBuf,
    ttl: Duration,
}

impl NewsCache {
    pub fn new(path: PathBuf, ttl: Duration) -> Self {
        Self { path, ttl }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached items when the file is present, parseable and younger than the TTL.
    pub async fn load(&self) -> Option<Vec<NewsItem>> {
        let content = tokio::fs::read_to_string(&self.path).await.ok()?;
        let cache: CacheFile = match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("[NEWS] Ignoring unreadable cache {}: {}", self.path.display(), e);
                return None;
            }
        };

        let written = DateTime::parse_from_rfc3339(&cache.timestamp).ok()?;
        let age = Utc::now().signed_duration_since(written.with_timezone(&Utc));
        let ttl = ChronoDuration::from_std(self.ttl).ok()?;
        if age < ChronoDuration::zero() || age >= ttl {
            debug!("[NEWS] Cache stale ({}s old)", age.num_seconds());
            return None;
        }
        Some(cache.data)
    }

    /// Write through a temp file and rename so readers never see a partial file.
    pub async fn save(&self, items: &[NewsItem]) -> Result<(), NewsError> {
        let cache = CacheFile {
            timestamp: Utc::now().to_rfc3339(),
            data: items.to_vec(),
        };
        let json = serde_json::to_string_pretty(&cache)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// ============ Service ============

pub struct NewsService {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    cache: NewsCache,
}

impl NewsService {
    pub fn new(api_url: &str, api_key: Option<String>, cache: NewsCache) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            cache,
        }
    }

    pub fn cache(&self) -> &NewsCache {
        &self.cache
    }

    /// Query NewsData directly.
    pub async fn fetch_live(&self, category: NewsCategory, limit: usize) -> Result<Vec<NewsItem>, NewsError> {
        let api_key = self.api_key.as_deref().ok_or(NewsError::MissingApiKey)?;
        let size = limit.clamp(1, MAX_PAGE_SIZE).to_string();

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("apikey", api_key),
                ("q", category.query()),
                ("language", "en"),
                ("size", size.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewsError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: NewsDataResponse = response.json().await?;
        items_from_response(data, limit)
    }

    /// Live articles, or the built-in samples when the feed is unavailable.
    /// The flag tells whether the items came from the live feed.
    pub async fn fetch(&self, category: NewsCategory, limit: usize) -> (Vec<NewsItem>, bool) {
        match self.fetch_live(category, limit).await {
            Ok(items) => {
                info!("[NEWS] {} live articles for {}", items.len(), category.as_str());
                (items, true)
            }
            Err(e) => {
                warn!("[NEWS] Live feed unavailable ({}), serving samples", e);
                (fallback_news(category, Utc::now()), false)
            }
        }
    }

    /// Cached articles when fresh, otherwise a fetch. Live `all` results refill the cache.
    pub async fn get_news(&self, category: NewsCategory, limit: usize) -> Vec<NewsItem> {
        if let Some(cached) = self.cache.load().await.filter(|c| !c.is_empty()) {
            debug!("[NEWS] Serving {} from cache", category.as_str());
            return cached
                .into_iter()
                .filter(|item| category.matches(item))
                .take(limit)
                .collect();
        }

        let (items, live) = self.fetch(category, limit).await;
        if live && category == NewsCategory::All && !items.is_empty() {
            if let Err(e) = self.cache.save(&items).await {
                warn!("[NEWS] Failed to write cache {}: {}", self.cache.path().display(), e);
            }
        }
        items.into_iter().take(limit).collect()
    }
}
