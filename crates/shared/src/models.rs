use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newsletter section a fetch is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    AiHeadlines,
    SeniorHousingNews,
    ForSaleListings,
}

impl Topic {
    pub const ALL: [Topic; 3] = [
        Topic::AiHeadlines,
        Topic::SeniorHousingNews,
        Topic::ForSaleListings,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Topic::AiHeadlines => "AI Headlines",
            Topic::SeniorHousingNews => "Senior Housing News",
            Topic::ForSaleListings => "For Sale Listings",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Topic::AiHeadlines => "ai",
            Topic::SeniorHousingNews => "senior",
            Topic::ForSaleListings => "forsale",
        }
    }

    /// Heading used when the fragment is exported as a newsletter section
    pub fn section_title(&self) -> &'static str {
        match self {
            Topic::AiHeadlines => "AI Headlines",
            Topic::SeniorHousingNews => "Senior Living Headlines",
            Topic::ForSaleListings => "For Sale Listings",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug.trim().to_lowercase().as_str() {
            "ai" | "ai-headlines" => Some(Topic::AiHeadlines),
            "senior" | "senior-housing" => Some(Topic::SeniorHousingNews),
            "forsale" | "for-sale" => Some(Topic::ForSaleListings),
            _ => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

/// How headlines are obtained from the senior-housing service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Query whatever the service currently has selected
    Plain,
    /// Ask the service to select new articles first, then re-query
    Regenerate,
}

/// Parameters locked in when a fetch is triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlineRequest {
    pub range: DateRange,
    pub count: u32,
    pub topic: Topic,
}

/// Article record returned by the senior-housing service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
}

impl Article {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            author: None,
            publication_date: None,
        }
    }
}

/// Body shape shared by the senior-housing POST endpoints
#[derive(Debug, Clone, Serialize)]
pub struct HeadlineQuery {
    pub start_date: String,
    pub end_date: String,
    pub num_headlines: u32,
}

impl From<&HeadlineRequest> for HeadlineQuery {
    fn from(request: &HeadlineRequest) -> Self {
        Self {
            start_date: request.range.start_param(),
            end_date: request.range.end_param(),
            num_headlines: request.count,
        }
    }
}

/// Validated senior-housing payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeniorHousingPayload {
    pub articles: Vec<Article>,
    pub html_content: String,
}

/// Result of asking the senior-housing service to scrape its sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeReport {
    pub message: Option<String>,
    pub articles: Vec<Article>,
}

/// Result of a send-newsletter call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    pub message: Option<String>,
    pub campaign_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_slug_roundtrip() {
        for topic in Topic::ALL {
            assert_eq!(Topic::from_slug(topic.slug()), Some(topic));
        }
        assert_eq!(Topic::from_slug(" Senior "), Some(Topic::SeniorHousingNews));
        assert_eq!(Topic::from_slug("sports"), None);
    }

    #[test]
    fn test_headline_query_uses_iso_dates() {
        let request = HeadlineRequest {
            range: DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            },
            count: 3,
            topic: Topic::SeniorHousingNews,
        };
        let query = HeadlineQuery::from(&request);
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "start_date": "2024-01-01",
                "end_date": "2024-01-07",
                "num_headlines": 3
            })
        );
    }

    #[test]
    fn test_article_optional_fields_default() {
        let article: Article =
            serde_json::from_str(r#"{"title": "A", "url": "https://a.example"}"#).unwrap();
        assert_eq!(article, Article::new("A", "https://a.example"));
    }
}
