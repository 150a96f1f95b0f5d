use tracing::{info, warn};

use crate::backend::{AiNewsResponse, NewsBackend, SeniorHousingResponse};
use crate::error::FetchError;
use crate::models::{
    Article, Campaign, FetchMode, HeadlineRequest, ScrapeReport, SeniorHousingPayload, Topic,
};
use crate::session::Ticket;

/// What a dispatched fetch produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    AiHeadlines(Vec<String>),
    SeniorHousing(SeniorHousingPayload),
    /// The topic is known but has no source behind it yet
    Unsupported(Topic),
}

/// Route a started fetch to the handler for its topic.
pub async fn dispatch(backend: &dyn NewsBackend, ticket: &Ticket) -> Result<Fetched, FetchError> {
    let request = &ticket.request;
    match request.topic {
        Topic::AiHeadlines => fetch_ai_headlines(backend, request)
            .await
            .map(Fetched::AiHeadlines),
        Topic::SeniorHousingNews => fetch_senior_housing(backend, request, ticket.mode)
            .await
            .map(Fetched::SeniorHousing),
        Topic::ForSaleListings => Ok(fetch_for_sale_listings()),
    }
}

async fn fetch_ai_headlines(
    backend: &dyn NewsBackend,
    request: &HeadlineRequest,
) -> Result<Vec<String>, FetchError> {
    let response = backend.ai_headlines(request).await?;
    let headlines = validate_ai_news(response)?;
    info!(count = headlines.len(), "Loaded AI headlines");
    Ok(headlines)
}

async fn fetch_senior_housing(
    backend: &dyn NewsBackend,
    request: &HeadlineRequest,
    mode: FetchMode,
) -> Result<SeniorHousingPayload, FetchError> {
    if mode == FetchMode::Regenerate {
        select_articles(backend, request).await?;
    }

    let response = backend.senior_housing_headlines(request, mode).await?;
    let payload = validate_senior_housing(response)?;
    info!(count = payload.articles.len(), "Loaded senior housing articles");
    Ok(payload)
}

fn fetch_for_sale_listings() -> Fetched {
    info!("For-sale listings have no source yet");
    Fetched::Unsupported(Topic::ForSaleListings)
}

/// Have the senior-housing service pull new articles from its sources.
pub async fn scrape(backend: &dyn NewsBackend) -> Result<ScrapeReport, FetchError> {
    let response = backend.scrape().await?;
    if let Some(error) = response.error {
        warn!(%error, "Scrape failed");
        return Err(FetchError::Application(error));
    }
    let articles = response.articles.unwrap_or_default();
    info!(count = articles.len(), "Scraped articles");
    Ok(ScrapeReport {
        message: response.message,
        articles,
    })
}

pub async fn list_articles(backend: &dyn NewsBackend) -> Result<Vec<Article>, FetchError> {
    let articles = backend.list_articles().await?;
    info!(count = articles.len(), "Listed stored articles");
    Ok(articles)
}

/// Ask the senior-housing service to pick a fresh set of articles.
pub async fn select_articles(
    backend: &dyn NewsBackend,
    request: &HeadlineRequest,
) -> Result<Option<String>, FetchError> {
    let response = backend.select_articles(request).await?;
    if let Some(error) = response.error {
        warn!(%error, "Article selection refused");
        return Err(FetchError::Application(error));
    }
    Ok(response.message)
}

/// Ask the senior-housing service to create and send the newsletter campaign.
pub async fn send_newsletter(backend: &dyn NewsBackend) -> Result<Campaign, FetchError> {
    let response = backend.send_newsletter().await?;
    if let Some(error) = response.error {
        warn!(%error, "Newsletter sending refused");
        return Err(FetchError::Application(error));
    }
    info!(campaign_id = ?response.campaign_id, "Newsletter campaign created");
    Ok(Campaign {
        message: response.message,
        campaign_id: response.campaign_id,
    })
}

pub fn validate_ai_news(response: AiNewsResponse) -> Result<Vec<String>, FetchError> {
    if let Some(error) = response.error {
        warn!(%error, "AI news service reported an error");
        return Err(FetchError::Application(error));
    }

    response.headlines.ok_or_else(|| {
        warn!("AI news response has no headlines field");
        FetchError::InvalidPayload("response has no headlines list".to_string())
    })
}

pub fn validate_senior_housing(
    response: SeniorHousingResponse,
) -> Result<SeniorHousingPayload, FetchError> {
    if let Some(error) = response.error {
        warn!(%error, "Senior housing service reported an error");
        return Err(FetchError::Application(error));
    }

    let articles = match response.articles {
        Some(articles) if !articles.is_empty() => articles,
        _ => {
            warn!("Senior housing response has no articles");
            return Err(FetchError::InvalidPayload(
                "response has no articles".to_string(),
            ));
        }
    };

    let html_content = match response.html_content {
        Some(html) if !html.trim().is_empty() => html,
        _ => {
            warn!("Senior housing response has no html_content");
            return Err(FetchError::InvalidPayload(
                "response has no html_content".to_string(),
            ));
        }
    };

    Ok(SeniorHousingPayload {
        articles,
        html_content,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::{ScrapeResponse, SelectArticlesResponse, SendNewsletterResponse};
    use crate::models::DateRange;
    use chrono::NaiveDate;
    use futures::future::{BoxFuture, FutureExt};
    use std::sync::Mutex;

    /// In-memory backend that replays canned responses and records calls.
    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub ai: Mutex<Option<Result<AiNewsResponse, FetchError>>>,
        pub senior: Mutex<Option<Result<SeniorHousingResponse, FetchError>>>,
        pub scrape: Mutex<Option<Result<ScrapeResponse, FetchError>>>,
        pub articles: Mutex<Option<Result<Vec<Article>, FetchError>>>,
        pub select: Mutex<Option<Result<SelectArticlesResponse, FetchError>>>,
        pub send: Mutex<Option<Result<SendNewsletterResponse, FetchError>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        pub(crate) fn with_articles(titles: &[&str]) -> Self {
            let articles = titles
                .iter()
                .map(|t| Article::new(*t, format!("https://news.example/{}", t.to_lowercase())))
                .collect();
            let backend = Self::default();
            *backend.senior.lock().unwrap() = Some(Ok(SeniorHousingResponse {
                articles: Some(articles),
                html_content: Some("<ul><li>server</li></ul>".to_string()),
                error: None,
            }));
            backend
        }

        pub(crate) fn with_headlines(headlines: &[&str]) -> Self {
            let backend = Self::default();
            *backend.ai.lock().unwrap() = Some(Ok(AiNewsResponse {
                headlines: Some(headlines.iter().map(|h| h.to_string()).collect()),
                error: None,
            }));
            backend
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn take<T: Default>(
            &self,
            slot: &Mutex<Option<Result<T, FetchError>>>,
            call: &str,
        ) -> Result<T, FetchError> {
            self.calls.lock().unwrap().push(call.to_string());
            slot.lock().unwrap().take().unwrap_or_else(|| Ok(T::default()))
        }
    }

    impl NewsBackend for FakeBackend {
        fn ai_headlines<'a>(
            &'a self,
            _request: &'a HeadlineRequest,
        ) -> BoxFuture<'a, Result<AiNewsResponse, FetchError>> {
            let result = self.take(&self.ai, "ai-news");
            async move { result }.boxed()
        }

        fn senior_housing_headlines<'a>(
            &'a self,
            _request: &'a HeadlineRequest,
            mode: FetchMode,
        ) -> BoxFuture<'a, Result<SeniorHousingResponse, FetchError>> {
            let call = match mode {
                FetchMode::Plain => "senior-housing GET",
                FetchMode::Regenerate => "senior-housing POST",
            };
            let result = self.take(&self.senior, call);
            async move { result }.boxed()
        }

        fn scrape(&self) -> BoxFuture<'_, Result<ScrapeResponse, FetchError>> {
            let result = self.take(&self.scrape, "scrape");
            async move { result }.boxed()
        }

        fn list_articles(&self) -> BoxFuture<'_, Result<Vec<Article>, FetchError>> {
            let result = self.take(&self.articles, "articles");
            async move { result }.boxed()
        }

        fn select_articles<'a>(
            &'a self,
            _request: &'a HeadlineRequest,
        ) -> BoxFuture<'a, Result<SelectArticlesResponse, FetchError>> {
            let result = self.take(&self.select, "select-articles");
            async move { result }.boxed()
        }

        fn send_newsletter(&self) -> BoxFuture<'_, Result<SendNewsletterResponse, FetchError>> {
            let result = self.take(&self.send, "send-newsletter");
            async move { result }.boxed()
        }
    }

    fn ticket(topic: Topic, mode: FetchMode) -> Ticket {
        Ticket {
            seq: 1,
            request: HeadlineRequest {
                range: DateRange {
                    start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                },
                count: 3,
                topic,
            },
            mode,
        }
    }

    #[tokio::test]
    async fn test_ai_topic_queries_news_service() {
        let backend = FakeBackend::with_headlines(&["<em>One</em>", "Two"]);
        let fetched = dispatch(&backend, &ticket(Topic::AiHeadlines, FetchMode::Plain))
            .await
            .unwrap();
        assert_eq!(
            fetched,
            Fetched::AiHeadlines(vec!["<em>One</em>".to_string(), "Two".to_string()])
        );
        assert_eq!(backend.calls(), vec!["ai-news"]);
    }

    #[tokio::test]
    async fn test_regenerate_selects_before_requery() {
        let backend = FakeBackend::with_articles(&["A", "B"]);
        let fetched = dispatch(
            &backend,
            &ticket(Topic::SeniorHousingNews, FetchMode::Regenerate),
        )
        .await
        .unwrap();
        assert!(matches!(fetched, Fetched::SeniorHousing(ref p) if p.articles.len() == 2));
        assert_eq!(
            backend.calls(),
            vec!["select-articles", "senior-housing POST"]
        );
    }

    #[tokio::test]
    async fn test_failed_selection_skips_requery() {
        let backend = FakeBackend::with_articles(&["A"]);
        *backend.select.lock().unwrap() = Some(Ok(SelectArticlesResponse {
            message: None,
            error: Some("no articles scraped".to_string()),
        }));

        let err = dispatch(
            &backend,
            &ticket(Topic::SeniorHousingNews, FetchMode::Regenerate),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "no articles scraped");
        assert_eq!(backend.calls(), vec!["select-articles"]);
    }

    #[tokio::test]
    async fn test_for_sale_listings_make_no_calls() {
        let backend = FakeBackend::default();
        let fetched = dispatch(&backend, &ticket(Topic::ForSaleListings, FetchMode::Plain))
            .await
            .unwrap();
        assert_eq!(fetched, Fetched::Unsupported(Topic::ForSaleListings));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_application_error_wins_over_payload() {
        let err = validate_senior_housing(SeniorHousingResponse {
            articles: Some(vec![Article::new("A", "https://a.example")]),
            html_content: Some("<li>A</li>".to_string()),
            error: Some("no data".to_string()),
        })
        .unwrap_err();
        assert!(matches!(err, FetchError::Application(ref m) if m == "no data"));
    }

    #[test]
    fn test_empty_articles_are_invalid() {
        let err = validate_senior_housing(SeniorHousingResponse {
            articles: Some(vec![]),
            html_content: Some("<ul></ul>".to_string()),
            error: None,
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid or missing data: response has no articles"
        );
    }

    #[test]
    fn test_blank_html_is_invalid() {
        let err = validate_senior_housing(SeniorHousingResponse {
            articles: Some(vec![Article::new("A", "https://a.example")]),
            html_content: Some("   ".to_string()),
            error: None,
        })
        .unwrap_err();
        assert!(matches!(err, FetchError::InvalidPayload(_)));
    }

    #[test]
    fn test_missing_headlines_are_invalid() {
        let err = validate_ai_news(AiNewsResponse::default()).unwrap_err();
        assert!(matches!(err, FetchError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_send_newsletter_returns_campaign() {
        let backend = FakeBackend::default();
        *backend.send.lock().unwrap() = Some(Ok(SendNewsletterResponse {
            message: Some("Newsletter created successfully".to_string()),
            campaign_id: Some("abc123".to_string()),
            error: None,
        }));

        let campaign = send_newsletter(&backend).await.unwrap();
        assert_eq!(campaign.campaign_id.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_scrape_reports_new_articles() {
        let backend = FakeBackend::default();
        *backend.scrape.lock().unwrap() = Some(Ok(ScrapeResponse {
            message: Some("Successfully scraped 2 articles".to_string()),
            articles: Some(vec![
                Article::new("A", "https://a.example"),
                Article::new("B", "https://b.example"),
            ]),
            error: None,
        }));

        let report = scrape(&backend).await.unwrap();
        assert_eq!(report.articles.len(), 2);
        assert_eq!(
            report.message.as_deref(),
            Some("Successfully scraped 2 articles")
        );
        assert_eq!(backend.calls(), vec!["scrape"]);
    }

    #[tokio::test]
    async fn test_scrape_error_is_application_error() {
        let backend = FakeBackend::default();
        *backend.scrape.lock().unwrap() = Some(Ok(ScrapeResponse {
            error: Some("spider crashed".to_string()),
            ..Default::default()
        }));

        let err = scrape(&backend).await.unwrap_err();
        assert!(matches!(err, FetchError::Application(ref m) if m == "spider crashed"));
    }

    #[tokio::test]
    async fn test_list_articles_passes_through() {
        let backend = FakeBackend::default();
        *backend.articles.lock().unwrap() =
            Some(Ok(vec![Article::new("Newest", "https://n.example")]));

        let articles = list_articles(&backend).await.unwrap();
        assert_eq!(articles, vec![Article::new("Newest", "https://n.example")]);
        assert_eq!(backend.calls(), vec!["articles"]);
    }
}
