use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::FetchError;
use crate::models::{Article, FetchMode, HeadlineQuery, HeadlineRequest};

#[derive(Debug, Default, Deserialize)]
pub struct AiNewsResponse {
    #[serde(default)]
    pub headlines: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeniorHousingResponse {
    #[serde(default)]
    pub articles: Option<Vec<Article>>,
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScrapeResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub articles: Option<Vec<Article>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectArticlesResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendNewsletterResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The remote services the newsletter desk talks to.
///
/// Implementations only deal with transport: they report non-success statuses
/// and unreadable bodies, and hand back the decoded body untouched. Deciding
/// whether a decoded body is usable is the dispatcher's job.
pub trait NewsBackend: Send + Sync {
    fn ai_headlines<'a>(
        &'a self,
        request: &'a HeadlineRequest,
    ) -> BoxFuture<'a, Result<AiNewsResponse, FetchError>>;

    fn senior_housing_headlines<'a>(
        &'a self,
        request: &'a HeadlineRequest,
        mode: FetchMode,
    ) -> BoxFuture<'a, Result<SeniorHousingResponse, FetchError>>;

    /// Have the senior-housing service scrape its sources for new articles.
    fn scrape(&self) -> BoxFuture<'_, Result<ScrapeResponse, FetchError>>;

    /// Every article the senior-housing service has stored, newest first.
    fn list_articles(&self) -> BoxFuture<'_, Result<Vec<Article>, FetchError>>;

    fn select_articles<'a>(
        &'a self,
        request: &'a HeadlineRequest,
    ) -> BoxFuture<'a, Result<SelectArticlesResponse, FetchError>>;

    fn send_newsletter(&self) -> BoxFuture<'_, Result<SendNewsletterResponse, FetchError>>;
}

pub struct HttpBackend {
    client: Client,
    ai_news: Url,
    senior_headlines: Url,
    scrape: Url,
    articles: Url,
    select_articles: Url,
    send_newsletter: Url,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            ai_news: Self::endpoint(&config.ai_news_url, "api/ai-news")?,
            senior_headlines: Self::endpoint(
                &config.senior_housing_url,
                "api/senior-housing/headlines",
            )?,
            scrape: Self::endpoint(&config.senior_housing_url, "api/scrape")?,
            articles: Self::endpoint(&config.senior_housing_url, "api/articles")?,
            select_articles: Self::endpoint(&config.senior_housing_url, "api/select-articles")?,
            send_newsletter: Self::endpoint(&config.senior_housing_url, "api/send-newsletter")?,
        })
    }

    /// Join `path` under `base`, keeping any path prefix the base carries
    /// (`http://host/newsletter` serves `http://host/newsletter/api/...`).
    fn endpoint(base: &Url, path: &str) -> Result<Url> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        base.join(path)
            .with_context(|| format!("Failed to build endpoint {} from {}", path, base))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, FetchError> {
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "{} request failed", what);
            FetchError::Network(e)
        })?;
        Self::read_json(response, what).await
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        what: &str,
    ) -> Result<T, FetchError> {
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "{} responded", what);

        if !status.is_success() {
            let status_text = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string());
            warn!(status = status.as_u16(), "{} returned {}", what, status_text);
            return Err(FetchError::Status {
                status: status.as_u16(),
                status_text,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "{} body is not valid JSON", what);
            FetchError::InvalidPayload(format!("{} response is not valid JSON ({})", what, e))
        })
    }

    fn ai_news_url(&self, request: &HeadlineRequest) -> Url {
        let mut url = self.ai_news.clone();
        url.query_pairs_mut()
            .append_pair("date_from", &request.range.start_param())
            .append_pair("date_to", &request.range.end_param())
            .append_pair("numHeadlines", &request.count.to_string());
        url
    }

    fn senior_headlines_url(&self, request: &HeadlineRequest) -> Url {
        let mut url = self.senior_headlines.clone();
        url.query_pairs_mut()
            .append_pair("start_date", &request.range.start_param())
            .append_pair("end_date", &request.range.end_param())
            .append_pair("num_headlines", &request.count.to_string());
        url
    }
}

impl NewsBackend for HttpBackend {
    fn ai_headlines<'a>(
        &'a self,
        request: &'a HeadlineRequest,
    ) -> BoxFuture<'a, Result<AiNewsResponse, FetchError>> {
        async move {
            let url = self.ai_news_url(request);
            debug!(%url, "GET ai-news");
            self.send_json(self.client.get(url), "AI news service").await
        }
        .boxed()
    }

    fn senior_housing_headlines<'a>(
        &'a self,
        request: &'a HeadlineRequest,
        mode: FetchMode,
    ) -> BoxFuture<'a, Result<SeniorHousingResponse, FetchError>> {
        async move {
            // Regenerated selections are re-queried with the POST form
            let builder = match mode {
                FetchMode::Plain => {
                    let url = self.senior_headlines_url(request);
                    debug!(%url, "GET senior-housing headlines");
                    self.client.get(url)
                }
                FetchMode::Regenerate => {
                    debug!(url = %self.senior_headlines, "POST senior-housing headlines");
                    self.client
                        .post(self.senior_headlines.clone())
                        .json(&HeadlineQuery::from(request))
                }
            };
            self.send_json(builder, "Senior housing service").await
        }
        .boxed()
    }

    fn scrape(&self) -> BoxFuture<'_, Result<ScrapeResponse, FetchError>> {
        async move {
            debug!(url = %self.scrape, "POST scrape");
            let builder = self.client.post(self.scrape.clone());
            self.send_json(builder, "Article scraping service").await
        }
        .boxed()
    }

    fn list_articles(&self) -> BoxFuture<'_, Result<Vec<Article>, FetchError>> {
        async move {
            debug!(url = %self.articles, "GET articles");
            self.send_json(self.client.get(self.articles.clone()), "Article listing service")
                .await
        }
        .boxed()
    }

    fn select_articles<'a>(
        &'a self,
        request: &'a HeadlineRequest,
    ) -> BoxFuture<'a, Result<SelectArticlesResponse, FetchError>> {
        async move {
            debug!(url = %self.select_articles, "POST select-articles");
            let builder = self
                .client
                .post(self.select_articles.clone())
                .json(&HeadlineQuery::from(request));
            self.send_json(builder, "Article selection service").await
        }
        .boxed()
    }

    fn send_newsletter(&self) -> BoxFuture<'_, Result<SendNewsletterResponse, FetchError>> {
        async move {
            debug!(url = %self.send_newsletter, "POST send-newsletter");
            let builder = self
                .client
                .post(self.send_newsletter.clone())
                .json(&serde_json::json!({}));
            self.send_json(builder, "Newsletter sending service").await
        }
        .boxed()
    }
}
