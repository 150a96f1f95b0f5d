use anyhow::{Context, Result};
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_AI_NEWS_URL: &str = "http://localhost:5000";
pub const DEFAULT_SENIOR_HOUSING_URL: &str = "http://localhost:5001";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub ai_news_url: Url,
    pub senior_housing_url: Url,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai_news_url: Url::parse(DEFAULT_AI_NEWS_URL).expect("default AI news URL is valid"),
            senior_housing_url: Url::parse(DEFAULT_SENIOR_HOUSING_URL)
                .expect("default senior housing URL is valid"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let ai_news_url = Self::url_var("AI_NEWS_URL", DEFAULT_AI_NEWS_URL)?;
        let senior_housing_url = Self::url_var("SENIOR_HOUSING_URL", DEFAULT_SENIOR_HOUSING_URL)?;

        let timeout = match env::var("NEWSLETTER_HTTP_TIMEOUT_SECS") {
            Ok(raw) => Self::parse_timeout(&raw)?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            ai_news_url,
            senior_housing_url,
            timeout,
        })
    }

    fn parse_timeout(raw: &str) -> Result<Duration> {
        let secs = raw.trim().parse::<u64>().with_context(|| {
            format!(
                "NEWSLETTER_HTTP_TIMEOUT_SECS must be a whole number of seconds, got {:?}",
                raw
            )
        })?;
        if secs == 0 {
            anyhow::bail!("NEWSLETTER_HTTP_TIMEOUT_SECS must be at least 1 second");
        }
        Ok(Duration::from_secs(secs))
    }

    /// Replace the service base URLs with command-line overrides, if given.
    pub fn with_overrides(
        mut self,
        ai_news_url: Option<&str>,
        senior_housing_url: Option<&str>,
    ) -> Result<Self> {
        if let Some(raw) = ai_news_url {
            self.ai_news_url = Self::parse_base("--ai-news-url", raw)?;
        }
        if let Some(raw) = senior_housing_url {
            self.senior_housing_url = Self::parse_base("--senior-housing-url", raw)?;
        }
        Ok(self)
    }

    fn url_var(name: &str, default: &str) -> Result<Url> {
        let raw = env::var(name).unwrap_or_else(|_| default.to_string());
        Self::parse_base(name, &raw)
    }

    fn parse_base(name: &str, raw: &str) -> Result<Url> {
        Url::parse(raw.trim()).with_context(|| {
            format!(
                "{} is not a valid URL: {:?}\n\n\
                Set it in ~/.config/newsletter-desk/.env, e.g.:\n  \
                AI_NEWS_URL={}\n  \
                SENIOR_HOUSING_URL={}",
                name, raw, DEFAULT_AI_NEWS_URL, DEFAULT_SENIOR_HOUSING_URL
            )
        })
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/newsletter-desk/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("newsletter-desk").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, the defaults point at the local development services
    }
}
