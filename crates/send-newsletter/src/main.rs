use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use shared::dispatcher::{scrape, select_articles, send_newsletter};
use shared::{Config, DateRange, HeadlineRequest, HttpBackend, Topic};
use tracing::debug;

#[derive(Parser)]
#[command(name = "send-newsletter")]
#[command(about = "Create and send the senior living newsletter campaign")]
struct Args {
    /// Scrape the news sources for new articles first
    #[arg(long)]
    scrape: bool,

    /// Select a fresh set of articles before sending
    #[arg(short, long)]
    regenerate: bool,

    /// Number of days to look back when regenerating
    #[arg(short, long, default_value = "7")]
    days: i64,

    /// Number of articles to select when regenerating
    #[arg(short = 'n', long, default_value = "5")]
    count: u32,

    /// Base URL of the senior-housing service (overrides SENIOR_HOUSING_URL)
    #[arg(long)]
    senior_housing_url: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn selection_request(today: NaiveDate, days: i64, count: u32) -> Result<HeadlineRequest> {
    if days < 0 {
        anyhow::bail!("--days must not be negative");
    }
    if count == 0 {
        anyhow::bail!("--count must be at least 1");
    }

    let start = today
        .checked_sub_days(Days::new(days.unsigned_abs()))
        .with_context(|| format!("--days {} reaches before the earliest supported date", days))?;

    Ok(HeadlineRequest {
        range: DateRange { start, end: today },
        count,
        topic: Topic::SeniorHousingNews,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    shared::logging::init("info", args.verbose);

    let config = Config::from_env()?.with_overrides(None, args.senior_housing_url.as_deref())?;
    debug!(url = %config.senior_housing_url, "Using senior housing service");
    let backend = HttpBackend::new(&config)?;

    if args.scrape {
        println!("🕸  Scraping news sources...");
        let report = scrape(&backend).await.context("Failed to scrape articles")?;
        println!(
            "✓ {}",
            report
                .message
                .unwrap_or_else(|| format!("Scraped {} articles", report.articles.len()))
        );
    }

    if args.regenerate {
        let request = selection_request(Local::now().date_naive(), args.days, args.count)?;
        println!(
            "🔄 Selecting {} articles from {} to {}...",
            request.count, request.range.start, request.range.end
        );
        let message = select_articles(&backend, &request)
            .await
            .context("Failed to select articles")?;
        println!(
            "✓ {}",
            message.as_deref().unwrap_or("Selected new articles")
        );
    }

    println!("\n📨 Sending newsletter...");
    let campaign = send_newsletter(&backend)
        .await
        .context("Failed to send newsletter")?;

    println!(
        "\n✅ {}",
        campaign
            .message
            .as_deref()
            .unwrap_or("Newsletter created successfully")
    );
    if let Some(id) = campaign.campaign_id {
        println!("   Campaign: {}", id);
    }

    Ok(())
}
