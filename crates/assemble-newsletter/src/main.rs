use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use shared::session::{parse_count, parse_date, parse_topic};
use shared::{
    copy_to_clipboard, dispatch, Completion, Config, FetchError, FetchMode, Fetched, HttpBackend,
    NewsBackend, NewsletterExport, Session, Ticket, Topic, Trigger,
};
use std::io::{self as stdio, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::debug;

mod commands;

use commands::{parse_command, Command, HELP};

const PREVIEW_WIDTH: usize = 80;

type Finished = (Ticket, Result<Fetched, FetchError>);

#[derive(Parser)]
#[command(name = "assemble-newsletter")]
#[command(
    about = "Fetch headlines for a newsletter section, edit the HTML, and copy, export, or send it"
)]
struct Args {
    /// Topic to start with (ai, senior, forsale)
    #[arg(short, long)]
    topic: Option<String>,

    /// Start of the date range, YYYY-MM-DD (defaults to today)
    #[arg(short, long)]
    start: Option<String>,

    /// End of the date range, YYYY-MM-DD (defaults to the start date)
    #[arg(short, long)]
    end: Option<String>,

    /// Number of headlines to request
    #[arg(short = 'n', long, default_value = "5")]
    count: i64,

    /// Base URL of the AI news service (overrides AI_NEWS_URL)
    #[arg(long)]
    ai_news_url: Option<String>,

    /// Base URL of the senior-housing service (overrides SENIOR_HOUSING_URL)
    #[arg(long)]
    senior_housing_url: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Ask for the section on the same reader the command loop uses, so lines
/// typed ahead of the menu reach the prompt afterwards.
async fn prompt_topic_selection<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> Result<Topic> {
    println!("Which newsletter section?");
    for (i, topic) in Topic::ALL.iter().enumerate() {
        println!("  {}) {}", i + 1, topic);
    }
    print!("\nEnter your choice (1-{}): ", Topic::ALL.len());
    stdio::stdout().flush()?;

    let input = lines
        .next_line()
        .await
        .context("Failed to read input")?
        .context("No section chosen")?;

    input
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|choice| choice.checked_sub(1))
        .and_then(|index| Topic::ALL.get(index).copied())
        .ok_or_else(|| anyhow::anyhow!("Invalid selection. Please choose 1, 2, or 3."))
}

fn prefill(session: &mut Session, args: &Args, topic: Topic) -> Result<()> {
    session.set_topic(topic);

    let start = match &args.start {
        Some(raw) => parse_date(raw)?,
        None => Some(session.today()),
    };
    let end = match &args.end {
        Some(raw) => parse_date(raw)?,
        None => start,
    };
    session
        .set_start_date(start)
        .context("Invalid --start date")?;
    session.set_end_date(end).context("Invalid --end date")?;
    session.set_count(args.count);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    shared::logging::init("warn", args.verbose);

    let config = Config::from_env()?
        .with_overrides(args.ai_news_url.as_deref(), args.senior_housing_url.as_deref())?;
    debug!(?config, "Loaded configuration");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let topic = match &args.topic {
        Some(slug) => parse_topic(slug)?,
        None => prompt_topic_selection(&mut lines).await?,
    };

    let mut session = Session::new(Local::now().date_naive());
    prefill(&mut session, &args, topic)?;

    let backend: Arc<dyn NewsBackend> = Arc::new(HttpBackend::new(&config)?);

    println!("\n✓ Selected: {}", topic);
    println!("  Type 'fetch' to get headlines, 'help' for all commands.");

    run(&mut session, backend, &mut lines).await
}

async fn run<R: AsyncBufRead + Unpin>(
    session: &mut Session,
    backend: Arc<dyn NewsBackend>,
    lines: &mut Lines<R>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Finished>();

    loop {
        print_prompt(session)?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };

                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Edit) => {
                        println!("Enter the new HTML. Finish with a line containing only '.'");
                        let markup = read_markup(lines).await?;
                        session.edit_fragment(markup);
                        println!("✓ Fragment replaced ({} bytes)", session.fragment().len());
                    }
                    Ok(command) => handle(command, session, &backend, &tx).await,
                    Err(e) => println!("✗ {}", e),
                }
            }
            Some((ticket, result)) = rx.recv() => {
                report_completion(session, &ticket, result);
            }
        }
    }

    println!("👋 Bye");
    Ok(())
}

async fn handle(
    command: Command,
    session: &mut Session,
    backend: &Arc<dyn NewsBackend>,
    tx: &mpsc::UnboundedSender<Finished>,
) {
    match command {
        Command::Topic(raw) => match parse_topic(&raw) {
            Ok(topic) => {
                session.set_topic(topic);
                println!("✓ Topic: {}", topic);
            }
            Err(e) => println!("✗ {}", e),
        },
        Command::Start(raw) => {
            match parse_date(&raw).and_then(|date| session.set_start_date(date)) {
                Ok(()) => println!("✓ Start date: {}", describe_date(session.form().start)),
                Err(e) => println!("✗ {}", e),
            }
        }
        Command::End(raw) => match parse_date(&raw).and_then(|date| session.set_end_date(date)) {
            Ok(()) => println!("✓ End date: {}", describe_date(session.form().end)),
            Err(e) => println!("✗ {}", e),
        },
        Command::Count(raw) => match parse_count(&raw) {
            Ok(count) => {
                session.set_count(count);
                println!("✓ Headline count: {}", count);
            }
            Err(e) => println!("✗ {}", e),
        },
        Command::Fetch => start_fetch(session, backend, tx, FetchMode::Plain),
        Command::Regenerate => start_fetch(session, backend, tx, FetchMode::Regenerate),
        Command::List => print_items(session),
        Command::Delete(position) => match session.delete_item(position - 1) {
            Ok(removed) => {
                println!("✓ Removed \"{}\"", shared::fragment::plain_text(&removed));
                print_items(session);
            }
            Err(e) => println!("✗ {}", e),
        },
        Command::Html => {
            if session.fragment().is_empty() {
                println!("(empty)");
            } else {
                println!("{}", session.fragment());
            }
        }
        Command::Preview => {
            let rendered = session.preview(PREVIEW_WIDTH);
            if rendered.trim().is_empty() {
                println!("(nothing to preview)");
            } else {
                println!("{}", rendered);
            }
        }
        Command::Server => match session.restore_server_fragment() {
            Ok(()) => println!("✓ Restored the service's markup"),
            Err(e) => println!("✗ {}", e),
        },
        Command::Copy => {
            if session.fragment().is_empty() {
                println!("✗ Nothing to copy");
                return;
            }
            match copy_to_clipboard(session.fragment()) {
                Ok(tool) => println!("📋 Copied HTML to clipboard (via {})", tool),
                Err(e) => println!("✗ {}", e),
            }
        }
        Command::Export => export(session),
        Command::Scrape => scrape(session, backend).await,
        Command::Articles => list_articles(backend).await,
        Command::Send => send(session, backend).await,
        Command::Status => print_status(session),
        Command::Help => println!("{}", HELP),
        Command::Edit | Command::Quit | Command::Empty => {}
    }
}

fn start_fetch(
    session: &mut Session,
    backend: &Arc<dyn NewsBackend>,
    tx: &mpsc::UnboundedSender<Finished>,
    mode: FetchMode,
) {
    match session.begin_fetch(mode) {
        Trigger::Started(ticket) => {
            let verb = match mode {
                FetchMode::Plain => "Fetching",
                FetchMode::Regenerate => "Regenerating",
            };
            println!(
                "\n📰 {} {} headlines for {} to {}...",
                verb,
                ticket.request.topic,
                ticket.request.range.start,
                ticket.request.range.end
            );

            let backend = Arc::clone(backend);
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = dispatch(backend.as_ref(), &ticket).await;
                // The receiver only goes away when the session is over
                let _ = tx.send((ticket, result));
            });
        }
        Trigger::Rejected(rejection) => println!("✗ Not fetching: {}", rejection),
        Trigger::Busy => println!("⏳ Still waiting for the previous request"),
    }
}

fn report_completion(session: &mut Session, ticket: &Ticket, result: Result<Fetched, FetchError>) {
    match session.complete(ticket, result) {
        Completion::Loaded(count) => {
            println!("\n✓ Loaded {} headlines", count);
            print_items(session);
        }
        Completion::Unsupported(topic) => {
            println!("\nℹ {} are not supported yet; nothing changed", topic);
        }
        Completion::Failed(message) => println!("\n✗ {}", message),
        Completion::Stale => {}
    }
}

fn export(session: &Session) {
    if session.fragment().is_empty() {
        println!("✗ Nothing to export");
        return;
    }

    let range = session.shown_request().map(|request| request.range);
    let content = NewsletterExport::generate(
        session.shown_topic(),
        session.fragment(),
        range.as_ref(),
        Local::now(),
    );
    let date = range.map(|r| r.end).unwrap_or_else(|| session.today());

    match NewsletterExport::save(&content, session.shown_topic(), date) {
        Ok(path) => println!("💾 Saved to {}", path.display()),
        Err(e) => println!("✗ {:#}", e),
    }
}

async fn scrape(session: &Session, backend: &Arc<dyn NewsBackend>) {
    if let Err(e) = session.ensure_idle() {
        println!("⏳ {}; wait for it to finish before scraping", e);
        return;
    }

    println!("\n🕸  Scraping news sources...");
    match shared::dispatcher::scrape(backend.as_ref()).await {
        Ok(report) => {
            let summary = report
                .message
                .unwrap_or_else(|| format!("Scraped {} articles", report.articles.len()));
            println!("✓ {}", summary);
            for article in &report.articles {
                println!("  • {}", article.title);
            }
        }
        Err(e) => println!("✗ {}", e),
    }
}

async fn list_articles(backend: &Arc<dyn NewsBackend>) {
    match shared::dispatcher::list_articles(backend.as_ref()).await {
        Ok(articles) if articles.is_empty() => println!("(no stored articles)"),
        Ok(articles) => {
            for (i, article) in articles.iter().enumerate() {
                let date = article
                    .publication_date
                    .as_deref()
                    .and_then(|d| d.get(..10))
                    .unwrap_or("undated");
                println!("  {}) [{}] {}", i + 1, date, article.title);
                println!("     {}", article.url);
            }
        }
        Err(e) => println!("✗ {}", e),
    }
}

async fn send(session: &Session, backend: &Arc<dyn NewsBackend>) {
    if let Err(e) = session.ensure_idle() {
        println!("⏳ {}; wait for it to finish before sending", e);
        return;
    }

    println!("\n📨 Sending newsletter...");
    match shared::dispatcher::send_newsletter(backend.as_ref()).await {
        Ok(campaign) => {
            println!(
                "✓ {}",
                campaign
                    .message
                    .as_deref()
                    .unwrap_or("Newsletter created successfully")
            );
            if let Some(id) = campaign.campaign_id {
                println!("  Campaign: {}", id);
            }
        }
        Err(e) => println!("✗ {}", e),
    }
}

async fn read_markup<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> Result<String> {
    let mut markup = Vec::new();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        if line.trim() == "." {
            break;
        }
        markup.push(line);
    }
    Ok(markup.join("\n"))
}

fn print_prompt(session: &Session) -> Result<()> {
    let marker = if session.is_busy() { "⏳" } else { ">" };
    print!("{} {} ", session.form().topic.slug(), marker);
    stdio::stdout().flush()?;
    Ok(())
}

fn print_items(session: &Session) {
    let items = session.items();
    if items.is_empty() {
        println!("(no headlines)");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        println!("  {}) {}", i + 1, item);
    }
}

fn print_status(session: &Session) {
    let form = session.form();
    println!("Form:");
    println!("  Topic:  {}", form.topic);
    println!("  Start:  {}", describe_date(form.start));
    println!("  End:    {}", describe_date(form.end));
    println!("  Count:  {}", form.count);

    println!("Results:");
    match session.committed() {
        Some(request) => println!(
            "  Last request: {} from {} to {}, {} headlines",
            request.topic, request.range.start, request.range.end, request.count
        ),
        None => println!("  Last request: none"),
    }
    println!("  Busy: {}", if session.is_busy() { "yes" } else { "no" });
    match session.shown_request() {
        Some(request) => println!(
            "  Showing: {} headlines ({}, {} to {})",
            session.headlines().len(),
            request.topic,
            request.range.start,
            request.range.end
        ),
        None => println!("  Showing: nothing"),
    }
    if let Some(error) = session.error() {
        println!("  Error: {}", error);
    }
    if let Some(notice) = session.notice() {
        println!("  Note: {}", notice);
    }
}

fn describe_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}
