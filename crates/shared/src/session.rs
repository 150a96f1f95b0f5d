use chrono::NaiveDate;
use std::fmt;
use tracing::{debug, info, warn};

use crate::dispatcher::Fetched;
use crate::error::{FetchError, FormError};
use crate::fragment;
use crate::models::{Article, DateRange, FetchMode, HeadlineRequest, Topic};

pub const DEFAULT_COUNT: i64 = 5;

/// Pending form inputs, editable at any time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub topic: Topic,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub count: i64,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            topic: Topic::AiHeadlines,
            start: None,
            end: None,
            count: DEFAULT_COUNT,
        }
    }
}

impl FormState {
    fn validate(&self) -> Result<HeadlineRequest, Rejection> {
        let start = self.start.ok_or(Rejection::MissingStartDate)?;
        let end = self.end.ok_or(Rejection::MissingEndDate)?;
        if start > end {
            return Err(Rejection::InvertedRange { start, end });
        }
        let count = match u32::try_from(self.count) {
            Ok(count) if count > 0 => count,
            _ => return Err(Rejection::NonPositiveCount(self.count)),
        };

        Ok(HeadlineRequest {
            range: DateRange { start, end },
            count,
            topic: self.topic,
        })
    }
}

/// Why a fetch was refused before anything was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingStartDate,
    MissingEndDate,
    NonPositiveCount(i64),
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingStartDate => write!(f, "no start date set"),
            Rejection::MissingEndDate => write!(f, "no end date set"),
            Rejection::NonPositiveCount(count) => {
                write!(f, "headline count must be positive, got {}", count)
            }
            Rejection::InvertedRange { start, end } => {
                write!(f, "start date {} is after end date {}", start, end)
            }
        }
    }
}

/// A fetch that has been started and not yet completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub request: HeadlineRequest,
    pub mode: FetchMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Started(Ticket),
    Rejected(Rejection),
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Loaded(usize),
    Unsupported(Topic),
    Failed(String),
    /// A newer fetch was started after this one; nothing changed
    Stale,
}

/// View state of one newsletter-assembly session.
///
/// Form inputs and displayed results are kept apart: edits to the form never
/// touch the results. `committed` is the most recently started request, while
/// `shown` is the request that produced the results on display.
#[derive(Debug)]
pub struct Session {
    today: NaiveDate,
    form: FormState,
    committed: Option<HeadlineRequest>,
    shown: Option<HeadlineRequest>,
    busy: bool,
    last_seq: u64,
    shown_topic: Topic,
    headlines: Vec<String>,
    articles: Vec<Article>,
    fragment: String,
    server_fragment: Option<String>,
    error: Option<String>,
    notice: Option<String>,
}

impl Session {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            form: FormState::default(),
            committed: None,
            shown: None,
            busy: false,
            last_seq: 0,
            shown_topic: Topic::AiHeadlines,
            headlines: Vec::new(),
            articles: Vec::new(),
            fragment: String::new(),
            server_fragment: None,
            error: None,
            notice: None,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn committed(&self) -> Option<&HeadlineRequest> {
        self.committed.as_ref()
    }

    /// The request whose results are currently displayed
    pub fn shown_request(&self) -> Option<&HeadlineRequest> {
        self.shown.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Refuse actions that must not overlap an outstanding request.
    pub fn ensure_idle(&self) -> Result<(), FormError> {
        if self.busy {
            return Err(FormError::Busy);
        }
        Ok(())
    }

    pub fn shown_topic(&self) -> Topic {
        self.shown_topic
    }

    pub fn headlines(&self) -> &[String] {
        &self.headlines
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Headlines as a reader would see them, markup removed
    pub fn items(&self) -> Vec<String> {
        self.headlines.iter().map(|h| fragment::plain_text(h)).collect()
    }

    pub fn preview(&self, width: usize) -> String {
        fragment::preview(&self.fragment, width)
    }

    pub fn set_topic(&mut self, topic: Topic) {
        self.form.topic = topic;
    }

    pub fn set_start_date(&mut self, date: Option<NaiveDate>) -> Result<(), FormError> {
        self.form.start = self.check_not_future(date)?;
        Ok(())
    }

    pub fn set_end_date(&mut self, date: Option<NaiveDate>) -> Result<(), FormError> {
        self.form.end = self.check_not_future(date)?;
        Ok(())
    }

    pub fn set_count(&mut self, count: i64) {
        self.form.count = count;
    }

    fn check_not_future(&self, date: Option<NaiveDate>) -> Result<Option<NaiveDate>, FormError> {
        match date {
            Some(d) if d > self.today => Err(FormError::FutureDate(d)),
            other => Ok(other),
        }
    }

    /// Lock in the form values and mark the session busy.
    ///
    /// Nothing changes when the session is already busy or the form is
    /// incomplete.
    pub fn begin_fetch(&mut self, mode: FetchMode) -> Trigger {
        if self.busy {
            debug!("Fetch requested while another is outstanding");
            return Trigger::Busy;
        }

        let request = match self.form.validate() {
            Ok(request) => request,
            Err(rejection) => {
                debug!(%rejection, "Fetch refused");
                return Trigger::Rejected(rejection);
            }
        };

        self.last_seq += 1;
        self.busy = true;
        self.committed = Some(request);

        let ticket = Ticket {
            seq: self.last_seq,
            request,
            mode,
        };
        info!(seq = ticket.seq, topic = %request.topic, ?mode, "Fetch started");
        Trigger::Started(ticket)
    }

    /// Apply the outcome of a fetch started with `ticket`.
    pub fn complete(&mut self, ticket: &Ticket, result: Result<Fetched, FetchError>) -> Completion {
        if ticket.seq != self.last_seq {
            debug!(
                seq = ticket.seq,
                latest = self.last_seq,
                "Discarding stale response"
            );
            return Completion::Stale;
        }

        self.busy = false;

        match result {
            Ok(Fetched::AiHeadlines(headlines)) => {
                self.show(ticket.request, headlines, Vec::new(), None);
                Completion::Loaded(self.headlines.len())
            }
            Ok(Fetched::SeniorHousing(payload)) => {
                let headlines = payload.articles.iter().map(|a| a.title.clone()).collect();
                self.show(
                    ticket.request,
                    headlines,
                    payload.articles,
                    Some(payload.html_content),
                );
                Completion::Loaded(self.headlines.len())
            }
            Ok(Fetched::Unsupported(topic)) => {
                self.notice = Some(format!("{} are not supported yet", topic));
                Completion::Unsupported(topic)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Fetch failed");
                self.headlines.clear();
                self.articles.clear();
                self.fragment.clear();
                self.server_fragment = None;
                self.shown = None;
                self.notice = None;
                self.error = Some(message.clone());
                Completion::Failed(message)
            }
        }
    }

    fn show(
        &mut self,
        request: HeadlineRequest,
        headlines: Vec<String>,
        articles: Vec<Article>,
        server_fragment: Option<String>,
    ) {
        self.shown = Some(request);
        self.shown_topic = request.topic;
        self.headlines = headlines;
        self.articles = articles;
        self.server_fragment = server_fragment;
        self.error = None;
        self.notice = None;
        self.rebuild_fragment();
    }

    fn rebuild_fragment(&mut self) {
        self.fragment = fragment::build_fragment(self.shown_topic, &self.headlines, &self.articles);
    }

    /// Remove the headline at `index` (and its article, if any) and rebuild
    /// the fragment. Returns the removed headline.
    pub fn delete_item(&mut self, index: usize) -> Result<String, FormError> {
        if index >= self.headlines.len() {
            return Err(FormError::IndexOutOfRange {
                index,
                len: self.headlines.len(),
            });
        }

        let removed = self.headlines.remove(index);
        if let Some(pos) = self.articles.iter().position(|a| a.title == removed) {
            self.articles.remove(pos);
        }
        self.rebuild_fragment();
        debug!(index, remaining = self.headlines.len(), "Deleted headline");
        Ok(removed)
    }

    /// Replace the fragment with hand-edited markup. The headline list is
    /// left as it is.
    pub fn edit_fragment(&mut self, markup: impl Into<String>) {
        self.fragment = markup.into();
    }

    /// Put the markup the senior-housing service supplied back in the editor.
    pub fn restore_server_fragment(&mut self) -> Result<(), FormError> {
        let markup = self
            .server_fragment
            .clone()
            .ok_or(FormError::NoServerFragment(self.shown_topic))?;
        self.fragment = markup;
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` form value; blank input clears the field.
pub fn parse_date(input: &str) -> Result<Option<NaiveDate>, FormError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| FormError::InvalidDate(trimmed.to_string()))
}

pub fn parse_count(input: &str) -> Result<i64, FormError> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| FormError::InvalidCount(input.trim().to_string()))
}

pub fn parse_topic(input: &str) -> Result<Topic, FormError> {
    Topic::from_slug(input).ok_or_else(|| FormError::UnknownTopic(input.trim().to_string()))
}
