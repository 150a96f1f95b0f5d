// Public modules
pub mod backend;
pub mod clipboard;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod export;
pub mod fragment;
pub mod logging;
pub mod models;
pub mod session;

// Re-export commonly used types
pub use backend::{HttpBackend, NewsBackend};
pub use clipboard::copy_to_clipboard;
pub use config::Config;
pub use dispatcher::{dispatch, Fetched};
pub use error::{FetchError, FormError};
pub use export::NewsletterExport;
pub use models::{
    Article, Campaign, DateRange, FetchMode, HeadlineRequest, ScrapeReport, Topic,
};
pub use session::{Completion, Rejection, Session, Ticket, Trigger};
