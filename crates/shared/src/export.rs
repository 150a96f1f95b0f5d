use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

use crate::fragment::escape_html;
use crate::models::{DateRange, Topic};

pub struct NewsletterExport;

impl NewsletterExport {
    fn format_range(range: &DateRange) -> String {
        if range.start == range.end {
            range.start.format("%A, %-d %B %Y").to_string()
        } else {
            format!(
                "{} to {}",
                range.start.format("%-d %B %Y"),
                range.end.format("%-d %B %Y")
            )
        }
    }

    /// Wrap a fragment into a standalone page with the topic's section heading.
    pub fn generate(
        topic: Topic,
        fragment: &str,
        range: Option<&DateRange>,
        prepared: DateTime<Local>,
    ) -> String {
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("  <meta charset=\"UTF-8\">\n");
        html.push_str(&format!(
            "  <title>{}</title>\n",
            escape_html(topic.section_title())
        ));
        html.push_str("  <style>\n");
        html.push_str("    body { font-family: 'Arial', sans-serif; max-width: 700px; margin: 40px auto; padding: 0 20px; }\n");
        html.push_str("    h2 { color: #333333; font-size: 24px; margin-bottom: 20px; padding-bottom: 10px; border-bottom: 2px solid #dddddd; }\n");
        html.push_str("    .dates { color: #7f8c8d; font-size: 0.9em; margin: -10px 0 20px 0; }\n");
        html.push_str("    ul { list-style-type: none; padding: 0; margin: 0; }\n");
        html.push_str("    li { margin-bottom: 15px; font-size: 16px; }\n");
        html.push_str("    a { color: #0066cc; text-decoration: none; }\n");
        html.push_str("    .prepared { color: #888; font-size: 0.8em; margin-top: 40px; }\n");
        html.push_str("  </style>\n");
        html.push_str("</head>\n<body>\n");

        html.push_str(&format!("<h2>{}</h2>\n", escape_html(topic.section_title())));
        if let Some(range) = range {
            html.push_str(&format!(
                "<p class=\"dates\">{}</p>\n",
                Self::format_range(range)
            ));
        }

        // The fragment is the hand-checked markup; it goes in unescaped
        html.push_str(fragment);
        html.push('\n');

        html.push_str(&format!(
            "<p class=\"prepared\">Prepared {}</p>\n",
            prepared.format("%a %-d %b %Y at %H:%M")
        ));
        html.push_str("</body>\n</html>");
        html
    }

    pub fn filename(topic: Topic, date: NaiveDate) -> String {
        format!("newsletter-{}-{}.html", topic.slug(), date.format("%Y-%m-%d"))
    }

    /// Save to the user's documents directory (or the current directory).
    pub fn save(content: &str, topic: Topic, date: NaiveDate) -> Result<PathBuf> {
        let documents_dir = dirs::document_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::save_in(&documents_dir, content, topic, date)
    }

    pub fn save_in(dir: &Path, content: &str, topic: Topic, date: NaiveDate) -> Result<PathBuf> {
        let filepath = dir.join(Self::filename(topic, date));

        fs::write(&filepath, content)
            .with_context(|| format!("Failed to write newsletter file {}", filepath.display()))?;

        Ok(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn prepared() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_generate_wraps_fragment_with_heading() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        let html = NewsletterExport::generate(
            Topic::SeniorHousingNews,
            "<ul>\n  <li>A</li>\n</ul>",
            Some(&range),
            prepared(),
        );

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h2>Senior Living Headlines</h2>"));
        assert!(html.contains("Monday, 1 January 2024"));
        assert!(html.contains("<ul>\n  <li>A</li>\n</ul>"));
        assert!(html.contains("Prepared Tue 2 Jan 2024 at 09:30"));
    }

    #[test]
    fn test_generate_multi_day_range() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        };
        let html = NewsletterExport::generate(Topic::AiHeadlines, "", Some(&range), prepared());
        assert!(html.contains("1 January 2024 to 7 January 2024"));
    }

    #[test]
    fn test_generate_without_range_has_no_dates_line() {
        let html = NewsletterExport::generate(Topic::AiHeadlines, "<ul></ul>", None, prepared());
        assert!(!html.contains("class=\"dates\""));
    }

    #[test]
    fn test_filename_uses_slug_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            NewsletterExport::filename(Topic::ForSaleListings, date),
            "newsletter-forsale-2024-03-09.html"
        );
    }

    #[test]
    fn test_save_in_writes_file() {
        let dir = std::env::temp_dir().join(format!("newsletter-export-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        let path = NewsletterExport::save_in(&dir, "<p>hi</p>", Topic::AiHeadlines, date).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>hi</p>");
        fs::remove_dir_all(&dir).ok();
    }
}
