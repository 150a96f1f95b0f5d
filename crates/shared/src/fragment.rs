use scraper::Html;

use crate::models::{Article, Topic};

/// Assemble the markup block for a list of headlines.
///
/// Each headline becomes one `<li>`. For senior-housing results, a headline
/// whose title matches an article with a URL is wrapped in a link to it; each
/// article is consumed by at most one headline so duplicate titles keep their
/// own URLs. Anything else is emitted as-is, since AI headlines already carry
/// their own markup.
pub fn build_fragment(topic: Topic, headlines: &[String], articles: &[Article]) -> String {
    if headlines.is_empty() {
        return String::new();
    }

    let link_articles = topic == Topic::SeniorHousingNews && !articles.is_empty();
    let mut used = vec![false; articles.len()];

    let mut html = String::from("<ul>\n");
    for headline in headlines {
        let linked = if link_articles {
            articles
                .iter()
                .enumerate()
                .find(|(i, a)| !used[*i] && a.title == *headline && !a.url.is_empty())
                .map(|(i, a)| {
                    used[i] = true;
                    a
                })
        } else {
            None
        };

        match linked {
            Some(article) => html.push_str(&format!(
                "  <li><a href=\"{}\" target=\"_blank\">{}</a></li>\n",
                escape_html(&article.url),
                escape_html(&article.title)
            )),
            None => html.push_str(&format!("  <li>{}</li>\n", headline)),
        }
    }
    html.push_str("</ul>");
    html
}

/// Text of a headline with any inline markup removed
pub fn plain_text(headline: &str) -> String {
    let fragment = Html::parse_fragment(headline);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render markup the way a reader would see it, wrapped to `width` columns
pub fn preview(fragment: &str, width: usize) -> String {
    if fragment.trim().is_empty() {
        return String::new();
    }
    html2text::from_read(fragment.as_bytes(), width)
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ai_headlines_keep_their_markup() {
        let html = build_fragment(
            Topic::AiHeadlines,
            &strings(&["<a href=\"https://x.example\">Big <b>news</b></a>", "Plain"]),
            &[],
        );
        assert_eq!(
            html,
            "<ul>\n  <li><a href=\"https://x.example\">Big <b>news</b></a></li>\n  <li>Plain</li>\n</ul>"
        );
    }

    #[test]
    fn test_senior_housing_titles_are_linked_in_order() {
        let articles = vec![
            Article::new("A", "https://a.example"),
            Article::new("B", "https://b.example"),
            Article::new("C", "https://c.example"),
        ];
        let html = build_fragment(
            Topic::SeniorHousingNews,
            &strings(&["A", "B", "C"]),
            &articles,
        );

        assert_eq!(html.matches("<li><a href=").count(), 3);
        let a = html.find("https://a.example").unwrap();
        let b = html.find("https://b.example").unwrap();
        let c = html.find("https://c.example").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_duplicate_titles_use_distinct_articles() {
        let articles = vec![
            Article::new("Same", "https://one.example"),
            Article::new("Same", "https://two.example"),
        ];
        let html = build_fragment(
            Topic::SeniorHousingNews,
            &strings(&["Same", "Same"]),
            &articles,
        );
        assert!(html.contains("https://one.example"));
        assert!(html.contains("https://two.example"));
    }

    #[test]
    fn test_article_without_url_is_not_linked() {
        let articles = vec![Article::new("No link", "")];
        let html = build_fragment(Topic::SeniorHousingNews, &strings(&["No link"]), &articles);
        assert!(html.contains("<li>No link</li>"));
        assert!(!html.contains("href"));
    }

    #[test]
    fn test_linked_titles_are_escaped() {
        let articles = vec![Article::new("Q&A <live>", "https://a.example/?x=1&y=2")];
        let html = build_fragment(
            Topic::SeniorHousingNews,
            &strings(&["Q&A <live>"]),
            &articles,
        );
        assert!(html.contains("href=\"https://a.example/?x=1&amp;y=2\""));
        assert!(html.contains(">Q&amp;A &lt;live&gt;</a>"));
    }

    #[test]
    fn test_empty_list_builds_empty_fragment() {
        assert_eq!(build_fragment(Topic::AiHeadlines, &[], &[]), "");
    }

    #[test]
    fn test_plain_text_strips_markup() {
        assert_eq!(
            plain_text("<a href=\"https://x.example\" target=\"_blank\">Big <b>news</b></a>"),
            "Big news"
        );
        assert_eq!(plain_text("  Already   plain "), "Already plain");
    }

    #[test]
    fn test_preview_renders_text() {
        let rendered = preview("<ul><li>First</li><li>Second</li></ul>", 80);
        assert!(rendered.contains("First"));
        assert!(rendered.contains("Second"));
        assert!(!rendered.contains("<li>"));
        assert_eq!(preview("", 80), "");
    }

    #[test]
    fn test_escape_html_combined() {
        assert_eq!(
            escape_html("<a href=\"test\">Click & Go</a>"),
            "&lt;a href=&quot;test&quot;&gt;Click &amp; Go&lt;/a&gt;"
        );
    }
}
