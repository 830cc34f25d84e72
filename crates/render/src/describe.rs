//! Open Graph fallback for wikis without an extract API: fetch the page's
//! own HTML and read its `og:description`/`og:image` meta tags. Failures
//! degrade to nothing; they never fail the resolution.

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use wikiref_client::Transport;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct OpenGraphSummary {
    pub description: Option<String>,
    pub image: Option<String>,
}

pub async fn scrape_open_graph(transport: &dyn Transport, url: &Url) -> OpenGraphSummary {
    match transport.get_text(url).await {
        Ok(html) => extract_open_graph(&html),
        Err(e) => {
            debug!(url = %url, error = %e, "description scrape failed");
            OpenGraphSummary::default()
        }
    }
}

pub fn extract_open_graph(html: &str) -> OpenGraphSummary {
    let document = Html::parse_document(html);
    OpenGraphSummary {
        description: meta_content(&document, "og:description"),
        image: meta_content(&document, "og:image"),
    }
}

fn meta_content(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[property='{property}']")).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}
