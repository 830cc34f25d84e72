//! Search fallback for missing or invalid titles. One query, limit 1,
//! restricted to the remote's content namespaces; the three outcomes are a
//! shrug, a direct render of an effectively equal title, or a best candidate
//! plus a "try these commands" hint. No state accumulates between runs.

use tracing::debug;

use wikiref_client::WikiClient;
use wikiref_core::endpoint::Endpoint;
use wikiref_core::error::ResolveError;
use wikiref_core::model::{PageInfo, SiteInfo};
use wikiref_core::types::{Feedback, Payload, SearchSuggestion};
use wikiref_render::embed::{self, RenderCtx};

pub async fn fallback(
    client: &WikiClient,
    render: &RenderCtx<'_>,
    endpoint: &Endpoint,
    site: &SiteInfo,
    title: &str,
    prefix: &str,
    max_namespaces: usize,
    query: Option<&str>,
    fragment: Option<&str>,
) -> Result<Payload, ResolveError> {
    let mut namespaces = site.content_namespaces();
    namespaces.truncate(max_namespaces);

    let found = client.search(endpoint, &namespaces, title, 1).await?;

    let best_page: Option<PageInfo> = if let Some(page) = found.pages.into_iter().next() {
        Some(page)
    } else if let Some(hit) = found.hits.first() {
        // Legacy search returns bare titles; fetch the page record for the
        // render.
        let (pages, _) = client.pages_for(endpoint, &hit.title).await?;
        pages.into_iter().next()
    } else {
        None
    };

    let suggestion = SearchSuggestion {
        result_count: found.total,
        best_match: best_page.as_ref().map(|p| p.title.clone()),
        exact_title_match: best_page
            .as_ref()
            .map(|p| titles_equivalent(title, &p.title))
            .unwrap_or(false),
    };
    debug!(
        title,
        results = suggestion.result_count,
        best = suggestion.best_match.as_deref().unwrap_or(""),
        "search fallback"
    );

    let Some(page) = best_page.filter(|_| suggestion.result_count > 0) else {
        return Ok(
            Payload::text_only(render.catalog.get("search.nothing", &[title]))
                .with_feedback(Feedback::Shrug),
        );
    };

    let transport = client.transport();
    let mut payload = embed::page_payload(
        &*transport,
        render,
        endpoint,
        site,
        &page,
        query,
        fragment,
        None,
    )
    .await;

    if !suggestion.exact_title_match {
        payload.text.push('\n');
        payload
            .text
            .push_str(&render.catalog.get("search.hint", &[prefix]));
    }
    Ok(payload)
}

/// Effectively-equal comparison for the direct-render shortcut: case,
/// hyphens, underscores and duplicate whitespace are ignored.
pub fn titles_equivalent(a: &str, b: &str) -> bool {
    fn fold(s: &str) -> String {
        s.to_lowercase()
            .replace(['-', '_'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
    fold(a) == fold(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalence_ignores_case_and_separators() {
        assert!(titles_equivalent("helo-world", "Helo World"));
        assert!(titles_equivalent("Main_Page", "main page"));
        assert!(titles_equivalent("  Help ", "help"));
        assert!(!titles_equivalent("Help", "Helping"));
    }
}
