//! Discussion thread/post references on Fandom-hosted wikis. Needs the
//! platform-internal numeric wiki id, resolved lazily once per snapshot.
//! Matching order: exact thread id, exact post id via direct fetch, then a
//! case-insensitive substring match over titles and raw content.

use tracing::debug;

use wikiref_client::discussion;
use wikiref_client::WikiClient;
use wikiref_core::endpoint::Endpoint;
use wikiref_core::error::ResolveError;
use wikiref_core::model::{DiscussionPost, DiscussionThread, SiteInfo};
use wikiref_core::types::{Embed, EmbedField, EmbedPolicy, Feedback, Payload};
use wikiref_render::docmodel;
use wikiref_render::embed::{escape_markdown, RenderCtx};

const THREAD_FETCH_LIMIT: u32 = 50;
/// Longest rendered body carried into the embed description.
const BODY_CLIP: usize = 400;

pub async fn run(
    client: &WikiClient,
    render: &RenderCtx<'_>,
    endpoint: &Endpoint,
    site: &SiteInfo,
    reference: &str,
) -> Result<Payload, ResolveError> {
    if !endpoint.platform.has_discussions() {
        return Ok(shrug(render));
    }
    let transport = client.transport();
    let Some(wiki_id) = discussion::resolve_wiki_id(&*transport, endpoint, site).await? else {
        debug!(host = endpoint.host(), "no discussion wiki id");
        return Ok(shrug(render));
    };
    let threads = discussion::fetch_threads(&*transport, wiki_id, THREAD_FETCH_LIMIT).await?;

    if let Some(thread) = threads.iter().find(|t| t.id == reference) {
        return Ok(thread_payload(render, endpoint, thread));
    }

    if !reference.is_empty() && reference.chars().all(|c| c.is_ascii_digit()) {
        if let Some(post) = discussion::fetch_post(&*transport, wiki_id, reference).await? {
            let thread = threads.iter().find(|t| t.id == post.thread_id);
            return Ok(post_payload(render, endpoint, &post, thread));
        }
    }

    let needle = reference.to_lowercase();
    let matched = threads.iter().find(|t| {
        t.title
            .as_deref()
            .map(|title| title.to_lowercase().contains(&needle))
            .unwrap_or(false)
            || t.raw_content.to_lowercase().contains(&needle)
    });
    match matched {
        Some(thread) => Ok(thread_payload(render, endpoint, thread)),
        None => Ok(shrug(render)),
    }
}

fn shrug(render: &RenderCtx<'_>) -> Payload {
    Payload::text_only(render.catalog.get("discussion.missing", &[]))
        .with_feedback(Feedback::Shrug)
}

/// Prefer the structured document model; fall back to flat raw content.
fn body_text(json_model: Option<&str>, raw: &str) -> Option<String> {
    let rendered = json_model
        .and_then(docmodel::render_model)
        .unwrap_or_else(|| raw.trim().to_string());
    (!rendered.is_empty()).then(|| clip(&rendered))
}

fn clip(text: &str) -> String {
    if text.chars().count() <= BODY_CLIP {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(BODY_CLIP).collect();
    cut.push('…');
    cut
}

fn thread_payload(render: &RenderCtx<'_>, endpoint: &Endpoint, thread: &DiscussionThread) -> Payload {
    let url = format!("https://{}/f/p/{}", endpoint.host(), thread.id);
    let title = thread
        .title
        .clone()
        .unwrap_or_else(|| render.catalog.get("discussion.thread", &[]));

    let mut payload = Payload::text_only(render.wrap(format!("<{url}>")));
    if render.embed_policy == EmbedPolicy::TextOnly {
        return payload;
    }

    let mut fields = Vec::new();
    if let Some(creator) = thread.creator.as_deref() {
        fields.push(EmbedField {
            name: render.catalog.get("discussion.thread", &[]),
            value: render
                .catalog
                .get("discussion.by", &[&escape_markdown(creator)]),
        });
    }
    if thread.post_count > 0 {
        fields.push(EmbedField {
            name: render.catalog.get("discussion.posts_label", &[]),
            value: render
                .catalog
                .get("discussion.posts", &[&thread.post_count.to_string()]),
        });
    }

    payload.embed = Some(Embed {
        title: escape_markdown(&title),
        url,
        description: body_text(thread.json_model.as_deref(), &thread.raw_content),
        fields,
        ..Default::default()
    });
    payload
}

fn post_payload(
    render: &RenderCtx<'_>,
    endpoint: &Endpoint,
    post: &DiscussionPost,
    thread: Option<&DiscussionThread>,
) -> Payload {
    let url = format!(
        "https://{}/f/p/{}/r/{}",
        endpoint.host(),
        post.thread_id,
        post.id
    );
    let title = thread
        .and_then(|t| t.title.clone())
        .unwrap_or_else(|| render.catalog.get("discussion.thread", &[]));

    let mut payload = Payload::text_only(render.wrap(format!("<{url}>")));
    if render.embed_policy == EmbedPolicy::TextOnly {
        return payload;
    }

    let mut description = body_text(post.json_model.as_deref(), &post.raw_content);
    if let Some(creator) = post.creator.as_deref() {
        let by = render
            .catalog
            .get("discussion.by", &[&escape_markdown(creator)]);
        description = Some(match description {
            Some(body) => format!("{body}\n{by}"),
            None => by,
        });
    }

    payload.embed = Some(Embed {
        title: escape_markdown(&title),
        url,
        description,
        ..Default::default()
    });
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_preserves_short_text() {
        assert_eq!(clip("short"), "short");
    }

    #[test]
    fn clip_cuts_on_char_boundary() {
        let long = "ä".repeat(BODY_CLIP + 10);
        let clipped = clip(&long);
        assert_eq!(clipped.chars().count(), BODY_CLIP + 1);
        assert!(clipped.ends_with('…'));
    }

    #[test]
    fn body_prefers_structured_model() {
        let model = r#"{"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"structured"}]}]}"#;
        assert_eq!(
            body_text(Some(model), "raw fallback").as_deref(),
            Some("structured")
        );
        assert_eq!(body_text(None, "raw fallback").as_deref(), Some("raw fallback"));
        assert_eq!(body_text(None, "   "), None);
    }
}
