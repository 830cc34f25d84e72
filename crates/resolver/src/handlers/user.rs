//! Unified profile rendering for user and contributions references. Both
//! arrival paths re-query the user record, then the user's own page for its
//! authoritative namespace-qualified title, and render the same result.

use chrono::DateTime;

use wikiref_client::WikiClient;
use wikiref_core::endpoint::Endpoint;
use wikiref_core::error::ResolveError;
use wikiref_core::model::{PageInfo, SiteInfo};
use wikiref_core::types::{Embed, EmbedField, EmbedPolicy, Feedback, Payload};
use wikiref_render::embed::{self, escape_markdown, RenderCtx};

use crate::classify::IP_USER;

pub async fn run(
    client: &WikiClient,
    render: &RenderCtx<'_>,
    endpoint: &Endpoint,
    site: &SiteInfo,
    ns_prefix: &str,
    name: &str,
) -> Result<Payload, ResolveError> {
    let name = name.trim();
    if IP_USER.is_match(name) {
        return Ok(anonymous_payload(render, endpoint, site, name));
    }

    let users = client.users(endpoint, name).await?;
    let Some(user) = users.into_iter().find(|u| !u.missing && !u.invalid) else {
        return Ok(
            Payload::text_only(render.catalog.get("user.missing", &[name]))
                .with_feedback(Feedback::Shrug),
        );
    };

    let qualified = format!("{ns_prefix}:{}", user.name);
    let (pages, _) = client.pages_for(endpoint, &qualified).await?;
    let page = pages.into_iter().next().unwrap_or_else(|| PageInfo {
        ns: site
            .namespace_for_prefix(ns_prefix)
            .map(|ns| ns.id)
            .unwrap_or(2),
        title: qualified.clone(),
        ..Default::default()
    });

    let transport = client.transport();
    let mut payload =
        embed::page_payload(&*transport, render, endpoint, site, &page, None, None, None).await;

    if let Some(block) = payload.embed.as_mut() {
        if let Some(edits) = user.editcount {
            block.fields.push(EmbedField {
                name: render.catalog.get("user.edits", &[]),
                value: edits.to_string(),
            });
        }
        if let Some(joined) = user
            .registration
            .as_deref()
            .and_then(|r| DateTime::parse_from_rfc3339(r).ok())
        {
            block.fields.push(EmbedField {
                name: render.catalog.get("user.joined", &[]),
                value: joined.format("%Y-%m-%d").to_string(),
            });
        }
        let groups: Vec<&str> = user
            .groups
            .iter()
            .map(String::as_str)
            .filter(|g| *g != "*" && *g != "user" && *g != "autoconfirmed")
            .collect();
        if !groups.is_empty() {
            block.fields.push(EmbedField {
                name: render.catalog.get("user.groups", &[]),
                value: groups.join(", "),
            });
        }
        if let Some(by) = user.blockedby.as_deref() {
            let reason = user.blockreason.as_deref().unwrap_or("-");
            block.fields.push(EmbedField {
                name: render.catalog.get("user.block", &[]),
                value: render.catalog.get(
                    "user.blocked",
                    &[&escape_markdown(by), &escape_markdown(reason)],
                ),
            });
            payload.feedback = Some(Feedback::Warning);
        }
    }
    Ok(payload)
}

/// IPs and CIDR ranges have no user record; link their contributions.
fn anonymous_payload(
    render: &RenderCtx<'_>,
    endpoint: &Endpoint,
    site: &SiteInfo,
    name: &str,
) -> Payload {
    let special = site
        .namespace_name(SiteInfo::SPECIAL_NS)
        .unwrap_or("Special")
        .to_string();
    let contributions = site.localized_special("Contributions");
    let title = format!("{special}:{contributions}/{name}");
    let url = endpoint.to_page_url(&title);

    let mut payload = Payload::text_only(render.wrap(format!("<{url}>")));
    if render.embed_policy != EmbedPolicy::TextOnly {
        payload.embed = Some(Embed {
            title: escape_markdown(name),
            url: url.to_string(),
            description: Some(render.catalog.get("user.anonymous", &[])),
            ..Default::default()
        });
    }
    payload
}
