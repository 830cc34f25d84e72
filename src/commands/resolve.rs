use std::sync::Arc;

use anyhow::Result;

use wikiref_client::{HttpTransport, WikiClient};
use wikiref_core::config::AppConfig;
use wikiref_core::types::{EmbedPolicy, Feedback, ResolveRequest, Tier};
use wikiref_resolver::Resolver;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: AppConfig,
    wiki: Option<String>,
    reference: Vec<String>,
    prefix: Option<String>,
    elevated: bool,
    spoiler: bool,
    no_embed: bool,
) -> Result<()> {
    let wiki = wiki.unwrap_or_else(|| config.general.default_wiki.clone());
    let request = ResolveRequest {
        reference: reference.join(" "),
        prefix: prefix.unwrap_or_else(|| config.general.invocation_prefix.clone()),
        tier: if elevated { Tier::Elevated } else { Tier::Standard },
        spoiler,
        embed_policy: if no_embed {
            EmbedPolicy::TextOnly
        } else {
            EmbedPolicy::Full
        },
    };

    let transport = Arc::new(HttpTransport::new(&config.http)?);
    let resolver = Resolver::new(WikiClient::new(transport), config);
    let payload = resolver.resolve(&wiki, &request).await;

    // Stand-in for the message-delivery collaborator: print the payload.
    println!("{}", payload.text);
    if let Some(embed) = payload.embed {
        println!();
        println!("  {}", embed.title);
        if let Some(description) = embed.description {
            for line in description.lines() {
                println!("  {line}");
            }
        }
        for field in embed.fields {
            println!("  {}: {}", field.name, field.value);
        }
        if let Some(picture) = embed.image.or(embed.attachment).or(embed.thumbnail) {
            println!("  {picture}");
        }
    }
    if let Some(feedback) = payload.feedback {
        let marker = match feedback {
            Feedback::Shrug => "🤷",
            Feedback::Nope => "❌",
            Feedback::Warning => "⚠️",
        };
        println!("{marker}");
    }
    Ok(())
}
