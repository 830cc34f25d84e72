use std::sync::Arc;

use anyhow::Result;

use wikiref_client::{HttpTransport, WikiClient};
use wikiref_core::config::AppConfig;
use wikiref_core::endpoint::Endpoint;

/// Dump the normalized snapshot of a wiki for operator debugging.
pub async fn run(config: AppConfig, wiki: String) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(&config.http)?);
    let client = WikiClient::new(transport);

    let mut endpoint = Endpoint::parse_input(&wiki)?;
    let result = client.page_query(&mut endpoint, "").await?;
    let site = result.siteinfo;

    println!(
        "{} ({})",
        site.general.sitename.as_deref().unwrap_or("unnamed wiki"),
        endpoint.host()
    );
    println!("  platform:  {:?}", endpoint.platform);
    println!("  api:       {}", endpoint.api_url());
    println!(
        "  main page: {}",
        site.general.mainpage.as_deref().unwrap_or("-")
    );

    let mut namespaces: Vec<_> = site.namespaces.values().collect();
    namespaces.sort_by_key(|ns| ns.id);
    println!("  namespaces:");
    for ns in namespaces {
        let name = if ns.name.is_empty() { "(main)" } else { &ns.name };
        let mut line = format!("  {:>6}  {name}", ns.id);
        if let Some(canonical) = ns.canonical.as_deref() {
            if canonical != name {
                line.push_str(&format!(" [{canonical}]"));
            }
        }
        if ns.content {
            line.push_str(" *content");
        }
        println!("{line}");
    }
    println!("  special-page aliases: {}", site.special_aliases.len());
    Ok(())
}
