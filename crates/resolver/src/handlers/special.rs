//! Special-page dispatch: a closed set of known report pages keyed by
//! canonical name. Random page, revision diff and site statistics have
//! bespoke response shapes and full overrides; every other known entry
//! renders the generic embed, augmented for elevated callers with a report
//! preview whose per-entry row formatter is picked below. Unknown canonical
//! names still render generically.

use chrono::DateTime;
use tracing::debug;

use wikiref_client::WikiClient;
use wikiref_core::catalog::Catalog;
use wikiref_core::endpoint::Endpoint;
use wikiref_core::error::ResolveError;
use wikiref_core::model::{QueryPageRow, SiteInfo};
use wikiref_core::types::{Embed, EmbedField, EmbedPolicy, Payload, Tier};
use wikiref_render::embed::{self, escape_markdown, RenderCtx};

/// Rows attached to an elevated caller's report preview.
const REPORT_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialPage {
    // Full overrides with bespoke response shapes.
    Random,
    Diff,
    Statistics,
    // Non-report pages known by name only.
    RecentChanges,
    Version,
    AllPages,
    // Report pages served through the query-page list.
    AncientPages,
    BrokenRedirects,
    DeadendPages,
    DoubleRedirects,
    FewestRevisions,
    ListDuplicatedFiles,
    ListRedirects,
    LonelyPages,
    LongPages,
    MostCategories,
    MostFiles,
    MostInterwikis,
    MostLinked,
    MostLinkedCategories,
    MostLinkedTemplates,
    MostRevisions,
    ShortPages,
    UncategorizedCategories,
    UncategorizedFiles,
    UncategorizedPages,
    UncategorizedTemplates,
    UnusedCategories,
    UnusedFiles,
    UnusedTemplates,
    UnwatchedPages,
    WantedCategories,
    WantedFiles,
    WantedPages,
    WantedTemplates,
    WithoutInterwiki,
    GadgetUsage,
}

impl SpecialPage {
    pub fn from_canonical(name: &str) -> Option<SpecialPage> {
        use SpecialPage::*;
        Some(match name.to_lowercase().as_str() {
            "randompage" | "random" => Random,
            "diff" => Diff,
            "statistics" => Statistics,
            "recentchanges" => RecentChanges,
            "version" => Version,
            "allpages" => AllPages,
            "ancientpages" => AncientPages,
            "brokenredirects" => BrokenRedirects,
            "deadendpages" => DeadendPages,
            "doubleredirects" => DoubleRedirects,
            "fewestrevisions" => FewestRevisions,
            "listduplicatedfiles" => ListDuplicatedFiles,
            "listredirects" => ListRedirects,
            "lonelypages" => LonelyPages,
            "longpages" => LongPages,
            "mostcategories" => MostCategories,
            "mostimages" => MostFiles,
            "mostinterwikis" => MostInterwikis,
            "mostlinked" => MostLinked,
            "mostlinkedcategories" => MostLinkedCategories,
            "mostlinkedtemplates" => MostLinkedTemplates,
            "mostrevisions" => MostRevisions,
            "shortpages" => ShortPages,
            "uncategorizedcategories" => UncategorizedCategories,
            "uncategorizedimages" => UncategorizedFiles,
            "uncategorizedpages" => UncategorizedPages,
            "uncategorizedtemplates" => UncategorizedTemplates,
            "unusedcategories" => UnusedCategories,
            "unusedimages" => UnusedFiles,
            "unusedtemplates" => UnusedTemplates,
            "unwatchedpages" => UnwatchedPages,
            "wantedcategories" => WantedCategories,
            "wantedfiles" => WantedFiles,
            "wantedpages" => WantedPages,
            "wantedtemplates" => WantedTemplates,
            "withoutinterwiki" => WithoutInterwiki,
            "gadgetusage" => GadgetUsage,
            _ => return None,
        })
    }

    /// `qppage` parameter for report pages; `None` for overrides and pages
    /// that are not query-page reports.
    fn report_name(&self) -> Option<&'static str> {
        use SpecialPage::*;
        Some(match self {
            Random | Diff | Statistics | RecentChanges | Version | AllPages => return None,
            AncientPages => "Ancientpages",
            BrokenRedirects => "BrokenRedirects",
            DeadendPages => "Deadendpages",
            DoubleRedirects => "DoubleRedirects",
            FewestRevisions => "Fewestrevisions",
            ListDuplicatedFiles => "ListDuplicatedFiles",
            ListRedirects => "Listredirects",
            LonelyPages => "Lonelypages",
            LongPages => "Longpages",
            MostCategories => "Mostcategories",
            MostFiles => "Mostimages",
            MostInterwikis => "Mostinterwikis",
            MostLinked => "Mostlinked",
            MostLinkedCategories => "Mostlinkedcategories",
            MostLinkedTemplates => "Mostlinkedtemplates",
            MostRevisions => "Mostrevisions",
            ShortPages => "Shortpages",
            UncategorizedCategories => "Uncategorizedcategories",
            UncategorizedFiles => "Uncategorizedimages",
            UncategorizedPages => "Uncategorizedpages",
            UncategorizedTemplates => "Uncategorizedtemplates",
            UnusedCategories => "Unusedcategories",
            UnusedFiles => "Unusedimages",
            UnusedTemplates => "Unusedtemplates",
            UnwatchedPages => "Unwatchedpages",
            WantedCategories => "Wantedcategories",
            WantedFiles => "Wantedfiles",
            WantedPages => "Wantedpages",
            WantedTemplates => "Wantedtemplates",
            WithoutInterwiki => "Withoutinterwiki",
            GadgetUsage => "GadgetUsage",
        })
    }
}

pub async fn run(
    client: &WikiClient,
    render: &RenderCtx<'_>,
    endpoint: &Endpoint,
    site: &SiteInfo,
    canonical: Option<&str>,
    title: &str,
    tier: Tier,
) -> Result<Payload, ResolveError> {
    let special = canonical.and_then(SpecialPage::from_canonical);
    debug!(title, ?special, "special page");
    match special {
        Some(SpecialPage::Random) => random(client, render, endpoint, site, title).await,
        Some(SpecialPage::Diff) => diff(client, render, endpoint, title).await,
        Some(SpecialPage::Statistics) => statistics(client, render, endpoint, title).await,
        other => generic(client, render, endpoint, other, title, tier).await,
    }
}

/// Generic special-page embed; elevated callers get one report preview.
async fn generic(
    client: &WikiClient,
    render: &RenderCtx<'_>,
    endpoint: &Endpoint,
    special: Option<SpecialPage>,
    title: &str,
    tier: Tier,
) -> Result<Payload, ResolveError> {
    let url = endpoint.to_page_url(title);
    let mut description = render.catalog.get("special.generic", &[]);

    if tier == Tier::Elevated {
        if let Some(rows) = report_preview(client, endpoint, render.catalog, special).await {
            if !rows.is_empty() {
                description.push('\n');
                description.push_str(&rows.join("\n"));
            }
        }
    }

    let mut payload = Payload::text_only(render.wrap(format!("<{url}>")));
    if render.embed_policy != EmbedPolicy::TextOnly {
        payload.embed = Some(Embed {
            title: escape_markdown(title),
            url: url.to_string(),
            description: Some(description),
            ..Default::default()
        });
    }
    Ok(payload)
}

/// Fetch and format the preview rows for a known report page. Errors here
/// degrade to no preview rather than failing the resolution.
async fn report_preview(
    client: &WikiClient,
    endpoint: &Endpoint,
    catalog: &Catalog,
    special: Option<SpecialPage>,
) -> Option<Vec<String>> {
    match special {
        Some(SpecialPage::RecentChanges) => {
            let changes = client.recent_changes(endpoint, REPORT_LIMIT).await.ok()?;
            Some(
                changes
                    .iter()
                    .map(|change| {
                        let title = escape_markdown(&change.title);
                        match change.user.as_deref() {
                            Some(user) => format!(
                                "{title} ({})",
                                catalog.get("discussion.by", &[&escape_markdown(user)])
                            ),
                            None => title,
                        }
                    })
                    .collect(),
            )
        }
        Some(page) => {
            let report = page.report_name()?;
            let result = client.query_page(endpoint, report, REPORT_LIMIT).await.ok()?;
            Some(
                result
                    .results
                    .iter()
                    .take(REPORT_LIMIT as usize)
                    .map(|row| format_row(page, row, catalog))
                    .collect(),
            )
        }
        None => None,
    }
}

/// Per-report row formatter: the metric column means something different for
/// each report type.
fn format_row(page: SpecialPage, row: &QueryPageRow, catalog: &Catalog) -> String {
    use SpecialPage::*;
    let title = escape_markdown(&row.title);
    let number = row.numeric_value().map(|v| v.to_string());
    let metric = match page {
        LongPages | ShortPages => number.map(|n| catalog.get("report.bytes", &[&n])),
        FewestRevisions | MostRevisions => number.map(|n| catalog.get("report.revisions", &[&n])),
        MostCategories => number.map(|n| catalog.get("report.categories", &[&n])),
        MostFiles => number.map(|n| catalog.get("report.uses", &[&n])),
        MostInterwikis => number.map(|n| catalog.get("report.interwikis", &[&n])),
        MostLinked | MostLinkedCategories | WantedPages | WantedCategories | WantedFiles
        | WantedTemplates => number.map(|n| catalog.get("report.links", &[&n])),
        MostLinkedTemplates => number.map(|n| catalog.get("report.transclusions", &[&n])),
        ListDuplicatedFiles => number.map(|n| catalog.get("report.duplicates", &[&n])),
        GadgetUsage => number.map(|n| catalog.get("report.users", &[&n])),
        AncientPages => row
            .timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.format("%Y-%m-%d").to_string()),
        // Plain title lists: redirects, orphans, uncategorized, unused.
        BrokenRedirects | DoubleRedirects | ListRedirects | DeadendPages | LonelyPages
        | UncategorizedCategories | UncategorizedFiles | UncategorizedPages
        | UncategorizedTemplates | UnusedCategories | UnusedFiles | UnusedTemplates
        | UnwatchedPages | WithoutInterwiki => None,
        Random | Diff | Statistics | RecentChanges | Version | AllPages => None,
    };
    match metric {
        Some(metric) => format!("{title} ({metric})"),
        None => title,
    }
}

/// Random page override: pick a content-namespace page, then render it like
/// a direct hit.
async fn random(
    client: &WikiClient,
    render: &RenderCtx<'_>,
    endpoint: &Endpoint,
    site: &SiteInfo,
    title: &str,
) -> Result<Payload, ResolveError> {
    let Some(picked) = client.random(endpoint, &site.content_namespaces()).await? else {
        return generic(client, render, endpoint, None, title, Tier::Standard).await;
    };
    let (pages, _) = client.pages_for(endpoint, &picked.title).await?;
    let Some(page) = pages.into_iter().next() else {
        return generic(client, render, endpoint, None, title, Tier::Standard).await;
    };
    let transport = client.transport();
    Ok(embed::page_payload(&*transport, render, endpoint, site, &page, None, None, None).await)
}

/// Revision diff override: `Special:Diff/<rev>` or `Special:Diff/<old>/<new>`.
async fn diff(
    client: &WikiClient,
    render: &RenderCtx<'_>,
    endpoint: &Endpoint,
    title: &str,
) -> Result<Payload, ResolveError> {
    let mut segments = title.splitn(2, ':').nth(1).unwrap_or(title).split('/').skip(1);
    let from = segments.next().and_then(|s| s.parse::<u64>().ok());
    let to = segments.next().and_then(|s| s.parse::<u64>().ok());

    let Some(from) = from else {
        return generic(client, render, endpoint, None, title, Tier::Standard).await;
    };
    let compared = client.compare(endpoint, from, to).await?;

    let target = compared.totitle.clone().unwrap_or_else(|| title.to_string());
    let from_id = compared.fromrevid.map(|id| id.to_string()).unwrap_or_default();
    let to_id = compared.torevid.map(|id| id.to_string()).unwrap_or_default();
    let url = endpoint.to_page_url_with(
        &target,
        Some(&format!("diff={to_id}&oldid={from_id}")),
        None,
    );

    let mut description = render
        .catalog
        .get("special.diff", &[&from_id, &to_id, &escape_markdown(&target)]);
    if let Some(user) = compared.touser.as_deref() {
        description.push('\n');
        description.push_str(&render.catalog.get("discussion.by", &[&escape_markdown(user)]));
    }

    let mut payload = Payload::text_only(render.wrap(format!("<{url}>")));
    if render.embed_policy != EmbedPolicy::TextOnly {
        payload.embed = Some(Embed {
            title: escape_markdown(&target),
            url: url.to_string(),
            description: Some(description),
            ..Default::default()
        });
    }
    Ok(payload)
}

/// Site statistics override.
async fn statistics(
    client: &WikiClient,
    render: &RenderCtx<'_>,
    endpoint: &Endpoint,
    title: &str,
) -> Result<Payload, ResolveError> {
    let stats = client.statistics(endpoint).await?;
    let url = endpoint.to_page_url(title);

    let mut payload = Payload::text_only(render.wrap(format!("<{url}>")));
    if render.embed_policy != EmbedPolicy::TextOnly {
        let field = |key: &str, value: u64| EmbedField {
            name: render.catalog.get(key, &[]),
            value: value.to_string(),
        };
        payload.embed = Some(Embed {
            title: render.catalog.get("special.statistics", &[]),
            url: url.to_string(),
            fields: vec![
                field("special.stat_pages", stats.pages),
                field("special.stat_articles", stats.articles),
                field("special.stat_edits", stats.edits),
                field("special.stat_files", stats.images),
                field("special.stat_users", stats.users),
                field("special.stat_active", stats.activeusers),
                field("special.stat_admins", stats.admins),
            ],
            ..Default::default()
        });
    }
    Ok(payload)
}
