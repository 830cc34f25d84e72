//! Turns a classified page plus the site snapshot into the final payload:
//! link line, escaped title, description, image choice and the category
//! summary field.

use url::Url;

use wikiref_client::Transport;
use wikiref_core::catalog::Catalog;
use wikiref_core::endpoint::Endpoint;
use wikiref_core::model::{CategoryInfo, PageInfo, SiteInfo};
use wikiref_core::types::{Embed, EmbedField, EmbedPolicy, Feedback, Payload};

use crate::describe::{self, OpenGraphSummary};

/// Raster formats the delivery channel can show inline.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

pub struct RenderCtx<'a> {
    pub catalog: &'a Catalog,
    pub spoiler: bool,
    pub embed_policy: EmbedPolicy,
}

impl<'a> RenderCtx<'a> {
    pub fn wrap(&self, text: String) -> String {
        if self.spoiler {
            format!("||{text}||")
        } else {
            text
        }
    }
}

pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '~' | '`' | '|' | '<' | '>' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render a classified page. When the response carried no usable extract the
/// page's own HTML is fetched once for its Open Graph tags; that fetch
/// failing silently degrades the render.
pub async fn page_payload(
    transport: &dyn Transport,
    ctx: &RenderCtx<'_>,
    endpoint: &Endpoint,
    site: &SiteInfo,
    page: &PageInfo,
    query: Option<&str>,
    fragment: Option<&str>,
    redirect_from: Option<&str>,
) -> Payload {
    let url = endpoint.to_page_url_with(&page.title, query, fragment);

    let needs_scrape = ctx.embed_policy != EmbedPolicy::TextOnly
        && !page.missing
        && page.extract.is_none()
        && page.description.is_none();
    let scraped = if needs_scrape {
        describe::scrape_open_graph(transport, &url).await
    } else {
        OpenGraphSummary::default()
    };

    assemble(ctx, site, page, &url, scraped, redirect_from)
}

fn assemble(
    ctx: &RenderCtx<'_>,
    site: &SiteInfo,
    page: &PageInfo,
    url: &Url,
    scraped: OpenGraphSummary,
    redirect_from: Option<&str>,
) -> Payload {
    let text = ctx.wrap(format!("<{url}>"));
    if ctx.embed_policy == EmbedPolicy::TextOnly {
        return Payload::text_only(text);
    }

    let mut description = page
        .extract
        .clone()
        .or_else(|| page.description.clone())
        .or(scraped.description);
    if let Some(from) = redirect_from {
        let note = ctx
            .catalog
            .get("redirect.from", &[&escape_markdown(from)]);
        description = Some(match description {
            Some(body) => format!("{note}\n{body}"),
            None => note,
        });
    }

    let mut embed = Embed {
        title: escape_markdown(&page.title),
        url: url.to_string(),
        description,
        ..Default::default()
    };

    let picture = page
        .thumbnail
        .as_ref()
        .map(|t| t.source.clone())
        .or(scraped.image);
    if let Some(source) = picture {
        if is_embeddable_image(site, page) && ctx.embed_policy == EmbedPolicy::Full {
            embed.image = Some(source);
        } else if is_embeddable_image(site, page) {
            embed.attachment = Some(source);
        } else {
            embed.thumbnail = Some(source);
        }
    }

    if let Some(info) = page.categoryinfo.as_ref() {
        if let Some(field) = category_field(ctx.catalog, info) {
            embed.fields.push(field);
        }
    }

    Payload {
        text,
        embed: Some(embed),
        feedback: None,
    }
}

/// A file page with a recognized raster extension can be shown as the
/// embed's main image; everything else stays a thumbnail.
fn is_embeddable_image(site: &SiteInfo, page: &PageInfo) -> bool {
    let is_file_ns = site
        .namespace(page.ns)
        .and_then(|ns| ns.canonical.as_deref())
        .map(|c| c == "File" || c == "Image")
        .unwrap_or(false);
    is_file_ns
        && page
            .title
            .rsplit('.')
            .next()
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
}

/// Category summary from the four counters. Only counters above zero appear;
/// an empty category says so explicitly.
pub fn category_field(catalog: &Catalog, info: &CategoryInfo) -> Option<EmbedField> {
    let mut parts = Vec::new();
    if info.size == 0 {
        parts.push(catalog.get("category.empty", &[]));
    } else {
        if info.pages > 0 {
            parts.push(catalog.get("category.pages", &[&info.pages.to_string()]));
        }
        if info.files > 0 {
            parts.push(catalog.get("category.files", &[&info.files.to_string()]));
        }
        if info.subcats > 0 {
            parts.push(catalog.get("category.subcats", &[&info.subcats.to_string()]));
        }
    }
    (!parts.is_empty()).then(|| EmbedField {
        name: catalog.get("category.field", &[]),
        value: parts.join(", "),
    })
}

/// Render an interwiki target the registry does not know, reattaching the
/// original query and fragment. `bound_exhausted` adds the visible warning
/// marker; a plain registry miss renders the bare link.
pub fn raw_link_payload(
    ctx: &RenderCtx<'_>,
    url: &Url,
    query: Option<&str>,
    fragment: Option<&str>,
    bound_exhausted: Option<u32>,
) -> Payload {
    let mut url = url.clone();
    if let Some(extra) = query {
        let merged = match url.query() {
            Some(existing) => format!("{existing}&{extra}"),
            None => extra.to_string(),
        };
        url.set_query(Some(&merged));
    }
    if let Some(frag) = fragment {
        url.set_fragment(Some(&frag.trim().replace(' ', "_")));
    }

    let mut payload = Payload::text_only(ctx.wrap(format!("<{url}>")));
    if let Some(bound) = bound_exhausted {
        payload.text.push('\n');
        payload
            .text
            .push_str(&ctx.catalog.get("interwiki.depth", &[&bound.to_string()]));
        payload.feedback = Some(Feedback::Warning);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wikiref_core::model::{NamespaceInfo, Thumbnail};

    fn ctx(catalog: &Catalog) -> RenderCtx<'_> {
        RenderCtx {
            catalog,
            spoiler: false,
            embed_policy: EmbedPolicy::Full,
        }
    }

    fn site_with_file_ns() -> SiteInfo {
        let mut namespaces = HashMap::new();
        namespaces.insert(
            6,
            NamespaceInfo {
                id: 6,
                name: "File".into(),
                canonical: Some("File".into()),
                content: false,
                aliases: Vec::new(),
            },
        );
        SiteInfo {
            namespaces,
            ..Default::default()
        }
    }

    #[test]
    fn escapes_markdown_control_characters() {
        assert_eq!(escape_markdown("a_b*c|d"), "a\\_b\\*c\\|d");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn category_summary_skips_zero_counters() {
        let catalog = Catalog::english();
        let field = category_field(
            catalog,
            &CategoryInfo {
                size: 12,
                pages: 10,
                files: 0,
                subcats: 2,
            },
        )
        .unwrap();
        assert_eq!(field.value, "10 pages, 2 subcategories");
    }

    #[test]
    fn empty_category_says_so() {
        let catalog = Catalog::english();
        let field = category_field(catalog, &CategoryInfo::default()).unwrap();
        assert_eq!(field.value, "empty");
    }

    #[test]
    fn file_page_with_raster_extension_embeds_inline() {
        let site = site_with_file_ns();
        let page = PageInfo {
            ns: 6,
            title: "File:Map.png".into(),
            thumbnail: Some(Thumbnail {
                source: "https://img.example.org/map.png".into(),
                width: None,
                height: None,
            }),
            ..Default::default()
        };
        assert!(is_embeddable_image(&site, &page));

        let svg = PageInfo {
            title: "File:Map.svg".into(),
            ..page.clone()
        };
        assert!(!is_embeddable_image(&site, &svg));

        let article = PageInfo {
            ns: 0,
            title: "Map.png history".into(),
            ..page
        };
        assert!(!is_embeddable_image(&site, &article));
    }

    #[test]
    fn article_thumbnail_stays_a_thumbnail() {
        let catalog = Catalog::english();
        let site = site_with_file_ns();
        let page = PageInfo {
            ns: 0,
            title: "Help".into(),
            extract: Some("All about helping.".into()),
            thumbnail: Some(Thumbnail {
                source: "https://img.example.org/help.png".into(),
                width: None,
                height: None,
            }),
            ..Default::default()
        };
        let url = Url::parse("https://test.example.org/wiki/Help").unwrap();
        let payload = assemble(
            &ctx(catalog),
            &site,
            &page,
            &url,
            OpenGraphSummary::default(),
            None,
        );
        let embed = payload.embed.unwrap();
        assert_eq!(embed.thumbnail.as_deref(), Some("https://img.example.org/help.png"));
        assert_eq!(embed.image, None);
        assert!(embed.fields.is_empty());
    }

    #[test]
    fn redirect_note_leads_the_description() {
        let catalog = Catalog::english();
        let site = site_with_file_ns();
        let page = PageInfo {
            ns: 0,
            title: "Help".into(),
            extract: Some("Body.".into()),
            ..Default::default()
        };
        let url = Url::parse("https://test.example.org/wiki/Help").unwrap();
        let payload = assemble(
            &ctx(catalog),
            &site,
            &page,
            &url,
            OpenGraphSummary::default(),
            Some("Assistance"),
        );
        let description = payload.embed.unwrap().description.unwrap();
        assert!(description.starts_with("Redirected from Assistance"));
        assert!(description.ends_with("Body."));
    }

    #[test]
    fn raw_link_reattaches_query_and_fragment() {
        let catalog = Catalog::english();
        let url = Url::parse("https://other.example.org/wiki/Page").unwrap();
        let payload = raw_link_payload(
            &ctx(catalog),
            &url,
            Some("action=history"),
            Some("Top"),
            None,
        );
        assert_eq!(
            payload.text,
            "<https://other.example.org/wiki/Page?action=history#Top>"
        );
        assert_eq!(payload.feedback, None);
    }

    #[test]
    fn exhausted_bound_carries_warning() {
        let catalog = Catalog::english();
        let url = Url::parse("https://other.example.org/wiki/Page").unwrap();
        let payload = raw_link_payload(&ctx(catalog), &url, None, None, Some(5));
        assert_eq!(payload.feedback, Some(Feedback::Warning));
        assert!(payload.text.contains("after 5 hops"));
    }

    #[test]
    fn spoiler_wraps_the_link_line() {
        let catalog = Catalog::english();
        let render = RenderCtx {
            catalog,
            spoiler: true,
            embed_policy: EmbedPolicy::TextOnly,
        };
        let site = SiteInfo::default();
        let page = PageInfo {
            title: "Secret".into(),
            ..Default::default()
        };
        let url = Url::parse("https://test.example.org/wiki/Secret").unwrap();
        let payload = assemble(&render, &site, &page, &url, OpenGraphSummary::default(), None);
        assert_eq!(payload.text, "||<https://test.example.org/wiki/Secret>||");
        assert_eq!(payload.embed, None);
    }
}
