use std::sync::Arc;

use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use wikiref_core::endpoint::Endpoint;
use wikiref_core::error::ResolveError;
use wikiref_core::model::{
    CompareResult, InterwikiRef, NamespaceInfo, Normalized, PageInfo, QueryPage, RandomPage,
    RecentChange, Redirect, SearchHit, SiteInfo, SiteStatistics, UserInfo,
};

use crate::response::{ApiEnvelope, QueryBlock};
use crate::transport::Transport;

type Params = Vec<(&'static str, String)>;

/// Everything the pipeline needs from one combined metadata+page query.
#[derive(Debug)]
pub struct PageQueryResult {
    pub siteinfo: SiteInfo,
    pub pages: Vec<PageInfo>,
    pub redirects: Vec<Redirect>,
    pub normalized: Vec<Normalized>,
    pub interwiki: Option<InterwikiRef>,
}

/// Search results in whichever shape the platform supports.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Generator-based search: full page records, ready to render.
    pub pages: Vec<PageInfo>,
    /// Legacy list-based search: bare titles.
    pub hits: Vec<SearchHit>,
    pub total: u64,
}

/// Read-only adapter over a wiki's `api.php`.
#[derive(Clone)]
pub struct WikiClient {
    transport: Arc<dyn Transport>,
}

impl WikiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    fn api_url(endpoint: &Endpoint, params: &Params) -> Url {
        let mut url = endpoint.api_url();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("format", "json");
            pairs.append_pair("formatversion", "2");
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    async fn call_raw(
        &self,
        endpoint: &Endpoint,
        params: &Params,
    ) -> Result<ApiEnvelope, ResolveError> {
        let url = Self::api_url(endpoint, params);
        let value = self.transport.get_json(&url).await?;
        let envelope: ApiEnvelope =
            serde_json::from_value(value).map_err(|e| ResolveError::Malformed(e.to_string()))?;
        if let Some(error) = envelope.error {
            return Err(match error.code.as_str() {
                "readapidenied" | "readdenied" => ResolveError::PermissionDenied,
                code => ResolveError::Malformed(format!("API error: {code}")),
            });
        }
        Ok(envelope)
    }

    async fn call(&self, endpoint: &Endpoint, params: &Params) -> Result<QueryBlock, ResolveError> {
        self.call_raw(endpoint, params)
            .await?
            .query
            .ok_or_else(|| ResolveError::Malformed("response without query block".into()))
    }

    /// The combined siteinfo+page query driving every pipeline step. On a
    /// response that is not API JSON, rediscovers the API entry point from
    /// the page HTML's edit link and retries exactly once.
    pub async fn page_query(
        &self,
        endpoint: &mut Endpoint,
        title: &str,
    ) -> Result<PageQueryResult, ResolveError> {
        let params = Self::page_params(endpoint, title);
        match self.call(endpoint, &params).await {
            Ok(query) => Self::into_page_result(endpoint, query),
            // Only an HTML/non-JSON body hints at a wrong entry point; API
            // JSON with surprising fields stays a malformed response.
            Err(ResolveError::Malformed(reason)) if reason.starts_with("non-JSON") => {
                debug!(host = endpoint.host(), reason, "probing for API entry point");
                self.rediscover_api(endpoint).await?;
                let params = Self::page_params(endpoint, title);
                let query = self.call(endpoint, &params).await?;
                Self::into_page_result(endpoint, query)
            }
            Err(e) => Err(e),
        }
    }

    fn page_params(endpoint: &Endpoint, title: &str) -> Params {
        let mut prop = String::from("pageprops|pageimages|categoryinfo");
        if endpoint.platform.has_extracts() {
            prop.push_str("|extracts");
        }
        let mut params: Params = vec![
            ("action", "query".into()),
            ("meta", "siteinfo".into()),
            (
                "siprop",
                "general|namespaces|namespacealiases|specialpagealiases".into(),
            ),
            ("iwurl", "1".into()),
            ("redirects", "1".into()),
            ("converttitles", "1".into()),
            ("prop", prop),
            ("piprop", "thumbnail|name".into()),
            ("pithumbsize", "300".into()),
        ];
        if endpoint.platform.has_extracts() {
            params.push(("exsentences", "2".into()));
            params.push(("exintro", "1".into()));
            params.push(("explaintext", "1".into()));
        }
        if !title.is_empty() {
            params.push(("titles", title.into()));
        }
        params
    }

    fn into_page_result(
        endpoint: &mut Endpoint,
        query: QueryBlock,
    ) -> Result<PageQueryResult, ResolveError> {
        let general = query
            .general
            .ok_or_else(|| ResolveError::Malformed("siteinfo without general block".into()))?;
        if query.namespaces.is_empty() {
            return Err(ResolveError::Malformed("siteinfo without namespace table".into()));
        }
        endpoint.update_from_general(&general);

        let mut namespaces: std::collections::HashMap<i64, NamespaceInfo> = query
            .namespaces
            .into_values()
            .map(|ns| (ns.id, ns))
            .collect();
        for alias in query.namespacealiases {
            if let Some(ns) = namespaces.get_mut(&alias.id) {
                ns.aliases.push(alias.alias);
            }
        }

        Ok(PageQueryResult {
            siteinfo: SiteInfo {
                general,
                namespaces,
                special_aliases: query.specialpagealiases,
                wiki_id: Default::default(),
            },
            pages: query.pages,
            redirects: query.redirects,
            normalized: query.normalized,
            interwiki: query.interwiki.into_iter().next(),
        })
    }

    async fn rediscover_api(&self, endpoint: &mut Endpoint) -> Result<(), ResolveError> {
        let probe = endpoint.probe_url();
        let html = self.transport.get_text(&probe).await?;
        let Some(href) = find_edit_uri(&html) else {
            warn!(host = endpoint.host(), "probe page carries no edit link");
            return Err(ResolveError::Malformed("no edit link in probe page".into()));
        };
        let absolute = if let Some(rest) = href.strip_prefix("//") {
            format!("https://{rest}")
        } else {
            href
        };
        let url = Url::parse(&absolute).map_err(|e| ResolveError::Malformed(e.to_string()))?;
        let script = url.path().trim_end_matches("/api.php").to_string();
        endpoint.set_script_path(&script);
        debug!(host = endpoint.host(), script, "rediscovered API entry point");
        Ok(())
    }

    /// Page records for follow-up lookups (search candidates, user pages),
    /// without re-fetching siteinfo.
    pub async fn pages_for(
        &self,
        endpoint: &Endpoint,
        title: &str,
    ) -> Result<(Vec<PageInfo>, Vec<Normalized>), ResolveError> {
        let mut prop = String::from("pageprops|pageimages|categoryinfo");
        if endpoint.platform.has_extracts() {
            prop.push_str("|extracts");
        }
        let mut params: Params = vec![
            ("action", "query".into()),
            ("redirects", "1".into()),
            ("prop", prop),
            ("piprop", "thumbnail|name".into()),
            ("pithumbsize", "300".into()),
            ("titles", title.into()),
        ];
        if endpoint.platform.has_extracts() {
            params.push(("exsentences", "2".into()));
            params.push(("exintro", "1".into()));
            params.push(("explaintext", "1".into()));
        }
        let query = self.call(endpoint, &params).await?;
        Ok((query.pages, query.normalized))
    }

    /// Content-namespace search, in whichever shape the platform offers.
    pub async fn search(
        &self,
        endpoint: &Endpoint,
        namespaces: &[i64],
        term: &str,
        limit: u32,
    ) -> Result<SearchOutcome, ResolveError> {
        let ns = namespaces
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("|");

        if endpoint.platform.legacy_search() {
            let params: Params = vec![
                ("action", "query".into()),
                ("list", "search".into()),
                ("srsearch", term.into()),
                ("srnamespace", ns),
                ("srlimit", limit.to_string()),
                ("srinfo", "totalhits".into()),
                ("srprop", "snippet".into()),
            ];
            let query = self.call(endpoint, &params).await?;
            let total = query
                .searchinfo
                .map(|info| info.totalhits)
                .unwrap_or(query.search.len() as u64);
            Ok(SearchOutcome {
                pages: Vec::new(),
                hits: query.search,
                total,
            })
        } else {
            let mut prop = String::from("pageprops|pageimages|categoryinfo");
            if endpoint.platform.has_extracts() {
                prop.push_str("|extracts");
            }
            let mut params: Params = vec![
                ("action", "query".into()),
                ("generator", "search".into()),
                ("gsrsearch", term.into()),
                ("gsrnamespace", ns),
                ("gsrlimit", limit.to_string()),
                ("prop", prop),
                ("piprop", "thumbnail|name".into()),
                ("pithumbsize", "300".into()),
            ];
            if endpoint.platform.has_extracts() {
                params.push(("exsentences", "2".into()));
                params.push(("exintro", "1".into()));
                params.push(("explaintext", "1".into()));
            }
            let query = self.call(endpoint, &params).await?;
            let total = query.pages.len() as u64;
            Ok(SearchOutcome {
                pages: query.pages,
                hits: Vec::new(),
                total,
            })
        }
    }

    pub async fn users(
        &self,
        endpoint: &Endpoint,
        name: &str,
    ) -> Result<Vec<UserInfo>, ResolveError> {
        let params: Params = vec![
            ("action", "query".into()),
            ("list", "users".into()),
            ("ususers", name.into()),
            ("usprop", "groups|editcount|registration|blockinfo".into()),
        ];
        Ok(self.call(endpoint, &params).await?.users)
    }

    pub async fn query_page(
        &self,
        endpoint: &Endpoint,
        page: &str,
        limit: u32,
    ) -> Result<QueryPage, ResolveError> {
        let params: Params = vec![
            ("action", "query".into()),
            ("list", "querypage".into()),
            ("qppage", page.into()),
            ("qplimit", limit.to_string()),
        ];
        self.call(endpoint, &params)
            .await?
            .querypage
            .ok_or_else(|| ResolveError::Malformed("querypage response without results".into()))
    }

    pub async fn compare(
        &self,
        endpoint: &Endpoint,
        from_rev: u64,
        to_rev: Option<u64>,
    ) -> Result<CompareResult, ResolveError> {
        let mut params: Params = vec![
            ("action", "compare".into()),
            ("fromrev", from_rev.to_string()),
            ("prop", "diff|ids|title|user|timestamp".into()),
        ];
        match to_rev {
            Some(rev) => params.push(("torev", rev.to_string())),
            None => params.push(("torelative", "prev".into())),
        }
        self.call_raw(endpoint, &params)
            .await?
            .compare
            .ok_or_else(|| ResolveError::Malformed("compare response without body".into()))
    }

    pub async fn random(
        &self,
        endpoint: &Endpoint,
        namespaces: &[i64],
    ) -> Result<Option<RandomPage>, ResolveError> {
        let ns = namespaces
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("|");
        let params: Params = vec![
            ("action", "query".into()),
            ("list", "random".into()),
            ("rnnamespace", ns),
            ("rnfilterredir", "nonredirects".into()),
            ("rnlimit", "1".into()),
        ];
        Ok(self.call(endpoint, &params).await?.random.into_iter().next())
    }

    pub async fn recent_changes(
        &self,
        endpoint: &Endpoint,
        limit: u32,
    ) -> Result<Vec<RecentChange>, ResolveError> {
        let params: Params = vec![
            ("action", "query".into()),
            ("list", "recentchanges".into()),
            ("rcprop", "title|user|timestamp".into()),
            ("rctype", "edit|new".into()),
            ("rclimit", limit.to_string()),
        ];
        Ok(self.call(endpoint, &params).await?.recentchanges)
    }

    pub async fn statistics(
        &self,
        endpoint: &Endpoint,
    ) -> Result<SiteStatistics, ResolveError> {
        let params: Params = vec![
            ("action", "query".into()),
            ("meta", "siteinfo".into()),
            ("siprop", "statistics".into()),
        ];
        self.call(endpoint, &params)
            .await?
            .statistics
            .ok_or_else(|| ResolveError::Malformed("siteinfo without statistics block".into()))
    }
}

fn find_edit_uri(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"link[rel="EditURI"]"#).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|href| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_uri_is_scraped_from_error_page() {
        let html = r#"<html><head>
            <title>Not found</title>
            <link rel="EditURI" type="application/rsd+xml"
                  href="//test.example.org/w/api.php?action=rsd"/>
        </head><body>nothing here</body></html>"#;
        assert_eq!(
            find_edit_uri(html).as_deref(),
            Some("//test.example.org/w/api.php?action=rsd")
        );
        assert_eq!(find_edit_uri("<html><body>plain</body></html>"), None);
    }

    #[test]
    fn page_result_requires_namespace_table() {
        let mut endpoint = Endpoint::parse_input("test.example.org").unwrap();
        let query: QueryBlock = serde_json::from_value(serde_json::json!({
            "general": {"sitename": "T", "mainpage": "Main"}
        }))
        .unwrap();
        assert!(matches!(
            WikiClient::into_page_result(&mut endpoint, query),
            Err(ResolveError::Malformed(_))
        ));
    }

    #[test]
    fn namespace_aliases_are_merged() {
        let mut endpoint = Endpoint::parse_input("test.example.org").unwrap();
        let query: QueryBlock = serde_json::from_value(serde_json::json!({
            "general": {"sitename": "T"},
            "namespaces": {"4": {"id": 4, "name": "Project", "canonical": "Project"}},
            "namespacealiases": [{"id": 4, "alias": "WP"}]
        }))
        .unwrap();
        let result = WikiClient::into_page_result(&mut endpoint, query).unwrap();
        assert_eq!(result.siteinfo.namespace(4).unwrap().aliases, vec!["WP"]);
    }

    #[test]
    fn extracts_requested_only_where_available() {
        let standard = Endpoint::parse_input("test.example.org").unwrap();
        let fandom = Endpoint::parse_input("gta.fandom.com").unwrap();
        let has_extract = |params: &Params| {
            params
                .iter()
                .any(|(k, v)| *k == "prop" && v.contains("extracts"))
        };
        assert!(has_extract(&WikiClient::page_params(&standard, "Help")));
        assert!(!has_extract(&WikiClient::page_params(&fandom, "Help")));
    }
}
