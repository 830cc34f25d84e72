//! Wire envelopes for `api.php` responses. The leaf models live in
//! `wikiref_core::model`; this module only adds the outer layers the API
//! wraps them in.

use std::collections::HashMap;

use serde::Deserialize;

use wikiref_core::model::{
    CompareResult, General, InterwikiRef, NamespaceAlias, NamespaceInfo, Normalized, PageInfo,
    QueryPage, RandomPage, RecentChange, Redirect, SearchHit, SearchInfo, SiteStatistics,
    SpecialPageAlias, UserInfo,
};

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub info: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiEnvelope {
    pub error: Option<ApiError>,
    pub query: Option<QueryBlock>,
    pub compare: Option<CompareResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryBlock {
    pub general: Option<General>,
    /// Keyed by stringified namespace id in `formatversion=2`.
    #[serde(default)]
    pub namespaces: HashMap<String, NamespaceInfo>,
    #[serde(default)]
    pub namespacealiases: Vec<NamespaceAlias>,
    #[serde(default)]
    pub specialpagealiases: Vec<SpecialPageAlias>,
    #[serde(default)]
    pub pages: Vec<PageInfo>,
    #[serde(default)]
    pub redirects: Vec<Redirect>,
    #[serde(default)]
    pub normalized: Vec<Normalized>,
    #[serde(default)]
    pub interwiki: Vec<InterwikiRef>,
    #[serde(default)]
    pub search: Vec<SearchHit>,
    pub searchinfo: Option<SearchInfo>,
    #[serde(default)]
    pub users: Vec<UserInfo>,
    pub querypage: Option<QueryPage>,
    #[serde(default)]
    pub random: Vec<RandomPage>,
    #[serde(default)]
    pub recentchanges: Vec<RecentChange>,
    pub statistics: Option<SiteStatistics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_combined_query_response() {
        let body = serde_json::json!({
            "batchcomplete": true,
            "query": {
                "general": {"sitename": "Test", "mainpage": "Main Page",
                            "server": "//test.example.org", "articlepath": "/wiki/$1",
                            "scriptpath": "/w", "lang": "en"},
                "namespaces": {
                    "-1": {"id": -1, "name": "Special", "canonical": "Special"},
                    "0": {"id": 0, "name": "", "content": true}
                },
                "specialpagealiases": [
                    {"realname": "Contributions", "aliases": ["Contributions"]}
                ],
                "redirects": [{"from": "A", "to": "B", "tofragment": "Sect"}],
                "pages": [{"pageid": 7, "ns": 0, "title": "B",
                           "categoryinfo": {"size": 2, "pages": 1, "files": 0, "subcats": 1}}]
            }
        });
        let envelope: ApiEnvelope = serde_json::from_value(body).unwrap();
        let query = envelope.query.unwrap();
        assert_eq!(query.namespaces.len(), 2);
        assert_eq!(query.redirects[0].tofragment.as_deref(), Some("Sect"));
        assert_eq!(query.pages[0].categoryinfo.unwrap().subcats, 1);
    }

    #[test]
    fn parses_api_error() {
        let body = serde_json::json!({
            "error": {"code": "readapidenied", "info": "You need read permission"}
        });
        let envelope: ApiEnvelope = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.error.unwrap().code, "readapidenied");
    }
}
