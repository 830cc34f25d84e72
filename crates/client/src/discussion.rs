//! Fandom's discussion sub-API. Separate from `api.php`: it is keyed by a
//! platform-internal numeric wiki id and serves its own JSON shapes.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use wikiref_core::endpoint::Endpoint;
use wikiref_core::error::ResolveError;
use wikiref_core::model::{DiscussionPost, DiscussionThread, SiteInfo};

use crate::transport::Transport;

const WIKI_LOOKUP: &str = "https://community.fandom.com/api/v1/Wikis/ByString";
const DISCUSSION_SERVICE: &str = "https://services.fandom.com/discussion";

#[derive(Debug, Deserialize)]
struct WikiLookupResponse {
    #[serde(default)]
    items: Vec<WikiLookupItem>,
}

#[derive(Debug, Deserialize)]
struct WikiLookupItem {
    id: u64,
    #[serde(default)]
    domain: String,
}

#[derive(Debug, Deserialize)]
struct ThreadListResponse {
    #[serde(rename = "_embedded", default)]
    embedded: ThreadListEmbedded,
}

#[derive(Debug, Default, Deserialize)]
struct ThreadListEmbedded {
    #[serde(default)]
    threads: Vec<WireThread>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireThread {
    id: String,
    title: Option<String>,
    #[serde(default)]
    raw_content: String,
    json_model: Option<serde_json::Value>,
    created_by: Option<WireUser>,
    creation_date: Option<WireDate>,
    #[serde(default)]
    post_count: u64,
    forum_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePost {
    id: String,
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    raw_content: String,
    json_model: Option<serde_json::Value>,
    created_by: Option<WireUser>,
    creation_date: Option<WireDate>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDate {
    epoch_second: i64,
}

/// The structured model arrives either inline or as a pre-serialized string.
fn model_string(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        value @ serde_json::Value::Object(_) => Some(value.to_string()),
        _ => None,
    }
}

fn wire_date(date: Option<WireDate>) -> Option<DateTime<Utc>> {
    date.and_then(|d| Utc.timestamp_opt(d.epoch_second, 0).single())
}

impl From<WireThread> for DiscussionThread {
    fn from(wire: WireThread) -> Self {
        DiscussionThread {
            id: wire.id,
            title: wire.title,
            raw_content: wire.raw_content,
            json_model: model_string(wire.json_model),
            creator: wire.created_by.and_then(|u| u.name),
            created: wire_date(wire.creation_date),
            post_count: wire.post_count,
            forum_name: wire.forum_name,
        }
    }
}

impl From<WirePost> for DiscussionPost {
    fn from(wire: WirePost) -> Self {
        DiscussionPost {
            id: wire.id,
            thread_id: wire.thread_id,
            raw_content: wire.raw_content,
            json_model: model_string(wire.json_model),
            creator: wire.created_by.and_then(|u| u.name),
            created: wire_date(wire.creation_date),
        }
    }
}

/// Resolve the platform-internal wiki id, caching it on the snapshot for the
/// rest of this resolution. Ambiguous lookups return `None` rather than a
/// guess.
pub async fn resolve_wiki_id(
    transport: &dyn Transport,
    endpoint: &Endpoint,
    site: &SiteInfo,
) -> Result<Option<u64>, ResolveError> {
    if let Some(id) = site.wiki_id.get() {
        return Ok(Some(*id));
    }

    let needle = format!("{}{}", endpoint.host(), endpoint.script_path());
    let mut url = Url::parse(WIKI_LOOKUP).expect("static URL");
    url.query_pairs_mut()
        .append_pair("includeDomain", "true")
        .append_pair("limit", "10")
        .append_pair("string", &needle);

    let value = transport.get_json(&url).await?;
    let response: WikiLookupResponse =
        serde_json::from_value(value).map_err(|e| ResolveError::Malformed(e.to_string()))?;

    let id = response
        .items
        .iter()
        .find(|item| item.domain.contains(endpoint.host()))
        .map(|item| item.id);
    if let Some(id) = id {
        debug!(host = endpoint.host(), id, "resolved discussion wiki id");
        let _ = site.wiki_id.set(id);
    }
    Ok(id)
}

pub async fn fetch_threads(
    transport: &dyn Transport,
    wiki_id: u64,
    limit: u32,
) -> Result<Vec<DiscussionThread>, ResolveError> {
    let mut url = Url::parse(&format!("{DISCUSSION_SERVICE}/{wiki_id}/threads"))
        .map_err(|e| ResolveError::Malformed(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("limit", &limit.to_string())
        .append_pair("responseGroup", "full")
        .append_pair("viewableOnly", "true");

    let value = transport.get_json(&url).await?;
    let response: ThreadListResponse =
        serde_json::from_value(value).map_err(|e| ResolveError::Malformed(e.to_string()))?;
    Ok(response
        .embedded
        .threads
        .into_iter()
        .map(DiscussionThread::from)
        .collect())
}

/// Direct post fetch. An id the service does not know yields `None`.
pub async fn fetch_post(
    transport: &dyn Transport,
    wiki_id: u64,
    post_id: &str,
) -> Result<Option<DiscussionPost>, ResolveError> {
    let url = Url::parse(&format!("{DISCUSSION_SERVICE}/{wiki_id}/posts/{post_id}"))
        .map_err(|e| ResolveError::Malformed(e.to_string()))?;
    match transport.get_json(&url).await {
        Ok(value) => {
            let post: WirePost = serde_json::from_value(value)
                .map_err(|e| ResolveError::Malformed(e.to_string()))?;
            Ok(Some(post.into()))
        }
        Err(ResolveError::Malformed(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_wire_shape_normalizes() {
        let wire: WireThread = serde_json::from_value(serde_json::json!({
            "id": "4400000000000001",
            "title": "Weekly question thread",
            "rawContent": "What did everyone think?",
            "jsonModel": "{\"type\":\"doc\",\"content\":[]}",
            "createdBy": {"name": "Example"},
            "creationDate": {"epochSecond": 1600000000},
            "postCount": 4,
            "forumName": "General"
        }))
        .unwrap();
        let thread = DiscussionThread::from(wire);
        assert_eq!(thread.id, "4400000000000001");
        assert_eq!(thread.creator.as_deref(), Some("Example"));
        assert_eq!(thread.post_count, 4);
        assert!(thread.json_model.unwrap().contains("doc"));
    }

    #[test]
    fn inline_json_model_is_reserialized() {
        let model = model_string(Some(serde_json::json!({"type": "doc"})));
        assert_eq!(model.as_deref(), Some("{\"type\":\"doc\"}"));
        assert_eq!(model_string(Some(serde_json::json!(""))), None);
        assert_eq!(model_string(None), None);
    }
}
