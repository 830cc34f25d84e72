//! End-to-end pipeline tests over a scripted in-memory transport: no
//! network, fully deterministic.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use wikiref_client::{Transport, WikiClient};
use wikiref_core::config::AppConfig;
use wikiref_core::error::ResolveError;
use wikiref_core::types::{Feedback, ResolveRequest, Tier};
use wikiref_resolver::Resolver;

struct MockTransport {
    /// `(substring, response)`; first match wins.
    routes: Vec<(String, Value)>,
    hits: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new(routes: Vec<(String, Value)>) -> Arc<Self> {
        Arc::new(Self {
            routes,
            hits: Mutex::new(Vec::new()),
        })
    }

    fn api_hits(&self) -> usize {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains("/api.php"))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(&self, url: &Url) -> Result<Value, ResolveError> {
        self.hits.lock().unwrap().push(url.to_string());
        for (pattern, response) in &self.routes {
            if url.as_str().contains(pattern.as_str()) {
                return Ok(response.clone());
            }
        }
        Err(ResolveError::Malformed(format!("no route for {url}")))
    }

    async fn get_text(&self, url: &Url) -> Result<String, ResolveError> {
        self.hits.lock().unwrap().push(url.to_string());
        Err(ResolveError::Malformed("no HTML route".into()))
    }
}

fn siteinfo(host: &str) -> Value {
    json!({
        "sitename": "Testwiki",
        "mainpage": "Main Page",
        "server": format!("//{host}"),
        "articlepath": "/wiki/$1",
        "scriptpath": "",
        "lang": "en"
    })
}

fn query_response(host: &str, extra: Value) -> Value {
    let mut query = json!({
        "general": siteinfo(host),
        "namespaces": {
            "-1": {"id": -1, "name": "Special", "canonical": "Special"},
            "0": {"id": 0, "name": "", "content": true},
            "2": {"id": 2, "name": "User", "canonical": "User"},
            "6": {"id": 6, "name": "File", "canonical": "File"},
            "14": {"id": 14, "name": "Category", "canonical": "Category"}
        },
        "specialpagealiases": [
            {"realname": "Contributions", "aliases": ["Contributions"]},
            {"realname": "Mypage", "aliases": ["MyPage"]}
        ]
    });
    if let (Some(base), Some(merge)) = (query.as_object_mut(), extra.as_object()) {
        for (key, value) in merge {
            base.insert(key.clone(), value.clone());
        }
    }
    json!({"batchcomplete": true, "query": query})
}

fn resolver(transport: Arc<MockTransport>) -> Resolver {
    Resolver::new(WikiClient::new(transport), AppConfig::default())
}

fn request(reference: &str) -> ResolveRequest {
    ResolveRequest::new(reference, "!wiki ")
}

#[tokio::test]
async fn direct_page_renders_article_link() {
    let transport = MockTransport::new(vec![(
        "titles=Help".into(),
        query_response(
            "test.example.org",
            json!({"pages": [{"pageid": 1, "ns": 0, "title": "Help"}]}),
        ),
    )]);
    let payload = resolver(transport.clone())
        .resolve("test.example.org", &request("Help"))
        .await;

    assert!(payload.text.contains("<https://test.example.org/wiki/Help>"));
    let embed = payload.embed.expect("embed");
    assert_eq!(embed.title, "Help");
    assert!(embed.fields.is_empty());
    assert_eq!(payload.feedback, None);
}

#[tokio::test]
async fn missing_title_with_equivalent_search_hit_renders_directly() {
    let transport = MockTransport::new(vec![
        (
            "titles=Helo".into(),
            query_response(
                "test.example.org",
                json!({"pages": [{"ns": 0, "title": "Helo", "missing": true}]}),
            ),
        ),
        (
            "gsrsearch=Helo".into(),
            query_response(
                "test.example.org",
                json!({"pages": [{"pageid": 2, "ns": 0, "title": "Help",
                                   "extract": "All about helping."}]}),
            ),
        ),
    ]);
    let resolver = resolver(transport.clone());

    let payload = resolver.resolve("test.example.org", &request("Helo")).await;
    assert!(payload.text.contains("/wiki/Help>"));
    assert!(!payload.text.contains("Maybe you meant"));
    assert_eq!(payload.feedback, None);

    // Idempotent: same missing title, same remote state, same outcome.
    let again = resolver.resolve("test.example.org", &request("Helo")).await;
    assert_eq!(payload, again);
}

#[tokio::test]
async fn ambiguous_search_hit_carries_a_hint() {
    let transport = MockTransport::new(vec![
        (
            "titles=Dragon".into(),
            query_response(
                "test.example.org",
                json!({"pages": [{"ns": 0, "title": "Dragon", "missing": true}]}),
            ),
        ),
        (
            "gsrsearch=Dragon".into(),
            query_response(
                "test.example.org",
                json!({"pages": [{"pageid": 5, "ns": 0, "title": "Dragon Taming Guide",
                                   "extract": "Taming them."}]}),
            ),
        ),
    ]);
    let payload = resolver(transport)
        .resolve("test.example.org", &request("Dragon"))
        .await;

    assert!(payload.text.contains("/wiki/Dragon_Taming_Guide>"));
    assert!(payload.text.contains("Maybe you meant"));
    assert!(payload.text.contains("!wiki "));
}

#[tokio::test]
async fn empty_search_results_shrug() {
    let transport = MockTransport::new(vec![
        (
            "titles=Zzzz".into(),
            query_response(
                "test.example.org",
                json!({"pages": [{"ns": 0, "title": "Zzzz", "missing": true}]}),
            ),
        ),
        ("gsrsearch=Zzzz".into(), query_response("test.example.org", json!({}))),
    ]);
    let payload = resolver(transport)
        .resolve("test.example.org", &request("Zzzz"))
        .await;

    assert_eq!(payload.feedback, Some(Feedback::Shrug));
    assert!(payload.text.contains("Zzzz"));
    assert_eq!(payload.embed, None);
}

/// Two wikis pointing interwiki links at each other: the loop must stop at
/// the standard bound with a visible warning, after bound + 1 entries.
#[tokio::test]
async fn cyclic_interwiki_chain_terminates_at_the_bound() {
    let transport = MockTransport::new(vec![
        (
            "a.fandom.com/api.php".into(),
            query_response(
                "a.fandom.com",
                json!({"interwiki": [{"title": "b:Next", "iw": "b",
                                       "url": "https://b.fandom.com/wiki/Next"}]}),
            ),
        ),
        (
            "b.fandom.com/api.php".into(),
            query_response(
                "b.fandom.com",
                json!({"interwiki": [{"title": "a:Next", "iw": "a",
                                       "url": "https://a.fandom.com/wiki/Next"}]}),
            ),
        ),
    ]);
    let payload = resolver(transport.clone())
        .resolve("a.fandom.com", &request("Next"))
        .await;

    // Initial entry plus five follows, then a raw link with the warning.
    assert_eq!(transport.api_hits(), 6);
    assert_eq!(payload.feedback, Some(Feedback::Warning));
    assert!(payload.text.contains("after 5 hops"));
    assert!(payload.text.contains("fandom.com/wiki/Next"));
}

#[tokio::test]
async fn elevated_tier_follows_deeper() {
    let transport = MockTransport::new(vec![
        (
            "a.fandom.com/api.php".into(),
            query_response(
                "a.fandom.com",
                json!({"interwiki": [{"title": "b:Next", "iw": "b",
                                       "url": "https://b.fandom.com/wiki/Next"}]}),
            ),
        ),
        (
            "b.fandom.com/api.php".into(),
            query_response(
                "b.fandom.com",
                json!({"interwiki": [{"title": "a:Next", "iw": "a",
                                       "url": "https://a.fandom.com/wiki/Next"}]}),
            ),
        ),
    ]);
    let mut elevated = request("Next");
    elevated.tier = Tier::Elevated;
    let payload = resolver(transport.clone())
        .resolve("a.fandom.com", &elevated)
        .await;

    assert_eq!(transport.api_hits(), 11);
    assert!(payload.text.contains("after 10 hops"));
}

#[tokio::test]
async fn unknown_interwiki_target_renders_raw_link_without_warning() {
    let transport = MockTransport::new(vec![(
        "titles=Elsewhere".into(),
        query_response(
            "test.example.org",
            json!({"interwiki": [{"title": "x:Page", "iw": "x",
                                   "url": "https://wiki.unrelated.example/view/Page"}]}),
        ),
    )]);
    let payload = resolver(transport)
        .resolve("test.example.org", &request("Elsewhere"))
        .await;

    assert_eq!(payload.text, "<https://wiki.unrelated.example/view/Page>");
    assert_eq!(payload.feedback, None);
}

#[tokio::test]
async fn special_page_with_unknown_name_renders_generically() {
    let transport = MockTransport::new(vec![(
        "titles=Special%3ASomethingNew".into(),
        query_response(
            "test.example.org",
            json!({"pages": [{"ns": -1, "title": "Special:SomethingNew", "missing": true}]}),
        ),
    )]);
    let payload = resolver(transport)
        .resolve("test.example.org", &request("Special:SomethingNew"))
        .await;

    let embed = payload.embed.expect("embed");
    assert!(embed.description.unwrap().contains("special page"));
    assert_eq!(payload.feedback, None);
}

#[tokio::test]
async fn paused_resolver_refuses_without_network_io() {
    let transport = MockTransport::new(Vec::new());
    let resolver = resolver(transport.clone());
    resolver.set_paused(true);

    let payload = resolver.resolve("test.example.org", &request("Help")).await;

    assert_eq!(payload.feedback, Some(Feedback::Nope));
    assert!(payload.text.contains("paused"));
    assert_eq!(transport.hits.lock().unwrap().len(), 0);
}

#[tokio::test]
async fn unresolvable_remote_yields_failure_signal() {
    let transport = MockTransport::new(Vec::new());
    let payload = resolver(transport)
        .resolve("test.example.org", &request("Help"))
        .await;

    assert_eq!(payload.feedback, Some(Feedback::Nope));
    assert_eq!(payload.embed, None);
}

#[tokio::test]
async fn overlong_reference_is_truncated_with_a_warning() {
    let long_title: String = "x".repeat(300);
    let transport = MockTransport::new(vec![(
        "api.php".into(),
        query_response(
            "test.example.org",
            json!({"pages": [{"pageid": 9, "ns": 0, "title": "x".repeat(250)}]}),
        ),
    )]);
    let payload = resolver(transport)
        .resolve("test.example.org", &request(&long_title))
        .await;

    assert!(payload.text.contains("has been shortened"));
    assert_eq!(payload.feedback, Some(Feedback::Warning));
}
