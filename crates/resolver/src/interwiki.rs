//! Registry of known hosting platforms and wiki projects. An interwiki
//! target URL is matched here, in order: current hosting platform, legacy
//! hosting platform, then the named project patterns. A match derives a new
//! endpoint plus the rewritten title so the pipeline can re-enter from the
//! top; anything unmatched is rendered as a plain external link.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use wikiref_core::endpoint::{Endpoint, Platform};

static FANDOM_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z\d-]{1,50}\.fandom\.com$").unwrap());

static WIKIA_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z\d-]{1,50}\.wikia\.(?:com|org)$").unwrap());

static LANG_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(?:-[a-z]{2,4})?$").unwrap());

struct ProjectPattern {
    name: &'static str,
    host: Regex,
    script_path: &'static str,
    article_path: &'static str,
}

static PROJECTS: Lazy<Vec<ProjectPattern>> = Lazy::new(|| {
    let project = |name, pattern, script_path, article_path| ProjectPattern {
        name,
        host: Regex::new(pattern).unwrap(),
        script_path,
        article_path,
    };
    vec![
        project(
            "wikimedia",
            r"^[a-z\d-]{1,50}\.(?:m\.)?(?:wikipedia|wikimedia|wiktionary|wikibooks|wikisource|wikidata|wikiversity|wikivoyage|wikiquote|wikinews|mediawiki)\.org$",
            "/w",
            "/wiki/$1",
        ),
        project("wiki.gg", r"^[a-z\d-]{1,50}\.wiki\.gg$", "", "/wiki/$1"),
        project("miraheze", r"^[a-z\d-]{1,50}\.miraheze\.org$", "/w", "/wiki/$1"),
        project("paradox", r"^[a-z\d-]{1,50}\.paradoxwikis\.com$", "", "/$1"),
        project("gamepedia", r"^[a-z\d-]{1,50}\.gamepedia\.com$", "", "/$1"),
    ]
});

/// Match an interwiki URL against the registry and derive the endpoint and
/// title for re-entry. `None` means "render as a raw external link".
pub fn match_interwiki(url: &Url) -> Option<(Endpoint, String)> {
    let host = url.host_str()?.to_lowercase();
    let origin = Url::parse(&format!("https://{host}")).ok()?;

    if FANDOM_HOST.is_match(&host) || WIKIA_HOST.is_match(&host) {
        let lang = url
            .path()
            .trim_start_matches('/')
            .split('/')
            .next()
            .filter(|seg| *seg != "wiki" && LANG_SEGMENT.is_match(seg))
            .map(|seg| seg.to_string());
        let prefix = lang
            .as_deref()
            .map(|l| format!("/{l}"))
            .unwrap_or_default();
        let platform = if FANDOM_HOST.is_match(&host) {
            Platform::Fandom { lang }
        } else {
            Platform::LegacyWikia { lang }
        };
        let endpoint = Endpoint::from_parts(
            origin,
            &prefix,
            &format!("{prefix}/wiki/$1"),
            platform,
        );
        let title = title_from(&endpoint, url);
        return Some((endpoint, title));
    }

    for pattern in PROJECTS.iter() {
        if pattern.host.is_match(&host) {
            let endpoint = Endpoint::from_parts(
                origin,
                pattern.script_path,
                pattern.article_path,
                Platform::Project(pattern.name),
            );
            let title = title_from(&endpoint, url);
            return Some((endpoint, title));
        }
    }
    None
}

/// Title carried by an interwiki URL: the article path when it parses,
/// otherwise an explicit `title=` query parameter, otherwise the main page.
fn title_from(endpoint: &Endpoint, url: &Url) -> String {
    if let Some(title) = endpoint.title_from_path(url.path()) {
        return title;
    }
    url.query_pairs()
        .find(|(key, _)| key == "title")
        .map(|(_, value)| value.replace('_', " "))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(url: &str) -> (Endpoint, String) {
        match_interwiki(&Url::parse(url).unwrap()).expect("registry match")
    }

    #[test]
    fn fandom_host_with_language() {
        let (endpoint, title) = matched("https://gta.fandom.com/de/wiki/Karl_Abolaji");
        assert!(endpoint.platform.has_discussions());
        assert_eq!(title, "Karl Abolaji");
        assert_eq!(endpoint.api_url().as_str(), "https://gta.fandom.com/de/api.php");
    }

    #[test]
    fn legacy_host_is_recognized() {
        let (endpoint, title) = matched("https://community.wikia.org/wiki/Help");
        assert!(endpoint.platform.is_legacy());
        assert_eq!(title, "Help");
    }

    #[test]
    fn wikimedia_project_uses_script_path() {
        let (endpoint, title) = matched("https://de.wikipedia.org/wiki/Hilfe");
        assert_eq!(endpoint.api_url().as_str(), "https://de.wikipedia.org/w/api.php");
        assert_eq!(title, "Hilfe");
    }

    #[test]
    fn root_article_path_project() {
        let (endpoint, title) = matched("https://eu4.paradoxwikis.com/Trade");
        assert_eq!(title, "Trade");
        assert_eq!(endpoint.to_page_url("War").as_str(), "https://eu4.paradoxwikis.com/War");
    }

    #[test]
    fn index_php_title_parameter() {
        let (_, title) = matched("https://en.wikipedia.org/w/index.php?title=Main_Page");
        assert_eq!(title, "Main Page");
    }

    #[test]
    fn unknown_host_is_a_raw_link() {
        let url = Url::parse("https://wiki.example.org/wiki/Page").unwrap();
        assert!(match_interwiki(&url).is_none());
    }

    #[test]
    fn bare_host_resolves_to_main_page() {
        let (_, title) = matched("https://gta.fandom.com/");
        assert_eq!(title, "");
    }
}
