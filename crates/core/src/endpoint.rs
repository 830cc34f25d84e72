use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use url::Url;

use crate::error::ResolveError;
use crate::model::General;

/// Characters escaped when a title is substituted into an article path.
/// `/` and `:` stay literal, matching how MediaWiki renders its own links.
const TITLE_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'#')
    .add(b'%')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^')
    .add(b'[')
    .add(b']');

static FANDOM_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z\d-]{1,50})\.fandom\.com$").unwrap());

static WIKIA_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z\d-]{1,50})\.wikia\.(?:com|org)$").unwrap());

static LANG_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(?:-[a-z]{2,4})?$").unwrap());

/// Which hosting family a wiki belongs to. Drives query shapes and feature
/// availability; everything unrecognized is treated as stock MediaWiki.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    MediaWiki,
    Fandom { lang: Option<String> },
    LegacyWikia { lang: Option<String> },
    Project(&'static str),
}

impl Platform {
    pub fn detect(host: &str, path: &str) -> Platform {
        let lang = path
            .trim_start_matches('/')
            .split('/')
            .next()
            .filter(|seg| *seg != "wiki" && LANG_SEGMENT.is_match(seg))
            .map(|seg| seg.to_string());

        if FANDOM_HOST.is_match(host) {
            Platform::Fandom { lang }
        } else if WIKIA_HOST.is_match(host) {
            Platform::LegacyWikia { lang }
        } else {
            Platform::MediaWiki
        }
    }

    pub fn is_fandom(&self) -> bool {
        matches!(self, Platform::Fandom { .. } | Platform::LegacyWikia { .. })
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Platform::LegacyWikia { .. })
    }

    /// The discussion sub-API only exists on current Fandom hosting.
    pub fn has_discussions(&self) -> bool {
        matches!(self, Platform::Fandom { .. })
    }

    /// Fandom-family wikis answer `list=search`; everything else gets the
    /// generator-based search so page props come back in the same response.
    pub fn legacy_search(&self) -> bool {
        self.is_fandom()
    }

    /// TextExtracts is absent on Fandom-family wikis; descriptions there
    /// come from an Open Graph scrape instead.
    pub fn has_extracts(&self) -> bool {
        !self.is_fandom()
    }

    fn lang_prefix(&self) -> String {
        match self {
            Platform::Fandom { lang: Some(l) } | Platform::LegacyWikia { lang: Some(l) } => {
                format!("/{l}")
            }
            _ => String::new(),
        }
    }
}

/// One addressable remote wiki and its link-construction rules.
///
/// Built as a guess from raw user input, then refined in place once the
/// remote's own `general` block comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    origin: Url,
    script_path: String,
    article_path: String,
    main_page: String,
    space_replacement: char,
    /// Path of the original input, kept for the HTML probe when the API
    /// entry point has to be rediscovered.
    entry_path: String,
    pub platform: Platform,
}

impl Endpoint {
    /// Normalize free-text input ("en.wikipedia.org", "test.fandom.com/de",
    /// a full article URL) into an endpoint guess. Plain-HTTP input is
    /// upgraded to HTTPS; sites without TLS surface later as unreachable.
    pub fn parse_input(input: &str) -> Result<Endpoint, ResolveError> {
        let trimmed = input.trim().trim_matches('<').trim_matches('>');
        let with_scheme = if trimmed.contains("://") {
            trimmed.replacen("http://", "https://", 1)
        } else {
            format!("https://{trimmed}")
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| ResolveError::InvalidUrl(format!("{trimmed}: {e}")))?;
        if url.scheme() != "https" {
            return Err(ResolveError::Unreachable(crate::error::UnreachableCause::NoHttps));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ResolveError::InvalidUrl(format!("{trimmed}: no host")))?
            .to_lowercase();

        let platform = Platform::detect(&host, url.path());
        let origin = Url::parse(&format!("https://{host}"))
            .map_err(|e| ResolveError::InvalidUrl(e.to_string()))?;
        let prefix = platform.lang_prefix();

        Ok(Endpoint {
            origin,
            script_path: prefix.clone(),
            article_path: format!("{prefix}/wiki/$1"),
            main_page: String::new(),
            space_replacement: '_',
            entry_path: url.path().to_string(),
            platform,
        })
    }

    /// Build an endpoint directly; used by the interwiki registry where the
    /// path conventions of the target project are already known.
    pub fn from_parts(
        origin: Url,
        script_path: &str,
        article_path: &str,
        platform: Platform,
    ) -> Endpoint {
        Endpoint {
            entry_path: article_path.replacen("$1", "", 1),
            origin,
            script_path: script_path.to_string(),
            article_path: article_path.to_string(),
            main_page: String::new(),
            space_replacement: '_',
            platform,
        }
    }

    /// Refine the guess with authoritative metadata from the `general`
    /// block. The server field may be protocol-relative.
    pub fn update_from_general(&mut self, general: &General) {
        if let Some(server) = general.server.as_deref() {
            let absolute = if let Some(rest) = server.strip_prefix("//") {
                format!("https://{rest}")
            } else {
                server.replacen("http://", "https://", 1)
            };
            if let Ok(url) = Url::parse(&absolute) {
                self.origin = url;
            }
        }
        if let Some(path) = general.articlepath.as_deref() {
            if path.contains("$1") {
                self.article_path = path.to_string();
            }
        }
        if let Some(script) = general.scriptpath.as_deref() {
            self.script_path = script.trim_end_matches('/').to_string();
        }
        if let Some(main) = general.mainpage.as_deref() {
            self.main_page = main.to_string();
        }
        // Re-detect with the refreshed host and article path; the remote may
        // have redirected us to its canonical hosting domain. A registry
        // match already knows its project and keeps it.
        if !matches!(self.platform, Platform::Project(_)) {
            let host = self.host().to_string();
            self.platform = Platform::detect(&host, &self.article_path);
        }
    }

    pub fn host(&self) -> &str {
        self.origin.host_str().unwrap_or_default()
    }

    pub fn main_page(&self) -> &str {
        &self.main_page
    }

    pub fn script_path(&self) -> &str {
        &self.script_path
    }

    /// `GET`-able api.php location for this wiki.
    pub fn api_url(&self) -> Url {
        self.join(&format!("{}/api.php", self.script_path))
    }

    /// Fandom's non-MediaWiki service entry point.
    pub fn services_url(&self) -> Url {
        self.join(&format!("{}/wikia.php", self.script_path))
    }

    /// The page the user originally pointed at; scraped for the edit link
    /// when the API entry point has to be rediscovered.
    pub fn probe_url(&self) -> Url {
        let path = if self.entry_path.is_empty() || self.entry_path == "/" {
            self.article_path.replacen("$1", "", 1)
        } else {
            self.entry_path.clone()
        };
        self.join(&path)
    }

    /// Replace the script path after edit-link discovery.
    pub fn set_script_path(&mut self, script: &str) {
        self.script_path = script.trim_end_matches('/').to_string();
    }

    /// Canonical link for a title. An empty title points at the main page.
    pub fn to_page_url(&self, title: &str) -> Url {
        let title = if title.is_empty() { &self.main_page } else { title };
        let replaced = title.replace(' ', &self.space_replacement.to_string());
        let encoded = utf8_percent_encode(&replaced, TITLE_ENCODE).to_string();
        self.join(&self.article_path.replacen("$1", &encoded, 1))
    }

    /// Link with an optional raw query string and/or section fragment.
    /// A query string forces the index.php form since article paths cannot
    /// carry parameters.
    pub fn to_page_url_with(
        &self,
        title: &str,
        query: Option<&str>,
        fragment: Option<&str>,
    ) -> Url {
        let mut url = match query {
            Some(qs) => {
                let mut url = self.join(&format!("{}/index.php", self.script_path));
                let title = if title.is_empty() { &self.main_page } else { title };
                url.set_query(Some(&format!(
                    "title={}&{qs}",
                    utf8_percent_encode(&title.replace(' ', "_"), TITLE_ENCODE)
                )));
                url
            }
            None => self.to_page_url(title),
        };
        if let Some(frag) = fragment {
            let anchor = frag.trim().replace(' ', "_");
            url.set_fragment(Some(&utf8_percent_encode(&anchor, TITLE_ENCODE).to_string()));
        }
        url
    }

    /// Recover a title from a path built with [`to_page_url`]. Returns
    /// `None` when the path does not match this endpoint's article path.
    pub fn title_from_path(&self, path: &str) -> Option<String> {
        let (prefix, suffix) = self.article_path.split_once("$1")?;
        let rest = path.strip_prefix(prefix)?;
        let encoded = rest.strip_suffix(suffix)?;
        let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
        Some(decoded.replace(self.space_replacement, " "))
    }

    fn join(&self, path: &str) -> Url {
        self.origin
            .join(path)
            .unwrap_or_else(|_| self.origin.clone())
    }
}
