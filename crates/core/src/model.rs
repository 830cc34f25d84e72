//! Typed views of the remote wiki's responses, shared by the client,
//! resolver and render crates. Field names follow `formatversion=2` JSON;
//! aliases cover the legacy shapes still served by older installations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::Deserialize;

/// The `general` siteinfo block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct General {
    pub sitename: Option<String>,
    pub mainpage: Option<String>,
    pub server: Option<String>,
    pub articlepath: Option<String>,
    pub scriptpath: Option<String>,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamespaceInfo {
    pub id: i64,
    #[serde(alias = "*", default)]
    pub name: String,
    pub canonical: Option<String>,
    #[serde(default)]
    pub content: bool,
    #[serde(skip)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceAlias {
    pub id: i64,
    #[serde(alias = "*")]
    pub alias: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpecialPageAlias {
    pub realname: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Canonical names treated as user-like profile namespaces when present in
/// the remote's table. Which numeric ids these map to varies per platform.
const USER_LIKE: &[&str] = &["User", "User profile", "UserProfile", "Message Wall"];

/// Canonical names of discussion-thread namespaces (Fandom forums/walls).
const THREAD_LIKE: &[&str] = &["Thread", "Board Thread"];

/// Normalized snapshot of one wiki's self-reported configuration. Built once
/// per resolution step; the namespace table is authoritative for
/// classification.
#[derive(Debug, Clone, Default)]
pub struct SiteInfo {
    pub general: General,
    pub namespaces: HashMap<i64, NamespaceInfo>,
    pub special_aliases: Vec<SpecialPageAlias>,
    /// Numeric wiki id used by the discussion sub-API; looked up lazily and
    /// cached for the rest of this resolution only.
    pub wiki_id: OnceCell<u64>,
}

impl SiteInfo {
    pub const SPECIAL_NS: i64 = -1;

    pub fn namespace(&self, id: i64) -> Option<&NamespaceInfo> {
        self.namespaces.get(&id)
    }

    /// Local name of a namespace, falling back to its canonical name.
    pub fn namespace_name(&self, id: i64) -> Option<&str> {
        self.namespace(id).map(|ns| {
            if ns.name.is_empty() {
                ns.canonical.as_deref().unwrap_or_default()
            } else {
                ns.name.as_str()
            }
        })
    }

    pub fn user_namespaces(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .namespaces
            .values()
            .filter(|ns| {
                ns.canonical
                    .as_deref()
                    .map(|c| USER_LIKE.contains(&c))
                    .unwrap_or(false)
            })
            .map(|ns| ns.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn thread_namespaces(&self) -> Vec<i64> {
        self.namespaces
            .values()
            .filter(|ns| {
                ns.canonical
                    .as_deref()
                    .map(|c| THREAD_LIKE.contains(&c))
                    .unwrap_or(false)
            })
            .map(|ns| ns.id)
            .collect()
    }

    /// Namespaces searched by the fallback engine. Falls back to the main
    /// namespace when the remote marks nothing as content.
    pub fn content_namespaces(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .namespaces
            .values()
            .filter(|ns| ns.content)
            .map(|ns| ns.id)
            .collect();
        if ids.is_empty() {
            ids.push(0);
        }
        ids.sort_unstable();
        ids
    }

    /// Find a namespace by the prefix used in a title, accepting the local
    /// name, the canonical name, or any registered alias.
    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&NamespaceInfo> {
        let wanted = fold_title(prefix);
        self.namespaces.values().find(|ns| {
            fold_title(&ns.name) == wanted
                || ns
                    .canonical
                    .as_deref()
                    .map(|c| fold_title(c) == wanted)
                    .unwrap_or(false)
                || ns.aliases.iter().any(|a| fold_title(a) == wanted)
        })
    }

    /// Resolve a localized special-page name to its canonical name via the
    /// alias table. Case-insensitive; spaces and underscores are equal.
    pub fn canonical_special(&self, local: &str) -> Option<&str> {
        let wanted = fold_title(local);
        self.special_aliases
            .iter()
            .find(|entry| {
                fold_title(&entry.realname) == wanted
                    || entry.aliases.iter().any(|a| fold_title(a) == wanted)
            })
            .map(|entry| entry.realname.as_str())
    }

    /// Preferred localized alias for a canonical special-page name.
    pub fn localized_special(&self, canonical: &str) -> String {
        self.special_aliases
            .iter()
            .find(|entry| entry.realname.eq_ignore_ascii_case(canonical))
            .and_then(|entry| entry.aliases.first().cloned())
            .unwrap_or_else(|| canonical.to_string())
    }
}

/// Title comparison key: lowercased, underscores read as spaces.
pub fn fold_title(title: &str) -> String {
    title.trim().replace('_', " ").to_lowercase()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInfo {
    pub pageid: Option<u64>,
    #[serde(default)]
    pub ns: i64,
    pub title: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
    pub extract: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<Thumbnail>,
    pub pageimage: Option<String>,
    pub categoryinfo: Option<CategoryInfo>,
    #[serde(default)]
    pub pageprops: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub source: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// The four counters behind a category summary.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CategoryInfo {
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub pages: i64,
    #[serde(default)]
    pub files: i64,
    #[serde(default)]
    pub subcats: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Redirect {
    pub from: String,
    pub to: String,
    pub tofragment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Normalized {
    pub from: String,
    pub to: String,
}

/// Returned when the requested title turns out to live on another wiki.
#[derive(Debug, Clone, Deserialize)]
pub struct InterwikiRef {
    pub title: String,
    pub iw: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub title: String,
    #[serde(default)]
    pub ns: i64,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchInfo {
    #[serde(default)]
    pub totalhits: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    pub userid: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub groups: Vec<String>,
    pub editcount: Option<u64>,
    pub registration: Option<String>,
    pub blockedby: Option<String>,
    pub blockreason: Option<String>,
    pub blockexpiry: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryPage {
    pub name: String,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub results: Vec<QueryPageRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryPageRow {
    pub title: String,
    #[serde(default)]
    pub ns: i64,
    /// Report-specific metric; a number or numeric string depending on the
    /// installation's age.
    pub value: Option<serde_json::Value>,
    pub timestamp: Option<String>,
}

impl QueryPageRow {
    pub fn numeric_value(&self) -> Option<i64> {
        match self.value.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomPage {
    pub id: Option<u64>,
    #[serde(default)]
    pub ns: i64,
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompareResult {
    pub fromtitle: Option<String>,
    pub totitle: Option<String>,
    pub fromrevid: Option<u64>,
    pub torevid: Option<u64>,
    pub fromuser: Option<String>,
    pub touser: Option<String>,
    pub totimestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentChange {
    pub title: String,
    #[serde(default)]
    pub ns: i64,
    pub user: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteStatistics {
    #[serde(default)]
    pub pages: u64,
    #[serde(default)]
    pub articles: u64,
    #[serde(default)]
    pub edits: u64,
    #[serde(default)]
    pub images: u64,
    #[serde(default)]
    pub users: u64,
    #[serde(default)]
    pub activeusers: u64,
    #[serde(default)]
    pub admins: u64,
}

/// A discussion thread, normalized from the hosting platform's wire shape.
#[derive(Debug, Clone, Default)]
pub struct DiscussionThread {
    pub id: String,
    pub title: Option<String>,
    pub raw_content: String,
    /// Structured document model as a JSON string, when the platform
    /// provides one.
    pub json_model: Option<String>,
    pub creator: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub post_count: u64,
    pub forum_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DiscussionPost {
    pub id: String,
    pub thread_id: String,
    pub raw_content: String,
    pub json_model: Option<String>,
    pub creator: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(id: i64, canonical: &str, name: &str, content: bool) -> NamespaceInfo {
        NamespaceInfo {
            id,
            name: name.to_string(),
            canonical: (!canonical.is_empty()).then(|| canonical.to_string()),
            content,
            aliases: Vec::new(),
        }
    }

    fn snapshot() -> SiteInfo {
        let mut namespaces = HashMap::new();
        for info in [
            ns(-1, "Special", "Spezial", false),
            ns(0, "", "", true),
            ns(2, "User", "Benutzer", false),
            ns(4, "Project", "Wiki", true),
            ns(1200, "Message Wall", "Message Wall", false),
            ns(1201, "Thread", "Thread", false),
        ] {
            namespaces.insert(info.id, info);
        }
        SiteInfo {
            namespaces,
            special_aliases: vec![
                SpecialPageAlias {
                    realname: "Contributions".into(),
                    aliases: vec!["Beiträge".into(), "Contribs".into()],
                },
                SpecialPageAlias {
                    realname: "Recentchanges".into(),
                    aliases: vec!["Letzte_Änderungen".into()],
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn user_like_namespaces_come_from_table() {
        assert_eq!(snapshot().user_namespaces(), vec![2, 1200]);
    }

    #[test]
    fn thread_namespace_from_table() {
        assert_eq!(snapshot().thread_namespaces(), vec![1201]);
    }

    #[test]
    fn content_namespaces_fall_back_to_main() {
        assert_eq!(snapshot().content_namespaces(), vec![0, 4]);
        let empty = SiteInfo::default();
        assert_eq!(empty.content_namespaces(), vec![0]);
    }

    #[test]
    fn special_alias_lookup_is_locale_insensitive() {
        let info = snapshot();
        assert_eq!(info.canonical_special("beiträge"), Some("Contributions"));
        assert_eq!(info.canonical_special("letzte änderungen"), Some("Recentchanges"));
        assert_eq!(info.canonical_special("no such page"), None);
    }

    #[test]
    fn query_page_row_value_accepts_both_shapes() {
        let row = QueryPageRow {
            title: "A".into(),
            ns: 0,
            value: Some(serde_json::json!("123")),
            timestamp: None,
        };
        assert_eq!(row.numeric_value(), Some(123));
        let row = QueryPageRow {
            value: Some(serde_json::json!(456)),
            ..row
        };
        assert_eq!(row.numeric_value(), Some(456));
    }
}
