//! Single-pass outcome classification: an ordered list of predicate rules
//! evaluated top to bottom, first match wins. The order is load-bearing: an
//! interwiki signal must beat namespace checks because remote sites can use
//! namespace collisions as titles that are not truly local pages.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use wikiref_core::model::{InterwikiRef, PageInfo, Redirect, SiteInfo};
use wikiref_core::types::Outcome;

/// Anonymous-user titles: IPv4/IPv6 addresses with an optional CIDR suffix.
pub(crate) static IP_USER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{1,3}(?:\.\d{1,3}){3}(?:/\d{1,2})?|[0-9A-Fa-f]{0,4}(?::[0-9A-Fa-f]{0,4}){2,7}(?:/\d{1,3})?)$")
        .unwrap()
});

pub struct ClassifyInput<'a> {
    pub site: &'a SiteInfo,
    /// Title as requested, before remote normalization.
    pub requested: &'a str,
    pub page: Option<&'a PageInfo>,
    pub redirects: &'a [Redirect],
    pub interwiki: Option<&'a InterwikiRef>,
}

type Rule = fn(&ClassifyInput) -> Option<Outcome>;

const RULES: &[(&str, Rule)] = &[
    ("interwiki", interwiki_target),
    ("self-page alias redirect", self_alias_redirect),
    ("user namespace", user_namespace),
    ("contributions path", contributions_path),
    ("missing page", missing_with_search),
    ("discussion thread", discussion_thread),
    ("special namespace", special_namespace),
    ("redirect", plain_redirect),
];

pub fn classify(input: &ClassifyInput) -> Outcome {
    for (name, rule) in RULES {
        if let Some(outcome) = rule(input) {
            debug!(rule = name, "classified");
            return outcome;
        }
    }
    match input.page {
        Some(page) => Outcome::Direct(page.clone()),
        // The remote dropped the title entirely; let search have a go.
        None => Outcome::MissingWithSearch {
            title: input.requested.to_string(),
        },
    }
}

fn split_prefix(title: &str) -> Option<(&str, &str)> {
    title
        .split_once(':')
        .filter(|(prefix, rest)| !prefix.is_empty() && !rest.is_empty())
}

/// Local name of the user namespace, straight from the table.
pub(crate) fn user_ns_prefix(site: &SiteInfo) -> String {
    site.namespaces
        .values()
        .find(|ns| ns.canonical.as_deref() == Some("User"))
        .map(|ns| {
            if ns.name.is_empty() {
                "User".to_string()
            } else {
                ns.name.clone()
            }
        })
        .unwrap_or_else(|| "User".to_string())
}

fn interwiki_target(input: &ClassifyInput) -> Option<Outcome> {
    let interwiki = input.interwiki?;
    let url = Url::parse(&interwiki.url).ok()?;
    Some(Outcome::Interwiki { url })
}

/// A redirect whose source is the localized "my page"/"my talk" special page
/// is rewritten in place: the target counts as the originally requested
/// user/special page instead of being followed as a plain redirect.
fn self_alias_redirect(input: &ClassifyInput) -> Option<Outcome> {
    let redirect = input.redirects.iter().find(|r| {
        split_prefix(&r.from)
            .and_then(|(_, rest)| input.site.canonical_special(rest))
            .map(|canonical| canonical == "Mypage" || canonical == "Mytalk")
            .unwrap_or(false)
    })?;

    let (prefix, rest) = split_prefix(&redirect.to)?;
    let ns = input.site.namespace_for_prefix(prefix)?;
    if input.site.user_namespaces().contains(&ns.id) {
        return Some(Outcome::User {
            ns_prefix: prefix.to_string(),
            name: rest.to_string(),
        });
    }
    if ns.id == SiteInfo::SPECIAL_NS {
        let head = rest.split('/').next().unwrap_or(rest);
        return Some(Outcome::Special {
            canonical: input.site.canonical_special(head).map(|c| c.to_string()),
            title: redirect.to.clone(),
        });
    }
    None
}

fn user_namespace(input: &ClassifyInput) -> Option<Outcome> {
    let page = input.page?;
    if !input.site.user_namespaces().contains(&page.ns) {
        return None;
    }
    let (prefix, rest) = split_prefix(&page.title)?;
    if rest.contains('/') && !IP_USER.is_match(rest) {
        return None;
    }
    Some(Outcome::User {
        ns_prefix: prefix.to_string(),
        name: rest.to_string(),
    })
}

/// `Special:Contributions/<name>` arrives as a special page with a path
/// segment; route it back through the user lookup.
fn contributions_path(input: &ClassifyInput) -> Option<Outcome> {
    let page = input.page?;
    if page.ns != SiteInfo::SPECIAL_NS {
        return None;
    }
    let (_, rest) = split_prefix(&page.title)?;
    let (head, tail) = rest.split_once('/')?;
    if input.site.canonical_special(head) != Some("Contributions") || tail.is_empty() {
        return None;
    }
    // The trailing segment may itself be a user-namespace title.
    let name = match split_prefix(tail) {
        Some((prefix, user)) if input
            .site
            .namespace_for_prefix(prefix)
            .map(|ns| input.site.user_namespaces().contains(&ns.id))
            .unwrap_or(false) =>
        {
            user
        }
        _ => tail,
    };
    Some(Outcome::User {
        ns_prefix: user_ns_prefix(input.site),
        name: name.to_string(),
    })
}

fn missing_with_search(input: &ClassifyInput) -> Option<Outcome> {
    let page = input.page?;
    if !(page.missing || page.invalid) || !input.redirects.is_empty() {
        return None;
    }
    // Special pages report themselves as missing; they classify below, and
    // so do missing thread and category titles.
    if page.ns == SiteInfo::SPECIAL_NS {
        return None;
    }
    let category = input
        .site
        .namespaces
        .values()
        .any(|ns| ns.canonical.as_deref() == Some("Category") && ns.id == page.ns);
    if category || input.site.thread_namespaces().contains(&page.ns) {
        return None;
    }
    let title = if page.title.is_empty() {
        input.requested.to_string()
    } else {
        page.title.clone()
    };
    Some(Outcome::MissingWithSearch { title })
}

fn discussion_thread(input: &ClassifyInput) -> Option<Outcome> {
    let page = input.page?;
    if !page.missing || !input.site.thread_namespaces().contains(&page.ns) {
        return None;
    }
    let (_, rest) = split_prefix(&page.title)?;
    Some(Outcome::Discussion {
        reference: rest.to_string(),
    })
}

fn special_namespace(input: &ClassifyInput) -> Option<Outcome> {
    let page = input.page?;
    if page.ns != SiteInfo::SPECIAL_NS {
        return None;
    }
    let canonical = split_prefix(&page.title)
        .map(|(_, rest)| rest.split('/').next().unwrap_or(rest))
        .and_then(|head| input.site.canonical_special(head))
        .map(|c| c.to_string());
    Some(Outcome::Special {
        canonical,
        title: page.title.clone(),
    })
}

fn plain_redirect(input: &ClassifyInput) -> Option<Outcome> {
    let page = input.page?;
    let redirect = input.redirects.first()?;
    Some(Outcome::Redirect {
        page: page.clone(),
        from: redirect.from.clone(),
        fragment: redirect.tofragment.clone(),
    })
}
