//! The resolution pipeline: parse, query, classify, hand off, and follow
//! interwiki targets as an explicit loop with an accumulating depth counter.
//! Every failure converts to a terminal payload here; nothing escapes as an
//! unhandled fault.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};
use url::Url;

use wikiref_client::WikiClient;
use wikiref_core::catalog::Catalog;
use wikiref_core::config::AppConfig;
use wikiref_core::endpoint::Endpoint;
use wikiref_core::error::ResolveError;
use wikiref_core::model::PageInfo;
use wikiref_core::types::{Feedback, Outcome, Payload, ResolveRequest, Tier};
use wikiref_render::embed::{self, RenderCtx};

use crate::classify::{classify, ClassifyInput};
use crate::handlers;
use crate::interwiki;
use crate::parse::{parse_reference, ParsedRef};
use crate::search;

enum Step {
    Done(Payload),
    Interwiki(Url),
}

pub struct Resolver {
    client: WikiClient,
    config: AppConfig,
    catalog: Catalog,
    /// Admission flag, checked once before the first network call of each
    /// resolution. Resolutions already running are unaffected.
    paused: AtomicBool,
}

impl Resolver {
    pub fn new(client: WikiClient, config: AppConfig) -> Self {
        Self::with_catalog(client, config, Catalog::english().clone())
    }

    pub fn with_catalog(client: WikiClient, config: AppConfig, catalog: Catalog) -> Self {
        Self {
            client,
            config,
            catalog,
            paused: AtomicBool::new(false),
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Resolve one reference against one wiki. Always terminates with a
    /// payload: a classified render, a raw link, or a short failure signal.
    pub async fn resolve(&self, wiki: &str, request: &ResolveRequest) -> Payload {
        let render = RenderCtx {
            catalog: &self.catalog,
            spoiler: request.spoiler,
            embed_policy: request.embed_policy,
        };

        if self.is_paused() {
            return Payload::text_only(self.catalog.get("error.paused", &[]))
                .with_feedback(Feedback::Nope);
        }

        let parsed = parse_reference(&request.reference);
        let bound = match request.tier {
            Tier::Standard => self.config.limits.interwiki_depth,
            Tier::Elevated => self.config.limits.interwiki_depth_elevated,
        };

        let mut endpoint = match Endpoint::parse_input(wiki) {
            Ok(endpoint) => endpoint,
            Err(e) => return self.error_payload(wiki, e),
        };
        let mut title = parsed.title.clone();
        let mut depth = 0u32;

        let mut payload = loop {
            match self.step(&render, &mut endpoint, &title, &parsed, request).await {
                Ok(Step::Done(payload)) => break payload,
                Ok(Step::Interwiki(url)) => match interwiki::match_interwiki(&url) {
                    Some((next_endpoint, next_title)) if depth < bound => {
                        depth += 1;
                        debug!(depth, target = %url, "following interwiki");
                        endpoint = next_endpoint;
                        title = next_title;
                    }
                    Some(_) => {
                        info!(depth, target = %url, "interwiki bound exhausted");
                        break embed::raw_link_payload(
                            &render,
                            &url,
                            parsed.query.as_deref(),
                            parsed.fragment.as_deref(),
                            Some(bound),
                        );
                    }
                    None => {
                        break embed::raw_link_payload(
                            &render,
                            &url,
                            parsed.query.as_deref(),
                            parsed.fragment.as_deref(),
                            None,
                        )
                    }
                },
                Err(e) => break self.error_payload(endpoint.host(), e),
            }
        };

        if parsed.truncated {
            payload.text.push('\n');
            payload
                .text
                .push_str(&self.catalog.get("reference.truncated", &[]));
            payload.feedback.get_or_insert(Feedback::Warning);
        }
        payload
    }

    async fn step(
        &self,
        render: &RenderCtx<'_>,
        endpoint: &mut Endpoint,
        title: &str,
        parsed: &ParsedRef,
        request: &ResolveRequest,
    ) -> Result<Step, ResolveError> {
        let result = self.client.page_query(endpoint, title).await?;
        let site = result.siteinfo;
        let transport = self.client.transport();

        // An empty reference points at the main page, whose name only the
        // snapshot knows.
        if title.is_empty() {
            let main = site.general.mainpage.clone().unwrap_or_default();
            if main.is_empty() {
                let url = endpoint.to_page_url("");
                return Ok(Step::Done(Payload::text_only(render.wrap(format!("<{url}>")))));
            }
            let (pages, _) = self.client.pages_for(endpoint, &main).await?;
            let page = pages
                .into_iter()
                .next()
                .unwrap_or_else(|| PageInfo {
                    title: main,
                    ..Default::default()
                });
            let payload = embed::page_payload(
                &*transport,
                render,
                endpoint,
                &site,
                &page,
                parsed.query.as_deref(),
                parsed.fragment.as_deref(),
                None,
            )
            .await;
            return Ok(Step::Done(payload));
        }

        let input = ClassifyInput {
            site: &site,
            requested: title,
            page: result.pages.first(),
            redirects: &result.redirects,
            interwiki: result.interwiki.as_ref(),
        };
        let outcome = classify(&input);

        let payload = match outcome {
            Outcome::Interwiki { url } => return Ok(Step::Interwiki(url)),
            Outcome::Direct(page) => {
                embed::page_payload(
                    &*transport,
                    render,
                    endpoint,
                    &site,
                    &page,
                    parsed.query.as_deref(),
                    parsed.fragment.as_deref(),
                    None,
                )
                .await
            }
            Outcome::Redirect {
                page,
                from,
                fragment,
            } => {
                let fragment = fragment.or_else(|| parsed.fragment.clone());
                embed::page_payload(
                    &*transport,
                    render,
                    endpoint,
                    &site,
                    &page,
                    parsed.query.as_deref(),
                    fragment.as_deref(),
                    Some(&from),
                )
                .await
            }
            Outcome::Special { canonical, title } => {
                handlers::special::run(
                    &self.client,
                    render,
                    endpoint,
                    &site,
                    canonical.as_deref(),
                    &title,
                    request.tier,
                )
                .await?
            }
            Outcome::User { ns_prefix, name } => {
                handlers::user::run(&self.client, render, endpoint, &site, &ns_prefix, &name)
                    .await?
            }
            Outcome::Discussion { reference } => {
                handlers::discussion::run(&self.client, render, endpoint, &site, &reference)
                    .await?
            }
            Outcome::MissingWithSearch { title } => {
                search::fallback(
                    &self.client,
                    render,
                    endpoint,
                    &site,
                    &title,
                    &request.prefix,
                    self.config.limits.max_search_namespaces,
                    parsed.query.as_deref(),
                    parsed.fragment.as_deref(),
                )
                .await?
            }
        };
        Ok(Step::Done(payload))
    }

    /// Convert a hard error into its terminal, user-visible signal.
    fn error_payload(&self, host: &str, error: ResolveError) -> Payload {
        debug!(host, error = %error, "resolution failed");
        let text = match &error {
            ResolveError::Unreachable(cause) => self
                .catalog
                .get("error.unreachable", &[&cause.to_string()]),
            ResolveError::WikiNotFound | ResolveError::InvalidUrl(_) => {
                self.catalog.get("error.notfound", &[host])
            }
            ResolveError::PermissionDenied => self.catalog.get("error.denied", &[]),
            ResolveError::Malformed(_) | ResolveError::Other(_) => {
                self.catalog.get("error.malformed", &[])
            }
        };
        Payload::text_only(text).with_feedback(Feedback::Nope)
    }
}
