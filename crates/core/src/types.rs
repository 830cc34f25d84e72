use url::Url;

use crate::model::PageInfo;

/// Caller tier; affects the interwiki bound and whether report previews are
/// attached to special-page renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tier {
    #[default]
    Standard,
    Elevated,
}

/// What the delivery channel permits for rich output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedPolicy {
    /// Rich summary with inline images.
    #[default]
    Full,
    /// No inline images; files are delivered attachment-style.
    AttachmentsOnly,
    /// Plain text only.
    TextOnly,
}

/// One resolution request as handed over by the command front end.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Free-text wiki reference, already stripped of the command invocation.
    pub reference: String,
    /// Invocation prefix echoed back in command hints.
    pub prefix: String,
    pub tier: Tier,
    pub spoiler: bool,
    pub embed_policy: EmbedPolicy,
}

impl ResolveRequest {
    pub fn new(reference: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            prefix: prefix.into(),
            tier: Tier::Standard,
            spoiler: false,
            embed_policy: EmbedPolicy::Full,
        }
    }
}

/// Classified outcome of one pipeline step. Produced once, consumed exactly
/// once by the renderer or a namespace handler.
#[derive(Debug, Clone)]
pub enum Outcome {
    Direct(PageInfo),
    Redirect {
        page: PageInfo,
        from: String,
        fragment: Option<String>,
    },
    Interwiki {
        url: Url,
    },
    Special {
        canonical: Option<String>,
        title: String,
    },
    User {
        ns_prefix: String,
        name: String,
    },
    Discussion {
        reference: String,
    },
    MissingWithSearch {
        title: String,
    },
}

/// Search fallback verdict on a missing title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSuggestion {
    pub result_count: u64,
    pub best_match: Option<String>,
    pub exact_title_match: bool,
}

/// Short feedback signal for the delivery channel (rendered as a reaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    /// Nothing found, nothing more to try.
    Shrug,
    /// The request failed outright.
    Nope,
    /// The result is usable but degraded.
    Warning,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// Rich summary block accompanying the link line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub attachment: Option<String>,
    pub fields: Vec<EmbedField>,
}

/// Final product of a resolution, handed to the delivery collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub text: String,
    pub embed: Option<Embed>,
    pub feedback: Option<Feedback>,
}

impl Payload {
    pub fn text_only(text: impl Into<String>) -> Self {
        Payload {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = Some(feedback);
        self
    }
}
