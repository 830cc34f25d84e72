use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub limits: LimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Wiki used when a resolve request names none.
    #[serde(default = "default_wiki")]
    pub default_wiki: String,
    /// Invocation prefix echoed back in command hints.
    #[serde(default = "default_prefix")]
    pub invocation_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_body_mb")]
    pub max_body_size_mb: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitConfig {
    /// Interwiki hops allowed for a standard-tier caller.
    #[serde(default = "default_depth")]
    pub interwiki_depth: u32,
    /// Interwiki hops allowed for an elevated-tier caller.
    #[serde(default = "default_depth_elevated")]
    pub interwiki_depth_elevated: u32,
    /// Upper bound on namespaces passed to a search query.
    #[serde(default = "default_search_namespaces")]
    pub max_search_namespaces: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_wiki: default_wiki(),
            invocation_prefix: default_prefix(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_seconds: default_connect_timeout(),
            request_timeout_seconds: default_request_timeout(),
            max_body_size_mb: default_max_body_mb(),
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            interwiki_depth: default_depth(),
            interwiki_depth_elevated: default_depth_elevated(),
            max_search_namespaces: default_search_namespaces(),
        }
    }
}

fn default_wiki() -> String {
    "https://en.wikipedia.org/wiki/".to_string()
}
fn default_prefix() -> String {
    "!wiki ".to_string()
}
fn default_user_agent() -> String {
    format!("wikiref/{}", env!("CARGO_PKG_VERSION"))
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_request_timeout() -> u64 {
    15
}
fn default_max_body_mb() -> usize {
    10
}
fn default_depth() -> u32 {
    5
}
fn default_depth_elevated() -> u32 {
    10
}
fn default_search_namespaces() -> usize {
    10
}
