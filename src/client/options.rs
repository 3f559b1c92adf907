//! Connection configuration: URL normalization, authentication modes, and the
//! client builder.
//!
//! Settings are applied in order; the first invalid one is remembered and
//! aborts [`RawClientBuilder::build`] with that specific error.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use url::Url;

use super::RawClient;
use crate::errors::TransportError;

/// Authentication mode. Exactly one mode is active per client.
#[derive(Clone, Default)]
pub(crate) enum Auth {
    #[default]
    Anonymous,
    Basic {
        username: String,
        password: String,
    },
    /// Raw token sent as the whole `Authorization` value, without a scheme
    /// prefix. This matches the target hosting API exactly; it is not a
    /// standard bearer scheme.
    Token(String),
}

impl Auth {
    pub(crate) fn header_value(&self) -> Option<String> {
        match self {
            Auth::Anonymous => None,
            Auth::Basic { username, password } => Some(format!(
                "Basic {}",
                BASE64.encode(format!("{username}:{password}"))
            )),
            Auth::Token(token) => Some(token.clone()),
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Anonymous => f.write_str("Anonymous"),
            Auth::Basic { username, .. } => write!(f, "Basic {{ username: {username:?} }}"),
            Auth::Token(_) => f.write_str("Token"),
        }
    }
}

/// Builder for [`RawClient`].
#[derive(Debug)]
pub struct RawClientBuilder {
    repo_url: String,
    auth: Auth,
    user_agent: Option<String>,
    http_client: Option<reqwest::Client>,
    error: Option<TransportError>,
}

impl RawClientBuilder {
    pub(crate) fn new(repo_url: &str) -> Self {
        Self {
            repo_url: repo_url.to_string(),
            auth: Auth::Anonymous,
            user_agent: None,
            http_client: None,
            error: None,
        }
    }

    /// Authenticate with username and password. An empty username is invalid;
    /// an empty password is accepted.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let username = username.into();
        if username.is_empty() {
            self.error = Some(TransportError::EmptyUsername);
            return self;
        }
        if matches!(self.auth, Auth::Token(_)) {
            self.error = Some(TransportError::ConflictingAuth);
            return self;
        }
        self.auth = Auth::Basic {
            username,
            password: password.into(),
        };
        self
    }

    /// Authenticate with a raw token sent verbatim in `Authorization`.
    pub fn token_auth(mut self, token: impl Into<String>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let token = token.into();
        if token.is_empty() {
            self.error = Some(TransportError::EmptyToken);
            return self;
        }
        if matches!(self.auth, Auth::Basic { .. }) {
            self.error = Some(TransportError::ConflictingAuth);
            return self;
        }
        self.auth = Auth::Token(token);
        self
    }

    /// Override the default `nanogit/<version>` user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Inject the HTTP client to use instead of a fresh default; this is how
    /// tests substitute deterministic transports.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> Result<RawClient, TransportError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let base_url = normalize_repo_url(&self.repo_url)?;
        Ok(RawClient {
            base_url,
            auth: self.auth,
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
            http: self.http_client.unwrap_or_default(),
        })
    }
}

pub(crate) fn default_user_agent() -> String {
    format!("nanogit/{}", env!("CARGO_PKG_VERSION"))
}

/// Normalize a repository URL: http/https only, trailing slashes stripped,
/// `.git` appended when missing. A bare root path stays empty rather than
/// becoming `/.git`.
pub(crate) fn normalize_repo_url(raw: &str) -> Result<String, TransportError> {
    if raw.trim().is_empty() {
        return Err(TransportError::InvalidUrl("empty URL".to_string()));
    }
    let url = Url::parse(raw).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(TransportError::UnsupportedScheme(scheme.to_string())),
    }

    let path = url.path().trim_end_matches('/');
    let mut base = format!("{}://{}", url.scheme(), url.authority());
    if !path.is_empty() {
        base.push_str(path);
        if !path.ends_with(".git") {
            base.push_str(".git");
        }
    }
    Ok(base)
}
