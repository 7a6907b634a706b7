//! REST client for accounts, the user directory and group rosters.
//!
//! Authenticated requests carry the bearer token and the CSRF token as
//! headers, read from a [`CredentialProvider`] per request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    conversation::{Group, User},
    credentials::{CredentialProvider, Credentials},
};

/// Default base URL of the chat server's REST surface.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8008";

/// Header carrying the CSRF token.
const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// REST client configuration.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string() }
    }
}

/// REST errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No complete token pair available.
    #[error("authentication tokens are missing")]
    AuthMissing,

    /// Request failed before a response arrived, or the body did not decode.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Configured base URL cannot address a request path.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// URL that failed to parse.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// Server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
    csrf_token: String,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct CreateGroupRequest<'a> {
    group_name: &'a str,
    admin_username: &'a str,
}

/// REST client.
#[derive(Clone)]
pub struct DirectoryClient<P> {
    http: reqwest::Client,
    config: DirectoryConfig,
    credentials: P,
}

impl<P: CredentialProvider> DirectoryClient<P> {
    /// Create a client reading tokens from `credentials`.
    pub fn new(config: DirectoryConfig, credentials: P) -> Self {
        Self { http: reqwest::Client::new(), config, credentials }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// `/group/{name}/members` with `name` escaped as a single path segment.
    fn members_url(&self, group: &Group) -> Result<reqwest::Url, DirectoryError> {
        let base = self.url("/");
        let invalid = |reason: String| DirectoryError::InvalidUrl { url: base.clone(), reason };

        let mut url = reqwest::Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["group", group.name.as_str(), "members"]);
        Ok(url)
    }

    /// Exchange a username and password for a token pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credentials, DirectoryError> {
        let response = self
            .http
            .post(self.url("/login/"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let tokens: LoginResponse = check(response).await?.json().await?;
        tracing::info!(%username, "logged in");
        Ok(Credentials::new(tokens.access_token, tokens.csrf_token))
    }

    /// Create an account.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, DirectoryError> {
        let response = self
            .http
            .post(self.url("/register/"))
            .json(&RegisterRequest { username, email, password })
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// All known users.
    pub async fn users(&self) -> Result<Vec<User>, DirectoryError> {
        self.get_json(self.url("/users/")).await
    }

    /// All groups.
    pub async fn groups(&self) -> Result<Vec<Group>, DirectoryError> {
        self.get_json(self.url("/groups/")).await
    }

    /// Members of `group`.
    pub async fn group_members(&self, group: &Group) -> Result<Vec<User>, DirectoryError> {
        self.get_json(self.members_url(group)?).await
    }

    /// Create a group administered by `admin_username`.
    pub async fn create_group(
        &self,
        name: &str,
        admin_username: &str,
    ) -> Result<Group, DirectoryError> {
        let credentials = self.credentials.credentials().ok_or(DirectoryError::AuthMissing)?;
        let response = self
            .http
            .post(self.url("/group_create/"))
            .bearer_auth(&credentials.access_token)
            .header(CSRF_HEADER, &credentials.csrf_token)
            .json(&CreateGroupRequest { group_name: name, admin_username })
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    async fn get_json<T, U>(&self, url: U) -> Result<T, DirectoryError>
    where
        T: for<'de> Deserialize<'de>,
        U: reqwest::IntoUrl,
    {
        let credentials = self.credentials.credentials().ok_or(DirectoryError::AuthMissing)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&credentials.access_token)
            .header(CSRF_HEADER, &credentials.csrf_token)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }
}

/// Turn a non-success status into [`DirectoryError::Status`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, DirectoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DirectoryError::Status { status: status.as_u16(), body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let client = DirectoryClient::new(
            DirectoryConfig { base_url: "http://chat.local/".to_string() },
            Credentials::new("a", "c"),
        );
        assert_eq!(client.url("/users/"), "http://chat.local/users/");
    }

    #[test]
    fn members_url_escapes_group_name() {
        let client = DirectoryClient::new(
            DirectoryConfig { base_url: "http://chat.local/api/".to_string() },
            Credentials::new("a", "c"),
        );

        let plain = client.members_url(&Group::new(1, "crabs")).unwrap();
        assert_eq!(plain.as_str(), "http://chat.local/api/group/crabs/members");

        for name in ["lobby#1", "q?x=1", "a/b"] {
            let url = client.members_url(&Group::new(2, name)).unwrap();
            let segments: Vec<_> = url.path_segments().unwrap().collect();

            assert_eq!(segments.len(), 4, "{url}");
            assert_eq!(segments[0], "api");
            assert_eq!(segments[3], "members");
            assert!(url.query().is_none(), "{url}");
            assert!(url.fragment().is_none(), "{url}");
        }
    }

    #[test]
    fn default_base_url_points_at_local_server() {
        assert_eq!(DirectoryConfig::default().base_url, "http://localhost:8008");
    }
}
