//! The external identity provider collaborator.
//!
//! The OAuth handshake itself is opaque to the rest of the application: the
//! only operation is exchanging an authorization code for an external
//! identity. Everything the provider returns is untrusted input and is
//! validated before it reaches the user store.

use std::str::FromStr;

use async_trait::async_trait;
use email_address::EmailAddress;
use serde::Deserialize;

use crate::Error;

/// The domain used when synthesizing a placeholder email for identities
/// without one. Downstream uniqueness constraints depend on this exact rule.
const NOREPLY_EMAIL_DOMAIN: &str = "users.noreply.github.com";

/// The identity returned by the provider after a successful code exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalIdentity {
    /// The provider's identifier for the account. Never empty.
    pub id: String,
    /// The account's login handle, e.g. a GitHub username.
    pub login: String,
    /// The account's display name, if set.
    pub name: Option<String>,
    /// The account's email, if the provider shared one.
    pub email: Option<String>,
    /// A URL to the account's avatar image, if set.
    pub avatar_url: Option<String>,
}

impl ExternalIdentity {
    /// The display name to store: the account name, falling back to the
    /// login handle.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.login.clone())
    }

    /// The email to store, synthesizing `<login>@users.noreply.github.com`
    /// when the provider supplied none.
    ///
    /// # Errors
    /// Returns [Error::IdentityProvider] if the provider-supplied email (or
    /// the synthesized fallback for an unusable login) is not a valid
    /// address.
    pub fn resolved_email(&self) -> Result<EmailAddress, Error> {
        let raw = match &self.email {
            Some(email) => email.clone(),
            None => format!("{}@{NOREPLY_EMAIL_DOMAIN}", self.login),
        };

        EmailAddress::from_str(&raw)
            .map_err(|error| Error::IdentityProvider(format!("invalid email {raw}: {error}")))
    }
}

/// Exchanges an OAuth authorization code for an external identity.
///
/// Implementations talk to the real provider; tests substitute a stub.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange `code` for the identity it was granted to.
    ///
    /// # Errors
    /// Returns [Error::IdentityProvider] if the exchange is rejected or the
    /// provider's response is unusable.
    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, Error>;
}

const ACCESS_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";
const USER_EMAILS_URL: &str = "https://api.github.com/user/emails";

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
}

/// The live identity provider: GitHub's OAuth token and user endpoints.
#[derive(Clone, Debug)]
pub struct GithubIdentityProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl GithubIdentityProvider {
    /// Create a provider using the OAuth app credentials `client_id` and
    /// `client_secret`.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
        }
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, Error> {
        let response = self
            .client
            .post(ACCESS_TOKEN_URL)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
            }))
            .send()
            .await
            .map_err(|error| Error::IdentityProvider(format!("token exchange failed: {error}")))?;

        let token_response: AccessTokenResponse = response
            .json()
            .await
            .map_err(|error| Error::IdentityProvider(format!("invalid token response: {error}")))?;

        if let Some(error) = token_response.error {
            let description = token_response.error_description.unwrap_or(error);
            return Err(Error::IdentityProvider(format!(
                "token exchange rejected: {description}"
            )));
        }

        token_response
            .access_token
            .ok_or_else(|| Error::IdentityProvider("no access token in response".to_owned()))
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GithubUser, Error> {
        self.client
            .get(USER_URL)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .header(reqwest::header::USER_AGENT, "centavo")
            .send()
            .await
            .map_err(|error| Error::IdentityProvider(format!("user fetch failed: {error}")))?
            .json()
            .await
            .map_err(|error| Error::IdentityProvider(format!("invalid user response: {error}")))
    }

    /// The primary email is preferred; any email beats none. A failure here
    /// is not fatal since the caller can fall back to a synthetic address.
    async fn fetch_email(&self, access_token: &str) -> Option<String> {
        let response = self
            .client
            .get(USER_EMAILS_URL)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .header(reqwest::header::USER_AGENT, "centavo")
            .send()
            .await;

        let emails: Vec<GithubEmail> = match response {
            Ok(response) => response.json().await.unwrap_or_default(),
            Err(error) => {
                tracing::debug!("could not fetch provider emails: {error}");
                return None;
            }
        };

        emails
            .iter()
            .find(|email| email.primary)
            .or_else(|| emails.first())
            .map(|email| email.email.clone())
    }
}

#[async_trait]
impl IdentityProvider for GithubIdentityProvider {
    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, Error> {
        let access_token = self.fetch_access_token(code).await?;
        let user = self.fetch_user(&access_token).await?;

        if user.id == 0 {
            return Err(Error::IdentityProvider(
                "provider returned an empty user id".to_owned(),
            ));
        }

        let email = match user.email {
            Some(email) => Some(email),
            None => self.fetch_email(&access_token).await,
        };

        Ok(ExternalIdentity {
            id: user.id.to_string(),
            login: user.login,
            name: user.name,
            email,
            avatar_url: user.avatar_url,
        })
    }
}

#[cfg(test)]
mod identity_tests {
    use super::ExternalIdentity;

    fn identity(email: Option<&str>) -> ExternalIdentity {
        ExternalIdentity {
            id: "12345".to_owned(),
            login: "octocat".to_owned(),
            name: Some("The Octocat".to_owned()),
            email: email.map(str::to_owned),
            avatar_url: None,
        }
    }

    #[test]
    fn provider_email_is_used_when_present() {
        let email = identity(Some("octocat@example.com"))
            .resolved_email()
            .unwrap();

        assert_eq!(email.as_str(), "octocat@example.com");
    }

    #[test]
    fn missing_email_synthesizes_noreply_fallback() {
        let email = identity(None).resolved_email().unwrap();

        assert_eq!(email.as_str(), "octocat@users.noreply.github.com");
    }

    #[test]
    fn invalid_provider_email_is_rejected() {
        assert!(identity(Some("not-an-email")).resolved_email().is_err());
    }

    #[test]
    fn display_name_falls_back_to_login() {
        let mut identity = identity(None);
        assert_eq!(identity.display_name(), "The Octocat");

        identity.name = None;
        assert_eq!(identity.display_name(), "octocat");
    }
}
