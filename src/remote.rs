//! Client for the hosted backend: the REST table API under `/rest/v1` and the
//! auth API under `/auth/v1`.
//!
//! Every call carries the project's anon key in the `apikey` header and the
//! signed-in user's access token as the bearer, so row-level policies on the
//! hosted side apply on top of the `user_id` filters sent from here.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SupabaseConfig;
use crate::error::AppError;
use crate::models::{AuthUser, Registration, Session};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Equality predicate on a column, sent as `column=eq.value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    column: &'static str,
    value: String,
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    fn query_pair(&self) -> (&'static str, String) {
        (self.column, format!("eq.{}", self.value))
    }
}

pub struct RemoteStore {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

impl RemoteStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: config.url.trim().trim_end_matches('/').to_string(),
            anon_key: config.anon_key.trim().to_string(),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, url: String, token: Option<&str>) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }

    // -----------------------------------------------------------------------
    // tables
    // -----------------------------------------------------------------------

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        token: &str,
        filters: &[Filter],
        order: Option<&str>,
    ) -> Result<Vec<T>, AppError> {
        let mut query = vec![("select", "*".to_string())];
        query.extend(filters.iter().map(Filter::query_pair));
        if let Some(order) = order {
            query.push(("order", order.to_string()));
        }
        let response = self
            .request(reqwest::Method::GET, self.rest_url(table), Some(token))
            .query(&query)
            .send()
            .await?;
        let text = read_success(response).await?;
        serde_json::from_str(&text).map_err(|err| unexpected_body(table, &err))
    }

    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        token: Option<&str>,
        row: &T,
    ) -> Result<Vec<R>, AppError> {
        let response = self
            .request(reqwest::Method::POST, self.rest_url(table), token)
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;
        let text = read_success(response).await?;
        serde_json::from_str(&text).map_err(|err| unexpected_body(table, &err))
    }

    pub async fn update<T: Serialize>(
        &self,
        table: &str,
        token: &str,
        filters: &[Filter],
        patch: &T,
    ) -> Result<(), AppError> {
        let query: Vec<_> = filters.iter().map(Filter::query_pair).collect();
        let response = self
            .request(reqwest::Method::PATCH, self.rest_url(table), Some(token))
            .query(&query)
            .json(patch)
            .send()
            .await?;
        read_success(response).await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, token: &str, filters: &[Filter]) -> Result<(), AppError> {
        let query: Vec<_> = filters.iter().map(Filter::query_pair).collect();
        let response = self
            .request(reqwest::Method::DELETE, self.rest_url(table), Some(token))
            .query(&query)
            .send()
            .await?;
        read_success(response).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // auth
    // -----------------------------------------------------------------------

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Registration, AppError> {
        let response = self
            .request(reqwest::Method::POST, self.auth_url("signup"), None)
            .json(&Credentials { email, password })
            .send()
            .await?;
        let text = read_success(response).await?;
        let parsed: SignUpResponse =
            serde_json::from_str(&text).map_err(|err| unexpected_body("signup", &err))?;
        match parsed {
            SignUpResponse::Session(token) => Ok(Registration {
                user: token.user,
                access_token: Some(token.access_token),
            }),
            SignUpResponse::User(user) => Ok(Registration {
                user,
                access_token: None,
            }),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let response = self
            .request(reqwest::Method::POST, self.auth_url("token"), None)
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await?;
        let text = read_success(response).await?;
        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|err| unexpected_body("token", &err))?;
        Ok(Session {
            token: token.access_token,
            user: token.user,
        })
    }

    pub async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        let response = self
            .request(reqwest::Method::POST, self.auth_url("logout"), Some(token))
            .send()
            .await?;
        read_success(response).await?;
        Ok(())
    }

    /// `None` when the token is expired or unknown to the auth service.
    pub async fn current_user(&self, token: &str) -> Result<Option<AuthUser>, AppError> {
        let response = self
            .request(reqwest::Method::GET, self.auth_url("user"), Some(token))
            .send()
            .await?;
        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Ok(None);
        }
        let text = read_success(response).await?;
        let user = serde_json::from_str(&text).map_err(|err| unexpected_body("user", &err))?;
        Ok(Some(user))
    }
}

async fn read_success(response: reqwest::Response) -> Result<String, AppError> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    if !(200..300).contains(&status) {
        let message = error_message(status, &text);
        tracing::warn!(status, error = %message, "hosted backend rejected request");
        return Err(AppError::Remote(message));
    }
    Ok(text)
}

fn unexpected_body(what: &str, err: &serde_json::Error) -> AppError {
    AppError::Remote(format!("unexpected {what} response: {err}"))
}

/// Pulls the human-readable message out of a table or auth error body.
pub fn error_message(status: u16, body: &str) -> String {
    const KEYS: [&str; 5] = ["message", "msg", "error_description", "error", "hint"];

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in KEYS {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                if !message.trim().is_empty() {
                    return message.to_string();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("request failed with status {status}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[path = "remote_test.rs"]
mod tests;
