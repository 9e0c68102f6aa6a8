// Looker API client implementation
use crate::application::looker_api::LookerApi;
use crate::domain::dashboard::Dashboard;
use crate::domain::query::{
    Query, QueryTask, QueryTaskOptions, User, WriteCreateQueryTask, WriteQuery,
};
use crate::infrastructure::config::LookerConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;

/// Log in again when the token has less than this left
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum LookerApiError {
    #[error("API request {method} {path} was rejected with status {status}: {body}")]
    Unauthorized {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("API request {method} {path} failed with status {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Failed to send API request {method} {path}")]
    Request {
        method: String,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse API response for {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LookerApiError {
    fn from_status(
        method: &Method,
        path: &str,
        status: StatusCode,
        body: String,
        login: bool,
    ) -> Self {
        let method = method.to_string();
        let path = path.to_string();
        let status_code = status.as_u16();

        // The login endpoint answers unknown credentials with 404
        let rejected = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            || (login && status == StatusCode::NOT_FOUND);

        if rejected {
            Self::Unauthorized {
                method,
                path,
                status: status_code,
                body,
            }
        } else {
            Self::Status {
                method,
                path,
                status: status_code,
                body,
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > ChronoDuration::seconds(TOKEN_EXPIRY_MARGIN_SECS)
    }
}

pub struct LookerClient {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
}

impl LookerClient {
    pub fn new(config: &LookerConfig) -> Result<Self> {
        if !config.verify_ssl {
            tracing::warn!("TLS certificate verification is disabled for {}", config.base_url);
        }

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_base: api_base(&config.base_url, &config.api_version),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if current.is_fresh(Utc::now()) {
                return Ok(current.value.clone());
            }
            tracing::debug!("Access token expires at {}, logging in again", current.expires_at);
        }

        let fresh = self.login().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn login(&self) -> Result<AccessToken> {
        let path = "/login";
        let response = self
            .http
            .post(self.url(path))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|source| LookerApiError::Request {
                method: Method::POST.to_string(),
                path: path.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(
                LookerApiError::from_status(&Method::POST, path, status, body, true).into(),
            );
        }

        let login: LoginResponse = decode(path, response).await?;
        tracing::debug!("Logged in, token valid for {}s", login.expires_in);

        Ok(AccessToken {
            value: login.access_token,
            expires_at: Utc::now() + ChronoDuration::seconds(login.expires_in),
        })
    }

    /// Send an authenticated request and return the successful response
    async fn send(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<reqwest::Response> {
        let token = self.access_token().await?;
        let request = self
            .http
            .request(method.clone(), self.url(path))
            .header("Authorization", format!("token {}", token))
            .header("Accept", "application/json");

        tracing::debug!("{} {}", method, path);
        let response = build(request)
            .send()
            .await
            .map_err(|source| LookerApiError::Request {
                method: method.to_string(),
                path: path.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LookerApiError::from_status(&method, path, status, body, false).into());
        }

        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, |r| r).await?;
        decode(path, response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, path, |r| r.json(body)).await?;
        decode(path, response).await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
    let text = response.text().await.map_err(|source| LookerApiError::Request {
        method: "read".to_string(),
        path: path.to_string(),
        source,
    })?;

    Ok(serde_json::from_str(&text).map_err(|source| LookerApiError::Decode {
        path: path.to_string(),
        source,
    })?)
}

fn api_base(base_url: &str, api_version: &str) -> String {
    format!("{}/api/{}", base_url.trim_end_matches('/'), api_version)
}

fn id_path(prefix: &str, id: &str) -> String {
    format!("{}/{}", prefix, urlencoding::encode(id))
}

fn query_task_path(options: QueryTaskOptions) -> String {
    format!(
        "/query_tasks?cache={}&force_production={}",
        options.cache, options.force_production
    )
}

/// 204 or an empty body means the results are not ready yet
fn parse_task_results(path: &str, status: StatusCode, text: &str) -> Result<serde_json::Value> {
    if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_str(text).map_err(|source| LookerApiError::Decode {
        path: path.to_string(),
        source,
    })?)
}

#[async_trait]
impl LookerApi for LookerClient {
    async fn me(&self) -> Result<User> {
        self.get("/user").await
    }

    async fn dashboard(&self, dashboard_id: &str) -> Result<Dashboard> {
        self.get(&id_path("/dashboards", dashboard_id)).await
    }

    async fn query(&self, query_id: &str) -> Result<Query> {
        self.get(&id_path("/queries", query_id)).await
    }

    async fn create_query(&self, body: &WriteQuery) -> Result<Query> {
        self.post("/queries", body).await
    }

    async fn create_query_task(
        &self,
        body: &WriteCreateQueryTask,
        options: QueryTaskOptions,
    ) -> Result<QueryTask> {
        self.post(&query_task_path(options), body).await
    }

    async fn query_task(&self, task_id: &str) -> Result<QueryTask> {
        self.get(&id_path("/query_tasks", task_id)).await
    }

    async fn query_task_results(&self, task_id: &str) -> Result<serde_json::Value> {
        let path = format!("{}/results", id_path("/query_tasks", task_id));
        let response = self.send(Method::GET, &path, |r| r).await?;
        let status = response.status();
        let text = response.text().await.map_err(|source| LookerApiError::Request {
            method: Method::GET.to_string(),
            path: path.clone(),
            source,
        })?;
        parse_task_results(&path, status, &text)
    }
}
