//! API client for communicating with the LearnGenix REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! API requests for accounts, exercises, progress and dashboard data.

use std::sync::Arc;

use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::TokenStore;
use crate::config::ApiConfig;
use crate::models::exercise::NextExerciseRequest;
use crate::models::user::ResendConfirmationRequest;
use crate::models::{
    Achievement, AuthResponse, ConfirmationResent, DashboardSummary, Difficulty, Exercise,
    ExerciseUpdate, NewExercise, ProgressSubmission, RegisterRequest, Role, Subject,
    SubmissionResult, SubmitAnswer, Topic, UserIdentity, UserProgress,
};

use super::endpoints;
use super::ApiError;

pub type Result<T> = std::result::Result<T, ApiError>;

/// API client for the LearnGenix backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and the token store is shared.
///
/// The client only reads the token store. Persisting and clearing tokens is
/// the session manager's job.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: ApiConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The token store credentials are read from.
    pub fn tokens(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.tokens)
    }

    /// Current credential, if any. An unreadable store counts as no credential.
    fn bearer_token(&self) -> Option<String> {
        match self.tokens.get() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read token store, sending request without credentials");
                None
            }
        }
    }

    /// Start a request to `path`, attaching the bearer token when one is stored.
    fn authenticated_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.config.url(path);
        debug!(%method, path, "Sending request");

        let request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");

        match self.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Like `authenticated_request`, declaring a JSON payload.
    fn json_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authenticated_request(method, path)
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Check if response is successful, returning the surfaced error if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %ApiError::truncate_body(&body), "Request failed");
        Err(ApiError::from_status(status, &body))
    }

    /// Send the request and decode the success body as `T`.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T> {
        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            warn!(path, error = %e, body = %ApiError::truncate_body(&body), "Malformed response");
            ApiError::InvalidResponse(format!("{} returned unexpected data: {}", path, e))
        })
    }

    /// Send the request and discard the success body.
    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        let response = request.send().await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.json_request(Method::GET, path);
        self.send(request, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.json_request(Method::POST, path).json(body);
        self.send(request, path).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.json_request(Method::PUT, path).json(body);
        self.send(request, path).await
    }

    // ===== Authentication =====

    /// Log in with the OAuth2 password-grant form. The backend takes the
    /// account email in the `username` field.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let request = self.login_request(username, password);
        self.send(request, endpoints::AUTH_LOGIN).await
    }

    /// Login carries only the form credentials, never a stored token.
    fn login_request(&self, username: &str, password: &str) -> RequestBuilder {
        let path = endpoints::AUTH_LOGIN;
        debug!(path, "Sending login request");
        self.client
            .post(self.config.url(path))
            .header(header::ACCEPT, "application/json")
            .form(&[("username", username), ("password", password)])
    }

    /// Create an account and receive a token for it.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<AuthResponse> {
        let body = RegisterRequest {
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
            role,
        };
        self.post(endpoints::AUTH_REGISTER, &body).await
    }

    /// Identity behind the stored token. Fails with `ApiError::Unauthorized`
    /// without touching the network when no token is stored.
    pub async fn current_user(&self) -> Result<UserIdentity> {
        if self.bearer_token().is_none() {
            return Err(ApiError::Unauthorized("Not authenticated".to_string()));
        }
        self.get(endpoints::AUTH_ME).await
    }

    pub async fn resend_confirmation(&self, email: &str) -> Result<ConfirmationResent> {
        self.post(
            endpoints::AUTH_RESEND_CONFIRMATION,
            &ResendConfirmationRequest { email },
        )
        .await
    }

    // ===== Exercises =====

    pub async fn list_exercises(&self, skip: u32, limit: u32) -> Result<Vec<Exercise>> {
        let path = endpoints::EXERCISES;
        let request = self
            .json_request(Method::GET, path)
            .query(&[("skip", skip), ("limit", limit)]);
        self.send(request, path).await
    }

    pub async fn create_exercise(&self, exercise: &NewExercise) -> Result<Exercise> {
        self.post(endpoints::EXERCISES, exercise).await
    }

    pub async fn get_exercise(&self, id: &str) -> Result<Exercise> {
        self.get(&endpoints::exercise(id)).await
    }

    pub async fn update_exercise(&self, id: &str, update: &ExerciseUpdate) -> Result<Exercise> {
        self.put(&endpoints::exercise(id), update).await
    }

    pub async fn delete_exercise(&self, id: &str) -> Result<()> {
        let request = self.json_request(Method::DELETE, &endpoints::exercise(id));
        self.send_empty(request).await
    }

    /// Ask the backend to pick the next exercise for a subject.
    pub async fn next_exercise(&self, subject_id: &str, difficulty: Difficulty) -> Result<Exercise> {
        self.post(
            endpoints::EXERCISES_NEXT,
            &NextExerciseRequest {
                subject_id,
                difficulty,
            },
        )
        .await
    }

    pub async fn submit_exercise(&self, answer: &SubmitAnswer) -> Result<SubmissionResult> {
        self.post(endpoints::EXERCISES_SUBMIT, answer).await
    }

    // ===== Progress =====

    pub async fn progress(&self) -> Result<Vec<UserProgress>> {
        self.get(endpoints::PROGRESS).await
    }

    pub async fn submit_progress(&self, submission: &ProgressSubmission) -> Result<UserProgress> {
        self.post(endpoints::PROGRESS_SUBMIT, submission).await
    }

    // ===== Dashboard =====

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary> {
        self.get(endpoints::DASHBOARD_SUMMARY).await
    }

    pub async fn subjects(&self) -> Result<Vec<Subject>> {
        self.get(endpoints::SUBJECTS).await
    }

    pub async fn subject(&self, id: &str) -> Result<Subject> {
        self.get(&endpoints::subject(id)).await
    }

    pub async fn topics(&self) -> Result<Vec<Topic>> {
        self.get(endpoints::TOPICS).await
    }

    pub async fn topic(&self, id: &str) -> Result<Topic> {
        self.get(&endpoints::topic(id)).await
    }

    pub async fn achievements(&self) -> Result<Vec<Achievement>> {
        self.get(endpoints::ACHIEVEMENTS).await
    }
}
