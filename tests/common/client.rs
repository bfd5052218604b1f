//! HTTP client for end-to-end tests
//!
//! This module wraps reqwest and provides methods for all podcast-server
//! endpoints. When API routes or request formats change, update only this file.
#![allow(dead_code)]

use super::constants::*;
use reqwest::{
    multipart::{Form, Part},
    Response, StatusCode,
};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client holding an optional bearer token
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when set
    pub token: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client logged in as the regular test user, registering it first
    ///
    /// # Panics
    ///
    /// Panics if signup or login fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER_NAME, TEST_USER_EMAIL, TEST_USER_PASS).await
    }

    /// Creates a client logged in as the second test user
    pub async fn authenticated_other(base_url: String) -> Self {
        Self::authenticated_as(base_url, OTHER_USER_NAME, OTHER_USER_EMAIL, OTHER_USER_PASS).await
    }

    pub async fn authenticated_as(
        base_url: String,
        name: &str,
        email: &str,
        password: &str,
    ) -> Self {
        let mut client = Self::new(base_url);

        let response = client.signup(name, email, password).await;
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "Test user signup failed: {:?}",
            response.text().await
        );

        let response = client.login(email, password).await;
        assert_eq!(response.status(), StatusCode::OK, "Test user login failed");
        let body: Value = response.json().await.expect("Login response is not JSON");
        let token = body["token"]
            .as_str()
            .expect("Login response has no token")
            .to_string();
        client.token = Some(token);

        client
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /api/auth/signup
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Response {
        self.client
            .post(self.url("/api/auth/signup"))
            .json(&json!({
                "name": name,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Signup request failed")
    }

    /// POST /api/auth/login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    // ========================================================================
    // Podcast Endpoints
    // ========================================================================

    /// GET /api/podcasts
    pub async fn list_podcasts(&self) -> Response {
        self.client
            .get(self.url("/api/podcasts"))
            .send()
            .await
            .expect("List podcasts request failed")
    }

    /// GET /api/podcasts?q=<term>
    pub async fn search_podcasts(&self, term: &str) -> Response {
        self.client
            .get(self.url("/api/podcasts"))
            .query(&[("q", term)])
            .send()
            .await
            .expect("Search podcasts request failed")
    }

    /// POST /api/podcasts/upload
    pub async fn upload_podcast(
        &self,
        title: &str,
        description: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Response {
        let media = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .expect("Invalid content type");
        let form = Form::new()
            .text("title", title.to_string())
            .text("description", description.to_string())
            .part("media", media);
        self.upload_form(form).await
    }

    /// POST /api/podcasts/upload with an arbitrary form
    ///
    /// File names are sent verbatim, without percent-encoding.
    pub async fn upload_form(&self, form: Form) -> Response {
        self.authorize(self.client.post(self.url("/api/podcasts/upload")))
            .multipart(form.percent_encode_noop())
            .send()
            .await
            .expect("Upload request failed")
    }

    /// Uploads a podcast and returns its JSON representation
    ///
    /// # Panics
    ///
    /// Panics if the upload is not accepted.
    pub async fn upload_sample(&self, title: &str, bytes: Vec<u8>) -> Value {
        let response = self
            .upload_podcast(title, "description", "episode.mp3", "audio/mpeg", bytes)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "Upload failed");
        response.json().await.expect("Upload response is not JSON")
    }

    /// DELETE /api/podcasts/{id}
    pub async fn delete_podcast(&self, id: &str) -> Response {
        self.authorize(self.client.delete(self.url(&format!("/api/podcasts/{}", id))))
            .send()
            .await
            .expect("Delete podcast request failed")
    }

    /// GET /uploads/{media}
    pub async fn get_media(&self, media: &str) -> Response {
        self.client
            .get(self.url(&format!("/uploads/{}", media)))
            .send()
            .await
            .expect("Media request failed")
    }

    // ========================================================================
    // Favourites Endpoints
    // ========================================================================

    /// GET /api/favourites
    pub async fn get_favourites(&self) -> Response {
        self.authorize(self.client.get(self.url("/api/favourites")))
            .send()
            .await
            .expect("Get favourites request failed")
    }

    /// POST /api/favourites/{podcast_id}
    pub async fn add_favourite(&self, podcast_id: &str) -> Response {
        self.authorize(
            self.client
                .post(self.url(&format!("/api/favourites/{}", podcast_id))),
        )
        .send()
        .await
        .expect("Add favourite request failed")
    }

    /// DELETE /api/favourites/{podcast_id}
    pub async fn remove_favourite(&self, podcast_id: &str) -> Response {
        self.authorize(
            self.client
                .delete(self.url(&format!("/api/favourites/{}", podcast_id))),
        )
        .send()
        .await
        .expect("Remove favourite request failed")
    }

    /// Ids of the favourites, in the order the server returns them
    pub async fn favourite_ids(&self) -> Vec<String> {
        let response = self.get_favourites().await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Vec<Value> = response.json().await.expect("Favourites are not JSON");
        body.iter()
            .map(|p| p["id"].as_str().expect("Podcast without id").to_string())
            .collect()
    }
}
