//! In-process fake of the LearnGenix backend.
//!
//! Each test builds an axum `Router` with just the routes it needs, serves
//! it on an ephemeral local port and points a real `ApiClient` at it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{header, HeaderMap, Method, Uri};
use axum::Router;
use learngenix_core::{ApiClient, ApiConfig, MemoryTokenStore, SessionManager};

/// Prefix every route is mounted under, like the real backend.
pub const API_PREFIX: &str = "/api/v1";

/// A request as the fake backend saw it.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

/// Shared log of requests, cloned into handlers.
#[derive(Clone, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: &str) {
        let header_str = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(Recorded {
            method: method.clone(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            authorization: header_str(header::AUTHORIZATION),
            content_type: header_str(header::CONTENT_TYPE),
            body: body.to_string(),
        });
    }

    pub fn all(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.all().pop().expect("no request was recorded")
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Full route path for an endpoint path.
pub fn route(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

/// Serve `router` on 127.0.0.1 and return the API base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test backend failed");
    });
    format!("http://{}{}", addr, API_PREFIX)
}

/// Client for `base_url` sharing `store`.
#[allow(dead_code)]
pub fn client(base_url: &str, store: Arc<MemoryTokenStore>) -> ApiClient {
    let config = ApiConfig::new(base_url).with_timeout(Duration::from_secs(5));
    ApiClient::new(config, store).expect("Failed to build client")
}

/// Session manager for `base_url` along with its token store.
#[allow(dead_code)]
pub fn session(base_url: &str, store: MemoryTokenStore) -> (SessionManager, Arc<MemoryTokenStore>) {
    let store = Arc::new(store);
    let api = client(base_url, store.clone());
    (SessionManager::new(api), store)
}

#[allow(dead_code)]
pub fn ana_json() -> serde_json::Value {
    serde_json::json!({
        "id": "1",
        "name": "Ana",
        "email": "ana@x.com",
        "role": "student"
    })
}

#[allow(dead_code)]
pub fn bob_json() -> serde_json::Value {
    serde_json::json!({
        "id": "2",
        "name": "Bob",
        "email": "b@x.com",
        "role": "teacher"
    })
}
