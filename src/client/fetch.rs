//! 单次 GET 请求的状态跟踪

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use super::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<T>,
}

impl<T> Default for FetchResult<T> {
    fn default() -> Self {
        Self {
            error: None,
            response: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchData<T> {
    pub status: FetchState,
    pub data: FetchResult<T>,
}

impl<T> Default for FetchData<T> {
    fn default() -> Self {
        Self::with_state(FetchState::Idle)
    }
}

impl<T> FetchData<T> {
    fn with_state(status: FetchState) -> Self {
        Self {
            status,
            data: FetchResult::default(),
        }
    }
}

/// 绑定一个 URL 的请求器；每次 `get` 依次发布 loading 与 success/error
pub struct Fetcher<T> {
    http: reqwest::Client,
    url: String,
    store: Store<FetchData<T>>,
}

impl<T: DeserializeOwned> Fetcher<T> {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            store: Store::default(),
        }
    }

    pub fn store(&self) -> &Store<FetchData<T>> {
        &self.store
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn get(&self) -> Arc<FetchData<T>> {
        self.store.set(FetchData::with_state(FetchState::Loading));

        let next = match self.request().await {
            Ok(response) => FetchData {
                status: FetchState::Success,
                data: FetchResult {
                    error: None,
                    response: Some(response),
                },
            },
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "fetch failed");
                FetchData {
                    status: FetchState::Error,
                    data: FetchResult {
                        error: Some(e.to_string()),
                        response: None,
                    },
                }
            }
        };

        self.store.set(next);
        self.store.get()
    }

    async fn request(&self) -> Result<T, reqwest::Error> {
        self.http.get(&self.url).send().await?.json::<T>().await
    }
}

/// 创建请求器并立即发起一次请求
pub async fn fetch_data<T: DeserializeOwned>(http: reqwest::Client, url: &str) -> Fetcher<T> {
    let fetcher = Fetcher::new(http, url);
    fetcher.get().await;
    fetcher
}

#[cfg(test)]
mod tests {
    use axum::{routing::get, Json, Router};
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Version {
        version: String,
    }

    async fn spawn_server() -> String {
        let router = Router::new()
            .route("/version", get(|| async { Json(json!({ "version": "1.2.3" })) }))
            .route("/broken", get(|| async { "not json" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_initial_state_is_idle() {
        let fetcher: Fetcher<Version> = Fetcher::new(reqwest::Client::new(), "http://unused");
        let state = fetcher.store().get();
        assert_eq!(state.status, FetchState::Idle);
        assert!(state.data.response.is_none());
        assert!(state.data.error.is_none());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let base = spawn_server().await;
        let fetcher: Fetcher<Version> =
            fetch_data(reqwest::Client::new(), &format!("{}/version", base)).await;

        let state = fetcher.store().get();
        assert_eq!(state.status, FetchState::Success);
        assert_eq!(
            state.data.response,
            Some(Version {
                version: "1.2.3".into()
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_error_on_bad_body() {
        let base = spawn_server().await;
        let fetcher: Fetcher<Version> =
            fetch_data(reqwest::Client::new(), &format!("{}/broken", base)).await;

        let state = fetcher.store().get();
        assert_eq!(state.status, FetchState::Error);
        assert!(state.data.error.is_some());
        assert!(state.data.response.is_none());
    }

    #[tokio::test]
    async fn test_refetch_publishes_loading_first() {
        let base = spawn_server().await;
        let fetcher: Fetcher<Version> =
            Fetcher::new(reqwest::Client::new(), format!("{}/version", base));
        let mut rx = fetcher.store().subscribe();

        let state = fetcher.get().await;
        assert_eq!(state.status, FetchState::Success);
        // watch 只保留最新值
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, FetchState::Success);
    }

    #[test]
    fn test_fetch_state_wire_format() {
        let data: FetchData<u8> = FetchData::default();
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({ "status": "idle", "data": {} })
        );
    }
}
