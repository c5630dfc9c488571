//! 端点查询
//!
//! 出错时错误放在 `QueryResponse::error` 中返回；`throw_err` 为真时改为返回 `Err`。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::{
    domain::endpoint::{Endpoint, ENDPOINT_TABLE},
    infrastructure::document_db::{DocumentDb, DocumentDbError},
};

/// 记录 id：`endpoint:xxx` 或裸 `xxx`
static RECORD_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*:)?[A-Za-z0-9_\-]+$").expect("valid record id pattern")
});

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to get endpoint; {0}")]
    GetEndpoint(String),
    #[error("failed to get endpoints")]
    GetEndpoints,
    #[error("endpoint not found; {0}")]
    NotFound(String),
    #[error("invalid endpoint id; {0}")]
    InvalidId(String),
    #[error(transparent)]
    Db(#[from] DocumentDbError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams {
    pub throw_err: bool,
}

impl QueryParams {
    pub fn throwing() -> Self {
        Self { throw_err: true }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse<T> {
    pub loading: bool,
    pub result: T,
    pub error: Option<String>,
}

fn finish<T>(
    outcome: Result<T, QueryError>,
    empty: T,
    params: QueryParams,
) -> Result<QueryResponse<T>, QueryError> {
    match outcome {
        Ok(result) => Ok(QueryResponse {
            loading: false,
            result,
            error: None,
        }),
        Err(e) if params.throw_err => Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "endpoint query failed");
            Ok(QueryResponse {
                loading: false,
                result: empty,
                error: Some(e.to_string()),
            })
        }
    }
}

/// 按 id 查询单个端点
pub async fn get_endpoint(
    db: &DocumentDb,
    endpoint_id: &str,
    params: QueryParams,
) -> Result<QueryResponse<Option<Endpoint>>, QueryError> {
    let outcome = async {
        if !RECORD_ID.is_match(endpoint_id) {
            return Err(QueryError::InvalidId(endpoint_id.to_string()));
        }
        let sql = format!("SELECT * FROM {} WHERE id={};", ENDPOINT_TABLE, endpoint_id);
        let response = db.query_one::<Vec<Endpoint>>(&sql, &[]).await?;
        if !response.is_ok() {
            return Err(QueryError::GetEndpoint(endpoint_id.to_string()));
        }
        response
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(Some)
            .ok_or_else(|| QueryError::NotFound(endpoint_id.to_string()))
    }
    .await;

    finish(outcome, None, params)
}

/// 查询全部端点
pub async fn get_endpoints(
    db: &DocumentDb,
    params: QueryParams,
) -> Result<QueryResponse<Vec<Endpoint>>, QueryError> {
    let outcome = async {
        let response = db
            .query_one::<Vec<Endpoint>>("SELECT * FROM type::table($tb);", &[("tb", ENDPOINT_TABLE)])
            .await?;
        if !response.is_ok() {
            return Err(QueryError::GetEndpoints);
        }
        Ok(response.result.unwrap_or_default())
    }
    .await;

    finish(outcome, Vec::new(), params)
}
