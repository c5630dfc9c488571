//! 登录会话

use std::sync::Arc;

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use super::{
    storage::{LocalStorage, StoreError},
    store::Store,
};

/// 会话 token 的存储键
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginState {
    pub logged_in: bool,
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    #[serde(rename = "ID", default)]
    id: Option<Value>,
    #[serde(default)]
    sub: Option<String>,
}

pub struct LoginStore {
    storage: Arc<dyn LocalStorage>,
    store: Store<LoginState>,
}

impl LoginStore {
    /// 从本地存储恢复会话
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        let token = storage.get_item(TOKEN_KEY).unwrap_or_default();
        let store = Store::new(LoginState {
            logged_in: !token.is_empty(),
            token,
        });
        Self { storage, store }
    }

    pub fn get(&self) -> Arc<LoginState> {
        self.store.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<LoginState>> {
        self.store.subscribe()
    }

    pub fn login(&self, token: impl Into<String>) -> Result<(), StoreError> {
        let token = token.into();
        self.storage.set_item(TOKEN_KEY, &token)?;
        self.store.set(LoginState {
            logged_in: true,
            token,
        });
        Ok(())
    }

    pub fn logout(&self) -> Result<(), StoreError> {
        self.storage.remove_item(TOKEN_KEY)?;
        self.store.set(LoginState {
            logged_in: false,
            token: String::new(),
        });
        Ok(())
    }

    /// 当前用户 id（JWT 载荷中的 `ID`，没有则取 `sub`）；未登录时为 `None`
    pub fn user_id(&self) -> Result<Option<String>, StoreError> {
        let state = self.store.get();
        if !state.logged_in {
            return Ok(None);
        }
        user_id_from_token(&state.token)
    }
}

/// 解析 JWT 载荷；签名由后端校验，这里不验证
pub fn user_id_from_token(token: &str) -> Result<Option<String>, StoreError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let claims = decode::<SessionClaims>(token, &DecodingKey::from_secret(&[]), &validation)?.claims;

    let id = match claims.id {
        Some(Value::String(id)) if !id.is_empty() => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => claims.sub.filter(|sub| !sub.is_empty()),
    };
    Ok(id)
}
