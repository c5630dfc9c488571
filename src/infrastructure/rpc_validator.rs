// RPC响应校验模块 - 防止节点返回的异常数据污染状态

use serde_json::Value;

use crate::infrastructure::rpc_client::RpcError;

/// 解析十六进制数量（`eth_blockNumber`、`net_peerCount`、`eth_chainId` 等）
pub fn parse_hex_quantity(value: &str) -> Result<u64, RpcError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| RpcError::InvalidResponse(format!("quantity without 0x prefix: {}", value)))?;

    // u64 最多16个十六进制字符
    if digits.is_empty() || digits.len() > 16 {
        return Err(RpcError::InvalidResponse(format!(
            "invalid hex quantity length: {}",
            value
        )));
    }

    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("invalid hex quantity {}: {}", value, e)))
}

/// 从 JSON 值中解析十六进制数量
pub fn quantity_from_value(value: &Value) -> Result<u64, RpcError> {
    match value {
        Value::String(s) => parse_hex_quantity(s),
        other => Err(RpcError::InvalidResponse(format!(
            "expected hex string, got {}",
            other
        ))),
    }
}

/// 验证地址格式，返回小写形式
pub fn validate_address(address: &str) -> Result<String, RpcError> {
    let addr = address.trim_start_matches("0x");

    if addr.len() != 40 {
        return Err(RpcError::InvalidResponse(format!(
            "invalid address length: expected 40, got {}",
            addr.len()
        )));
    }

    if !addr.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RpcError::InvalidResponse(
            "invalid address format: contains non-hex characters".to_string(),
        ));
    }

    Ok(format!("0x{}", addr.to_lowercase()))
}

/// 验证RPC响应格式
pub fn validate_rpc_response(json: &Value) -> Result<(), RpcError> {
    if let Some(error) = json.get("error") {
        let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        return Err(RpcError::JsonRpc { code, message });
    }

    if json.get("result").is_none() {
        return Err(RpcError::InvalidResponse(
            "Missing result field in RPC response".to_string(),
        ));
    }

    if let Some(version) = json.get("jsonrpc") {
        if version.as_str() != Some("2.0") {
            return Err(RpcError::InvalidResponse(format!(
                "Unsupported JSON-RPC version: {}",
                version
            )));
        }
    }

    Ok(())
}
