//! 字符串工具模块
//! 提供字符串处理相关的工具函数

/// 从客户端版本串中提取版本号
///
/// `web3_clientVersion` 通常形如 `Geth/v1.10.9-omnibus-e03773e6/linux-amd64/go1.17.2`，
/// 返回第二个 `/` 分段；没有第二个分段时原样返回。
pub fn get_version(client_version: &str) -> String {
    match client_version.split('/').nth(1) {
        Some(version) if !version.is_empty() => version.to_string(),
        _ => client_version.to_string(),
    }
}
