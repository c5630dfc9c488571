//! 网络常量模块
//!
//! chain id → 网络名称注册表、受支持网络与节点类型

use std::{collections::HashMap, fmt};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// 已知网络
///
/// 来源：各链官方文档（Besu NetworkID/ChainID 表、BSC、Polygon 等）
static NETWORK_REGISTRY: Lazy<HashMap<u64, &'static str>> = Lazy::new(|| {
    let networks: [(u64, &'static str); 11] = [
        // Eth networks
        (1, "Mainnet"),
        (3, "Ropsten"),
        (4, "Rinkeby"),
        (5, "Goerli"),
        (2018, "Dev"),
        // Binance Smart Chain
        (56, "Binance Smart Chain"),
        (97, "BSC - testnet"),
        (137, "Polygon"),
        (43114, "Avalanche"),
        (250, "Fantom"),
        (1666600000, "Harmony"),
    ];
    networks.into_iter().collect()
});

/// 按 chain id 查找网络名称
pub fn network_name(chain_id: u64) -> Option<&'static str> {
    NETWORK_REGISTRY.get(&chain_id).copied()
}

/// 所有已知网络，按 chain id 排序
pub fn known_networks() -> Vec<(u64, &'static str)> {
    let mut all: Vec<_> = NETWORK_REGISTRY.iter().map(|(id, n)| (*id, *n)).collect();
    all.sort_unstable_by_key(|(id, _)| *id);
    all
}

/// 仪表盘直接支持的网络
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkId {
    Mainnet = 1,
    BinanceSmartChain = 56,
    Polygon = 137,
}

impl NetworkId {
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(Self::Mainnet),
            56 => Some(Self::BinanceSmartChain),
            137 => Some(Self::Polygon),
            _ => None,
        }
    }

    pub fn is_supported(chain_id: u64) -> bool {
        Self::from_chain_id(chain_id).is_some()
    }

    pub fn chain_id(self) -> u64 {
        self as u64
    }
}

/// 节点 `eth_chainId` 解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub chain_id: u64,
    /// 未登记的 chain id 为 "unknown"
    pub name: String,
}

impl NetworkInfo {
    pub fn from_chain_id(chain_id: u64) -> Self {
        Self {
            chain_id,
            name: network_name(chain_id).unwrap_or("unknown").to_string(),
        }
    }
}

/// 节点类型（序列化为整数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum NodeType {
    GethNodeInProcess = 1,
    GethNode = 2,
    RemoteNode = 3,
}

impl TryFrom<i32> for NodeType {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::GethNodeInProcess),
            2 => Ok(Self::GethNode),
            3 => Ok(Self::RemoteNode),
            other => Err(format!("unknown node type: {}", other)),
        }
    }
}

impl From<NodeType> for i32 {
    fn from(value: NodeType) -> Self {
        value as i32
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GethNodeInProcess => "GethNodeInProcess",
            Self::GethNode => "GethNode",
            Self::RemoteNode => "RemoteNode",
        };
        f.write_str(name)
    }
}
