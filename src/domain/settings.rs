//! 全局设置模型

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::network::NodeType;

/// 进程内 geth 节点支持的版本
pub const SUPPORTED_GETH_VERSION: &str = "1.10.17";

/// 单个节点类型的支持信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeSetting {
    pub node_type: NodeType,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSettings {
    pub supported_nodes: Vec<NodeTypeSetting>,
    #[serde(rename = "defaultNodeID")]
    pub default_node_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub node_settings: NodeSettings,
}

impl Setting {
    /// 首次启动写入的默认设置
    pub fn seeded(default_node_id: Uuid) -> Self {
        Self {
            node_settings: NodeSettings {
                supported_nodes: vec![
                    NodeTypeSetting {
                        node_type: NodeType::GethNodeInProcess,
                        version: SUPPORTED_GETH_VERSION.to_string(),
                    },
                    NodeTypeSetting {
                        node_type: NodeType::RemoteNode,
                        version: String::new(),
                    },
                ],
                default_node_id,
            },
        }
    }

    /// 默认节点 id；nil 表示未设置
    pub fn default_node_id(&self) -> Option<Uuid> {
        Some(self.node_settings.default_node_id).filter(|id| !id.is_nil())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_wire_format() {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(Setting::seeded(id)).unwrap();
        assert_eq!(value["nodeSettings"]["defaultNodeID"], id.to_string());
        assert_eq!(value["nodeSettings"]["supportedNodes"][0]["nodeType"], 1);
        assert_eq!(value["nodeSettings"]["supportedNodes"][1]["nodeType"], 3);
        assert_eq!(value["nodeSettings"]["supportedNodes"][1]["version"], "");
    }

    #[test]
    fn test_default_node_id_nil() {
        assert_eq!(Setting::seeded(Uuid::nil()).default_node_id(), None);
    }
}
