//! 命令行节点探测：对给定 RPC 地址执行一次完整刷新并输出 JSON
//!
//! 用法：`node_status <rpc-url> [--name <name>] [--timeout <secs>] [--coinbase]`

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use zeth::{
    domain::{Node, NodeRecord, Rpc},
    infrastructure::HttpRpcClient,
};

struct Args {
    rpc_url: String,
    name: String,
    timeout: Duration,
    coinbase: bool,
}

fn parse_args() -> Result<Args> {
    let mut rpc_url = None;
    let mut name = "node-status".to_string();
    let mut timeout = Duration::from_secs(10);
    let mut coinbase = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--name" => {
                name = args.next().context("--name requires a value")?;
            }
            "--timeout" => {
                let secs: u64 = args
                    .next()
                    .context("--timeout requires a value")?
                    .parse()
                    .context("--timeout must be an integer number of seconds")?;
                timeout = Duration::from_secs(secs.max(1));
            }
            "--coinbase" => coinbase = true,
            other if other.starts_with("--") => bail!("unknown flag: {}", other),
            other => rpc_url = Some(other.to_string()),
        }
    }

    let Some(rpc_url) = rpc_url else {
        bail!("usage: node_status <rpc-url> [--name <name>] [--timeout <secs>] [--coinbase]");
    };
    if !rpc_url.starts_with("http://") && !rpc_url.starts_with("https://") {
        bail!("rpc url must be http(s): {}", rpc_url);
    }

    Ok(Args {
        rpc_url,
        name,
        timeout,
        coinbase,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let record = NodeRecord::new_remote(
        args.name,
        Rpc {
            http: args.rpc_url.clone(),
            ws: None,
        },
    );
    let mut node = Node::from(record);
    node.set_http_provider(Arc::new(HttpRpcClient::new(&args.rpc_url, args.timeout)));
    node.refresh().await?;

    let mut output = serde_json::to_value(&node)?;
    if args.coinbase {
        match node.coinbase().await {
            Ok(address) => output["coinbase"] = serde_json::Value::String(address),
            Err(e) => tracing::warn!(error = %e, "eth_coinbase failed"),
        }
    }

    println!("{}", serde_json::to_string_pretty(&output)?);

    if !node.connected {
        bail!("node at {} did not answer eth_chainId", args.rpc_url);
    }
    Ok(())
}
