//! Zeth 主入口

use std::sync::Arc;

use anyhow::{Context, Result};
use zeth::{
    api,
    app_state::AppState,
    config::Config,
    infrastructure::{db, logging, DocumentDb},
};

#[tokio::main]
async fn main() -> Result<()> {
    // ✅ 1. 加载环境变量
    dotenvy::dotenv().ok();

    // ✅ 2. 加载配置（CONFIG_PATH 指向的文件优先）
    let config = Config::from_env_and_file(std::env::var("CONFIG_PATH").ok())?;
    config.validate().context("invalid configuration")?;
    let config = Arc::new(config);

    // ✅ 3. 初始化日志
    let _log_guard = logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    tracing::info!("🚀 Starting Zeth node manager v{}", env!("CARGO_PKG_VERSION"));

    // ✅ 4. 存储：--memory 使用进程内存储，否则连接 Postgres
    let in_memory = std::env::args().skip(1).any(|arg| arg == "--memory");
    let state = if in_memory {
        tracing::info!("⚠️ Using in-memory storage; data is lost on exit");
        AppState::in_memory(config.clone())
    } else {
        let pool = db::init_pool(&config.database)
            .await
            .context("failed to connect to database")?;
        tracing::info!("✅ Database connected");

        if std::env::var("SKIP_MIGRATIONS").is_err() {
            db::run_migrations(&pool)
                .await
                .context("database migrations failed")?;
            tracing::info!("✅ Database migrations completed");
        } else {
            tracing::info!("⏭️ Database migrations skipped (SKIP_MIGRATIONS=1)");
        }

        AppState::from_pool(pool, config.clone())
    };
    let state = Arc::new(state);

    // ✅ 5. 首次启动写入默认节点与设置
    match state.seed().await {
        Ok(true) => tracing::info!("✅ Default node and settings created"),
        Ok(false) => tracing::info!("Settings already initialized"),
        Err(e) => tracing::warn!(error = ?e, "Failed to seed default settings"),
    }

    // ✅ 6. 文档数据库表结构（设置了 SURREAL_URL 时）
    match DocumentDb::connect(&config.document_db).await {
        Ok(Some(_)) => tracing::info!("✅ Document db schema ready at {}", config.document_db.url),
        Ok(None) => tracing::info!("⏭️ Document db disabled (SURREAL_URL not set)"),
        Err(e) => tracing::warn!(error = %e, "Failed to initialize document db schema"),
    }

    // ✅ 7. 启动节点状态轮询
    let monitor = state.monitor.clone();
    tokio::spawn(async move {
        monitor.start_background_monitor().await;
    });
    tracing::info!("✅ Node monitor started");

    // ✅ 8. 启动服务器
    let app = api::routes(state.clone());
    let bind_addr = config.server.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("🎉 Server listening on http://{}", bind_addr);
    tracing::info!("📖 OpenAPI: http://{}/api/v1/openapi.json", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
