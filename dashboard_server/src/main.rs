use anyhow::Context;
use dashboard_server::config;
use dashboard_server::dataset::load_dataset;
use dashboard_server::server::DashboardServer;
use dashboard_server::shutdown;
use log::{info, LevelFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志记录器，RUST_LOG 可覆盖默认级别
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
    info!("[主程序] 日志系统已成功初始化 (env_logger)，默认级别: Info。");

    let config_path = config::config_file_path();
    let app_config = config::load_or_create_config(&config_path)
        .with_context(|| format!("加载配置文件 {:?} 失败", config_path))?;
    info!(
        "[主程序] 应用配置已加载：监听地址 {}，工作池大小 {}，数据集 {:?}",
        app_config.websocket.listen_addr(),
        app_config.worker_pool.max_workers,
        app_config.dataset.path
    );

    let dataset = load_dataset(&app_config.dataset.path)
        .with_context(|| format!("加载数据集 {:?} 失败", app_config.dataset.path))?;

    let server = DashboardServer::bind(&app_config, dataset)
        .await
        .context("启动 WebSocket 服务失败")?;
    info!("[主程序] WebSocket 服务已在 ws://{} 上就绪。", server.local_addr());

    let shutdown_handle = server.shutdown_handle();
    tokio::spawn(async move {
        shutdown::wait_for_signal().await;
        shutdown_handle.trigger();
    });

    server.run().await?;
    info!("[主程序] 服务已停止。");
    Ok(())
}
