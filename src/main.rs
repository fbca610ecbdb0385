mod api;
mod app;
mod config;

use anyhow::Result;
use app::models::TaskConfig;
use app::state::AppState;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    app::logger::init();

    let app_config = config::get();

    info!("正在加载任务文件: {}", app_config.task_file);
    let mut task = TaskConfig::load(&app_config.task_file)?;
    task.validate(&app_config.base_url)?;
    info!(
        "任务: {} {} ~ {}",
        task.company_name, task.start_date, task.end_date
    );

    info!("正在初始化浏览器...");
    let state = AppState::new(&task.target_url).await?;
    info!("浏览器已就绪");

    let stats = app::workflow::pipeline::run(&state, &mut task).await?;

    info!(
        "🎉 所有任务执行完成: 成功 {} 个，跳过 {} 个，失败 {} 个",
        stats.success, stats.exists, stats.failed
    );

    Ok(())
}
