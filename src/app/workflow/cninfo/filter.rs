use anyhow::{Result, anyhow};
use chromiumoxide::Page;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::app::models::TaskConfig;
use crate::config::{SelectorSet, WaitConfig};

use super::extract::wait_for_rows;
use super::scripts::{click_button_by_text_js, fill_input_js};

/// 在公告列表页上填入日期范围并提交查询。
///
/// 采集器要求调用方先把过滤条件生效、表格进入结果视图，
/// 这一步就是那个前置条件。
pub async fn apply_date_filter(
    page: &Page,
    task: &TaskConfig,
    selectors: &SelectorSet,
    waits: &WaitConfig,
) -> Result<()> {
    if !task.start_date.is_empty() {
        fill_input(page, &selectors.start_date_input, &task.start_date).await?;
    }
    if !task.end_date.is_empty() {
        fill_input(page, &selectors.end_date_input, &task.end_date).await?;
    }

    info!("提交查询: {} ~ {}", task.start_date, task.end_date);
    let clicked: bool = page
        .evaluate(click_button_by_text_js(&selectors.query_button_text))
        .await?
        .into_value()?;
    if !clicked {
        return Err(anyhow!(
            "没有找到文本为 '{}' 的查询按钮",
            selectors.query_button_text
        ));
    }

    // 查询是异步刷新的，稍等后再开始等待结果行
    sleep(Duration::from_millis(500)).await;

    if !wait_for_rows(
        page,
        &selectors.row,
        waits.initial_rows_secs,
        waits.poll_interval_ms,
    )
    .await
    {
        warn!(
            "等待 {} 超时（{} 秒），日期范围内可能没有公告",
            selectors.row, waits.initial_rows_secs
        );
    }

    Ok(())
}

async fn fill_input(page: &Page, selector: &str, value: &str) -> Result<()> {
    debug!("填写 {} = {}", selector, value);
    let ok: bool = page
        .evaluate(fill_input_js(selector, value))
        .await?
        .into_value()?;
    if !ok {
        return Err(anyhow!("没有找到输入框: {}", selector));
    }
    Ok(())
}
