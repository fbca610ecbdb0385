use anyhow::{Result, anyhow};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;

use crate::app::models::{Announcement, TaskConfig};
use crate::app::state::AppState;
use crate::app::types::{ProcessResult, ProcessStats};

use super::cninfo::{extract, filter};
use super::{download, summarize};

/// 完整流程：过滤 → 翻页采集 → 回写任务文件 → 下载 PDF → LLM 分析。
pub async fn run(state: &AppState, task: &mut TaskConfig) -> Result<ProcessStats> {
    let app_config = state.config;
    let download_dir = Path::new(&app_config.download_dir);
    let data_dir = Path::new(&app_config.data_dir);

    info!("🚀 开始执行所有任务...");

    // 准备工作目录
    std::fs::create_dir_all(download_dir)?;
    std::fs::create_dir_all(data_dir)?;
    if app_config.clean_start {
        info!("清空 {} / {} 目录...", app_config.download_dir, app_config.data_dir);
        download::clear_directory(download_dir)?;
        download::clear_directory(data_dir)?;
    }

    let base = Url::parse(&app_config.base_url)
        .map_err(|e| anyhow!("base_url 配置无效 '{}': {}", app_config.base_url, e))?;

    // 在列表页上应用日期过滤并采集全部分页
    let extraction = {
        let page = state.page.read().await;

        filter::apply_date_filter(&page, task, &app_config.selectors, &app_config.waits).await?;

        extract::extract_announcements(
            &page,
            &app_config.selectors,
            &app_config.waits,
            &base,
            app_config.max_pages,
        )
        .await?
    };

    // 仅在 debug 模式下把完整采集结果保存到 TOML 文件
    #[cfg(debug_assertions)]
    {
        match toml::to_string_pretty(&extraction) {
            Ok(toml_str) => {
                let toml_path = data_dir.join("extraction.toml");
                if let Err(e) = std::fs::write(&toml_path, toml_str) {
                    tracing::debug!("保存采集结果失败: {:?}, 错误: {}", toml_path, e);
                } else {
                    tracing::debug!("已保存采集结果到: {:?}", toml_path);
                }
            }
            Err(e) => tracing::debug!("序列化采集结果失败: {}", e),
        }
    }

    // 过滤出目标公司的公告并回写任务文件
    let selected = select_announcements(&extraction.rows, &task.company_name);
    info!("✅ 过滤后的唯一标题数量: {}", selected.len());

    if selected.is_empty() {
        return Err(anyhow!(
            "根据 '{}' 检索不到任何公告，请检查 companyName 和日期范围是否正确",
            task.company_name
        ));
    }

    task.titles = selected.iter().map(|(t, _)| t.clone()).collect();
    task.hrefs = selected.iter().map(|(_, h)| h.clone()).collect();
    task.save(&app_config.task_file)?;

    // 下载 PDF 到 downloads 目录
    let client = download::build_client(&app_config.base_url)?;
    let total = selected.len();
    let mut download_stats = ProcessStats::default();

    for (idx, (title, href)) in selected.iter().enumerate() {
        info!("[{}/{}] 正在处理: {}", idx + 1, total, title);

        if href.is_empty() {
            warn!("公告 '{}' 没有链接，跳过下载", title);
            download_stats.add_result(&ProcessResult::Failed);
            continue;
        }

        match download::download_announcement(&client, &base, href, title, idx, download_dir).await
        {
            Ok(_) => download_stats.add_result(&ProcessResult::Success),
            Err(e) => {
                warn!("❌ 下载失败: {}，错误: {}", title, e);
                download_stats.add_result(&ProcessResult::Failed);
            }
        }

        if idx + 1 < total {
            sleep(Duration::from_secs(app_config.download_delay_secs)).await;
        }
    }

    info!(
        "下载完成: 成功 {} 个，失败 {} 个",
        download_stats.success, download_stats.failed
    );

    // 移动到 data 目录后统一分析
    download::move_pdf_files(download_dir, data_dir)?;

    let stats =
        summarize::summarize_directory(data_dir, &task.require, !app_config.clean_start).await?;

    info!(
        "📊 分析统计: 成功 {} 个，跳过 {} 个，失败 {} 个",
        stats.success, stats.exists, stats.failed
    );

    Ok(stats)
}

/// 从采集结果里挑出要下载的公告：
/// 去掉空标题，按 companyName 前缀过滤（为空则不过滤），
/// 按标题去重并保留第一次出现的顺序和链接。
pub fn select_announcements(rows: &[Announcement], company_name: &str) -> Vec<(String, String)> {
    let mut seen = std::collections::HashSet::new();
    let mut selected = Vec::new();

    for row in rows {
        let title = row.title.trim();
        if title.is_empty() {
            continue;
        }
        if !company_name.is_empty() && !title.starts_with(company_name) {
            continue;
        }
        if !seen.insert(title.to_string()) {
            continue;
        }
        selected.push((title.to_string(), row.href.clone()));
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann(title: &str, href: &str) -> Announcement {
        Announcement {
            title: title.to_string(),
            href: href.to_string(),
            time: String::new(),
        }
    }

    #[test]
    fn test_select_filters_by_company_prefix() {
        let rows = vec![
            ann("巨轮智能：2025年半年度报告", "https://a/1"),
            ann("其他公司：公告", "https://a/2"),
            ann("巨轮智能：监事会决议", "https://a/3"),
        ];
        let selected = select_announcements(&rows, "巨轮智能");
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].0, "巨轮智能：2025年半年度报告");
        assert_eq!(selected[1].1, "https://a/3");
    }

    #[test]
    fn test_select_dedups_keeping_first() {
        let rows = vec![
            ann("公告A", "https://a/first"),
            ann("公告B", "https://a/b"),
            ann("公告A", "https://a/second"),
        ];
        let selected = select_announcements(&rows, "");
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0], ("公告A".to_string(), "https://a/first".to_string()));
    }

    #[test]
    fn test_select_keeps_rows_without_href() {
        // 标题在、链接缺失的行保留下来，下载阶段再跳过
        let rows = vec![ann("公告A", ""), ann("", "https://a/x")];
        let selected = select_announcements(&rows, "");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, "公告A");
        assert!(selected[0].1.is_empty());
    }
}
