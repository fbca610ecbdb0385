use anyhow::Context;
use config::{Config, FileFormat};
use serde::Deserialize;
use std::sync::LazyLock;

static CONFIG: LazyLock<AppConfig> =
    LazyLock::new(|| AppConfig::load().expect("Failed to initialize config"));

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 任务文件（config.json）路径
    pub task_file: String,

    pub download_dir: String,
    pub data_dir: String,

    /// 站点根地址，相对链接基于它补全
    pub base_url: String,

    pub browser_port: u16,
    pub headless: bool,

    /// 翻页安全上限
    pub max_pages: u32,

    /// 运行前是否清空 downloads/data
    pub clean_start: bool,

    pub download_delay_secs: u64,

    /// gemini | deepseek
    pub llm_provider: String,
    pub gemini_model: String,
    pub deepseek_model: String,
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default)]
    pub deepseek_api_key: String,

    #[serde(default)]
    pub selectors: SelectorSet,
    #[serde(default)]
    pub waits: WaitConfig,
}

/// 公告列表页的选择器集合。
///
/// 默认值对应巨潮资讯网当前的 Element-UI 表格标记，站点改版时
/// 可以在 application.yaml 里覆盖而不用改代码。
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelectorSet {
    /// 公告行
    pub row: String,
    /// 行内的标题链接
    pub title_link: String,
    /// 行内的时间文本
    pub timestamp: String,
    /// 下一页按钮
    pub next_button: String,
    /// 下一页按钮禁用态的 class 标记
    pub disabled_marker: String,
    /// 加载遮罩
    pub loading_mask: String,
    /// 开始/结束日期输入框
    pub start_date_input: String,
    pub end_date_input: String,
    /// 查询按钮的文本（按钮没有稳定 class，按文本查找）
    pub query_button_text: String,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            row: "tr.el-table__row".to_string(),
            title_link: "td a.ahover".to_string(),
            timestamp: "span.time".to_string(),
            next_button: "button.btn-next".to_string(),
            disabled_marker: "disabled".to_string(),
            loading_mask: ".el-loading-mask".to_string(),
            start_date_input: "input[placeholder=\"开始日期\"]".to_string(),
            end_date_input: "input[placeholder=\"结束日期\"]".to_string(),
            query_button_text: "查询".to_string(),
        }
    }
}

/// 各等待阶段的超时预算（秒），轮询间隔为毫秒。
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WaitConfig {
    /// 查询提交后首次等待公告行
    pub initial_rows_secs: u64,
    /// 每页等待公告行可见
    pub rows_secs: u64,
    /// 翻页后等待第一行标题变化
    pub transition_secs: u64,
    /// 兜底：等待加载遮罩消失
    pub mask_secs: u64,
    /// 兜底：重新等待公告行出现
    pub rows_retry_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_rows_secs: 20,
            rows_secs: 10,
            transition_secs: 10,
            mask_secs: 3,
            rows_retry_secs: 8,
            poll_interval_ms: 500,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Config::builder()
            .add_source(
                config::File::with_name("application")
                    .format(FileFormat::Yaml)
                    .required(true),
            )
            .add_source(config::Environment::with_prefix("APP").try_parsing(true))
            .build()
            .with_context(|| anyhow::anyhow!("Failed to load config"))?
            .try_deserialize()
            .with_context(|| anyhow::anyhow!("Failed to deserialize config"))
    }
}

pub fn get() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        let config = AppConfig::load().expect("Failed to load config");
        println!("{:#?}", config);
        assert!(config.base_url.starts_with("https://www.cninfo.com.cn"));
        assert!(config.max_pages > 0);
    }

    #[test]
    fn test_selector_defaults() {
        let selectors = SelectorSet::default();
        assert!(!selectors.row.is_empty());
        assert!(!selectors.title_link.is_empty());
        assert!(!selectors.timestamp.is_empty());
        assert!(!selectors.next_button.is_empty());
        assert!(!selectors.disabled_marker.is_empty());
    }
}
