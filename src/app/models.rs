use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// 一条公告记录，对应列表页的一行。
///
/// 标题和链接都可能缺失（行里没有匹配到元素，或读取失败），
/// 缺失时保留空字符串占位，保证行和时间列的一一对应关系。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(default)]
    pub title: String,
    /// 已补全为绝对地址的链接
    #[serde(default)]
    pub href: String,
    /// 站点上的发布时间原文，不做解析
    #[serde(default)]
    pub time: String,
}

/// 一次完整翻页采集的结果。
///
/// `complete` 为 false 表示没有走到"下一页按钮消失/禁用"的正常终点
/// （触发了 max_pages 上限，或点击下一页失败），已采集的行仍然有效。
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// 实际访问的页数
    pub pages: usize,
    pub complete: bool,
    pub rows: Vec<Announcement>,
}

/// 任务文件（config.json），字段沿用既有格式，titles/hrefs 由采集结果回写。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub target_url: String,

    #[serde(rename = "companyName", default)]
    pub company_name: String,

    #[serde(rename = "startDate", default)]
    pub start_date: String,
    #[serde(rename = "endDate", default)]
    pub end_date: String,

    /// 交给 LLM 的分析要求
    #[serde(default = "default_require")]
    pub require: String,

    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub hrefs: Vec<String>,
}

fn default_require() -> String {
    "请分析此文档，提取关键内容并进行总结。".to_string()
}

impl TaskConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| anyhow!("读取任务文件失败: {:?}", path))?;
        let task: TaskConfig = serde_json::from_str(&content)
            .with_context(|| anyhow!("解析任务文件失败: {:?}", path))?;
        debug!("已加载任务文件: {:?}", path);
        Ok(task)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| anyhow!("写入任务文件失败: {:?}", path))?;
        info!("任务文件已保存: {:?}", path);
        Ok(())
    }

    /// 本工具只处理巨潮资讯网的公告页面
    pub fn validate(&self, base_url: &str) -> Result<()> {
        if !self.target_url.starts_with(base_url) {
            return Err(anyhow!(
                "target_url 受限，目前仅支持 {} 下的页面: {}",
                base_url,
                self.target_url
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_config_round_trip() {
        let json = r#"{
            "target_url": "https://www.cninfo.com.cn/new/disclosure/stock?stockCode=002031",
            "companyName": "巨轮智能",
            "startDate": "2025-07-01",
            "endDate": "2025-08-26",
            "require": "请总结",
            "titles": []
        }"#;

        let task: TaskConfig = serde_json::from_str(json).expect("解析失败");
        assert_eq!(task.company_name, "巨轮智能");
        assert_eq!(task.start_date, "2025-07-01");
        assert!(task.titles.is_empty());
        assert!(task.hrefs.is_empty());

        // 回写时保持 camelCase 字段名
        let out = serde_json::to_string(&task).expect("序列化失败");
        assert!(out.contains("\"companyName\""));
        assert!(out.contains("\"startDate\""));
        assert!(out.contains("\"endDate\""));
        assert!(out.contains("\"hrefs\""));
    }

    #[test]
    fn test_task_config_defaults() {
        let json = r#"{ "target_url": "https://www.cninfo.com.cn/x" }"#;
        let task: TaskConfig = serde_json::from_str(json).expect("解析失败");
        assert!(task.company_name.is_empty());
        assert!(!task.require.is_empty());
    }

    #[test]
    fn test_validate_target_url() {
        let task = TaskConfig {
            target_url: "https://example.com/page".to_string(),
            company_name: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            require: String::new(),
            titles: vec![],
            hrefs: vec![],
        };
        assert!(task.validate("https://www.cninfo.com.cn").is_err());

        let ok = TaskConfig {
            target_url: "https://www.cninfo.com.cn/new/disclosure".to_string(),
            ..task
        };
        assert!(ok.validate("https://www.cninfo.com.cn").is_ok());
    }
}
