use anyhow::{Result, anyhow};
use std::path::Path;
use tracing::{info, warn};

use super::{deepseek, gemini, pdf_text};

/// LLM 提供商
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    Deepseek,
}

impl LlmProvider {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "deepseek" => Ok(Self::Deepseek),
            other => Err(anyhow!("不支持的 LLM 提供商: {}", other)),
        }
    }
}

/// 分析一个 PDF，返回 Markdown 结果。
///
/// gemini 走 PDF 内联上传；deepseek 不支持附件，先在本地抽取
/// 文本再发给模型。
pub async fn summarize_pdf(pdf_path: &Path, require: &str) -> Result<String> {
    let config = crate::config::get();
    let provider = LlmProvider::parse(&config.llm_provider)?;

    match provider {
        LlmProvider::Gemini => {
            if config.gemini_api_key.is_empty() {
                return Err(anyhow!("未配置 GEMINI API Key (APP_GEMINI_API_KEY)"));
            }
            let pdf_bytes = tokio::fs::read(pdf_path).await?;
            let prompt = build_attachment_prompt(require);
            info!("正在调用 {} 分析文档: {:?}", config.gemini_model, pdf_path);
            gemini::summarize_pdf(
                &config.gemini_api_key,
                &config.gemini_model,
                &prompt,
                &pdf_bytes,
            )
            .await
        }
        LlmProvider::Deepseek => {
            if config.deepseek_api_key.is_empty() {
                return Err(anyhow!("未配置 DEEPSEEK API Key (APP_DEEPSEEK_API_KEY)"));
            }
            let text = pdf_text::extract_text(pdf_path).await.map_err(|e| {
                warn!("读取 PDF 文本失败: {}", e);
                e
            })?;
            let prompt = build_text_prompt(require, &text);
            info!("正在调用 {} 分析文档: {:?}", config.deepseek_model, pdf_path);
            deepseek::summarize_text(&config.deepseek_api_key, &config.deepseek_model, &prompt)
                .await
        }
    }
}

/// 统一的输出格式要求
const RESULT_FORMAT: &str = "## 公告编号\n[文档内的公告编号] \n\n## 公告日期\n[文档最后的一行的日期]  \n\n## 文档摘要\n[文档的核心内容摘要]\n\n## 关键信息\n- [要点1]\n- [要点2]\n- [要点3]\n\n## 详细内容\n[文档的详细分析]";

fn build_attachment_prompt(require: &str) -> String {
    format!(
        "{}\n\n请分析附件中的 PDF 文档并按以下格式返回结果：\n\n{}",
        require, RESULT_FORMAT
    )
}

fn build_text_prompt(require: &str, text: &str) -> String {
    format!(
        "{}\n\n文档内容如下:\n{}\n\n请分析文档并按以下格式返回结果：\n\n{}",
        require, text, RESULT_FORMAT
    )
}
