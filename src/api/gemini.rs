use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// 调用 Gemini generateContent 分析 PDF。
///
/// PDF 以 base64 内联在请求里（inline_data），不走文件上传接口。
pub async fn summarize_pdf(
    api_key: &str,
    model: &str,
    prompt: &str,
    pdf_bytes: &[u8],
) -> Result<String> {
    debug!("正在调用 Gemini API，模型: {}，PDF {} 字节", model, pdf_bytes.len());

    let url = format!("{}/{}:generateContent?key={}", API_BASE_URL, model, api_key);

    let payload = json!({
        "contents": [{
            "parts": [
                { "text": prompt },
                {
                    "inline_data": {
                        "mime_type": "application/pdf",
                        "data": general_purpose::STANDARD.encode(pdf_bytes),
                    }
                }
            ]
        }]
    });

    // PDF 分析耗时较长，超时放宽
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let resp = client.post(&url).json(&payload).send().await?;
    let status = resp.status();
    info!("Gemini API 响应状态码: {}", status);

    let resp_json: Value = resp.json().await?;

    if let Some(error) = resp_json.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("未知错误");
        warn!("Gemini API 返回错误: {}", message);
        return Err(anyhow!("Gemini API 返回错误: {}", message));
    }

    if !status.is_success() {
        return Err(anyhow!(
            "Gemini API 请求失败，状态码: {}。响应: {}",
            status,
            serde_json::to_string(&resp_json).unwrap_or_default()
        ));
    }

    let text = collect_candidate_text(&resp_json);
    if text.is_empty() {
        return Err(anyhow!("Gemini 返回空响应"));
    }

    Ok(text.trim().to_string())
}

/// 把第一个候选结果里的所有文本片段拼起来
fn collect_candidate_text(resp: &Value) -> String {
    resp["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_candidate_text() {
        let resp = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "## 文档摘要\n" },
                        { "text": "公告内容" }
                    ]
                }
            }]
        });
        assert_eq!(collect_candidate_text(&resp), "## 文档摘要\n公告内容");
    }

    #[test]
    fn test_collect_candidate_text_empty() {
        assert_eq!(collect_candidate_text(&json!({})), "");
        assert_eq!(collect_candidate_text(&json!({ "candidates": [] })), "");
    }
}
