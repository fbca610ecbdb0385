use anyhow::{Result, anyhow};
use openai::Credentials;
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};
use tracing::{debug, warn};

const API_BASE_URL: &str = "https://api.deepseek.com/v1";

const SYSTEM_MESSAGE: &str =
    "你是一位专业的文档分析助手，请仔细分析用户提供的文档内容并按要求格式回答。";

/// 调用 DeepSeek（OpenAI 兼容接口）生成分析结果
pub async fn summarize_text(api_key: &str, model: &str, prompt: &str) -> Result<String> {
    debug!("正在调用 DeepSeek API，模型: {}", model);

    let credentials = Credentials::new(api_key, API_BASE_URL);

    let messages = vec![
        ChatCompletionMessage {
            role: ChatCompletionMessageRole::System,
            content: Some(SYSTEM_MESSAGE.to_string()),
            name: None,
            function_call: None,
            tool_call_id: None,
            tool_calls: None,
        },
        ChatCompletionMessage {
            role: ChatCompletionMessageRole::User,
            content: Some(prompt.to_string()),
            name: None,
            function_call: None,
            tool_call_id: None,
            tool_calls: None,
        },
    ];

    let chat_completion = ChatCompletion::builder(model, messages)
        .credentials(credentials)
        .create()
        .await
        .map_err(|e| {
            warn!("DeepSeek API 调用失败: {}", e);
            anyhow!("DeepSeek API 调用失败: {}", e)
        })?;

    debug!("DeepSeek API 调用成功");

    let returned_message = chat_completion
        .choices
        .first()
        .ok_or_else(|| anyhow!("DeepSeek 返回结果为空"))?
        .message
        .clone();

    let content = returned_message
        .content
        .ok_or_else(|| anyhow!("DeepSeek 返回内容为空"))?;

    Ok(content.trim().to_string())
}
