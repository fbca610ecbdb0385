use anyhow::{Result, anyhow};
use std::path::Path;
use tracing::{debug, warn};

/// 扫描版 PDF 提取不出文本时的占位说明
pub const SCANNED_PDF_PLACEHOLDER: &str = "[无法从PDF中提取文本内容，可能是扫描版PDF]";

/// 提取 PDF 的全部文本。
///
/// pdf-extract 是同步阻塞的，放到阻塞线程池里跑；
/// 提取结果为空时返回占位文本而不是报错。
pub async fn extract_text(pdf_path: &Path) -> Result<String> {
    let path = pdf_path.to_path_buf();
    debug!("正在读取 PDF 文本: {:?}", path);

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path))
        .await
        .map_err(|e| anyhow!("PDF 文本提取任务失败: {}", e))?
        .map_err(|e| anyhow!("PDF 文本提取失败: {}", e))?;

    if text.trim().is_empty() {
        warn!("⚠️ PDF 中未提取到文本内容，可能是扫描版 PDF: {:?}", pdf_path);
        return Ok(SCANNED_PDF_PLACEHOLDER.to_string());
    }

    Ok(text)
}
