use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::api::llm;
use crate::app::types::{ProcessResult, ProcessStats};

/// 逐个分析 data 目录下的 PDF，结果写到同名 .md 文件。
///
/// 单个文件失败只记入统计，不中断整批处理。
pub async fn summarize_directory(
    data_dir: &Path,
    require: &str,
    skip_existing: bool,
) -> Result<ProcessStats> {
    let pdfs = list_pdf_files(data_dir)?;
    info!("找到 {} 个 PDF 文件", pdfs.len());

    let mut stats = ProcessStats::default();
    let total = pdfs.len();

    for (idx, pdf) in pdfs.iter().enumerate() {
        info!("[{}/{}] 处理 PDF 文件: {:?}", idx + 1, total, pdf);
        match summarize_one(pdf, require, skip_existing).await {
            Ok(result) => stats.add_result(&result),
            Err(e) => {
                warn!("❌ 处理 PDF 失败: {:?}，错误: {}", pdf, e);
                stats.add_result(&ProcessResult::Failed);
            }
        }
    }

    Ok(stats)
}

async fn summarize_one(
    pdf_path: &Path,
    require: &str,
    skip_existing: bool,
) -> Result<ProcessResult> {
    let md_path = pdf_path.with_extension("md");
    if skip_existing && md_path.exists() {
        info!("分析结果已存在，跳过: {:?}", md_path);
        return Ok(ProcessResult::AlreadyExists);
    }

    let markdown = llm::summarize_pdf(pdf_path, require).await?;
    tokio::fs::write(&md_path, &markdown).await?;
    info!("✅ 分析完成，结果已保存到: {:?}", md_path);

    Ok(ProcessResult::Success)
}

/// 列出目录下的 PDF（不区分扩展名大小写），按文件名排序保证处理顺序稳定
fn list_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();
    if !dir.exists() {
        return Ok(pdfs);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_pdf_files() {
        let unique = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("时间倒流")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "cninfo_rs_test_list_{}_{}",
            std::process::id(),
            unique
        ));
        std::fs::create_dir_all(&dir).expect("创建临时目录失败");

        std::fs::write(dir.join("b.pdf"), b"x").expect("写文件失败");
        std::fs::write(dir.join("a.PDF"), b"x").expect("写文件失败");
        std::fs::write(dir.join("c.md"), b"x").expect("写文件失败");

        let pdfs = list_pdf_files(&dir).expect("列目录失败");
        assert_eq!(pdfs.len(), 2);
        // 排序后 a.PDF 在前
        assert_eq!(pdfs[0].file_name().and_then(|n| n.to_str()), Some("a.PDF"));

        // 不存在的目录返回空列表
        let empty = list_pdf_files(&dir.join("missing")).expect("应返回空列表");
        assert!(empty.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
