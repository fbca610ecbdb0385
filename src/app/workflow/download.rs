use anyhow::{Result, anyhow};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::utils::pdf_filename;
use crate::app::workflow::cninfo::extract::resolve_href;

/// 下载公告用的 HTTP 客户端，带上浏览器式请求头
pub fn build_client(base_url: &str) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36"));
    headers.insert(REFERER, HeaderValue::from_str(base_url)?);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/pdf,text/html,application/xhtml+xml,*/*"),
    );

    let client = Client::builder()
        .default_headers(headers)
        .timeout(std::time::Duration::from_secs(60))
        .build()?;
    Ok(client)
}

/// 下载一条公告的 PDF。
///
/// 链接可能直接指向 PDF，也可能指向公告详情页；后一种情况
/// 先抓详情页，再从里面找静态 PDF 地址。
pub async fn download_announcement(
    client: &Client,
    base: &Url,
    href: &str,
    title: &str,
    index: usize,
    download_dir: &Path,
) -> Result<PathBuf> {
    let (content_type, body) = fetch_with_retry(client, href).await?;

    let pdf_bytes = if is_pdf(content_type.as_deref(), &body) {
        body
    } else {
        // 拿到的是详情页，从 HTML 里找 PDF 链接再下一次
        let html = String::from_utf8_lossy(&body);
        let pdf_url = find_pdf_href(&html, base)
            .ok_or_else(|| anyhow!("详情页里没有找到 PDF 链接: {}", href))?;
        debug!("详情页解析出 PDF 地址: {}", pdf_url);

        let (ct, bytes) = fetch_with_retry(client, &pdf_url).await?;
        if !is_pdf(ct.as_deref(), &bytes) {
            return Err(anyhow!("下载内容不是 PDF: {}", pdf_url));
        }
        bytes
    };

    let path = download_dir.join(pdf_filename(title, index));
    tokio::fs::write(&path, &pdf_bytes).await?;
    info!("✅ 已保存: {:?} ({} 字节)", path, pdf_bytes.len());
    Ok(path)
}

async fn fetch_with_retry(client: &Client, url: &str) -> Result<(Option<String>, Vec<u8>)> {
    let retry_strategy = FixedInterval::from_millis(1000).take(3);

    let result = Retry::spawn(retry_strategy, || {
        let client = client.clone();
        let url = url.to_string();
        async move {
            let resp = client.get(&url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(anyhow!("请求失败，状态码 {}: {}", status, url));
            }
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            let body = resp.bytes().await?;
            Ok((content_type, body.to_vec()))
        }
    })
    .await
    .map_err(|e: anyhow::Error| {
        warn!("下载失败（已重试）: {}", url);
        e
    })?;

    Ok(result)
}

fn is_pdf(content_type: Option<&str>, body: &[u8]) -> bool {
    if let Some(ct) = content_type {
        if ct.to_ascii_lowercase().contains("pdf") {
            return true;
        }
    }
    body.starts_with(b"%PDF")
}

/// 在公告详情页的 HTML 里找真正的 PDF 地址
pub fn find_pdf_href(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").ok()?;

    for a in document.select(&selector) {
        if let Some(href) = a.value().attr("href") {
            let lower = href.to_ascii_lowercase();
            if lower.ends_with(".pdf") || lower.contains("static.cninfo.com.cn/finalpage") {
                return Some(resolve_href(base, href));
            }
        }
    }
    None
}

/// 清空目录中的文件（不存在则跳过，不递归子目录）
pub fn clear_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    let mut removed = 0usize;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    info!("已清空目录 {:?}（{} 个文件）", dir, removed);
    Ok(())
}

/// 把 downloads 目录里的 PDF 移动到 data 目录，已存在的跳过
pub fn move_pdf_files(download_dir: &Path, data_dir: &Path) -> Result<usize> {
    if !download_dir.exists() {
        debug!("下载目录不存在: {:?}", download_dir);
        return Ok(0);
    }
    std::fs::create_dir_all(data_dir)?;

    let mut moved = 0usize;
    for entry in std::fs::read_dir(download_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_pdf_file = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !is_pdf_file {
            continue;
        }

        let file_name = match path.file_name() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        let dest = data_dir.join(&file_name);
        if dest.exists() {
            info!("文件已存在，跳过: {:?}", file_name);
            continue;
        }

        std::fs::rename(&path, &dest)?;
        debug!("移动文件: {:?}", file_name);
        moved += 1;
    }

    info!("成功移动 {} 个 PDF 文件到 {:?}", moved, data_dir);
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.cninfo.com.cn").expect("base url")
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let unique = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("时间倒流")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "cninfo_rs_test_{}_{}_{}",
            tag,
            std::process::id(),
            unique
        ));
        std::fs::create_dir_all(&dir).expect("创建临时目录失败");
        dir
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Some("application/pdf"), b""));
        assert!(is_pdf(None, b"%PDF-1.7 ..."));
        assert!(!is_pdf(Some("text/html"), b"<html></html>"));
    }

    #[test]
    fn test_find_pdf_href() {
        let html = r#"
            <html><body>
                <a href="/new/disclosure/stock?stockCode=002031">返回</a>
                <a href="http://static.cninfo.com.cn/finalpage/2024-12-30/1222180577.PDF">公告全文</a>
            </body></html>
        "#;
        let found = find_pdf_href(html, &base()).expect("应找到 PDF 链接");
        assert_eq!(
            found,
            "http://static.cninfo.com.cn/finalpage/2024-12-30/1222180577.PDF"
        );
    }

    #[test]
    fn test_find_pdf_href_relative() {
        let html = r#"<a href="/finalpage/2025-01-01/123.pdf">下载</a>"#;
        let found = find_pdf_href(html, &base()).expect("应找到 PDF 链接");
        assert_eq!(found, "https://www.cninfo.com.cn/finalpage/2025-01-01/123.pdf");
    }

    #[test]
    fn test_find_pdf_href_missing() {
        let html = r#"<a href="/somewhere/else">其他链接</a>"#;
        assert!(find_pdf_href(html, &base()).is_none());
    }

    #[test]
    fn test_clear_directory() {
        let dir = temp_dir("clear");
        std::fs::write(dir.join("a.pdf"), b"x").expect("写文件失败");
        std::fs::write(dir.join("b.txt"), b"y").expect("写文件失败");

        clear_directory(&dir).expect("清空失败");
        assert_eq!(std::fs::read_dir(&dir).expect("读目录失败").count(), 0);

        // 不存在的目录不报错
        clear_directory(&dir.join("missing")).expect("应跳过不存在的目录");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_move_pdf_files_skips_existing() {
        let src = temp_dir("move_src");
        let dst = temp_dir("move_dst");

        std::fs::write(src.join("a.pdf"), b"new").expect("写文件失败");
        std::fs::write(src.join("b.PDF"), b"upper").expect("写文件失败");
        std::fs::write(src.join("c.txt"), b"not pdf").expect("写文件失败");
        std::fs::write(dst.join("a.pdf"), b"old").expect("写文件失败");

        let moved = move_pdf_files(&src, &dst).expect("移动失败");
        // a.pdf 已存在被跳过，c.txt 不是 PDF，只有 b.PDF 被移动
        assert_eq!(moved, 1);
        assert_eq!(
            std::fs::read(dst.join("a.pdf")).expect("读文件失败"),
            b"old"
        );
        assert!(dst.join("b.PDF").exists());
        assert!(src.join("a.pdf").exists());
        assert!(src.join("c.txt").exists());

        let _ = std::fs::remove_dir_all(&src);
        let _ = std::fs::remove_dir_all(&dst);
    }
}
