//! 公告表格的翻页采集。
//!
//! 调用方保证页面已经是过滤后的结果视图；这里只负责一页一页把
//! (标题, 链接, 时间) 读出来，点下一页，确认翻页生效，直到
//! 下一页按钮消失或禁用。所有等待都有超时，超时走兜底链而不是
//! 让整个采集失败。

use anyhow::{Result, anyhow};
use chromiumoxide::Page;
use chromiumoxide::element::Element;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};
use url::Url;

use crate::app::models::{Announcement, Extraction};
use crate::config::{SelectorSet, WaitConfig};

use super::scripts::disabled_probe_js;

/// 遍历所有分页，返回按"页序 + 页内行序"排列的完整结果。
///
/// 不去重：每一页有几行就追加几条记录，标题/链接读不到也用空串
/// 占位，保证行数和时间列一一对应。`max_pages` 是防止死循环的
/// 安全上限，触发时 `complete` 置 false，正常走到最后一页时结果
/// 与没有上限完全一致。
pub async fn extract_announcements(
    page: &Page,
    selectors: &SelectorSet,
    waits: &WaitConfig,
    base: &Url,
    max_pages: u32,
) -> Result<Extraction> {
    let mut rows: Vec<Announcement> = Vec::new();
    let mut page_no: u32 = 1;

    let complete = loop {
        // 1. 等本页的公告行出现；超时按空页处理而不是失败
        if !wait_for_rows(page, &selectors.row, waits.rows_secs, waits.poll_interval_ms).await {
            warn!("第 {} 页等待公告行超时，按无数据处理", page_no);
        }

        // 2-4. 逐行读取并追加
        let page_rows = read_page_rows(page, selectors, base, page_no).await;
        info!("📄 第 {} 页提取到 {} 条公告", page_no, page_rows.len());
        rows.extend(page_rows);

        // 5. 记录翻页前第一行标题，作为翻页完成的判断指纹
        let fingerprint = first_row_title(page, selectors).await.unwrap_or_default();

        // 6. 找下一页按钮；不存在说明只有这一页
        let next_btn = match page.find_element(selectors.next_button.as_str()).await {
            Ok(el) => el,
            Err(_) => {
                info!("没有找到下一页按钮，翻页结束");
                break true;
            }
        };

        // 7. 按钮禁用说明已经是最后一页
        if next_is_disabled(page, &next_btn, selectors).await {
            info!("下一页按钮已禁用，已到最后一页");
            break true;
        }

        // 安全上限放在正常终止判断之后，保证不会改变成功路径的结果
        if page_no >= max_pages {
            warn!("已达到最大页数 {}，提前停止", max_pages);
            break false;
        }

        // 8. 翻页
        if let Err(e) = next_btn.click().await {
            warn!("点击下一页失败: {}，停止翻页", e);
            break false;
        }

        // 9. 确认翻页真的发生了
        wait_for_transition(page, selectors, waits, &fingerprint).await;

        // 10. 进入下一页
        page_no += 1;
    };

    info!(
        "✅ 采集完成: {} 页共 {} 条公告{}",
        page_no,
        rows.len(),
        if complete { "" } else { "（未走到最后一页）" }
    );

    Ok(Extraction {
        rows,
        pages: page_no as usize,
        complete,
    })
}

/// 轮询等待至少一条公告行出现，超时返回 false
pub async fn wait_for_rows(page: &Page, row_selector: &str, secs: u64, poll_ms: u64) -> bool {
    let deadline = Instant::now() + Duration::from_secs(secs);
    loop {
        match page.find_elements(row_selector).await {
            Ok(els) if !els.is_empty() => return true,
            Ok(_) => {}
            Err(e) => debug!("查询公告行失败: {}", e),
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(poll_ms)).await;
    }
}

/// 按 DOM 顺序读出当前页的所有行
async fn read_page_rows(
    page: &Page,
    selectors: &SelectorSet,
    base: &Url,
    page_no: u32,
) -> Vec<Announcement> {
    let row_els = match page.find_elements(selectors.row.as_str()).await {
        Ok(els) => els,
        Err(e) => {
            warn!("第 {} 页枚举公告行失败: {}", page_no, e);
            Vec::new()
        }
    };

    let mut rows = Vec::with_capacity(row_els.len());
    for (idx, row_el) in row_els.iter().enumerate() {
        let ann = read_row(row_el, selectors, base, page_no, idx).await;
        debug!("{} {} {}", ann.time, ann.title, ann.href);
        rows.push(ann);
    }
    rows
}

/// 读一行的三个字段。
///
/// 每个字段独立探测：元素不存在或读取失败都只让该字段留空，
/// 单行出错不影响同页其余行，行本身总是会被记录下来。
async fn read_row(
    row: &Element,
    selectors: &SelectorSet,
    base: &Url,
    page_no: u32,
    idx: usize,
) -> Announcement {
    let mut ann = Announcement::default();

    match row.find_element(selectors.title_link.as_str()).await {
        Ok(link) => {
            match link.inner_text().await {
                Ok(text) => ann.title = text.unwrap_or_default().trim().to_string(),
                Err(e) => warn!("读取第 {} 页第 {} 行标题失败: {}", page_no, idx + 1, e),
            }
            match link.attribute("href").await {
                Ok(href) => ann.href = resolve_href(base, href.as_deref().unwrap_or("")),
                Err(e) => warn!("读取第 {} 页第 {} 行链接失败: {}", page_no, idx + 1, e),
            }
        }
        Err(_) => debug!("第 {} 页第 {} 行没有标题链接", page_no, idx + 1),
    }

    match row.find_element(selectors.timestamp.as_str()).await {
        Ok(el) => match el.inner_text().await {
            Ok(text) => ann.time = text.unwrap_or_default().trim().to_string(),
            Err(e) => warn!("读取第 {} 页第 {} 行时间失败: {}", page_no, idx + 1, e),
        },
        Err(_) => debug!("第 {} 页第 {} 行没有时间元素", page_no, idx + 1),
    }

    ann
}

/// 当前页第一行的标题文本
async fn first_row_title(page: &Page, selectors: &SelectorSet) -> Option<String> {
    let sel = format!("{} {}", selectors.row, selectors.title_link);
    let el = page.find_element(sel).await.ok()?;
    el.inner_text()
        .await
        .ok()
        .flatten()
        .map(|t| t.trim().to_string())
}

/// 判断下一页按钮是否禁用：优先直接查询 disabled 属性，
/// 查询本身失败时回退检查 class 标记。
async fn next_is_disabled(page: &Page, next_btn: &Element, selectors: &SelectorSet) -> bool {
    let direct = match page.evaluate(disabled_probe_js(&selectors.next_button)).await {
        Ok(res) => res.into_value::<bool>().map_err(|e| anyhow!(e)),
        Err(e) => Err(anyhow!(e)),
    };

    match direct {
        Ok(disabled) => disabled,
        Err(e) => {
            debug!("直接查询禁用状态失败: {}，回退检查 class", e);
            match next_btn.attribute("class").await {
                Ok(cls) => cls
                    .unwrap_or_default()
                    .contains(&selectors.disabled_marker),
                Err(e2) => {
                    warn!("读取下一页按钮 class 失败: {}", e2);
                    false
                }
            }
        }
    }
}

/// 分层等待翻页完成：
/// 1. 等第一行标题和翻页前不同；
/// 2. 超时则等加载遮罩消失（短超时，失败忽略）；
/// 3. 再兜底等公告行重新出现。
/// 全部超时也继续往下走，不让翻页等待拖垮整个采集。
async fn wait_for_transition(
    page: &Page,
    selectors: &SelectorSet,
    waits: &WaitConfig,
    fingerprint: &str,
) {
    let poll = Duration::from_millis(waits.poll_interval_ms);

    let deadline = Instant::now() + Duration::from_secs(waits.transition_secs);
    loop {
        if let Some(title) = first_row_title(page, selectors).await {
            if title != fingerprint {
                debug!("第一行标题已变化，翻页完成");
                return;
            }
        }
        if Instant::now() >= deadline {
            break;
        }
        sleep(poll).await;
    }

    debug!("等待第一行标题变化超时，回退等待加载遮罩消失");
    let deadline = Instant::now() + Duration::from_secs(waits.mask_secs);
    loop {
        if page
            .find_element(selectors.loading_mask.as_str())
            .await
            .is_err()
        {
            break;
        }
        if Instant::now() >= deadline {
            break;
        }
        sleep(poll).await;
    }

    if !wait_for_rows(
        page,
        &selectors.row,
        waits.rows_retry_secs,
        waits.poll_interval_ms,
    )
    .await
    {
        warn!("翻页后等待公告行超时，继续尝试读取");
    }
}

/// 把相对链接补全为绝对地址；已经是绝对地址的原样返回。
pub fn resolve_href(base: &Url, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    match base.join(href) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!("补全链接失败 '{}': {}", href, e);
            href.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.cninfo.com.cn").expect("base url")
    }

    #[test]
    fn test_resolve_relative_href() {
        let resolved = resolve_href(
            &base(),
            "/new/disclosure/detail?plate=szse&announcementId=1222180577",
        );
        assert_eq!(
            resolved,
            "https://www.cninfo.com.cn/new/disclosure/detail?plate=szse&announcementId=1222180577"
        );

        let url = Url::parse(&resolved).expect("解析失败");
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("www.cninfo.com.cn"));
    }

    #[test]
    fn test_resolve_absolute_href_passthrough() {
        let absolute = "http://static.cninfo.com.cn/finalpage/2024-12-30/1222180577.PDF";
        assert_eq!(resolve_href(&base(), absolute), absolute);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let once = resolve_href(&base(), "/new/disclosure/detail?id=1");
        let twice = resolve_href(&base(), &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_resolve_empty_href() {
        assert_eq!(resolve_href(&base(), ""), "");
        assert_eq!(resolve_href(&base(), "   "), "");
    }
}
