use anyhow::{Result, anyhow};
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// 应用程序共享状态
#[derive(Clone)]
pub struct AppState {
    /// 浏览器实例
    pub browser: Arc<Browser>,

    /// 公告列表页（使用 RwLock 支持并发访问）
    pub page: Arc<RwLock<Page>>,

    /// 应用配置
    pub config: &'static crate::config::AppConfig,
}

impl AppState {
    /// 创建应用状态：连接/启动浏览器并打开公告列表页
    pub async fn new(target_url: &str) -> Result<Self> {
        let config = crate::config::get();
        let browser = connect_browser().await?;

        // 查找是否已经有目标站点的页面打开
        let pages = browser.pages().await?;
        info!("当前浏览器中有 {} 个页面", pages.len());

        let mut found_page: Option<Page> = None;
        for page in pages {
            if let Ok(Some(u)) = page.url().await {
                debug!("检查页面: {}", u);
                if u.starts_with(&config.base_url) {
                    info!("找到已存在的目标页面: {}", u);
                    found_page = Some(page);
                    break;
                }
            }
        }

        let page = match found_page {
            Some(existing) => {
                info!("复用已存在的页面，重新导航到目标地址");
                existing.goto(target_url).await?;
                existing
            }
            None => {
                info!("未找到目标页面，正在打开: {}", target_url);
                browser.new_page(target_url).await?
            }
        };

        // 页面是前端渲染的，导航完成后再留出渲染时间
        if let Err(e) = page.wait_for_navigation().await {
            warn!("等待页面导航完成失败: {}，继续执行", e);
        }
        sleep(Duration::from_secs(5)).await;

        Ok(Self {
            browser: Arc::new(browser),
            page: Arc::new(RwLock::new(page)),
            config,
        })
    }
}

/// 连接浏览器：优先复用调试端口上的现有实例，连不上则启动新实例
pub async fn connect_browser() -> Result<Browser> {
    let config = crate::config::get();
    let browser_url = format!("http://localhost:{}", config.browser_port);
    debug!("尝试连接到现有浏览器: {}", browser_url);

    let (browser, mut handler) = match Browser::connect(&browser_url).await {
        Ok(res) => {
            info!("✓ 成功连接到端口 {} 的现有浏览器", config.browser_port);
            res
        }
        Err(_) => {
            warn!(
                "无法连接到端口 {}，准备启动新的浏览器实例...",
                config.browser_port
            );
            launch_local_browser(config.headless).await?
        }
    };

    // chromiumoxide 要求持续驱动事件循环
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    Ok(browser)
}

/// 启动本地浏览器进程
async fn launch_local_browser(
    headless: bool,
) -> Result<(Browser, chromiumoxide::handler::Handler)> {
    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .window_size(1400, 900);

    if !headless {
        builder = builder.with_head();
    }

    let browser_config = builder
        .build()
        .map_err(|e| anyhow!("构造浏览器配置失败: {}", e))?;

    let launched = Browser::launch(browser_config)
        .await
        .map_err(|e| anyhow!("启动浏览器失败: {}", e))?;

    info!("✓ 新浏览器实例启动成功");
    Ok(launched)
}

#[tokio::test]
async fn test_connect_browser() {
    use crate::app::logger;
    logger::init_test();
    match connect_browser().await {
        Ok(_) => tracing::info!("成功连接到浏览器"),
        Err(e) => tracing::error!("连接浏览器失败: {}", e),
    }
}
