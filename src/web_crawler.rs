//! Web请求模块
//!
//! 此模块负责：
//! - 构建共享的HTTP客户端（超时、代理、User-Agent）
//! - 以GET或表单POST方式获取页面文本
//! - 对网络错误和5xx响应进行有限次数的重试，延迟线性递增

// 标准库导入
use std::time::Duration;

// 第三方crate导入
use reqwest::{Client, Proxy, StatusCode};
use tracing::{debug, info, warn};

// 本地模块导入
use crate::config::ProviderConfig;
use crate::error::{Result, TranslationError};
use crate::translation_error;

/// 请求方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    PostForm,
}

/// 页面获取器
///
/// 内部持有一个 `reqwest::Client`，克隆开销很小，可在并发任务间共享。
#[derive(Debug, Clone)]
pub struct WebCrawler {
    client: Client,
    max_retries: usize,
    retry_delay: Duration,
}

impl WebCrawler {
    /// 按提供方配置创建页面获取器
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .user_agent(config.user_agent());

        if let Some(proxy) = config.proxy() {
            let proxy = Proxy::all(proxy)
                .map_err(|e| translation_error!(config, "proxy", e))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| translation_error!(config, "http_client", e))?;

        Ok(Self {
            client,
            max_retries: config.max_retries(),
            retry_delay: Duration::from_millis(config.retry_delay_ms()),
        })
    }

    /// GET请求并返回响应文本
    pub async fn get(&self, url: &str) -> Result<String> {
        self.fetch_with_retry(Method::Get, url, &[]).await
    }

    /// 以 `application/x-www-form-urlencoded` 提交表单并返回响应文本
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<String> {
        self.fetch_with_retry(Method::PostForm, url, form).await
    }

    /// 带重试机制的请求
    ///
    /// 只有可重试的错误（连接失败、超时、5xx）才会重试；429等客户端错误直接返回。
    async fn fetch_with_retry(&self, method: Method, url: &str, form: &[(&str, &str)]) -> Result<String> {
        let attempts = self.max_retries + 1;
        let mut attempt = 1;

        loop {
            match self.fetch_once(method, url, form).await {
                Ok(body) => {
                    if attempt > 1 {
                        info!("✅ 重试成功 (第 {} 次)", attempt);
                    }
                    return Ok(body);
                }
                Err(e) if attempt < attempts && is_retryable(&e) => {
                    let delay = self.retry_delay * attempt as u32;
                    warn!("❌ 请求失败 (尝试 {}/{}): {}，{:?} 后重试", attempt, attempts, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, method: Method, url: &str, form: &[(&str, &str)]) -> Result<String> {
        debug!("🌐 {:?} {}", method, url);

        let request = match method {
            Method::Get => self.client.get(url),
            Method::PostForm => self.client.post(url).form(form),
        };
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranslationError::TooManyRequests {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(translation_error!(
                network,
                format!("服务返回错误状态: {}", status),
                status.as_u16()
            ));
        }

        let body = response.text().await?;
        debug!("📄 响应大小: {} 字节", body.len());
        Ok(body)
    }
}

/// 判断错误是否值得重试
fn is_retryable(error: &TranslationError) -> bool {
    match error {
        TranslationError::Network { status_code, .. } => {
            status_code.map_or(true, |code| code >= 500)
        }
        _ => false,
    }
}
