//! 配置管理模块
//!
//! 提供CLI参数解析和翻译提供方配置管理功能

// 标准库导入
use std::fmt;
use std::path::PathBuf;

// 第三方crate导入
use clap::{Parser, ValueEnum};

// 本地模块导入
use crate::api_constants::{base_urls, http_config, service_config};

/// 翻译提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// Google翻译移动版页面（HTML抓取）
    Google,
    /// Linguee词典（HTML抓取，返回多个候选）
    Linguee,
    /// MyMemory（JSON接口）
    Mymemory,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Linguee => "linguee",
            Provider::Mymemory => "mymemory",
        }
    }

    /// 提供方的默认服务地址
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Google => base_urls::GOOGLE_TRANSLATE,
            Provider::Linguee => base_urls::LINGUEE,
            Provider::Mymemory => base_urls::MYMEMORY,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 翻译提供方配置
///
/// 支持Builder模式进行链式配置。
///
/// # Examples
///
/// ```rust
/// use scrape_translator::config::{Provider, ProviderConfig};
///
/// let config = ProviderConfig::new(Provider::Google)
///     .with_languages("en", "de")
///     .with_timeout_secs(10)
///     .with_max_retries(5);
///
/// assert_eq!(config.target(), "de");
/// ```
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// 翻译提供方
    provider: Provider,
    /// 源语言代码
    source: String,
    /// 目标语言代码
    target: String,
    /// 自定义服务地址（为空时使用提供方默认地址）
    base_url: Option<String>,
    /// 代理地址
    proxy: Option<String>,
    /// 请求超时时间（秒）
    timeout_secs: u64,
    /// User-Agent
    user_agent: String,
    /// 最大重试次数
    max_retries: usize,
    /// 重试延迟基数（毫秒）
    retry_delay_ms: u64,
    /// 批量翻译时的并发请求数
    concurrency: usize,
}

impl ProviderConfig {
    /// 创建新的配置实例
    ///
    /// 默认值：
    /// - 源语言: auto
    /// - 目标语言: fr
    /// - 超时: 30秒
    /// - 最大重试次数: 3
    /// - 并发请求数: 5
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            source: service_config::DEFAULT_SOURCE_LANG.to_string(),
            target: service_config::DEFAULT_TARGET_LANG.to_string(),
            base_url: None,
            proxy: None,
            timeout_secs: http_config::DEFAULT_TIMEOUT_SECS,
            user_agent: http_config::DEFAULT_USER_AGENT.to_string(),
            max_retries: http_config::DEFAULT_MAX_RETRIES,
            retry_delay_ms: http_config::RETRY_DELAY_BASE_MS,
            concurrency: service_config::DEFAULT_CONCURRENCY,
        }
    }

    /// 从命令行参数构建配置
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = Self::new(cli.provider)
            .with_languages(&cli.source, &cli.target)
            .with_timeout_secs(cli.timeout)
            .with_max_retries(cli.max_retries)
            .with_concurrency(cli.concurrency);
        if let Some(proxy) = &cli.proxy {
            config = config.with_proxy(proxy);
        }
        config
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// 实际使用的服务地址
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn retry_delay_ms(&self) -> u64 {
        self.retry_delay_ms
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 源语言与目标语言相同
    pub fn same_source_target(&self) -> bool {
        self.source == self.target
    }

    /// 设置源语言和目标语言
    pub fn with_languages(mut self, source: &str, target: &str) -> Self {
        self.source = source.to_string();
        self.target = target.to_string();
        self
    }

    /// 覆盖服务地址
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    /// 设置代理
    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    /// 设置请求超时
    pub fn with_timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    /// 设置User-Agent
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// 设置最大重试次数
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// 设置重试延迟基数
    pub fn with_retry_delay_ms(mut self, millis: u64) -> Self {
        self.retry_delay_ms = millis;
        self
    }

    /// 设置并发请求数（至少为1）
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(Provider::Google)
    }
}

/// CLI参数结构
#[derive(Parser, Debug)]
#[command(author, version, about = "HTML抓取翻译工具 - 从翻译网站页面中提取译文", long_about = None)]
pub struct Cli {
    /// 待翻译文本
    #[arg(long, value_name = "TEXT", conflicts_with_all = ["file", "extract"])]
    pub text: Option<String>,

    /// 待翻译文件路径
    #[arg(short, long, value_name = "FILE", conflicts_with = "extract")]
    pub file: Option<PathBuf>,

    /// 输出文件路径 (可选，默认为 translated_<文件名>)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// 源语言代码
    #[arg(short, long, default_value = service_config::DEFAULT_SOURCE_LANG)]
    pub source: String,

    /// 目标语言代码 (如: zh, en, ja, fr)
    #[arg(short, long, default_value = service_config::DEFAULT_TARGET_LANG)]
    pub target: String,

    /// 翻译提供方
    #[arg(short, long, value_enum, default_value_t = Provider::Google)]
    pub provider: Provider,

    /// 代理地址 (如: http://127.0.0.1:7890)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// 请求超时时间（秒）
    #[arg(long, default_value_t = http_config::DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// 最大重试次数
    #[arg(long, default_value_t = http_config::DEFAULT_MAX_RETRIES)]
    pub max_retries: usize,

    /// 批量翻译的并发请求数
    #[arg(long, default_value_t = service_config::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// 离线提取模式：对本地HTML文件执行查询
    #[arg(long, value_name = "HTML_FILE")]
    pub extract: Option<PathBuf>,

    /// 提取模式下查询的标签名
    #[arg(long, default_value = "div")]
    pub tag: String,

    /// 提取模式下的属性条件
    #[arg(long, value_name = "KEY=VALUE", requires = "extract")]
    pub attr: Option<String>,

    /// 提取模式下输出全部匹配
    #[arg(long)]
    pub all: bool,

    /// 以JSON格式输出结果
    #[arg(long)]
    pub json: bool,

    /// 详细输出模式
    #[arg(short, long)]
    pub verbose: bool,

    /// 静默模式 (仅输出错误)
    #[arg(short, long)]
    pub quiet: bool,
}
