/// 翻译服务相关常量
///
/// 统一管理各提供方的地址、页面结构查询条件和限制参数

/// 各提供方的服务地址
pub mod base_urls {
    /// Google翻译移动版页面（返回HTML）
    pub const GOOGLE_TRANSLATE: &str = "https://translate.google.com/m";

    /// Linguee词典
    pub const LINGUEE: &str = "https://www.linguee.com/";

    /// MyMemory翻译API（返回JSON）
    pub const MYMEMORY: &str = "https://api.mymemory.translated.net/get";
}

/// 页面结构查询条件：(标签, 属性名, 属性值)
pub mod element_queries {
    /// Google译文容器
    pub const GOOGLE_RESULT: (&str, &str, &str) = ("div", "class", "t0");

    /// Google译文容器（新版页面）
    pub const GOOGLE_RESULT_FALLBACK: (&str, &str, &str) = ("div", "class", "result-container");

    /// Linguee候选译文链接，可配置多个条件，结果依次拼接
    pub const LINGUEE_RESULTS: &[(&str, &str, &str)] = &[("a", "class", "dictLink featured")];

    /// Linguee链接中的代词占位，需要从译文中去掉
    pub const LINGUEE_PLACEHOLDER: (&str, &str, &str) = ("span", "class", "placeholder");
}

/// 翻译服务配置
pub mod service_config {
    /// 默认源语言
    pub const DEFAULT_SOURCE_LANG: &str = "auto";

    /// 默认目标语言
    pub const DEFAULT_TARGET_LANG: &str = "fr";

    /// 单次请求允许的最大文本字节数（超出部分按块切分）
    pub const MAX_TEXT_BYTES: usize = 5000;

    /// Linguee单词查询的最大字符数
    pub const LINGUEE_MAX_WORD_CHARS: usize = 50;

    /// 默认并发请求数量
    pub const DEFAULT_CONCURRENCY: usize = 5;

    /// 支持的语言代码
    pub const SUPPORTED_LANGUAGES: &[&str] = &[
        "zh", "en", "ja", "ko", "fr", "de", "es", "it", "pt", "ru", "ar", "hi", "th", "vi", "id",
        "ms", "tl", "nl", "sv", "da", "no", "fi", "pl", "cs", "sk", "hu", "ro", "bg", "hr", "sr",
        "sl", "et", "lv", "lt", "mt", "ga", "cy", "is", "mk", "sq", "el", "tr", "uk",
    ];

    /// Linguee使用语言全名构造URL
    pub const LINGUEE_LANGUAGES: &[(&str, &str)] = &[
        ("bg", "bulgarian"),
        ("cs", "czech"),
        ("da", "danish"),
        ("de", "german"),
        ("el", "greek"),
        ("en", "english"),
        ("es", "spanish"),
        ("et", "estonian"),
        ("fi", "finnish"),
        ("fr", "french"),
        ("hu", "hungarian"),
        ("it", "italian"),
        ("ja", "japanese"),
        ("lt", "lithuanian"),
        ("lv", "latvian"),
        ("mt", "maltese"),
        ("nl", "dutch"),
        ("pl", "polish"),
        ("pt", "portuguese"),
        ("ro", "romanian"),
        ("ru", "russian"),
        ("sk", "slovak"),
        ("sl", "slovene"),
        ("sv", "swedish"),
        ("zh", "chinese"),
    ];
}

/// HTTP请求配置
pub mod http_config {
    /// 默认请求超时时间（秒）
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// 默认User-Agent
    pub const DEFAULT_USER_AGENT: &str =
        "Mozilla/5.0 (compatible; ScrapeTranslator/0.1.0; +https://github.com/scrape-translator)";

    /// 默认最大重试次数
    pub const DEFAULT_MAX_RETRIES: usize = 3;

    /// 重试延迟基数（毫秒），第n次重试等待 n * 基数
    pub const RETRY_DELAY_BASE_MS: u64 = 1000;
}

/// 验证语言代码是否支持，源语言允许 `auto`
pub fn is_supported_language(lang: &str) -> bool {
    lang == "auto" || service_config::SUPPORTED_LANGUAGES.contains(&lang)
}

/// 语言代码到Linguee语言全名的映射
pub fn linguee_language_name(code: &str) -> Option<&'static str> {
    service_config::LINGUEE_LANGUAGES
        .iter()
        .find(|(lang, _)| *lang == code)
        .map(|(_, name)| *name)
}

/// 验证URL是否为HTTP(S)地址
pub fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
