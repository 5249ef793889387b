//! 翻译提供方模块
//!
//! 每个提供方只是一层很薄的胶水：构造请求URL → 获取响应 → 从HTML或JSON中提取译文。
//! HTML类提供方通过 [`crate::html_processor::parse`] 构建文档树，再用查询引擎定位译文容器。

// 标准库导入
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

// 第三方crate导入
use futures::future::join_all;
use regex::Regex;
use tracing::{debug, info};
use url::Url;

// 本地模块导入
use crate::api_constants::{
    element_queries, is_supported_language, is_valid_http_url, linguee_language_name,
    service_config,
};
use crate::config::{Provider, ProviderConfig};
use crate::error::{QueryError, Result, TranslationError};
use crate::html_processor::parse;
use crate::translation_error;
use crate::utils::{chunk_text, translated_output_path};
use crate::web_crawler::WebCrawler;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// 把查询引擎错误映射为带提供方名称的翻译错误
fn map_query_error(provider: Provider, error: QueryError) -> TranslationError {
    match error {
        QueryError::NotFound { .. } => translation_error!(not_found, provider),
        other => other.into(),
    }
}

/// 从Google翻译移动版页面中提取译文
///
/// 先查 `div.t0`，找不到时回退到 `div.result-container`。
pub fn extract_google_translation(html: &str) -> Result<String> {
    let doc = parse(html);
    let root = doc.root();

    let (tag, key, value) = element_queries::GOOGLE_RESULT;
    let mut element = root.find_by_attr(tag, key, value);
    if element.error().is_some_and(QueryError::is_not_found) {
        let (tag, key, value) = element_queries::GOOGLE_RESULT_FALLBACK;
        element = root.find_by_attr(tag, key, value);
    }

    let text = element
        .full_text()
        .map_err(|e| map_query_error(Provider::Google, e))?;
    if text.is_empty() {
        return Err(translation_error!(not_found, Provider::Google));
    }
    Ok(text)
}

/// 从Linguee词典页面中提取全部候选译文
///
/// 每个查询条件的结果依次拼接；链接中的代词占位（`span.placeholder`）会被去掉。
pub fn extract_linguee_candidates(html: &str) -> Result<Vec<String>> {
    let doc = parse(html);
    let root = doc.root();
    if let Some(error) = root.error() {
        return Err(map_query_error(Provider::Linguee, error.clone()));
    }

    let (placeholder_tag, placeholder_key, placeholder_value) = element_queries::LINGUEE_PLACEHOLDER;

    let mut candidates = Vec::new();
    for &(tag, key, value) in element_queries::LINGUEE_RESULTS {
        let links = root
            .find_all_by_attr(tag, key, value)
            .map_err(|e| map_query_error(Provider::Linguee, e))?;
        for link in links {
            let mut text = link.full_text().unwrap_or_default();
            if let Ok(pronoun) = link
                .find_by_attr(placeholder_tag, placeholder_key, placeholder_value)
                .full_text()
            {
                if !pronoun.is_empty() {
                    text = text.replace(&pronoun, "");
                }
            }

            let text = WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned();
            if !text.is_empty() {
                candidates.push(text);
            }
        }
    }

    if candidates.is_empty() {
        return Err(translation_error!(not_found, Provider::Linguee));
    }
    Ok(candidates)
}

/// 从MyMemory的JSON响应中提取译文 (`responseData.translatedText`)
pub fn extract_mymemory_translation(body: &str) -> Result<String> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| translation_error!(malformed, format!("JSON解析失败: {}", e)))?;

    let translated = json
        .get("responseData")
        .and_then(|data| data.get("translatedText"))
        .and_then(|text| text.as_str())
        .ok_or_else(|| translation_error!(malformed, "缺少 responseData.translatedText 字段"))?;

    if translated.trim().is_empty() {
        return Err(translation_error!(not_found, Provider::Mymemory));
    }
    Ok(translated.to_string())
}

/// 翻译器
pub struct Translator {
    config: ProviderConfig,
    crawler: WebCrawler,
}

impl Translator {
    /// 创建翻译器，校验语言并构建HTTP客户端
    pub fn new(config: ProviderConfig) -> Result<Self> {
        if !is_valid_http_url(config.base_url()) {
            return Err(translation_error!(config, "base_url", "仅支持http(s)地址"));
        }
        validate_languages(&config)?;
        let crawler = WebCrawler::new(&config)?;
        Ok(Self { config, crawler })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// 翻译一段文本
    ///
    /// 源语言与目标语言相同时原样返回；Linguee返回第一个候选译文。
    pub async fn translate(&self, text: &str) -> Result<String> {
        validate_text(text)?;
        if self.config.same_source_target() {
            return Ok(text.to_string());
        }

        match self.config.provider() {
            Provider::Google => {
                let url = self.google_url(text)?;
                let html = self.crawler.get(url.as_str()).await?;
                let translated = extract_google_translation(&html)?;
                if translated.trim() == text.trim() {
                    return Ok(text.to_string());
                }
                Ok(translated)
            }
            Provider::Linguee => {
                let mut candidates = self.linguee_candidates(text).await?;
                Ok(candidates.swap_remove(0))
            }
            Provider::Mymemory => {
                let url = self.mymemory_url(text)?;
                let body = self.crawler.get(url.as_str()).await?;
                extract_mymemory_translation(&body)
            }
        }
    }

    /// 查询单词的全部候选译文
    ///
    /// 只有Linguee会返回多个候选，其他提供方返回单个译文。
    pub async fn candidates(&self, word: &str) -> Result<Vec<String>> {
        match self.config.provider() {
            Provider::Linguee => self.linguee_candidates(word).await,
            _ => Ok(vec![self.translate(word).await?]),
        }
    }

    async fn linguee_candidates(&self, word: &str) -> Result<Vec<String>> {
        let word = word.trim();
        if word.is_empty() || word.chars().count() > service_config::LINGUEE_MAX_WORD_CHARS {
            return Err(translation_error!(
                input_validation,
                word,
                format!("单词长度应在1到{}个字符之间", service_config::LINGUEE_MAX_WORD_CHARS)
            ));
        }
        if self.config.same_source_target() {
            return Ok(vec![word.to_string()]);
        }

        let url = self.linguee_url(word)?;
        let html = self.crawler.get(url.as_str()).await?;
        let candidates = extract_linguee_candidates(&html)?;
        debug!("🔍 Linguee候选译文: {:?}", candidates);
        Ok(candidates)
    }

    /// 批量翻译
    ///
    /// 超长文本先按字节上限切块；所有块按并发上限分波发出，第一个错误终止整个批次。
    /// 结果与输入一一对应，切块的译文按原顺序拼接。
    pub async fn translate_batch(&self, texts: &[String]) -> Result<Vec<String>> {
        let pieces: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .flat_map(|(index, text)| {
                chunk_text(text, service_config::MAX_TEXT_BYTES)
                    .into_iter()
                    .map(move |chunk| (index, chunk))
            })
            .collect();

        info!(
            "🚀 批量翻译: {} 段文本切分为 {} 个请求",
            texts.len(),
            pieces.len()
        );

        let mut results = vec![String::new(); texts.len()];
        for wave in pieces.chunks(self.config.concurrency()) {
            let tasks = wave
                .iter()
                .map(|&(index, chunk)| async move { (index, self.translate_piece(chunk).await) });

            for (index, translated) in join_all(tasks).await {
                results[index].push_str(&translated?);
            }
        }

        Ok(results)
    }

    /// 翻译文件内容并写入 `translated_<文件名>`（或指定的输出路径）
    pub async fn translate_file(&self, path: &Path, output: Option<&Path>) -> Result<PathBuf> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| translation_error!(file_op, path.display(), "读取", e))?;
        info!("📂 读取文件: {} ({} 字节)", path.display(), content.len());

        let translated = self
            .translate_batch(std::slice::from_ref(&content))
            .await?
            .concat();

        let output_path = translated_output_path(path, output);
        std::fs::write(&output_path, &translated)
            .map_err(|e| translation_error!(file_op, output_path.display(), "写入", e))?;
        info!("📄 译文已写入: {}", output_path.display());

        Ok(output_path)
    }

    /// 纯空白块原样保留，避免空文本校验失败
    async fn translate_piece(&self, chunk: &str) -> Result<String> {
        if chunk.trim().is_empty() {
            return Ok(chunk.to_string());
        }
        self.translate(chunk).await
    }

    fn google_url(&self, text: &str) -> Result<Url> {
        Url::parse_with_params(
            self.config.base_url(),
            &[
                ("tl", self.config.target()),
                ("sl", self.config.source()),
                ("q", text),
            ],
        )
        .map_err(|e| translation_error!(config, "base_url", e))
    }

    fn mymemory_url(&self, text: &str) -> Result<Url> {
        let source = match self.config.source() {
            "auto" => "autodetect",
            other => other,
        };
        let langpair = format!("{}|{}", source, self.config.target());
        Url::parse_with_params(
            self.config.base_url(),
            &[("langpair", langpair.as_str()), ("q", text)],
        )
        .map_err(|e| translation_error!(config, "base_url", e))
    }

    fn linguee_url(&self, word: &str) -> Result<Url> {
        let source = linguee_name(self.config.source())?;
        let target = linguee_name(self.config.target())?;

        let base = Url::parse(self.config.base_url())
            .map_err(|e| translation_error!(config, "base_url", e))?;
        let mut url = base
            .join(&format!("{}-{}/search/", source, target))
            .map_err(|e| translation_error!(config, "base_url", e))?;
        url.query_pairs_mut()
            .append_pair("source", source)
            .append_pair("query", word);
        Ok(url)
    }
}

fn linguee_name(code: &str) -> Result<&'static str> {
    linguee_language_name(code).ok_or_else(|| TranslationError::UnsupportedLanguage {
        language: code.to_string(),
    })
}

fn validate_languages(config: &ProviderConfig) -> Result<()> {
    let (source, target) = (config.source(), config.target());

    if config.provider() == Provider::Linguee {
        linguee_name(source)?;
        linguee_name(target)?;
        return Ok(());
    }

    for language in [source, target] {
        if !is_supported_language(language) {
            return Err(TranslationError::UnsupportedLanguage {
                language: language.to_string(),
            });
        }
    }
    if target == "auto" {
        return Err(TranslationError::UnsupportedLanguage {
            language: target.to_string(),
        });
    }
    Ok(())
}

fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(translation_error!(input_validation, text, "文本为空"));
    }
    if text.len() > service_config::MAX_TEXT_BYTES {
        return Err(translation_error!(
            input_validation,
            format!("{}...", text.chars().take(20).collect::<String>()),
            format!("文本超过{}字节，请使用批量翻译", service_config::MAX_TEXT_BYTES)
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;

    const GOOGLE_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Google Translate</title></head>
<body>
  <div class="root-container">
    <div class="result-container">Bonjour, <b>le monde</b> !</div>
  </div>
</body></html>"#;

    const LINGUEE_PAGE: &str = r##"<html><body>
<div class="exact">
  <a class="dictLink featured" href="/french-english/translation/maison.html">maison</a>
  <a class="dictLink featured" href="#">  la <span class="placeholder">qn</span>  demeure </a>
  <a class="dictLink" href="#">foyer</a>
</div>
</body></html>"##;

    #[test]
    fn test_extract_google_prefers_t0() {
        let html = r#"<div><div class="t0">Hallo Welt</div><div class="result-container">x</div></div>"#;
        assert_eq!(extract_google_translation(html).unwrap(), "Hallo Welt");
    }

    #[test]
    fn test_extract_google_falls_back_to_result_container() {
        assert_eq!(extract_google_translation(GOOGLE_PAGE).unwrap(), "Bonjour, le monde !");
    }

    #[test]
    fn test_extract_google_missing_container() {
        let err = extract_google_translation("<html><body><p>nothing</p></body></html>").unwrap_err();
        match err {
            TranslationError::TranslationNotFound { provider } => assert_eq!(provider, "google"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_extract_google_empty_page_is_malformed() {
        let err = extract_google_translation("").unwrap_err();
        assert!(matches!(err, TranslationError::MalformedResponse { .. }));
    }

    #[test]
    fn test_extract_linguee_candidates() {
        let candidates = extract_linguee_candidates(LINGUEE_PAGE).unwrap();
        assert_eq!(candidates, vec!["maison".to_string(), "la demeure".to_string()]);
    }

    #[test]
    fn test_extract_linguee_without_featured_links() {
        let err = extract_linguee_candidates(r#"<div><a class="dictLink">x</a></div>"#).unwrap_err();
        assert!(matches!(err, TranslationError::TranslationNotFound { .. }));
    }

    #[test]
    fn test_extract_mymemory() {
        let body = r#"{"responseData":{"translatedText":"Bonjour","match":1},"responseStatus":200}"#;
        assert_eq!(extract_mymemory_translation(body).unwrap(), "Bonjour");

        let err = extract_mymemory_translation(r#"{"responseStatus":403}"#).unwrap_err();
        assert!(matches!(err, TranslationError::MalformedResponse { .. }));

        let err = extract_mymemory_translation("<html>").unwrap_err();
        assert!(matches!(err, TranslationError::MalformedResponse { .. }));
    }

    #[test]
    fn test_language_validation() {
        let bad_target = ProviderConfig::new(Provider::Google).with_languages("en", "xx");
        assert!(matches!(
            Translator::new(bad_target),
            Err(TranslationError::UnsupportedLanguage { .. })
        ));

        let auto_target = ProviderConfig::new(Provider::Mymemory).with_languages("en", "auto");
        assert!(Translator::new(auto_target).is_err());

        let linguee_auto = ProviderConfig::new(Provider::Linguee).with_languages("auto", "fr");
        assert!(Translator::new(linguee_auto).is_err());

        let linguee_ok = ProviderConfig::new(Provider::Linguee).with_languages("en", "fr");
        assert!(Translator::new(linguee_ok).is_ok());

        let bad_url = ProviderConfig::default().with_base_url("ftp://example.com/");
        assert!(matches!(
            Translator::new(bad_url),
            Err(TranslationError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_text_validation() {
        let translator = Translator::new(ProviderConfig::default()).unwrap();
        assert!(matches!(
            translator.translate("   ").await,
            Err(TranslationError::InputValidation { .. })
        ));

        let long = "a".repeat(service_config::MAX_TEXT_BYTES + 1);
        assert!(matches!(
            translator.translate(&long).await,
            Err(TranslationError::InputValidation { .. })
        ));
    }

    #[tokio::test]
    async fn test_same_language_short_circuits() {
        let config = ProviderConfig::default()
            .with_languages("en", "en")
            .with_base_url("http://127.0.0.1:9/");
        let translator = Translator::new(config).unwrap();
        assert_eq!(translator.translate("Hello").await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_google_translate_over_http() {
        let (url, _, requests) = serve(vec![("200 OK", GOOGLE_PAGE)]).await;
        let config = ProviderConfig::default()
            .with_languages("en", "fr")
            .with_base_url(&url);
        let translator = Translator::new(config).unwrap();

        let translated = translator.translate("Hello, world!").await.unwrap();
        assert_eq!(translated, "Bonjour, le monde !");

        let requests = requests.lock().await;
        let request_line = requests[0].lines().next().unwrap_or_default();
        assert!(request_line.starts_with("GET /?tl=fr&sl=en&q=Hello%2C+world%21 "));
    }

    #[tokio::test]
    async fn test_google_identical_result_returns_input() {
        let (url, _, _) = serve(vec![("200 OK", r#"<div><div class="t0"> Paris </div></div>"#)]).await;
        let config = ProviderConfig::default()
            .with_languages("en", "fr")
            .with_base_url(&url);
        let translator = Translator::new(config).unwrap();

        assert_eq!(translator.translate("Paris ").await.unwrap(), "Paris ");
    }

    #[tokio::test]
    async fn test_linguee_candidates_over_http() {
        let (url, _, requests) = serve(vec![("200 OK", LINGUEE_PAGE)]).await;
        let config = ProviderConfig::new(Provider::Linguee)
            .with_languages("en", "fr")
            .with_base_url(&url);
        let translator = Translator::new(config).unwrap();

        let candidates = translator.candidates("house").await.unwrap();
        assert_eq!(candidates, vec!["maison".to_string(), "la demeure".to_string()]);

        let requests = requests.lock().await;
        let request_line = requests[0].lines().next().unwrap_or_default();
        assert!(request_line
            .starts_with("GET /english-french/search/?source=english&query=house "));
    }

    #[tokio::test]
    async fn test_linguee_translate_returns_first_candidate() {
        let (url, hits, _) = serve(vec![("200 OK", LINGUEE_PAGE)]).await;
        let config = ProviderConfig::new(Provider::Linguee)
            .with_languages("en", "fr")
            .with_base_url(&url);
        let translator = Translator::new(config).unwrap();

        assert_eq!(translator.translate("house").await.unwrap(), "maison");
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_candidates_for_single_result_provider() {
        let body = r#"{"responseData":{"translatedText":"Haus"}}"#;
        let (url, _, _) = serve(vec![("200 OK", body)]).await;
        let config = ProviderConfig::new(Provider::Mymemory)
            .with_languages("en", "de")
            .with_base_url(&format!("{}get", url));
        let translator = Translator::new(config).unwrap();

        assert_eq!(translator.candidates("house").await.unwrap(), vec!["Haus".to_string()]);
    }

    #[tokio::test]
    async fn test_linguee_rejects_long_words() {
        let config = ProviderConfig::new(Provider::Linguee).with_languages("en", "fr");
        let translator = Translator::new(config).unwrap();
        let word = "x".repeat(service_config::LINGUEE_MAX_WORD_CHARS + 1);
        assert!(matches!(
            translator.candidates(&word).await,
            Err(TranslationError::InputValidation { .. })
        ));
        assert!(matches!(
            translator.candidates("  ").await,
            Err(TranslationError::InputValidation { .. })
        ));
    }

    #[tokio::test]
    async fn test_mymemory_over_http() {
        let body = r#"{"responseData":{"translatedText":"Hallo"}}"#;
        let (url, _, requests) = serve(vec![("200 OK", body)]).await;
        let config = ProviderConfig::new(Provider::Mymemory)
            .with_languages("auto", "de")
            .with_base_url(&format!("{}get", url));
        let translator = Translator::new(config).unwrap();

        assert_eq!(translator.translate("Hello").await.unwrap(), "Hallo");

        let requests = requests.lock().await;
        assert!(requests[0].starts_with("GET /get?langpair=autodetect%7Cde&q=Hello "));
    }

    #[tokio::test]
    async fn test_translate_batch_keeps_order() {
        let (url, hits, _) = serve(vec![("200 OK", r#"<div><div class="t0">ok</div></div>"#)]).await;
        let config = ProviderConfig::default()
            .with_languages("en", "fr")
            .with_base_url(&url)
            .with_concurrency(2);
        let translator = Translator::new(config).unwrap();

        let texts = vec!["one".to_string(), "  ".to_string(), "three".to_string()];
        let results = translator.translate_batch(&texts).await.unwrap();

        assert_eq!(results, vec!["ok".to_string(), "  ".to_string(), "ok".to_string()]);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_translate_batch_splits_long_text() {
        let (url, hits, _) = serve(vec![("200 OK", r#"<div><div class="t0">x</div></div>"#)]).await;
        let config = ProviderConfig::default()
            .with_languages("en", "fr")
            .with_base_url(&url);
        let translator = Translator::new(config).unwrap();

        let long = "word ".repeat(service_config::MAX_TEXT_BYTES / 5 * 2 + 1);
        let results = translator.translate_batch(&[long]).await.unwrap();

        assert_eq!(results, vec!["xxx".to_string()]);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_translate_batch_stops_on_error() {
        let (url, _, _) = serve(vec![("200 OK", "<p>no container</p>")]).await;
        let config = ProviderConfig::default()
            .with_languages("en", "fr")
            .with_base_url(&url);
        let translator = Translator::new(config).unwrap();

        let err = translator
            .translate_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::TranslationNotFound { .. }));
    }

    #[tokio::test]
    async fn test_translate_file() {
        let (url, _, _) = serve(vec![("200 OK", r#"<div><div class="t0">Bonjour</div></div>"#)]).await;
        let config = ProviderConfig::default()
            .with_languages("en", "fr")
            .with_base_url(&url);
        let translator = Translator::new(config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("hello.txt");
        let output = dir.path().join("hello_fr.txt");
        std::fs::write(&input, "Hello").unwrap();

        let written = translator.translate_file(&input, Some(&output)).await.unwrap();
        assert_eq!(written, output);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "Bonjour");
    }

    #[tokio::test]
    async fn test_translate_missing_file() {
        let translator = Translator::new(ProviderConfig::default()).unwrap();
        let err = translator
            .translate_file(Path::new("/definitely/not/here.txt"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::FileOperation { .. }));
    }
}
