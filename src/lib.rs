//! Scrape Translator - 容错HTML树引擎与网页翻译工具库
//!
//! 这个库提供两层功能：
//! - 树引擎：把任意（可能残缺的）HTML解析成只读文档树，并提供链式查询
//! - 翻译胶水：抓取翻译网站页面，用树引擎定位并提取译文
//!
//! ```rust
//! use scrape_translator::parse;
//!
//! let doc = parse(r#"<div><p class="x">First</p><p>Second</p></div>"#);
//! let first = doc.root().find_by_attr("p", "class", "x");
//! assert_eq!(first.full_text().unwrap(), "First");
//! assert_eq!(first.find_next_sibling().text().unwrap(), "Second");
//! ```

pub mod api_constants;
pub mod config;
pub mod dom;
pub mod error;
pub mod html_processor;
pub mod query;
pub mod translator;
pub mod utils;
pub mod web_crawler;

#[cfg(test)]
mod test_support;

pub use dom::{Document, NodeId};
pub use error::{QueryError, TranslationError};
pub use html_processor::parse;
pub use query::NodeRef;
