//! HTML处理模块
//!
//! 面向抓取场景的容错HTML解析：把任意（可能残缺的）HTML文本切分为
//! 开始标签、结束标签、自闭合标签和文本片段，再借助显式的打开元素栈构建文档树。
//!
//! - 结束标签与栈顶不匹配时，向下弹栈直到匹配；栈中根本没有同名元素时忽略该结束标签
//! - 空元素（`br`、`img`、`input` 等）不需要结束标签，也不会接收子节点
//! - 只解码 `&amp; &lt; &gt; &quot; &#39;`，其余字符引用原样保留
//! - 注释、`<!DOCTYPE>`、`<?...?>` 被跳过；`script`/`style` 内容按原始文本处理

// 标准库导入
use std::borrow::Cow;

// 第三方crate导入
use tracing::trace;

// 本地模块导入
use crate::dom::{Attributes, Document, DocumentBuilder, NodeId};
use crate::error::QueryError;

/// 最小字符引用解码表
const ENTITY_TABLE: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// 内容按原始文本处理的元素
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// 判断是否为空元素
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// 解码最小字符引用表，未识别的引用原样保留
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        match ENTITY_TABLE
            .iter()
            .find(|(entity, _)| rest.starts_with(entity))
        {
            Some((entity, replacement)) => {
                out.push_str(replacement);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// 词法单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    StartTag {
        name: String,
        attrs: Attributes,
        self_closing: bool,
    },
    EndTag(String),
    Text(String),
}

/// 把HTML文本切分为词法单元
///
/// 只在ASCII结构字节处切片，因此所有切片端点都是UTF-8字符边界。
pub(crate) fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    let flush_text = |tokens: &mut Vec<Token>, from: usize, to: usize| {
        if from < to {
            tokens.push(Token::Text(decode_entities(&input[from..to]).into_owned()));
        }
    };

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }

        let next = bytes.get(i + 1).copied();
        match next {
            // 注释
            Some(b'!') if input[i..].starts_with("<!--") => {
                flush_text(&mut tokens, text_start, i);
                i = match input[i + 4..].find("-->") {
                    Some(end) => i + 4 + end + 3,
                    None => bytes.len(),
                };
                text_start = i;
            }
            // DOCTYPE、CDATA等声明，以及处理指令
            Some(b'!') | Some(b'?') => {
                flush_text(&mut tokens, text_start, i);
                i = skip_past(bytes, i, b'>');
                text_start = i;
            }
            Some(b'/') if bytes.get(i + 2).is_some_and(u8::is_ascii_alphabetic) => {
                flush_text(&mut tokens, text_start, i);
                let name_end = scan_name(bytes, i + 2);
                let name = input[i + 2..name_end].to_ascii_lowercase();
                i = skip_past(bytes, name_end, b'>');
                tokens.push(Token::EndTag(name));
                text_start = i;
            }
            Some(c) if c.is_ascii_alphabetic() => {
                flush_text(&mut tokens, text_start, i);
                let (token, end) = read_start_tag(input, i + 1);
                i = end;

                let raw_text = match &token {
                    Token::StartTag {
                        name,
                        self_closing: false,
                        ..
                    } if RAW_TEXT_ELEMENTS.contains(&name.as_str()) => Some(name.clone()),
                    _ => None,
                };
                tokens.push(token);

                if let Some(name) = raw_text {
                    let close = find_raw_text_end(input, i, &name);
                    if close > i {
                        tokens.push(Token::Text(input[i..close].to_string()));
                    }
                    i = close;
                }
                text_start = i;
            }
            // 不构成标签的 '<' 按文本处理
            _ => {
                i += 1;
            }
        }
    }
    flush_text(&mut tokens, text_start, bytes.len());

    tokens
}

/// 从 `from` 开始跳过到 `target` 之后，找不到时返回输入末尾
fn skip_past(bytes: &[u8], from: usize, target: u8) -> usize {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|&b| b == target)
        .map_or(bytes.len(), |pos| from + pos + 1)
}

fn scan_name(bytes: &[u8], from: usize) -> usize {
    let mut end = from;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || matches!(bytes[end], b'-' | b'_' | b':')) {
        end += 1;
    }
    end
}

fn is_attr_name_byte(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'/' | b'>' | b'=' | b'"' | b'\'' | b'<')
}

/// 解析开始标签，`start` 指向标签名首字节；返回词法单元和标签之后的位置
fn read_start_tag(input: &str, start: usize) -> (Token, usize) {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let name_end = scan_name(bytes, start);
    let name = input[start..name_end].to_ascii_lowercase();

    let mut attrs = Attributes::new();
    let mut self_closing = false;
    let mut k = name_end;

    let skip_whitespace = |k: &mut usize| {
        while *k < len && bytes[*k].is_ascii_whitespace() {
            *k += 1;
        }
    };

    loop {
        skip_whitespace(&mut k);
        if k >= len {
            break;
        }
        match bytes[k] {
            b'>' => {
                k += 1;
                break;
            }
            b'/' => {
                if bytes.get(k + 1) == Some(&b'>') {
                    self_closing = true;
                    k += 2;
                    break;
                }
                k += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = k;
        while k < len && is_attr_name_byte(bytes[k]) {
            k += 1;
        }
        if attr_start == k {
            // 属性位置上的杂散引号等
            k += 1;
            continue;
        }
        let attr_name = input[attr_start..k].to_ascii_lowercase();

        skip_whitespace(&mut k);
        let mut value = String::new();
        if k < len && bytes[k] == b'=' {
            k += 1;
            skip_whitespace(&mut k);
            if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                let quote = bytes[k];
                let value_start = k + 1;
                let value_end = bytes[value_start..]
                    .iter()
                    .position(|&b| b == quote)
                    .map_or(len, |pos| value_start + pos);
                value = decode_entities(&input[value_start..value_end]).into_owned();
                k = (value_end + 1).min(len);
            } else {
                let value_start = k;
                while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                    k += 1;
                }
                value = decode_entities(&input[value_start..k]).into_owned();
            }
        }

        // 重复属性以第一次出现为准
        attrs.entry(attr_name).or_insert(value);
    }

    (
        Token::StartTag {
            name,
            attrs,
            self_closing,
        },
        k,
    )
}

/// 查找原始文本元素的结束标签位置（大小写不敏感），找不到时返回输入末尾
fn find_raw_text_end(input: &str, from: usize, name: &str) -> usize {
    let bytes = input.as_bytes();
    let close_len = name.len() + 2;
    let mut i = from;
    while let Some(rel) = bytes[i..].iter().position(|&b| b == b'<') {
        i += rel;
        if i + close_len <= bytes.len()
            && bytes[i + 1] == b'/'
            && bytes[i + 2..i + close_len].eq_ignore_ascii_case(name.as_bytes())
        {
            return i;
        }
        i += 1;
    }
    bytes.len()
}

/// 解析HTML文本，返回不可变的文档
///
/// 从不失败：空输入或没有任何可用内容时，返回携带 [`QueryError::Parse`] 的占位文档。
pub fn parse(html: &str) -> Document {
    if html.trim().is_empty() {
        return DocumentBuilder::placeholder(QueryError::Parse {
            reason: "输入为空".to_string(),
        });
    }

    let tokens = tokenize(html);
    let token_count = tokens.len();

    let mut builder = DocumentBuilder::new();
    let mut stack: Vec<NodeId> = vec![builder.root()];

    for token in tokens {
        let current = stack.last().copied().unwrap_or_else(|| builder.root());
        match token {
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => {
                let void = is_void_element(&name);
                let element = builder.append_element(current, name, attrs);
                if !void && !self_closing {
                    stack.push(element);
                }
            }
            Token::EndTag(name) => {
                // 合成根（下标0）永不出栈
                let matched = stack
                    .iter()
                    .skip(1)
                    .rposition(|&open| builder.tag(open) == Some(name.as_str()));
                if let Some(pos) = matched {
                    stack.truncate(pos + 1);
                }
            }
            Token::Text(text) => {
                // 顶层的纯空白文本没有意义，丢弃
                if stack.len() == 1 && text.trim().is_empty() {
                    continue;
                }
                builder.append_text(current, &text);
            }
        }
    }

    let doc = builder.finish();
    trace!(tokens = token_count, nodes = doc.len(), "HTML解析完成");
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn start(name: &str, attrs: &[(&str, &str)], self_closing: bool) -> Token {
        Token::StartTag {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            self_closing,
        }
    }

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize(r#"<p class="a">Hi</p>"#);
        assert_eq!(
            tokens,
            vec![
                start("p", &[("class", "a")], false),
                Token::Text("Hi".to_string()),
                Token::EndTag("p".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_attribute_forms() {
        let tokens = tokenize(r#"<input type=text value='it&#39;s' disabled data-x = "1" TYPE="dup"/>"#);
        assert_eq!(
            tokens,
            vec![start(
                "input",
                &[("type", "text"), ("value", "it's"), ("disabled", ""), ("data-x", "1")],
                true
            )]
        );
    }

    #[test]
    fn test_tokenize_skips_comments_and_doctype() {
        let tokens = tokenize("<!DOCTYPE html><!-- <p>hidden</p> --><?xml version=\"1.0\"?>a");
        assert_eq!(tokens, vec![Token::Text("a".to_string())]);
    }

    #[test]
    fn test_tokenize_unterminated_comment_consumes_rest() {
        let tokens = tokenize("a<!-- never closed <p>x</p>");
        assert_eq!(tokens, vec![Token::Text("a".to_string())]);
    }

    #[test]
    fn test_tokenize_stray_angle_bracket_is_text() {
        let tokens = tokenize("1 < 2 <= 3</>");
        assert_eq!(tokens, vec![Token::Text("1 < 2 <= 3</>".to_string())]);
    }

    #[test]
    fn test_tokenize_raw_text() {
        let tokens = tokenize("<script>if (a < b && c) { x = '</p>'; }</SCRIPT>after");
        assert_eq!(
            tokens,
            vec![
                start("script", &[], false),
                Token::Text("if (a < b && c) { x = '</p>'; }".to_string()),
                Token::EndTag("script".to_string()),
                Token::Text("after".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_multibyte_text() {
        let tokens = tokenize("<p title=\"你好\">翻译 — 结果</p>");
        assert_eq!(
            tokens,
            vec![
                start("p", &[("title", "你好")], false),
                Token::Text("翻译 — 结果".to_string()),
                Token::EndTag("p".to_string()),
            ]
        );
    }

    #[test_case("a &amp; b", "a & b"; "ampersand")]
    #[test_case("&lt;p&gt;", "<p>"; "angle brackets")]
    #[test_case("&quot;q&quot; &#39;s&#39;", "\"q\" 's'"; "quotes")]
    #[test_case("AT&T &nbsp; &copy; &#8212;", "AT&T &nbsp; &copy; &#8212;"; "unknown references pass through")]
    #[test_case("&amp;lt;", "&lt;"; "single pass")]
    #[test_case("tail &", "tail &"; "trailing ampersand")]
    fn test_decode_entities(input: &str, expected: &str) {
        assert_eq!(decode_entities(input), expected);
    }

    #[test]
    fn test_parse_root_is_html() {
        let doc = parse("<html><body><p>Hello, World!</p></body></html>");
        assert!(doc.is_ok());
        let root = doc.root();
        assert_eq!(root.tag_name(), Some("html"));

        let body = root.find("body");
        assert_eq!(body.tag_name(), Some("body"));
        let p = body.find("p");
        assert_eq!(p.tag_name(), Some("p"));
        assert_eq!(p.text().unwrap(), "Hello, World!");
    }

    #[test]
    fn test_parse_with_doctype_and_whitespace() {
        let doc = parse("<!DOCTYPE html>\n<html>\n<body><p>x</p></body>\n</html>\n");
        assert_eq!(doc.root().tag_name(), Some("html"));
        assert_eq!(doc.root().find("p").full_text().unwrap(), "x");
    }

    #[test]
    fn test_parse_fragment_with_siblings_gets_synthetic_root() {
        let doc = parse("<p>a</p><p>b</p>");
        assert!(doc.is_ok());
        assert_eq!(doc.root().tag_name(), Some(crate::dom::SYNTHETIC_ROOT_TAG));
        assert_eq!(doc.root().children().len(), 2);
        assert_eq!(doc.root().full_text().unwrap(), "ab");
    }

    #[test]
    fn test_parse_plain_text_gets_synthetic_root() {
        let doc = parse("just text");
        assert!(doc.is_ok());
        assert_eq!(doc.root().text().unwrap(), "just text");
    }

    #[test]
    fn test_parse_mismatched_close_pops_to_match() {
        let doc = parse("<div><p><b>bold</div><span>after</span>");
        let root = doc.root();
        assert_eq!(root.tag_name(), Some(crate::dom::SYNTHETIC_ROOT_TAG));

        let div = root.find("div");
        assert_eq!(div.full_text().unwrap(), "bold");
        // span 不在div内部
        assert!(div.find("span").error().is_some());
        assert_eq!(div.find_next_sibling().tag_name(), Some("span"));
    }

    #[test]
    fn test_parse_unmatched_close_is_ignored() {
        let doc = parse("<div><p>a</span>b</p></div>");
        let p = doc.root().find("p");
        assert_eq!(p.text().unwrap(), "ab");
    }

    #[test]
    fn test_parse_missing_close_tags() {
        let doc = parse("<ul><li>one<li>two</ul>");
        let items = doc.root().find_all("li").unwrap();
        assert_eq!(items.len(), 2);
        // 没有隐式闭合规则：第二个li嵌套在第一个li中
        assert_eq!(items[0].full_text().unwrap(), "onetwo");
        assert_eq!(items[1].full_text().unwrap(), "two");
    }

    #[test]
    fn test_parse_void_elements() {
        let doc = parse("<div>a<br>b<img src=\"x.png\">c<br/>d</div>");
        let div = doc.root();
        assert_eq!(div.children().len(), 7);
        assert_eq!(div.text().unwrap(), "abcd");

        let br = div.find("br");
        assert!(br.children().is_empty());
        assert_eq!(br.find_next_sibling().text_content(), Some("b"));
        assert_eq!(div.find("img").attr("src"), Some("x.png"));
    }

    #[test]
    fn test_parse_stray_void_close_tag() {
        let doc = parse("<p>a</br>b</p>");
        assert_eq!(doc.root().text().unwrap(), "ab");
    }

    #[test]
    fn test_parse_self_closing_non_void() {
        let doc = parse("<div><span/>text</div>");
        let span = doc.root().find("span");
        assert!(span.children().is_empty());
        assert_eq!(doc.root().text().unwrap(), "text");
    }

    #[test]
    fn test_parse_decodes_text_and_attributes() {
        let doc = parse(r#"<a title="Tom &amp; Jerry" href="?a=1&b=2">1 &lt; 2 &hellip;</a>"#);
        let a = doc.root();
        assert_eq!(a.attr("title"), Some("Tom & Jerry"));
        assert_eq!(a.attr("href"), Some("?a=1&b=2"));
        assert_eq!(a.text().unwrap(), "1 < 2 &hellip;");
    }

    #[test]
    fn test_parse_script_content_is_not_markup() {
        let doc = parse("<div><script>var s = '<p>not a paragraph</p>';</script><p>real</p></div>");
        let ps = doc.root().find_all("p").unwrap();
        assert_eq!(ps.len(), 1);
        assert_eq!(ps[0].full_text().unwrap(), "real");
    }

    #[test]
    fn test_parse_unterminated_tag_at_eof() {
        let doc = parse("<div>text<span class=\"x");
        let span = doc.root().find("span");
        assert!(span.is_ok());
        assert_eq!(span.attr("class"), Some("x"));
    }

    #[test_case(""; "empty")]
    #[test_case("   \n\t "; "whitespace only")]
    #[test_case("<!-- only a comment -->"; "comment only")]
    #[test_case("<!DOCTYPE html>"; "doctype only")]
    #[test_case("</div></p>"; "close tags only")]
    fn test_parse_without_content_is_parse_error(input: &str) {
        let doc = parse(input);
        assert!(doc.error().is_some_and(QueryError::is_parse));
        assert!(doc.root().error().is_some_and(QueryError::is_parse));
    }
}
