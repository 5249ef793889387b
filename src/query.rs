//! 结构化查询模块
//!
//! 在已解析的 [`Document`] 上做只读遍历：按标签/属性查找、兄弟节点、子节点、文本提取。
//! 每个查询都返回句柄形式的 [`NodeRef`]，它要么指向一个节点，要么携带一个 [`QueryError`]。
//! 携带错误的句柄上的任何查询都不做遍历，直接返回同一个错误，
//! 因此 `root.find("div").find("span").full_text()` 这样的链式调用是安全的。

// 标准库导入
use std::sync::LazyLock;

// 第三方crate导入
use regex::Regex;

// 本地模块导入
use crate::dom::{Attributes, Document, NodeId, NodeKind};
use crate::error::QueryError;

static EMPTY_ATTRIBUTES: Attributes = Attributes::new();

static TAG_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9:_-]*$").unwrap());

/// 查询结果句柄
///
/// 借用所属文档，是树的视图而不是拷贝。
#[derive(Debug, Clone)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    state: Result<NodeId, QueryError>,
}

/// 标签 + 可选的单个属性精确匹配条件
#[derive(Debug, Clone)]
struct Matcher<'q> {
    tag: String,
    attr: Option<(String, &'q str)>,
}

impl<'q> Matcher<'q> {
    fn new(tag: &str, attr: Option<(&str, &'q str)>) -> Result<Self, QueryError> {
        if tag.is_empty() {
            return Err(QueryError::InvalidArgument {
                reason: "标签名为空".to_string(),
            });
        }
        if !TAG_NAME_PATTERN.is_match(tag) {
            return Err(QueryError::InvalidArgument {
                reason: format!("非法标签名: {:?}", tag),
            });
        }

        let attr = match attr {
            Some((key, _)) if key.trim().is_empty() => {
                return Err(QueryError::InvalidArgument {
                    reason: "属性名为空".to_string(),
                })
            }
            Some((key, value)) => Some((key.to_ascii_lowercase(), value)),
            None => None,
        };

        Ok(Self {
            tag: tag.to_ascii_lowercase(),
            attr,
        })
    }

    fn matches(&self, kind: &NodeKind) -> bool {
        let NodeKind::Element(element) = kind else {
            return false;
        };
        if element.tag != self.tag {
            return false;
        }
        match &self.attr {
            Some((key, value)) => element.attrs.get(key).is_some_and(|actual| actual == value),
            None => true,
        }
    }

    fn not_found(&self) -> QueryError {
        QueryError::NotFound {
            tag: self.tag.clone(),
            attr: self
                .attr
                .as_ref()
                .map(|(key, value)| (key.clone(), value.to_string())),
        }
    }
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(doc: &'a Document, id: NodeId) -> Self {
        Self { doc, state: Ok(id) }
    }

    pub(crate) fn failed(doc: &'a Document, error: QueryError) -> Self {
        Self {
            doc,
            state: Err(error),
        }
    }

    /// 所属文档
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// 节点下标，错误句柄返回 `None`
    pub fn id(&self) -> Option<NodeId> {
        self.state.as_ref().ok().copied()
    }

    /// 句柄携带的错误
    pub fn error(&self) -> Option<&QueryError> {
        self.state.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.state.is_ok()
    }

    /// 转为 `Result`，便于在调用方用 `?` 传播
    pub fn into_result(self) -> Result<Self, QueryError> {
        match self.state {
            Ok(_) => Ok(self),
            Err(error) => Err(error),
        }
    }

    /// 元素的标签名；文本节点和错误句柄返回 `None`
    pub fn tag_name(&self) -> Option<&'a str> {
        let id = self.id()?;
        self.doc
            .node(id)
            .as_element()
            .map(|element| element.tag.as_str())
    }

    pub fn is_text(&self) -> bool {
        self.id()
            .is_some_and(|id| matches!(self.doc.node(id).kind, NodeKind::Text(_)))
    }

    /// 在子树中（不含自身）按先序查找第一个标签匹配的元素
    pub fn find(&self, tag: &str) -> NodeRef<'a> {
        self.find_matching(tag, None)
    }

    /// 在子树中按先序查找第一个标签匹配且属性 `key` 的值恰好等于 `value` 的元素
    ///
    /// 属性值按整串比较，`class="a b"` 不会匹配 `class="a"`。
    pub fn find_by_attr(&self, tag: &str, key: &str, value: &str) -> NodeRef<'a> {
        self.find_matching(tag, Some((key, value)))
    }

    /// 与 [`NodeRef::find`] 相同的匹配条件，按先序收集全部匹配
    ///
    /// 没有匹配时返回空列表；参数非法或句柄本身携带错误时返回 `Err`。
    pub fn find_all(&self, tag: &str) -> Result<Vec<NodeRef<'a>>, QueryError> {
        self.find_all_matching(tag, None)
    }

    pub fn find_all_by_attr(
        &self,
        tag: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<NodeRef<'a>>, QueryError> {
        self.find_all_matching(tag, Some((key, value)))
    }

    /// 父节点子列表中的下一个节点（可能是文本节点）
    pub fn find_next_sibling(&self) -> NodeRef<'a> {
        let id = match &self.state {
            Ok(id) => *id,
            Err(error) => return self.propagate(error),
        };

        let next = self.doc.node(id).parent.and_then(|parent| {
            let siblings = &self.doc.node(parent).children;
            let position = siblings.iter().position(|&sibling| sibling == id)?;
            siblings.get(position + 1).copied()
        });

        match next {
            Some(next) => NodeRef::new(self.doc, next),
            None => NodeRef::failed(
                self.doc,
                QueryError::NotFound {
                    tag: String::new(),
                    attr: None,
                },
            ),
        }
    }

    /// 元素的属性表；文本节点或错误句柄返回空表
    pub fn attrs(&self) -> &'a Attributes {
        self.id()
            .and_then(|id| self.doc.node(id).as_element())
            .map_or(&EMPTY_ATTRIBUTES, |element| &element.attrs)
    }

    /// 按属性名（大小写不敏感）取单个属性值
    pub fn attr(&self, key: &str) -> Option<&'a str> {
        self.attrs()
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 直接子节点，按文档顺序
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match &self.state {
            Ok(id) => self
                .doc
                .node(*id)
                .children
                .iter()
                .map(|&child| NodeRef::new(self.doc, child))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// 直接文本子节点的拼接，不做trim
    ///
    /// 嵌套在子元素中的文本不计入；文本节点没有子节点，结果为空串。
    pub fn text(&self) -> Result<String, QueryError> {
        let id = self.state.clone()?;
        Ok(self
            .doc
            .node(id)
            .children
            .iter()
            .filter_map(|&child| self.doc.node(child).as_text())
            .collect())
    }

    /// 文本节点自身的内容；元素和错误句柄返回 `None`
    pub fn text_content(&self) -> Option<&'a str> {
        let id = self.id()?;
        self.doc.node(id).as_text()
    }

    /// 子树中所有文本节点按先序拼接，并去除首尾空白
    pub fn full_text(&self) -> Result<String, QueryError> {
        let id = self.state.clone()?;
        let mut out = String::new();

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.doc.node(current);
            match &node.kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Element(_) => stack.extend(node.children.iter().rev().copied()),
            }
        }

        Ok(out.trim().to_string())
    }

    fn propagate(&self, error: &QueryError) -> NodeRef<'a> {
        NodeRef::failed(self.doc, error.clone())
    }

    fn find_matching(&self, tag: &str, attr: Option<(&str, &str)>) -> NodeRef<'a> {
        let id = match &self.state {
            Ok(id) => *id,
            Err(error) => return self.propagate(error),
        };
        let matcher = match Matcher::new(tag, attr) {
            Ok(matcher) => matcher,
            Err(error) => return NodeRef::failed(self.doc, error),
        };

        match self.descendants(id).find(|&candidate| matcher.matches(&self.doc.node(candidate).kind)) {
            Some(found) => NodeRef::new(self.doc, found),
            None => NodeRef::failed(self.doc, matcher.not_found()),
        }
    }

    fn find_all_matching(
        &self,
        tag: &str,
        attr: Option<(&str, &str)>,
    ) -> Result<Vec<NodeRef<'a>>, QueryError> {
        let id = self.state.clone()?;
        let matcher = Matcher::new(tag, attr)?;

        Ok(self
            .descendants(id)
            .filter(|&candidate| matcher.matches(&self.doc.node(candidate).kind))
            .map(|found| NodeRef::new(self.doc, found))
            .collect())
    }

    /// 先序遍历 `id` 的后代（不含自身）
    fn descendants(&self, id: NodeId) -> Descendants<'a> {
        let mut stack: Vec<NodeId> = self.doc.node(id).children.clone();
        stack.reverse();
        Descendants {
            doc: self.doc,
            stack,
        }
    }
}

struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.node(current).children.iter().rev().copied());
        Some(current)
    }
}
