//! 文档树模块
//!
//! 所有节点存放在同一个arena（`Vec<Node>`）中，通过 [`NodeId`] 下标互相引用。
//! 子节点列表只保存下标，父节点只记录下标，不存在所有权环。
//! 树构建完成后不可变，可被任意多个读者并发查询。

// 标准库导入
use std::collections::BTreeMap;

// 本地模块导入
use crate::error::QueryError;
use crate::query::NodeRef;

/// 合成根节点的标签名，不是合法标签名，因此永远不会被查询命中
pub const SYNTHETIC_ROOT_TAG: &str = "#root";

/// 属性表：属性名已小写，属性值保持原样
pub type Attributes = BTreeMap<String, String>;

/// arena中的节点下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 元素节点数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// 小写标签名
    pub tag: String,
    /// 属性表
    pub attrs: Attributes,
}

/// 节点类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// 元素
    Element(ElementData),
    /// 文本（实体已解码）
    Text(String),
}

/// arena中的一个节点
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }
}

/// 解析得到的文档
///
/// 持有整棵树以及可选的解析错误。解析失败时根节点是一个空的占位元素，
/// 而 [`Document::root`] 返回的句柄携带该解析错误，后续链式查询原样传播。
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    error: Option<QueryError>,
}

impl Document {
    /// 返回根节点的查询句柄
    pub fn root(&self) -> NodeRef<'_> {
        match &self.error {
            Some(error) => NodeRef::failed(self, error.clone()),
            None => NodeRef::new(self, self.root),
        }
    }

    /// 根节点下标（解析失败时为占位元素）
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// 解析错误
    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// 按下标获取节点
    ///
    /// 下标只能来自同一个文档，越界时返回 `None`。
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// arena中的节点数量（包括不可达的合成根节点）
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

/// 文档构建器，只供解析器使用
///
/// 始终以合成根元素开始；`finish` 时若顶层恰好只有一个元素，则提升它为根。
#[derive(Debug)]
pub(crate) struct DocumentBuilder {
    nodes: Vec<Node>,
}

impl DocumentBuilder {
    pub(crate) fn new() -> Self {
        let root = Node {
            kind: NodeKind::Element(ElementData {
                tag: SYNTHETIC_ROOT_TAG.to_string(),
                attrs: Attributes::new(),
            }),
            parent: None,
            children: Vec::new(),
        };
        Self { nodes: vec![root] }
    }

    pub(crate) fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// 在 `parent` 下追加一个元素
    pub(crate) fn append_element(&mut self, parent: NodeId, tag: String, attrs: Attributes) -> NodeId {
        self.push(parent, NodeKind::Element(ElementData { tag, attrs }))
    }

    /// 在 `parent` 下追加文本，与紧邻的前一个文本节点合并
    pub(crate) fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }

        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.0].kind {
                existing.push_str(text);
                return;
            }
        }

        self.push(parent, NodeKind::Text(text.to_string()));
    }

    pub(crate) fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].as_element().map(|element| element.tag.as_str())
    }

    pub(crate) fn finish(mut self) -> Document {
        let synthetic = self.root();
        let top_level = &self.nodes[synthetic.0].children;

        if top_level.is_empty() {
            return Self::placeholder(QueryError::Parse {
                reason: "输入中没有可用的HTML内容".to_string(),
            });
        }

        let promoted = match top_level.as_slice() {
            [only] if self.nodes[only.0].as_element().is_some() => Some(*only),
            _ => None,
        };

        let root = match promoted {
            Some(only) => {
                self.nodes[only.0].parent = None;
                self.nodes[synthetic.0].children.clear();
                only
            }
            None => synthetic,
        };

        Document {
            nodes: self.nodes,
            root,
            error: None,
        }
    }

    /// 仅含一个空占位元素、携带错误的文档
    pub(crate) fn placeholder(error: QueryError) -> Document {
        let builder = Self::new();
        Document {
            nodes: builder.nodes,
            root: NodeId(0),
            error: Some(error),
        }
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}
