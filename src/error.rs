//! 统一错误处理模块
//!
//! 分两层：
//! - [`QueryError`]：解析/查询引擎的结果错误，作为值挂在查询结果上，从不panic
//! - [`TranslationError`]：翻译提供方与CLI层的统一错误类型

// 标准库导入
use std::fmt;

// 第三方crate导入
use anyhow::Error as AnyhowError;

/// 解析与查询引擎的错误
///
/// 链式查询时第一个出现的错误会原样向后传播。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// 输入无法构建任何可用的文档树（如空字符串）
    Parse {
        /// 失败原因
        reason: String,
    },

    /// `find` / `find_next_sibling` 没有找到匹配节点
    NotFound {
        /// 查询的标签名（兄弟查询时为空）
        tag: String,
        /// 查询的属性条件
        attr: Option<(String, String)>,
    },

    /// 传入了空的或非法的标签名/属性名
    InvalidArgument {
        /// 参数错误原因
        reason: String,
    },
}

impl QueryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::NotFound { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, QueryError::Parse { .. })
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Parse { reason } => write!(f, "HTML解析失败: {}", reason),
            QueryError::NotFound { tag, attr } => match (tag.is_empty(), attr) {
                (true, _) => write!(f, "未找到下一个兄弟节点"),
                (false, Some((key, value))) => {
                    write!(f, "未找到元素 <{} {}=\"{}\">", tag, key, value)
                }
                (false, None) => write!(f, "未找到元素 <{}>", tag),
            },
            QueryError::InvalidArgument { reason } => write!(f, "查询参数无效: {}", reason),
        }
    }
}

impl std::error::Error for QueryError {}

/// 翻译工具统一错误类型
#[derive(Debug)]
pub enum TranslationError {
    /// 网络请求相关错误
    Network {
        /// 错误消息
        message: String,
        /// HTTP状态码（如果适用）
        status_code: Option<u16>,
    },

    /// 服务端限流 (HTTP 429)
    TooManyRequests {
        /// 请求地址
        url: String,
    },

    /// 响应中没有找到译文
    TranslationNotFound {
        /// 翻译提供方名称
        provider: String,
    },

    /// 上游响应格式异常（HTML无法解析、JSON字段缺失等）
    MalformedResponse {
        /// 具体错误信息
        details: String,
    },

    /// 输入验证错误
    InputValidation {
        /// 输入值
        input: String,
        /// 验证失败原因
        reason: String,
    },

    /// 不支持的语言
    UnsupportedLanguage {
        /// 语言代码
        language: String,
    },

    /// 文件操作相关错误
    FileOperation {
        /// 文件路径
        path: String,
        /// 操作类型（读取、写入、创建等）
        operation: String,
        /// 底层错误信息
        source: String,
    },

    /// 配置相关错误
    Configuration {
        /// 配置项名称
        field: String,
        /// 错误原因
        reason: String,
    },

    /// 内部处理错误（包装anyhow::Error）
    Internal {
        /// 包装的错误
        source: AnyhowError,
    },
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::Network { message, status_code } => {
                if let Some(code) = status_code {
                    write!(f, "网络请求失败 [{}]: {}", code, message)
                } else {
                    write!(f, "网络请求失败: {}", message)
                }
            }
            TranslationError::TooManyRequests { url } => {
                write!(f, "请求过于频繁，请稍后再试: {}", url)
            }
            TranslationError::TranslationNotFound { provider } => {
                write!(f, "未找到译文 [{}]", provider)
            }
            TranslationError::MalformedResponse { details } => {
                write!(f, "上游响应格式异常: {}", details)
            }
            TranslationError::InputValidation { input, reason } => {
                write!(f, "输入验证失败 [{}]: {}", input, reason)
            }
            TranslationError::UnsupportedLanguage { language } => {
                write!(f, "不支持的语言: {}", language)
            }
            TranslationError::FileOperation { path, operation, source } => {
                write!(f, "文件{}操作失败 [{}]: {}", operation, path, source)
            }
            TranslationError::Configuration { field, reason } => {
                write!(f, "配置错误 [{}]: {}", field, reason)
            }
            TranslationError::Internal { source } => {
                write!(f, "内部处理错误: {}", source)
            }
        }
    }
}

impl std::error::Error for TranslationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TranslationError::Internal { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, TranslationError>;

/// 便捷的错误创建宏
#[macro_export]
macro_rules! translation_error {
    (network, $msg:expr) => {
        $crate::error::TranslationError::Network {
            message: $msg.to_string(),
            status_code: None,
        }
    };
    (network, $msg:expr, $code:expr) => {
        $crate::error::TranslationError::Network {
            message: $msg.to_string(),
            status_code: Some($code),
        }
    };
    (not_found, $provider:expr) => {
        $crate::error::TranslationError::TranslationNotFound {
            provider: $provider.to_string(),
        }
    };
    (malformed, $details:expr) => {
        $crate::error::TranslationError::MalformedResponse {
            details: $details.to_string(),
        }
    };
    (input_validation, $input:expr, $reason:expr) => {
        $crate::error::TranslationError::InputValidation {
            input: $input.to_string(),
            reason: $reason.to_string(),
        }
    };
    (file_op, $path:expr, $op:expr, $source:expr) => {
        $crate::error::TranslationError::FileOperation {
            path: $path.to_string(),
            operation: $op.to_string(),
            source: $source.to_string(),
        }
    };
    (config, $field:expr, $reason:expr) => {
        $crate::error::TranslationError::Configuration {
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
}

/// 从anyhow::Error转换为TranslationError
impl From<AnyhowError> for TranslationError {
    fn from(error: AnyhowError) -> Self {
        TranslationError::Internal { source: error }
    }
}

/// 从reqwest::Error转换为TranslationError
impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        TranslationError::Network {
            message: error.to_string(),
            status_code,
        }
    }
}

/// 从std::io::Error转换为TranslationError
impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::FileOperation {
            path: "unknown".to_string(),
            operation: "io".to_string(),
            source: error.to_string(),
        }
    }
}

/// 查询引擎错误在提供方边界上的映射：
/// 解析失败视为上游响应异常，找不到节点视为无译文
impl From<QueryError> for TranslationError {
    fn from(error: QueryError) -> Self {
        match error {
            QueryError::Parse { reason } => TranslationError::MalformedResponse { details: reason },
            QueryError::NotFound { .. } => TranslationError::TranslationNotFound {
                provider: "unknown".to_string(),
            },
            invalid @ QueryError::InvalidArgument { .. } => TranslationError::Internal {
                source: AnyhowError::new(invalid),
            },
        }
    }
}
