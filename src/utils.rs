use std::path::{Path, PathBuf};

use crate::error::{Result, TranslationError};
use crate::translation_error;

/// 初始化日志系统
pub fn init_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// 验证输入文件
pub fn validate_input_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(translation_error!(file_op, path.display(), "读取", "文件不存在"));
    }

    if !path.is_file() {
        return Err(translation_error!(file_op, path.display(), "读取", "路径不是文件"));
    }

    Ok(())
}

/// 生成翻译结果文件路径: translated_<文件名>
pub fn translated_output_path(input: &Path, output: Option<&Path>) -> PathBuf {
    if let Some(output_path) = output {
        return output_path.to_path_buf();
    }

    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.txt".to_string());

    PathBuf::from(format!("translated_{}", file_name))
}

/// 按最大字节数切分文本，切分点总是落在字符边界上
pub fn chunk_text(text: &str, max_bytes: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    let max_bytes = max_bytes.max(4);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_bytes {
        let mut cut = max_bytes;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);

    chunks
}

/// 解析 `key=value` 形式的属性条件
pub fn parse_attr_filter(filter: &str) -> Result<(String, String)> {
    match filter.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(TranslationError::Configuration {
            field: "attr".to_string(),
            reason: format!("属性条件应为 key=value 形式: {}", filter),
        }),
    }
}
