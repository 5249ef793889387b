use anyhow::{anyhow, Context, Result};
use clap::Parser;
use scrape_translator::config::{Cli, Provider, ProviderConfig};
use scrape_translator::translator::Translator;
use scrape_translator::utils::{init_logging, parse_attr_filter, validate_input_file};
use scrape_translator::{parse, NodeRef};
use serde_json::json;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    init_logging(cli.verbose, cli.quiet);

    let total_start = Instant::now();

    if let Err(e) = run(&cli).await {
        error!("❌ 执行失败: {:#}", e);
        std::process::exit(1);
    }

    debug!("⏱️ 总耗时: {:.3}秒", total_start.elapsed().as_secs_f64());
    Ok(())
}

async fn run(cli: &Cli) -> Result<()> {
    if let Some(html_file) = &cli.extract {
        return extract(cli, html_file);
    }

    let config = ProviderConfig::from_cli(cli);
    info!(
        "🌐 提供方: {} ({} → {})",
        config.provider(),
        config.source(),
        config.target()
    );
    let translator = Translator::new(config)?;

    if let Some(file) = &cli.file {
        validate_input_file(file)?;
        let output_path = translator.translate_file(file, cli.output.as_deref()).await?;
        if cli.json {
            println!(
                "{}",
                json!({ "input": file.display().to_string(), "output": output_path.display().to_string() })
            );
        } else {
            println!("{}", output_path.display());
        }
        return Ok(());
    }

    let text = cli
        .text
        .as_deref()
        .ok_or_else(|| anyhow!("请通过 --text、--file 或 --extract 指定输入"))?;

    if translator.config().provider() == Provider::Linguee {
        let candidates = translator.candidates(text).await?;
        if cli.json {
            println!(
                "{}",
                json!({
                    "provider": Provider::Linguee.name(),
                    "input": text,
                    "candidates": candidates,
                })
            );
        } else {
            for candidate in &candidates {
                println!("{}", candidate);
            }
        }
        return Ok(());
    }

    let translated = translator.translate(text).await?;
    if cli.json {
        println!(
            "{}",
            json!({
                "provider": translator.config().provider().name(),
                "source": translator.config().source(),
                "target": translator.config().target(),
                "input": text,
                "translation": translated,
            })
        );
    } else {
        println!("{}", translated);
    }
    Ok(())
}

/// 离线提取模式：对本地HTML文件执行一次查询并打印文本
fn extract(cli: &Cli, html_file: &Path) -> Result<()> {
    validate_input_file(html_file)?;
    let html = std::fs::read_to_string(html_file)
        .with_context(|| format!("无法读取HTML文件: {}", html_file.display()))?;

    let doc = parse(&html);
    debug!("🌳 文档节点数: {}", doc.len());
    let root = doc.root();
    let filter = cli.attr.as_deref().map(parse_attr_filter).transpose()?;

    let matches: Vec<NodeRef<'_>> = if cli.all {
        match &filter {
            Some((key, value)) => root.find_all_by_attr(&cli.tag, key, value)?,
            None => root.find_all(&cli.tag)?,
        }
    } else {
        let found = match &filter {
            Some((key, value)) => root.find_by_attr(&cli.tag, key, value),
            None => root.find(&cli.tag),
        };
        vec![found.into_result()?]
    };

    let texts = matches
        .iter()
        .map(NodeRef::full_text)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    info!("🔍 匹配到 {} 个元素", texts.len());

    if cli.json {
        let items: Vec<_> = matches
            .iter()
            .zip(&texts)
            .map(|(node, text)| {
                json!({
                    "tag": node.tag_name(),
                    "attrs": node.attrs(),
                    "text": text,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for text in &texts {
            println!("{}", text);
        }
    }
    Ok(())
}
