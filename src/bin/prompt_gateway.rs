//! prompt-gateway — 通过合并式缓存网关执行一次生成请求的命令行工具
//!
//! Usage:
//!   prompt-gateway <image|text|gpt> <prompt> [--store <dir>] [--out <file>]

use anyhow::{bail, Context};
use prompt_gateway::cache::FsStore;
use prompt_gateway::types::PayloadKind;
use prompt_gateway::{
    Gateway, GatewayConfig, HttpBackend, HttpBackendConfig, ModelKind, Payload, ResponseSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE_DIR: &str = ".prompt-gateway-cache";

struct Args {
    kind: ModelKind,
    prompt: String,
    store: PathBuf,
    out: Option<PathBuf>,
}

fn print_usage() {
    println!(
        r#"prompt-gateway — 合并式缓存网关命令行工具

USAGE:
    prompt-gateway <image|text|gpt> <prompt> [OPTIONS]

OPTIONS:
    --store <dir>      Cache directory (default: {DEFAULT_STORE_DIR})
    --out <file>       Write the payload to a file instead of stdout
    --help             Show this help message

ENVIRONMENT:
    AWS_REGION                  Backend region (default: us-east-1)
    GATEWAY_BASE_URL            Override the backend base URL
    BEDROCK_API_KEY             Bearer token for the backend
    GATEWAY_FINGERPRINT_LENGTH  Hex characters kept from the fingerprint
    GATEWAY_MAX_RETRIES         Retries on 429/401/403
    GATEWAY_BASE_DELAY_MS       First retry delay in milliseconds
    RUST_LOG                    Log filter (default: prompt_gateway=info)"#
    );
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<Args>> {
    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Ok(None);
    }

    let mut positional = Vec::new();
    let mut store = PathBuf::from(DEFAULT_STORE_DIR);
    let mut out = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--store" => {
                store = PathBuf::from(iter.next().context("--store requires a directory")?);
            }
            "--out" => {
                out = Some(PathBuf::from(iter.next().context("--out requires a file path")?));
            }
            other if other.starts_with("--") => bail!("unknown option: {other}"),
            other => positional.push(other.to_string()),
        }
    }

    let [route, prompt] = <[String; 2]>::try_from(positional)
        .map_err(|_| anyhow::anyhow!("expected <image|text|gpt> <prompt>"))?;
    let kind = ModelKind::from_route_prefix(&route)
        .with_context(|| format!("unknown route '{route}', use image, text or gpt"))?;

    if kind.payload_kind() == PayloadKind::Binary && out.is_none() {
        bail!("{route} produces binary output; pass --out <file>");
    }

    Ok(Some(Args {
        kind,
        prompt,
        store,
        out,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prompt_gateway=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    let backend = HttpBackend::new(HttpBackendConfig::from_env())?;
    let store = FsStore::open(&args.store)
        .await
        .with_context(|| format!("opening cache directory {}", args.store.display()))?;
    tracing::debug!(store = %store.root().display(), "cache directory ready");
    let gateway = Gateway::builder()
        .config(GatewayConfig::from_env())
        .backend(Arc::new(backend))
        .store(Arc::new(store))
        .build()?;

    let response = gateway.handle(&args.prompt, args.kind).await?;
    let origin = match response.source {
        ResponseSource::Cache => "cache",
        ResponseSource::Generated => "backend",
    };
    eprintln!("{} ({}, {} bytes)", response.content_type, origin, response.payload.len());

    match (&args.out, &response.payload) {
        (Some(path), payload) => {
            tokio::fs::write(path, payload.as_bytes())
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        (None, Payload::Text(text)) => println!("{text}"),
        (None, Payload::Binary(_)) => bail!("binary payload; pass --out <file> to save it"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(&args(&["image", "a fox", "--out", "fox.png"]))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.kind, ModelKind::TitanImage);
        assert_eq!(parsed.prompt, "a fox");
        assert_eq!(parsed.out, Some(PathBuf::from("fox.png")));
        assert_eq!(parsed.store, PathBuf::from(DEFAULT_STORE_DIR));
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(&args(&["video", "x"])).is_err());
        assert!(parse_args(&args(&["text"])).is_err());
        assert!(parse_args(&args(&["text", "x", "--store"])).is_err());
        assert!(parse_args(&args(&["text", "x", "--bogus"])).is_err());
        assert!(parse_args(&args(&["image", "a fox"])).is_err());
        assert!(parse_args(&args(&["--help"])).unwrap().is_none());
    }
}
