//! textkit-cache: 结果缓存文件的查看、校验与清理工具
//!
//! Usage:
//!   textkit-cache stats [--dir <path>]                  Entry counts per operation
//!   textkit-cache verify [--dir <path>]                 Check every cache file parses
//!   textkit-cache clear <operation> [--dir <path>]      Empty one operation's cache
//!   textkit-cache key <operation> <text> [name=value]   Print the derived cache key

use anyhow::{bail, Context};
use std::path::PathBuf;
use textkit_memo::cache::{write_atomic, CacheKeyGenerator, CacheStore};
use textkit_memo::config::{CacheConfig, ENV_CACHE_DIR};
use textkit_memo::types::{Operation, TextRequest};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "stats" => cmd_stats(&args[2..]),
        "verify" => cmd_verify(&args[2..]),
        "clear" => cmd_clear(&args[2..]),
        "key" => cmd_key(&args[2..]),
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"textkit-cache: 结果缓存维护工具

USAGE:
    textkit-cache <COMMAND> [OPTIONS]

COMMANDS:
    stats [--dir <path>]                   Show entry counts per operation
    verify [--dir <path>]                  Check that every cache file parses
    clear <operation> [--dir <path>]       Remove all entries for one operation
    key <operation> <text> [name=value]    Print the cache key for a request
    version                                Show version information
    help                                   Show this help message

OPERATIONS:
    summarize, paraphrase, complete, grammar

ENVIRONMENT:
    TEXTKIT_CACHE_DIR                      Cache directory (default: ./cache)
    RUST_LOG                               Log filter (default: warn)"#
    );
}

fn cmd_version() {
    println!("textkit-cache {}", env!("CARGO_PKG_VERSION"));
}

/// `--dir` wins over the environment, which wins over the default.
fn resolve_config(args: &[String]) -> anyhow::Result<CacheConfig> {
    let mut cfg = CacheConfig::from_env().context("reading cache configuration")?;
    for (i, arg) in args.iter().enumerate() {
        if arg == "--dir" {
            match args.get(i + 1) {
                Some(path) => cfg.cache_dir = PathBuf::from(path),
                None => bail!("--dir requires a path (or set {ENV_CACHE_DIR})"),
            }
        }
    }
    Ok(cfg)
}

/// Positional arguments with `--dir <path>` removed.
fn positional(args: &[String]) -> Vec<&String> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        if arg == "--dir" {
            skip = true;
            continue;
        }
        out.push(arg);
    }
    out
}

fn cmd_stats(args: &[String]) -> anyhow::Result<()> {
    let cfg = resolve_config(args)?;
    println!("Cache directory: {}", cfg.cache_dir.display());
    println!();
    let mut total = 0usize;
    for op in Operation::ALL {
        let path = cfg.path_for(op);
        let store = CacheStore::load(&path);
        let lists = store.iter().filter(|(_, v)| v.as_list().is_some()).count();
        println!(
            "  {:<12} {:>6} entries ({} lists)  {}",
            op.as_str(),
            store.len(),
            lists,
            path.display()
        );
        total += store.len();
    }
    println!();
    println!("{total} entries total");
    Ok(())
}

fn cmd_verify(args: &[String]) -> anyhow::Result<()> {
    let cfg = resolve_config(args)?;
    let mut failed = Vec::new();
    for op in Operation::ALL {
        let path = cfg.path_for(op);
        if !path.exists() {
            println!("  - {:<12} (no file)", op.as_str());
            continue;
        }
        match CacheStore::read(&path) {
            Ok(store) => println!("  ✓ {:<12} {} entries", op.as_str(), store.len()),
            Err(e) => {
                println!("  ✗ {:<12} {}", op.as_str(), e);
                failed.push(op);
            }
        }
    }
    if !failed.is_empty() {
        bail!(
            "{} cache file(s) unreadable; they will load as empty",
            failed.len()
        );
    }
    Ok(())
}

fn cmd_clear(args: &[String]) -> anyhow::Result<()> {
    let cfg = resolve_config(args)?;
    let pos = positional(args);
    let Some(name) = pos.first() else {
        bail!("clear requires an operation");
    };
    let op: Operation = name.parse()?;
    let path = cfg.path_for(op);
    let before = CacheStore::load(&path).len();
    write_atomic(&path, &CacheStore::new().to_bytes()?)?;
    println!("Cleared {before} {op} entries from {}", path.display());
    Ok(())
}

fn cmd_key(args: &[String]) -> anyhow::Result<()> {
    let pos = positional(args);
    if pos.len() < 2 {
        bail!("key requires an operation and a text");
    }
    let op: Operation = pos[0].parse()?;
    let text = pos[1].as_str();
    let mut params = Vec::new();
    for raw in &pos[2..] {
        let Some((name, value)) = raw.split_once('=') else {
            bail!("parameter must look like name=value, got {raw:?}");
        };
        params.push((name.to_string(), value.to_string()));
    }
    let cfg = resolve_config(args)?;
    let request = TextRequest::from_params(op, text, &params)?;
    let mut keys = CacheKeyGenerator::new();
    if let Some(salt) = cfg.key_salt {
        keys = keys.with_salt(salt);
    }
    let key = keys.key_for_request(&request);
    for (name, value) in request.key_params() {
        println!("  {name} = {value}");
    }
    println!("{key}");
    Ok(())
}
