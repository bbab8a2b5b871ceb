use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use xsshound::error::CliError;
use xsshound::report::{self, OutputFormat};
use xsshound::xss::{
    self,
    config::{is_local_target, ScanData, ScanMode, XssConfig},
    dom::DomAnalyzer,
    http_client::HttpClient,
};

#[derive(Parser)]
#[command(name = "xsshound")]
#[command(version)]
#[command(about = "Cross-site scripting scanner (AUTHORIZED USE ONLY)", long_about = None)]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a single page (http(s) URL or file:// path)
    Scan {
        #[command(flatten)]
        options: ScanOptions,
    },

    /// Crawl same-origin pages, then scan every page found
    Crawl {
        #[command(flatten)]
        options: ScanOptions,

        /// Maximum crawl depth (fetch rounds)
        #[arg(long, default_value = "2")]
        depth: usize,

        /// Maximum concurrent fetches while crawling
        #[arg(long, default_value = "5")]
        concurrency: usize,
    },

    /// Print the static DOM-XSS report for one page
    Dom {
        /// Page URL or file:// path
        #[arg(short, long)]
        target: String,

        /// Request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
}

#[derive(Args)]
struct ScanOptions {
    /// Target URL or file:// path
    #[arg(short, long)]
    target: String,

    /// Confirm you are authorized to test this target
    #[arg(long)]
    confirm_authorized: bool,

    /// Only the basic payload category, no extra categories
    #[arg(long)]
    basic: bool,

    /// Add case-randomized, entity- and percent-encoded variants
    #[arg(long)]
    obfuscate: bool,

    /// Also try unicode-escaped, entity- and percent-encoded forms
    #[arg(long)]
    encode: bool,

    /// Fingerprint WAF responses
    #[arg(long)]
    waf: bool,

    /// Blind XSS collector URL (enables out-of-band probes)
    #[arg(long, value_name = "URL")]
    blind: Option<String>,

    /// Payload corpus (YAML: category -> list of payloads)
    #[arg(long)]
    payloads: Option<PathBuf>,

    /// WAF signature registry (JSON: name -> {code, headers, page})
    #[arg(long)]
    signatures: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Custom User-Agent string
    #[arg(long)]
    user_agent: Option<String>,

    /// Cookie string
    #[arg(long)]
    cookies: Option<String>,

    /// Additional header in key:value format (repeatable)
    #[arg(long = "header")]
    headers: Vec<String>,

    /// Output format: json, yaml or csv
    #[arg(short, long, default_value = "json")]
    output: String,

    /// Output file path (if not specified, writes to stdout)
    #[arg(long)]
    output_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "xsshound=debug" } else { "xsshound=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let result = tokio::select! {
        result = run_command(cli.command) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nReceived shutdown signal, stopping scan");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("\n⛔ {}", e);
        std::process::exit(1);
    }
}

async fn run_command(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Scan { options } => handle_scan(options, ScanMode::Single, 1, 1).await,
        Commands::Crawl {
            options,
            depth,
            concurrency,
        } => handle_scan(options, ScanMode::Crawl, depth, concurrency).await,
        Commands::Dom { target, timeout } => handle_dom(target, timeout).await,
    }
}

async fn handle_scan(
    options: ScanOptions,
    mode: ScanMode,
    max_depth: usize,
    max_concurrency: usize,
) -> Result<(), CliError> {
    if !options.confirm_authorized && !is_local_target(&options.target) {
        print_authorization_notice();
        std::process::exit(1);
    }

    let format: OutputFormat = options.output.parse()?;
    let custom_headers = parse_headers(&options.headers)?;

    let mut config = XssConfig {
        target: options.target,
        mode,
        max_depth,
        max_concurrency,
        timeout_secs: options.timeout,
        cookies: options.cookies,
        custom_headers,
        basic_only: options.basic,
        obfuscate: options.obfuscate,
        encode: options.encode,
        detect_waf: options.waf,
        blind_callback: options.blind,
        payload_file: options.payloads,
        signature_file: options.signatures,
        ..Default::default()
    };
    if let Some(user_agent) = options.user_agent {
        config.user_agent = user_agent;
    }

    config.validate()?;

    let data = Arc::new(ScanData::load(&config));
    let target = config.target.clone();
    let records = xss::scan_target(config, data).await?;

    xss::print_results(&target, &records);

    let rendered = report::render(&records, format)?;
    report::write_output(&rendered, options.output_file.as_deref())?;
    Ok(())
}

async fn handle_dom(target: String, timeout: u64) -> Result<(), CliError> {
    let config = XssConfig {
        target: target.clone(),
        timeout_secs: timeout,
        ..Default::default()
    };
    config.validate()?;

    let http_client = HttpClient::new(Arc::new(config))?;
    let html = xss::load_page(&http_client, &target).await?;

    println!("{}", DomAnalyzer::new().report(&html));
    Ok(())
}

fn parse_headers(raw: &[String]) -> Result<HashMap<String, String>, CliError> {
    let mut headers = HashMap::new();
    for header in raw {
        let Some((key, value)) = header.split_once(':') else {
            return Err(CliError::Validation(format!(
                "Header '{}' is not in key:value format",
                header
            )));
        };
        headers.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(headers)
}

fn print_authorization_notice() {
    eprintln!("\n{}", "═".repeat(70));
    eprintln!("  ⛔ AUTHORIZATION REQUIRED");
    eprintln!("{}", "═".repeat(70));
    eprintln!("This XSS scanner is for AUTHORIZED security testing ONLY.");
    eprintln!("\nYou must provide:");
    eprintln!("  --confirm-authorized  (acknowledges you have permission)");
    eprintln!("\nLocal file:// targets do not need it.");
    eprintln!("{}", "═".repeat(70));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers(&["X-Api-Key: abc".to_string(), "Accept:text/html".to_string()])
            .unwrap();
        assert_eq!(headers["X-Api-Key"], "abc");
        assert_eq!(headers["Accept"], "text/html");

        assert!(matches!(
            parse_headers(&["broken".to_string()]),
            Err(CliError::Validation(_))
        ));
    }

    #[test]
    fn test_cli_parses_crawl_flags() {
        let cli = Cli::parse_from([
            "xsshound", "crawl", "-t", "https://example.com", "--depth", "3", "--waf",
            "--header", "A:b", "--header", "C:d", "-o", "csv",
        ]);
        match cli.command {
            Commands::Crawl { options, depth, concurrency } => {
                assert_eq!(depth, 3);
                assert_eq!(concurrency, 5);
                assert!(options.waf);
                assert_eq!(options.headers.len(), 2);
                assert_eq!(options.output, "csv");
            }
            _ => panic!("expected crawl"),
        }
    }
}
