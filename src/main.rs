use std::io;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use bgp_peerfinder::analysis::{AnalysisOutcome, Analyzer};
use bgp_peerfinder::bgptools::BgpToolsClient;
use bgp_peerfinder::bgptools::download::Downloader;
use bgp_peerfinder::bgptools::whois::WhoisClient;
use bgp_peerfinder::config::{Config, Verbosity};
use bgp_peerfinder::error::AppResult;
use bgp_peerfinder::input::{self, Prompt};

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.verbosity);
    if let Some(path) = &config.source {
        tracing::info!("Loaded configuration from: {}", path.display());
    }

    let (target_asn, user_agent) = match resolve_target(&config) {
        Ok(values) => values,
        Err(e) if e.is_validation() => {
            eprintln!("Error: {}", e);
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let downloader = match Downloader::new(&config.base_url, &user_agent) {
        Ok(downloader) => downloader,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("\nChecking bgp.tools connectivity...");
    match downloader.check_connectivity() {
        Ok(status) => println!("✓ bgp.tools connectivity: OK (HTTP {})", status),
        Err(e) => {
            println!("✗ bgp.tools connectivity: FAILED ({})", e);
            println!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    }

    println!("\nStarting analysis for AS{}...", target_asn);
    println!("User-Agent: {}", user_agent);
    println!("{}", "=".repeat(50));

    let client = BgpToolsClient::new(
        WhoisClient::new(&config.whois_host, config.whois_port),
        downloader,
    );
    let analyzer = Analyzer::new(
        client,
        target_asn,
        user_agent,
        &config.output_dir,
        config.verbosity,
    );

    let result = analyzer.run();
    let status = exit_status(&result);

    match result {
        Ok(AnalysisOutcome::NoRelatedAsns) => {}
        Ok(AnalysisOutcome::Completed(summary)) => {
            println!("\nAS{} - {}", target_asn, summary.target_name);
            println!("Related ASNs:    {}", summary.related);
            println!(
                "Potential peers: {} -> {}",
                summary.classification.potential_peers.len(),
                summary.reports.potential_peers.display()
            );
            println!(
                "Other ASNs:      {} -> {}",
                summary.classification.other.len(),
                summary.reports.other_asns.display()
            );
        }
        Err(e) => {
            tracing::error!("ERROR during analysis: {}", e);
            if config.verbosity >= Verbosity::VERBOSE {
                let report = anyhow::Error::new(e).context("analysis aborted");
                tracing::error!("Traceback: {:?}", report);
            }
        }
    }

    ExitCode::from(status)
}

/// Process status for a finished analysis. Finding nothing related is not a
/// failure.
fn exit_status(result: &AppResult<AnalysisOutcome>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

// RUST_LOG wins when set; otherwise --debug picks the level
fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(verbosity.tracing_level()).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Validated target ASN and User-Agent, prompting for whatever is missing
fn resolve_target(config: &Config) -> AppResult<(u32, String)> {
    if !config.needs_prompt() {
        let asn = input::parse_asn(config.asn.as_deref().unwrap_or_default())?;
        let agent = input::validate_user_agent(config.user_agent.as_deref().unwrap_or_default())?;
        return Ok((asn, agent));
    }

    println!("No arguments provided, entering interactive mode...");
    println!();

    let stdin = io::stdin();
    let mut prompt = Prompt::new(stdin.lock(), io::stdout());
    prompt.banner()?;

    let asn = match config.asn.as_deref() {
        Some(raw) => input::parse_asn(raw)?,
        None => prompt.ask_asn()?,
    };
    let agent = match config.user_agent.as_deref() {
        Some(raw) => input::validate_user_agent(raw)?,
        None => prompt.ask_user_agent()?,
    };

    Ok((asn, agent))
}
