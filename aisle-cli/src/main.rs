//! Interactive shell for the category curation engine.
//!
//! The first message generates a batch; later messages refine it. Slash
//! commands: `/reset` drops the batch, `/metrics` prints degrade counters,
//! `/quit` exits.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;

use aisle::{AisleConfig, Category, CurationOutcome, Curator, DegradedReason};

#[derive(Parser, Debug)]
#[command(name = "aisle", about = "LLM-driven shoppable category curation")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<String>,

    /// Provider type override (stub, openai, anthropic, hosted).
    #[arg(long)]
    provider: Option<String>,

    /// Model name override.
    #[arg(long)]
    model: Option<String>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(&args)?;
    if let Some(provider) = &args.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &args.model {
        config.llm.model = model.clone();
    }

    let mut curator = Curator::from_config(&config).context("failed to create provider")?;
    let info = curator.provider_info();
    println!("aisle — provider: {} ({})", info.name, info.model);
    println!("Describe what you want to shop for. /reset, /metrics, /quit.\n");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/reset" => {
                curator.reset();
                println!("Batch cleared.\n");
            }
            "/metrics" => {
                let summary = curator.metrics().summary();
                println!("{}\n", serde_json::to_string_pretty(&summary)?);
            }
            message => {
                let outcome = if curator.categories().is_empty() {
                    curator.generate(message).await
                } else {
                    curator.refine(message).await
                };
                render(&outcome, message);
            }
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<AisleConfig> {
    if let Some(path) = &args.config {
        return AisleConfig::from_file(path).with_context(|| format!("loading {}", path));
    }
    if let Some(config) = AisleConfig::from_env() {
        return Ok(config);
    }
    tracing::debug!("no config file or provider env vars, using stub provider");
    Ok(AisleConfig::default())
}

fn render(outcome: &CurationOutcome, base_query: &str) {
    if let Some(reason) = &outcome.degraded {
        println!("  (degraded: {})", describe_degrade(reason));
    }
    for category in shoppable(&outcome.categories) {
        println!(
            "  [{}] {} (priority {})",
            category.category_type.as_str(),
            category.name,
            category.priority
        );
        if !category.description.is_empty() {
            println!("      {}", category.description);
        }
        println!("      search: {}", category.search_query(base_query));
    }
    println!();
}

/// Categories without search terms cannot be shopped; skip them in display.
fn shoppable(categories: &[Category]) -> impl Iterator<Item = &Category> {
    categories.iter().filter(|c| !c.search_terms.is_empty())
}

fn describe_degrade(reason: &DegradedReason) -> String {
    match reason {
        DegradedReason::ProviderUnavailable(e) => format!("provider unavailable: {}", e),
        DegradedReason::UnparseableGeneration(e) => format!("unparseable response: {}", e),
        DegradedReason::ClassificationFallback(e) => {
            format!("classifier failed, regenerated: {}", e)
        }
        DegradedReason::NoTargetsResolved => "no matching categories, regenerated".to_string(),
        DegradedReason::UpdateFallback(e) => format!("update failed, regenerated: {}", e),
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
