use clap::Parser;
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "npm-advisory-import")]
#[command(about = "Warm the advisory cache by importing packages through the API", long_about = None)]
#[command(version = VERSION)]
struct Args {
    /// Package name(s) to import, e.g. left-pad or @types/node
    #[arg(required = true)]
    packages: Vec<String>,

    /// Base URL of the advisory server
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    server: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "npm_advisory_import=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let base = args.server.trim_end_matches('/');
    let client = reqwest::Client::new();

    let mut failures = 0usize;

    for name in &args.packages {
        let url = format!("{}/api/packages/{}", base, name);

        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let versions = response
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v["versions"].as_array().map(|a| a.len()))
                    .unwrap_or(0);
                println!(
                    "{} {} ({} versions)",
                    "imported".green().bold(),
                    name,
                    versions
                );
            }
            Ok(response) => {
                failures += 1;
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                eprintln!("{} {}: {} {}", "failed".red().bold(), name, status, body);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {}", "failed".red().bold(), name, e);
            }
        }
    }

    if failures > 0 {
        process::exit(1);
    }
}
