// src/main.rs

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use caseforge::config::CaseforgeConfig;
use caseforge::knowledge::{HttpKnowledgeBase, KnowledgeBase, NoopKnowledgeBase};
use caseforge::llm::OpenAiProvider;
use caseforge::pipeline::Orchestrator;

#[derive(Parser)]
#[command(name = "caseforge", about = "AI-assisted test case generation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full generation pipeline over a requirement document.
    Generate {
        /// Path to the requirement document (plain text with numbered headings).
        #[arg(long)]
        input: PathBuf,
        /// Write the batch as JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Named system to scope knowledge-base lookups to.
        #[arg(long)]
        system: Option<String>,
    },
    /// Check provider configuration and list available models.
    Probe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CaseforgeConfig::from_env();

    let level: Level = config.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let provider = OpenAiProvider::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.model.clone(),
    );

    match cli.command {
        Command::Probe => {
            let models = provider.probe(config.bootstrap_timeout()).await?;
            info!(count = models.len(), "provider reachable");
            for model in models {
                println!("{model}");
            }
        }
        Command::Generate { input, output, system } => {
            let document = tokio::fs::read_to_string(&input).await?;

            // Bounded provider-configuration discovery; generation calls
            // themselves run without a timeout.
            match provider.probe(config.bootstrap_timeout()).await {
                Ok(models) if !models.contains(&config.model) => {
                    warn!(model = %config.model, "configured model not advertised by provider");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "provider probe failed; continuing anyway"),
            }

            let knowledge: Arc<dyn KnowledgeBase> =
                match (config.kb_base_url.is_empty(), system) {
                    (false, Some(system)) => Arc::new(HttpKnowledgeBase::new(
                        config.kb_base_url.clone(),
                        system,
                    )),
                    _ => Arc::new(NoopKnowledgeBase),
                };

            let orchestrator = Orchestrator::new(config, Arc::new(provider), knowledge);

            let cancel = CancellationToken::new();
            let ctrl_c_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received; cancelling generation");
                    ctrl_c_cancel.cancel();
                }
            });

            let batch = orchestrator.generate(&document, cancel).await?;
            let json = serde_json::to_string_pretty(&batch)?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json).await?;
                    info!(path = %path.display(), "batch written");
                }
                None => println!("{json}"),
            }
        }
    }
    Ok(())
}
