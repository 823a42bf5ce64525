//! Domain Model CLI
//!
//! Builds a domain model from a document tree and checks, exports or
//! inspects it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use domain_schemas::{load_directory, BuildOutput, DependencyGraph, ModelConfig, ModelError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "domain-model")]
#[command(about = "Validate, normalize and analyze a domain model")]
struct Cli {
    /// Configuration file (defaults to domain-model.toml lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the model and report every problem found
    Check {
        /// Root of the document tree
        dir: PathBuf,
    },

    /// Write the normalized model as JSON
    Export {
        /// Root of the document tree
        dir: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print typed dependencies and containment cycles
    Deps {
        /// Root of the document tree
        dir: PathBuf,
        /// Only show edges leaving this schema id
        #[arg(short, long)]
        schema: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().to_string());
    let config = ModelConfig::load_from(config_path.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Check { dir } => {
            let output = build(&dir, &config)?;
            print_warnings(&output);
            println!(
                "✅ {} module(s), {} schema(s), {} warning(s)",
                output.model.modules().len(),
                output.model.schemas().len(),
                output.warnings.len()
            );
            Ok(())
        }

        Commands::Export { dir, output } => {
            let built = build(&dir, &config)?;
            print_warnings(&built);
            let json = serde_json::to_string_pretty(&built.model)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
                    println!("✅ Exported {} schema(s) to {}", built.model.schemas().len(), path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }

        Commands::Deps { dir, schema } => {
            let built = build(&dir, &config)?;
            let graph = DependencyGraph::from_model(&built.model)?;

            let edges: Vec<_> = match &schema {
                Some(id) => {
                    if built.model.schema(id).is_none() {
                        return Err(ModelError::SchemaNotFound { id: id.clone() }.into());
                    }
                    graph.edges_from(id).collect()
                }
                None => graph.edges().collect(),
            };

            for edge in &edges {
                println!(
                    "{}{} --{}{}--> {}{}",
                    edge.from_schema,
                    edge.from_definition_name.as_ref().map(|d| format!("#{}", d)).unwrap_or_default(),
                    edge.kind,
                    if edge.is_array { "[]" } else { "" },
                    edge.to_schema,
                    edge.to_definition_name.as_ref().map(|d| format!("#{}", d)).unwrap_or_default(),
                );
            }
            for warning in graph.diagnostics().warnings() {
                println!("⚠️  {}", warning);
            }

            let cycles = graph.containment_cycles();
            if !cycles.is_empty() {
                println!();
                println!("Containment cycles:");
                for cycle in cycles {
                    let members: Vec<String> = cycle.iter().map(|e| e.to_string()).collect();
                    println!("  └─ {}", members.join(" -> "));
                }
            }
            Ok(())
        }
    }
}

fn build(dir: &Path, config: &ModelConfig) -> anyhow::Result<BuildOutput> {
    load_directory(dir, config).with_context(|| format!("building model from {}", dir.display()))
}

fn print_warnings(output: &BuildOutput) {
    for warning in output.warnings.warnings() {
        eprintln!("⚠️  {}", warning);
    }
}
