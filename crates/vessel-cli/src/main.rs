mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vessel", about = "Build Nuxt apps into serverless functions, static assets and routes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the build pipeline for a platform build request
    Build {
        /// Build request JSON (files, entrypoint, workPath, config, meta)
        #[arg(long, short = 'i')]
        input: PathBuf,
        /// Write the build result here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Show how a project would be built, without running any stage
    Inspect {
        /// Directory holding the project
        #[arg(long, default_value = ".")]
        work_path: PathBuf,
        /// Entrypoint relative to the work path
        #[arg(long, default_value = "package.json")]
        entrypoint: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loaded before the subscriber so RUST_LOG from .env applies.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => tracing::debug!("no .env file"),
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output } => commands::build(&input, output.as_deref()).await?,
        Commands::Inspect {
            work_path,
            entrypoint,
        } => commands::inspect(&work_path, &entrypoint)?,
    }

    Ok(())
}
