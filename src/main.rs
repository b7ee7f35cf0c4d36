use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quire::config::AppConfig;
use quire::tree::render::render_outline;
use quire::{api, codec, db, progress, Workspace};

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Outline and progress tracking for long-form writing projects")]
struct Cli {
    /// Snapshot database to use instead of the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port for HTTP API
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the outline
    Tree,
    /// Write the outline as a portable JSON snapshot
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the outline with a JSON snapshot
    Import {
        file: PathBuf,
    },
    /// Erase the stored outline
    Clear {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },
    /// Show word counts and completion for each root
    Stats,
}

/// Initialize tracing with output to stderr (when stdout carries data) or stdout
fn init_tracing(filter: &str, use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(filter);

    if use_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_workspace(config: &AppConfig) -> anyhow::Result<Workspace> {
    let path = match &config.database_path {
        Some(path) => path.clone(),
        None => db::Database::default_path()?,
    };
    let db = db::Database::open(path.clone())
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    db.migrate()?;
    Ok(Workspace::open(db))
}

async fn serve(workspace: Workspace, port: u16) -> anyhow::Result<()> {
    let app = api::create_router(workspace);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Quire listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }

    let use_stderr = !matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(&config.log_filter, use_stderr);

    let workspace = open_workspace(&config)?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            serve(workspace, port.unwrap_or(config.port)).await?;
        }
        Some(Commands::Tree) => {
            let forest = workspace.forest();
            if forest.is_empty() {
                println!("(empty outline)");
            } else {
                print!("{}", render_outline(forest.roots()));
            }
        }
        Some(Commands::Export { output }) => {
            let text = workspace.export()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Exported outline to {}", path.display());
                }
                None => println!("{}", text),
            }
        }
        Some(Commands::Import { file }) => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let forest = workspace
                .import_bytes(&bytes)
                .with_context(|| format!("Import of {} failed; outline unchanged", file.display()))?;
            eprintln!("Imported {} nodes", forest.len());
        }
        Some(Commands::Clear { yes }) => {
            if !yes {
                anyhow::bail!(
                    "Refusing to erase the outline without --yes (export it first with `quire export -o {}`)",
                    codec::EXPORT_FILENAME
                );
            }
            workspace.clear()?;
            eprintln!("Outline cleared");
        }
        Some(Commands::Stats) => {
            match workspace.saved_at()? {
                Some(at) => println!("Last saved {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                None => println!("Never saved"),
            }
            for root in workspace.forest().roots() {
                let summary = progress::rollup(root);
                println!(
                    "{}: {} documents, {}/{} words ({:.2}%), ~{} min read",
                    root.name,
                    summary.documents,
                    summary.word_count,
                    summary.word_count_goal,
                    summary.completion_percentage,
                    summary.estimated_reading_time
                );
            }
        }
        None => {
            serve(workspace, config.port).await?;
        }
    }

    Ok(())
}
