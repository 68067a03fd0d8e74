use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{stdin, stdout};
use tower_lsp_server::{LspService, Server};
use treelens::document::{Document, offset_to_position};
use treelens::error::{ParserError, TreelensResult};
use treelens::lsp::{TreeLens, load_settings};
use treelens::session::DocumentSession;
use treelens::syntax::{ParserLoader, TreeSitterParser};

/// Incremental tree-sitter projection served over the Language Server Protocol
#[derive(Parser)]
#[command(name = "treelens")]
#[command(version)]
#[command(about = "Incremental tree-sitter projection served over the Language Server Protocol")]
struct Cli {
    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Grammar to parse a file with
#[derive(clap::Args)]
struct GrammarArgs {
    /// The file to parse
    file: PathBuf,

    /// Shared library exporting the grammar
    #[arg(long)]
    library: PathBuf,

    /// Language name (e.g., rust, lua)
    #[arg(long)]
    language: String,

    /// Constructor symbol, if not `tree_sitter_<language>`
    #[arg(long)]
    symbol: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token lines projected for a file
    Tokens(GrammarArgs),
    /// Print the structural diagnostics of a file
    Check(GrammarArgs),
}

/// Parse `args.file` once under the settings of the working directory
fn parse_file(args: &GrammarArgs, loader: &mut ParserLoader) -> TreelensResult<DocumentSession> {
    let text = std::fs::read_to_string(&args.file)?;
    let language = loader
        .load_language(
            &args.library.to_string_lossy(),
            &args.language,
            args.symbol.as_deref(),
        )
        .map_err(ParserError::from)?;
    let parser = TreeSitterParser::new(&language)?;

    let cwd = std::env::current_dir().ok();
    let outcome = load_settings(cwd.as_deref(), None);
    for event in &outcome.events {
        log::info!("{}", event.message);
    }
    let settings = outcome.settings;

    let mut session = DocumentSession::new(Document::new(text), &settings.default_scope);
    session.attach_parser(Box::new(parser));
    session.reparse(&settings.scope_map);
    Ok(session)
}

fn print_tokens(session: &DocumentSession) {
    let doc = session.document();
    for (row, line) in session.tokens().lines().iter().enumerate() {
        let segments: Vec<String> = line
            .segments(doc.line_length(row))
            .map(|(start, end, scope)| format!("{start}..{end} {scope}"))
            .collect();
        println!("{:>4}: {}", row + 1, segments.join(", "));
    }
}

fn print_diagnostics(path: &Path, session: &DocumentSession) -> usize {
    let doc = session.document();
    let diagnostics = session.diagnostics();
    for diagnostic in &diagnostics {
        let start = offset_to_position(doc, diagnostic.span.map_or(0, |span| span.start));
        println!(
            "{}:{}:{}: {}: {}",
            path.display(),
            start.line,
            start.column,
            diagnostic.code,
            diagnostic.message
        );
    }
    diagnostics.len()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout carries the protocol; logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .target(env_logger::Target::Stderr)
        .init();

    match cli.command {
        Some(Commands::Tokens(args)) => {
            let mut loader = ParserLoader::new();
            match parse_file(&args, &mut loader) {
                Ok(session) => print_tokens(&session),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Check(args)) => {
            let mut loader = ParserLoader::new();
            match parse_file(&args, &mut loader) {
                Ok(session) => {
                    if print_diagnostics(&args.file, &session) > 0 {
                        std::process::exit(2);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            let stdin = stdin();
            let stdout = stdout();

            let (service, socket) = LspService::new(TreeLens::new);
            Server::new(stdin, stdout, socket).serve(service).await;
        }
    }
}
