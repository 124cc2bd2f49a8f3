//! CLI binary for lectern.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `LecternConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lectern::{
    analyze, ask, extract, load_document, load_document_from, save_document, LecternConfig,
    PageSource, PdfSource,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "lectern",
    version,
    about = "Ask questions about slide decks and PDF lecture notes using multimodal LLMs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Storage directory for document records.
    #[arg(long, global = true, default_value = "slides")]
    store: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Process a document (path or URL) and persist its record.
    Ingest {
        /// Local file path or HTTP(S) URL.
        input: String,

        /// PDF password for encrypted documents.
        #[arg(long)]
        password: Option<String>,

        /// Rasterization zoom factor.
        #[arg(long, default_value_t = 2.0)]
        zoom: f32,
    },

    /// Extract pages only (no math detection, no rasters) and persist.
    Extract {
        /// Local file path.
        input: PathBuf,

        #[arg(long)]
        password: Option<String>,
    },

    /// Show document metadata without processing.
    Inspect {
        input: PathBuf,

        #[arg(long)]
        password: Option<String>,
    },

    /// Per-page math-detection diagnostics for a stored record.
    Analyze {
        /// Record basename in the store, or a path to a record file.
        document: String,

        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Ask a question about a stored record.
    Ask {
        /// Record basename in the store, or a path to a record file.
        document: String,

        question: String,

        /// Scope the answer to a single slide/page.
        #[arg(long)]
        page: Option<u32>,

        /// Attach captured page images and formula crops.
        #[arg(long)]
        visual: bool,

        /// LLM provider name (e.g. "openai", "anthropic", "gemini").
        #[arg(long, env = "LECTERN_PROVIDER")]
        provider: Option<String>,

        /// Model identifier.
        #[arg(long, env = "LECTERN_MODEL")]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Ingest {
            input,
            password,
            zoom,
        } => cmd_ingest(&input, password, zoom, &cli.store).await,
        Command::Extract { input, password } => cmd_extract(&input, password, &cli.store),
        Command::Inspect { input, password } => cmd_inspect(&input, password),
        Command::Analyze { document, json } => cmd_analyze(&document, json, &cli.store),
        Command::Ask {
            document,
            question,
            page,
            visual,
            provider,
            model,
        } => cmd_ask(&document, &question, page, visual, provider, model, &cli.store).await,
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

async fn cmd_ingest(input: &str, password: Option<String>, zoom: f32, store: &Path) -> Result<()> {
    let mut builder = LecternConfig::builder()
        .zoom(zoom)
        .storage_dir(store.to_path_buf());
    if let Some(pwd) = password {
        builder = builder.password(pwd);
    }
    let config = builder.build().context("invalid configuration")?;

    let bar = spinner(&format!("Processing {input}…"));
    let record = lectern::ingest(input, &config).await;
    bar.finish_and_clear();

    let record = record.context("ingest failed")?;
    println!(
        "{} {}",
        green("✓"),
        bold(&format!(
            "{}: {} pages, {} formula regions, {} images",
            record.filename,
            record.total_pages,
            record.formulas.len(),
            record.images.len()
        ))
    );
    if record.math_content_pages.is_empty() {
        println!("  {}", dim("no mathematical content detected"));
    } else {
        println!(
            "  math content on pages: {}",
            record
                .math_content_pages
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

fn cmd_extract(input: &Path, password: Option<String>, store: &Path) -> Result<()> {
    let mut builder = LecternConfig::builder().storage_dir(store.to_path_buf());
    if let Some(pwd) = password {
        builder = builder.password(pwd);
    }
    let config = builder.build().context("invalid configuration")?;

    let record = extract(input, &config).context("extraction failed")?;
    let path = save_document(&record, store).context("saving record failed")?;
    println!(
        "{} extracted {} pages → {}",
        green("✓"),
        record.total_pages,
        path.display()
    );
    Ok(())
}

fn cmd_inspect(input: &Path, password: Option<String>) -> Result<()> {
    let source =
        PdfSource::open(input, password.as_deref()).context("could not open document")?;
    let meta = source.metadata().context("could not read metadata")?;
    let pages = source.page_count().context("could not count pages")?;

    println!("{}", bold(&input.display().to_string()));
    println!("  pages:     {pages}");
    println!("  title:     {}", meta.title.as_deref().unwrap_or("—"));
    println!("  author:    {}", meta.author.as_deref().unwrap_or("—"));
    println!(
        "  created:   {}",
        meta.creation_date.as_deref().unwrap_or("—")
    );
    println!(
        "  modified:  {}",
        meta.modification_date.as_deref().unwrap_or("—")
    );
    println!("  forms:     {}", if meta.has_form_fields { "yes" } else { "no" });
    Ok(())
}

fn cmd_analyze(document: &str, json: bool, store: &Path) -> Result<()> {
    let record = load_record(document, store)?;
    let config = LecternConfig::default();
    let report = analyze(&record, &config);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let math_pages = report.iter().filter(|p| p.likely_has_math).count();
    println!(
        "{} — {}/{} pages with math content",
        bold(&record.filename),
        math_pages,
        report.len()
    );
    for page in &report {
        let verdict = if page.likely_has_math {
            green("MATH")
        } else {
            dim("    ")
        };
        println!(
            "  {verdict} page {:>3}  symbols {:>3}  greek {:>3}  equations {:>2}  lines {:>2}  {}",
            page.page_number,
            page.symbol_count,
            page.greek_letter_count,
            page.equation_count,
            page.block_math_count,
            dim(&page.first_lines),
        );
    }
    Ok(())
}

async fn cmd_ask(
    document: &str,
    question: &str,
    page: Option<u32>,
    visual: bool,
    provider: Option<String>,
    model: Option<String>,
    store: &Path,
) -> Result<()> {
    let record = load_record(document, store)?;

    let mut builder = LecternConfig::builder().storage_dir(store.to_path_buf());
    if let Some(p) = provider {
        builder = builder.provider_name(p);
    }
    if let Some(m) = model {
        builder = builder.model(m);
    }
    let config = builder.build().context("invalid configuration")?;

    let bar = spinner("Thinking…");
    let answer = ask(&record, question, page, visual, &config).await;
    bar.finish_and_clear();

    if answer.starts_with("Error:") {
        println!("{} {answer}", red("✗"));
    } else {
        println!("{answer}");
    }
    Ok(())
}

/// Accept either a path to a record file or a basename in the store.
fn load_record(document: &str, store: &Path) -> Result<lectern::DocumentRecord> {
    let as_path = Path::new(document);
    if as_path.extension().map(|e| e == "json").unwrap_or(false) && as_path.exists() {
        return load_document(as_path).context("could not load record file");
    }
    load_document_from(store, document)
        .with_context(|| format!("no record '{document}' in {}", store.display()))
}
