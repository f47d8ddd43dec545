use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use texpick_build::{BuildConfig, BuildEvent, CompilationDriver};
use texpick_core::{AssembleOptions, Assembly, DocumentAssembler, NestedSelection};
use texpick_log::LogClassifier;
use texpick_syntax::ParsedDocument;

const DEFAULT_OUTPUT: &str = "custom_report.tex";

#[derive(Parser)]
#[command(name = "texpick")]
#[command(about = "Pick sections out of a LaTeX document and build them", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Selection {
    /// Component ids to include, e.g. Section_2
    #[arg(short, long = "select", value_name = "ID", num_args = 1..)]
    select: Vec<String>,

    /// Include every component
    #[arg(long)]
    all: bool,

    /// Output file [default: custom_report.tex beside the source]
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// Also emit components already contained in another selected one
    #[arg(long)]
    keep_nested: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the components of a .tex file
    List {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Write a standalone document from selected components
    Assemble {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[command(flatten)]
        selection: Selection,
    },
    /// Assemble, then compile the result to PDF
    Build {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[command(flatten)]
        selection: Selection,

        /// Number of engine passes
        #[arg(long)]
        passes: Option<u32>,

        /// TeX engine name or path
        #[arg(long)]
        engine: Option<String>,

        /// JSON build configuration
        #[arg(long, value_name = "C")]
        config: Option<PathBuf>,

        /// Do not fail on missing .aux/.toc/... files from a fresh first run
        #[arg(long)]
        ignore_aux: bool,
    },
    /// Classify the errors in a TeX log file
    Classify {
        #[arg(value_name = "LOG")]
        path: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load(path: &Path) -> anyhow::Result<ParsedDocument> {
    texpick_syntax::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Resolves the ids to assemble. Unknown ids are reported and dropped.
fn resolve_selection(doc: &ParsedDocument, selection: &Selection) -> anyhow::Result<Vec<String>> {
    let ids: Vec<String> = if selection.all {
        doc.body_components().map(|c| c.id.clone()).collect()
    } else {
        selection
            .select
            .iter()
            .filter(|id| {
                let known = doc.body_components().any(|c| &c.id == *id);
                if !known {
                    log::warn!("Unknown component id {}", id);
                }
                known
            })
            .cloned()
            .collect()
    };
    if ids.is_empty() {
        bail!("No components selected");
    }
    Ok(ids)
}

fn output_path(doc: &ParsedDocument, selection: &Selection) -> PathBuf {
    selection
        .output
        .clone()
        .unwrap_or_else(|| doc.source_dir().join(DEFAULT_OUTPUT))
}

fn assemble(path: &Path, selection: &Selection) -> anyhow::Result<Assembly> {
    let doc = load(path)?;
    let ids = resolve_selection(&doc, selection)?;
    let nested = if selection.keep_nested {
        NestedSelection::Keep
    } else {
        NestedSelection::Skip
    };
    let output = output_path(&doc, selection);
    let assembly = DocumentAssembler::new(AssembleOptions { nested })
        .assemble(&doc, &ids, &output)
        .with_context(|| format!("Failed to assemble {}", output.display()))?;
    for id in &assembly.nested {
        println!("Skipped {} (contained in another selected component)", id);
    }
    Ok(assembly)
}

fn build_config(
    config: Option<&Path>,
    passes: Option<u32>,
    engine: Option<&str>,
    ignore_aux: bool,
) -> anyhow::Result<BuildConfig> {
    let mut build = match config {
        Some(path) => BuildConfig::load(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => BuildConfig::default(),
    };
    if let Some(passes) = passes {
        build.passes = passes;
    }
    if let Some(engine) = engine {
        build.engine = engine.to_string();
    }
    if ignore_aux {
        build.skip_auxiliary_missing = true;
    }
    Ok(build)
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::List { path, json } => {
            let doc = load(path)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&doc.components)?);
            } else {
                for c in &doc.components {
                    println!("{}  {}: {}", c.id, c.kind.label(), c.title);
                }
            }
        }
        Commands::Assemble { path, selection } => {
            let assembly = assemble(path, selection)?;
            println!(
                "Wrote {} ({} component(s), {} image(s))",
                assembly.output.display(),
                assembly.included.len(),
                assembly.images.len()
            );
        }
        Commands::Build {
            path,
            selection,
            passes,
            engine,
            config,
            ignore_aux,
        } => {
            let build = build_config(config.as_deref(), *passes, engine.as_deref(), *ignore_aux)?;
            let assembly = assemble(path, selection)?;
            let driver = CompilationDriver::new(build);
            let handle = driver.spawn(&assembly.output)?;

            for event in handle.events().iter() {
                match event {
                    BuildEvent::Status(text) => println!("{}", text),
                    BuildEvent::Progress(percent) => eprintln!("[{:>3}%]", percent),
                    BuildEvent::Finished { .. } => {}
                }
            }
            let result = handle.join();
            if !result.succeeded {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Classify { path, json } => {
            let content = texpick_log::read_log(path)?;
            let errors = LogClassifier::new().classify(&content);
            if *json {
                println!("{}", serde_json::to_string_pretty(&errors)?);
            } else {
                for error in &errors {
                    println!("{}: {}", error.line, error);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
