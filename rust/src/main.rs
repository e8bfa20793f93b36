use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use source_framework::container::ComponentContainer;
use source_framework::logging::init_logging;
use source_framework::record::{rel_path, write_json, ComponentRecord};
use source_framework::{Component, IndexDefinitions, IndexView, IndexerConfig, SourceIndexer};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "source-framework",
    version,
    about = "Index configured files and items across a source tree"
)]
struct Cli {
    /// Directory to search upwards from for root.config (default: current directory)
    #[arg(long, value_name = "dir", global = true)]
    from: Option<PathBuf>,

    /// User-level config merged beneath root.config
    #[arg(
        long,
        value_name = "file",
        env = "SOURCE_FRAMEWORK_BASE_CONFIG",
        global = true
    )]
    base_config: Option<PathBuf>,

    /// Ignore ~/.source_framework/root.config
    #[arg(long, global = true)]
    no_user_defaults: bool,

    /// Emit a JSON array instead of text
    #[arg(long, global = true)]
    json: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the resolved index definitions
    Definitions,
    /// List indexed files
    Files,
    /// List extracted items
    Items {
        /// Only items in this file or directory
        #[arg(long, value_name = "path")]
        file: Option<PathBuf>,
        /// Only items with this name
        #[arg(long)]
        name: Option<String>,
    },
    /// List the root project
    Projects {
        /// Include every project it depends on
        #[arg(long)]
        with_dependencies: bool,
    },
    /// List everything indexed at a path
    At { path: PathBuf },
}

fn indexer_config(cli: &Cli) -> IndexerConfig {
    let mut config = if cli.no_user_defaults {
        IndexerConfig::default()
    } else {
        IndexerConfig::with_user_defaults()
    };
    if let Some(base) = &cli.base_config {
        config.base_config = Some(base.clone());
    }
    config
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let start = match &cli.from {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let mut indexer = SourceIndexer::new(indexer_config(&cli), &start);

    match &cli.command {
        Command::Definitions => {
            let definitions = indexer.resolve().with_context(|| {
                format!("Failed to resolve index definitions from {}", start.display())
            })?;
            print_definitions(&definitions, cli.json)
        }
        Command::Files => {
            let view = indexed(&mut indexer, &start)?;
            print_components(view.root_dir(), view.files().components(), cli.json)
        }
        Command::Items { file, name } => {
            let view = indexed(&mut indexer, &start)?;
            let mut items = view.items();
            if let Some(file) = file {
                items = items.by_path(file);
            }
            if let Some(name) = name {
                items = items.named(name);
            }
            print_components(view.root_dir(), items.components(), cli.json)
        }
        Command::Projects { with_dependencies } => {
            let view = indexed(&mut indexer, &start)?;
            let projects = if *with_dependencies {
                view.projects().components().to_vec()
            } else {
                vec![Component::from(indexer.root_project()?)]
            };
            print_components(view.root_dir(), &projects, cli.json)
        }
        Command::At { path } => {
            let view = indexed(&mut indexer, &start)?;
            print_components(view.root_dir(), view.at_path(path)?.components(), cli.json)
        }
    }
}

fn indexed(indexer: &mut SourceIndexer, start: &Path) -> Result<IndexView> {
    indexer
        .index()
        .with_context(|| format!("Failed to index source tree from {}", start.display()))?;
    Ok(indexer.view()?)
}

fn print_components(root: &Path, components: &[Component], json: bool) -> Result<()> {
    if json {
        let records: Vec<ComponentRecord> = components
            .iter()
            .map(|c| ComponentRecord::new(root, c))
            .collect();
        let mut out = io::stdout().lock();
        write_json(&records, &mut out).context("Failed to write JSON")?;
        return Ok(());
    }

    for component in components {
        let path = rel_path(root, component.path());
        let definition = component
            .definition()
            .map(|d| format!(" [{}]", d.name))
            .unwrap_or_default();
        let lines = component
            .lines()
            .map(|(start, end)| format!(":{start}-{end}"))
            .unwrap_or_default();
        println!(
            "{:<8} {}{} {}{}",
            component.kind().to_string().cyan(),
            component.name().bold(),
            definition.dimmed(),
            path,
            lines
        );
    }
    if components.is_empty() {
        println!("{}", "nothing found".yellow());
    }
    Ok(())
}

fn print_definitions(definitions: &IndexDefinitions, json: bool) -> Result<()> {
    if json {
        let records: Vec<serde_json::Value> = definitions
            .all()
            .iter()
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "type": d.kind,
                    "identifier": d.identifier.to_string(),
                    "source": rel_path(&definitions.root_dir, &d.source),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "root".green().bold(),
        definitions.root_marker.display()
    );
    for definition in definitions.all() {
        println!(
            "{:<8} {} {} ({})",
            definition.kind.cyan(),
            definition.name.bold(),
            definition.identifier,
            rel_path(&definitions.root_dir, &definition.source)
        );
    }
    Ok(())
}
