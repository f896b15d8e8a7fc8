//! flyback CLI tool.
//!
//! Designs an offline flyback converter from a JSON design file.

mod design_file;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flyback_catalog::{CoreCatalog, MemoryCatalog};
use flyback_solver::DesignContext;

use design_file::DesignFile;

#[derive(Parser)]
#[command(name = "flyback")]
#[command(about = "Flyback converter design calculator")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every design stage and print the report
    Design {
        /// Path to the JSON design file
        file: PathBuf,

        /// Core model to use instead of the design file's
        #[arg(long)]
        core: Option<String>,

        /// Core catalog JSON file (defaults to the built-in set)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,

        /// Directory for Bode plot CSV files
        #[arg(long)]
        bode_dir: Option<PathBuf>,
    },

    /// List the cores in a catalog
    Cores {
        /// Core catalog JSON file (defaults to the built-in set)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Print a design file for the reference design
    Template,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Design {
            file,
            core,
            catalog,
            json,
            bode_dir,
        } => cmd_design(&file, core.as_deref(), catalog.as_deref(), json, bode_dir.as_deref()),
        Commands::Cores { catalog } => cmd_cores(catalog.as_deref()),
        Commands::Template => cmd_template(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_catalog(path: Option<&Path>) -> Result<MemoryCatalog> {
    match path {
        Some(path) => MemoryCatalog::from_json_file(path)
            .with_context(|| format!("loading core catalog {}", path.display())),
        None => Ok(MemoryCatalog::builtin()?),
    }
}

fn cmd_design(
    file: &Path,
    core: Option<&str>,
    catalog: Option<&Path>,
    json: bool,
    bode_dir: Option<&Path>,
) -> Result<()> {
    let design = DesignFile::from_path(file)?;
    let catalog = load_catalog(catalog)?;
    let core = design.resolve_core(core, &catalog)?;

    let mut ctx = DesignContext::new(design.inputs).with_core(core);
    // Completed stages are reported even when a later one fails
    let outcome = ctx.run_all();
    let report = ctx.report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output::render_text(&report));
    }

    if let Some(dir) = bode_dir {
        for path in output::write_bode_files(&report, dir)
            .with_context(|| format!("writing Bode files to {}", dir.display()))?
        {
            eprintln!("wrote {}", path.display());
        }
    }

    outcome.context("design incomplete")
}

fn cmd_cores(catalog: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(catalog)?;
    println!(
        "{:<12} {:>12} {:>12} {:>14}",
        "model", "Ac (mm^2)", "Wa (mm^2)", "AP (mm^4)"
    );
    for model in catalog.models() {
        let core = catalog.lookup(model)?;
        println!(
            "{:<12} {:>12.2} {:>12.2} {:>14.0}",
            core.model,
            core.cross_section_area * 1e6,
            core.window_area * 1e6,
            core.area_product() * 1e12
        );
    }
    Ok(())
}

fn cmd_template() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&DesignFile::template())?);
    Ok(())
}
