//! damascus CLI - layered billet patterning from the terminal
//!
//! Runs recipe files or the built-in demos and writes cross-section PNGs,
//! STL meshes and a JSON operation log.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use damascus_kernel::{DiagnosticLevel, OperationReport, Settings};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod recipe;
mod run;
mod writers;

use recipe::{Demo, MeshOutput, Recipe};

#[derive(Parser)]
#[command(name = "damascus")]
#[command(about = "Layered damascus billet deformation and cross-section tool", long_about = None)]
struct Cli {
    /// Log per-layer detail (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recipe file (.toml or .json)
    Run {
        recipe: PathBuf,
        /// Settings file overriding parameter limits, forge and plate defaults
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Directory for the written files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Run one of the built-in pattern walkthroughs
    Demo {
        #[arg(value_enum)]
        pattern: Demo,
        #[arg(short, long)]
        settings: Option<PathBuf>,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Also write meshes
        #[arg(long, value_enum)]
        mesh: Option<MeshOutput>,
        /// Cross-section resolution in pixels
        #[arg(long)]
        resolution: Option<usize>,
    },
    /// Apply a recipe in memory and print the resulting billet
    Info {
        recipe: PathBuf,
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            recipe,
            settings,
            out_dir,
        } => {
            let recipe = Recipe::load(&recipe)?;
            run_and_print(&recipe, load_settings(settings.as_deref())?, &out_dir)?;
        }
        Commands::Demo {
            pattern,
            settings,
            out_dir,
            mesh,
            resolution,
        } => {
            let mut recipe = pattern.recipe();
            if let Some(mesh) = mesh {
                recipe.mesh = mesh;
            }
            if let Some(resolution) = resolution {
                for section in &mut recipe.sections {
                    section.resolution = resolution;
                }
            }
            run_and_print(&recipe, load_settings(settings.as_deref())?, &out_dir)?;
        }
        Commands::Info { recipe, settings } => {
            let recipe = Recipe::load(&recipe)?;
            show_info(&recipe, load_settings(settings.as_deref())?)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn run_and_print(recipe: &Recipe, settings: Settings, out_dir: &Path) -> Result<()> {
    let output = run::run(recipe, settings, out_dir)?;
    print_reports(&output.reports);
    println!(
        "\n{}: {} layers, {:.1} x {:.1} x {:.2} mm{}",
        recipe.name,
        output.stats.layer_count,
        output.stats.width,
        output.stats.length,
        output.stats.total_height,
        if output.stats.forged { " (forged)" } else { "" }
    );
    for path in &output.files {
        println!("  wrote {}", path.display());
    }
    Ok(())
}

fn show_info(recipe: &Recipe, settings: Settings) -> Result<()> {
    let billet = &recipe.billet;
    println!("recipe: {}", recipe.name);
    println!(
        "  Billet: {} layers ({} / {} mm), {} x {} mm",
        billet.layer_count,
        billet.white_thickness,
        billet.black_thickness,
        billet.width,
        billet.length
    );
    println!("  Operations: {}", recipe.operations.len());
    println!("  Sections: {}", recipe.sections.len());

    let (session, reports) = run::simulate(recipe, settings)?;
    print_reports(&reports);

    let stats = session.billet().stats();
    println!("\nResult:");
    println!("  Size: {:.1} x {:.1} mm", stats.width, stats.length);
    println!("  Height: {:.2} mm", stats.total_height);
    println!("  Forged: {}", stats.forged);
    println!("  Vertices: {}", stats.total_vertices);
    println!("  Triangles: {}", stats.total_triangles);
    Ok(())
}

fn print_reports(reports: &[OperationReport]) {
    for (i, report) in reports.iter().enumerate() {
        println!(
            "{:>3}. {:<18} {:>8.3} ms",
            i + 1,
            report.operation,
            report.duration_seconds * 1000.0
        );
        for note in report.diagnostics.entries() {
            if note.level == DiagnosticLevel::Warning {
                println!("       warning: {}", note.message);
            }
        }
    }
}
