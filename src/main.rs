use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use threadkit::{init_logging, load_thread, Config, GcodeFile, Threader, BUILD_DATE, VERSION};
use tracing::info;

/// Plan ring moves that embed a continuous thread in a sliced print
#[derive(Parser)]
#[command(name = "threadkit")]
#[command(version)]
struct Cli {
    /// Sliced gcode to process
    input: PathBuf,

    /// Thread route: JSON array of [x, y, z] points
    #[arg(long)]
    thread: PathBuf,

    /// Configuration file (.toml or .json); defaults to the user config if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file; stdout if omitted
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    if let Some(path) = path {
        return Config::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    match Config::default_path() {
        Ok(path) if path.exists() => Config::load_from_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        _ => Ok(Config::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    info!("threadkit {} (built {})", VERSION, BUILD_DATE);

    let config = load_config(cli.config.as_ref())?;
    let text = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let file = GcodeFile::parse(&text).with_context(|| format!("parsing {}", cli.input.display()))?;
    let thread_text = std::fs::read_to_string(&cli.thread)
        .with_context(|| format!("reading {}", cli.thread.display()))?;
    let thread = load_thread(&thread_text)
        .with_context(|| format!("parsing thread {}", cli.thread.display()))?;

    let threader = Threader::new(config);
    let layers = threader.route(&file, &thread).context("planning thread")?;
    for steps in &layers {
        for step in steps.steps().iter().filter(|s| s.valid) {
            info!(
                "Layer {} step {}: {} [{} segments]",
                steps.layer().number,
                step.number,
                step.name,
                step.segments.len()
            );
        }
    }

    let output = threader.render(&file, &layers).context("rendering gcode")?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, output).with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}
