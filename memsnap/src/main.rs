use anyhow::Context;
use clap::{Parser, Subcommand};
use memsnap::analysis::{AnalysisConfig, ForwardAnalysis, Worklist};
use memsnap::cfg::{Program, parse_program};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct MemsnapConfig {
    pub analysis: AnalysisConfig,
}

impl MemsnapConfig {
    /// Stored configuration with any limits given on the command line applied.
    fn with_overrides(mut self, limits: &Limits) -> Self {
        if let Some(limit) = limits.widening_limit {
            self.analysis.snapshot.widening_limit = Some(limit);
        }
        if let Some(limit) = limits.simplify_limit {
            self.analysis.snapshot.simplify_limit = Some(limit);
        }
        if let Some(steps) = limits.max_steps {
            self.analysis.max_steps = steps;
        }
        if let Some(depth) = limits.max_call_depth {
            self.analysis.max_call_depth = depth;
        }
        self
    }
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct MemsnapParams {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
struct Limits {
    /// Commits after which changing entries are widened
    #[arg(long)]
    pub widening_limit: Option<usize>,
    /// Scalars an entry may hold before collapsing to their kinds
    #[arg(long)]
    pub simplify_limit: Option<usize>,
    #[arg(long)]
    pub max_steps: Option<usize>,
    #[arg(long)]
    pub max_call_depth: Option<usize>,
    /// Remember these limits for later runs
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyse a program listing and print the warnings reaching its end
    Analyze {
        file: PathBuf,
        #[command(flatten)]
        limits: Limits,
        /// Also print the memory at the end of the script
        #[arg(long)]
        dump: bool,
        /// Print the snapshot operation counters
        #[arg(long)]
        stats: bool,
    },
    /// Parse a program listing and print its control-flow graphs
    Check { file: PathBuf },
    /// Print the stored configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let params: MemsnapParams = MemsnapParams::parse();
    let stored: MemsnapConfig = confy::load("memsnap", None)?;
    match params.command {
        Commands::Analyze {
            file,
            limits,
            dump,
            stats,
        } => {
            let config = update_config(stored, &limits)?;
            analyze(&config, &file, dump, stats)
        }
        Commands::Check { file } => check(&file),
        Commands::Config => {
            println!("{:#?}", stored.analysis);
            Ok(())
        }
    }
}

fn update_config(stored: MemsnapConfig, limits: &Limits) -> anyhow::Result<MemsnapConfig> {
    let config = stored.with_overrides(limits);
    if limits.save {
        confy::store("memsnap", None, &config)?;
    }
    Ok(config)
}

fn load(file: &Path) -> anyhow::Result<Program> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    parse_program(&text).with_context(|| format!("parsing {}", file.display()))
}

fn analyze(config: &MemsnapConfig, file: &Path, dump: bool, stats: bool) -> anyhow::Result<()> {
    let program = load(file)?;
    let result = ForwardAnalysis::new(&program, config.analysis, Worklist::new()).run()?;
    for warning in result.warnings() {
        println!("{}", warning)
    }
    if dump {
        match result.exit() {
            Some(exit) => println!("{}", exit.dump()),
            None => println!("end of script is unreachable"),
        }
    }
    if stats {
        for (kind, count) in result.statistics().iter() {
            println!("{}: {}", kind, count)
        }
        println!("steps: {}", result.steps())
    }
    Ok(())
}

fn check(file: &Path) -> anyhow::Result<()> {
    let program = load(file)?;
    for function in program.functions() {
        println!("function {}:", function.name);
        let cfg = &function.cfg;
        for node in cfg.nodes() {
            let label = cfg.label(node).unwrap_or_default();
            let successors: Vec<String> = cfg
                .successors(node)
                .filter_map(|s| cfg.label(s))
                .map(|l| l.to_string())
                .collect();
            match cfg.statement(node) {
                Some(statement) => {
                    println!("  {}: {} -> [{}]", label, statement, successors.join(", "))
                }
                None => println!("  {}: -> [{}]", label, successors.join(", ")),
            }
        }
    }
    Ok(())
}
