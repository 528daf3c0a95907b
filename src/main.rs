use aws_network_topology::config::{
    DuplicateKeyPolicy, RouteCoverage, DEFAULT_INPUT_DIR, DEFAULT_LOG_CONFIG,
};
use aws_network_topology::output::{print_summary, write_report};
use aws_network_topology::{analyze_dir, AnalysisConfig};
use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::error::Error;
use std::path::{Path, PathBuf};

/// Correlate an exported AWS network snapshot and report connectivity issues.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Snapshot directory with the exported JSON documents
    #[arg(short, long, default_value = DEFAULT_INPUT_DIR)]
    input: PathBuf,

    /// Also write the full report as pretty JSON to this file
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Viewer account id, overrides the one in metadata.json
    #[arg(long, value_name = "ID")]
    account_id: Option<String>,

    /// Which record wins when ids repeat (first, last)
    #[arg(long, value_name = "POLICY")]
    duplicate_keys: Option<DuplicateKeyPolicy>,

    /// When a route covers a CIDR (supernet, exact)
    #[arg(long, value_name = "MODE")]
    coverage: Option<RouteCoverage>,

    /// Read documents one at a time
    #[arg(long)]
    sequential: bool,

    /// log4rs configuration file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_LOG_CONFIG)]
    log_config: PathBuf,

    /// Findings listed in the terminal summary
    #[arg(long, default_value_t = 50)]
    max_findings: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_config)?;
    log::info!("#Start main()");

    let mut config = AnalysisConfig::from_env()?;
    if let Some(account_id) = args.account_id {
        config.viewer_account = Some(account_id);
    }
    if let Some(policy) = args.duplicate_keys {
        config.duplicate_keys = policy;
    }
    if let Some(coverage) = args.coverage {
        config.coverage = coverage;
    }
    if args.sequential {
        config.parallel_load = false;
    }

    let report = analyze_dir(&args.input, &config);
    print_summary(&report, args.max_findings);
    if let Some(path) = args.json {
        write_report(&report, &path)?;
    }

    log::info!("#End main()");
    Ok(())
}

/// log4rs from `path`, or info level on stderr when the file is absent.
fn init_logging(path: &Path) -> Result<(), Box<dyn Error>> {
    if path.exists() {
        log4rs::init_file(path, Default::default())?;
        return Ok(());
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    log::debug!("{} not found, logging to stderr", path.display());
    Ok(())
}
