use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use exdrift::{
    analyzer::ExceptionDifferenceAnalyzer,
    cli::{Cli, OutputFormat},
    config::{parse_expiry_date, AnalyzerConfig},
    model::RunSequence,
    relevance::ExpiryPolicy,
    report,
};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn build_config(args: &Cli) -> Result<AnalyzerConfig> {
    let now = Utc::now();
    let mut expiry = match &args.expiry_date {
        Some(input) => ExpiryPolicy::new(parse_expiry_date(input, now)?, false),
        None => ExpiryPolicy::default(),
    };
    expiry.measure_from_first_occurrence = args.expiry_from_first_occurrence;

    let config = AnalyzerConfig::default()
        .with_analyzer_name(args.analyzer_name.clone())
        .with_characteristics(args.characteristics.iter().copied())
        .with_still_active_only(args.still_active_only)
        .with_relevant_processes(args.relevant_processes.iter().cloned())
        .with_expiry(expiry)
        .with_output_dir(args.out_dir.clone());
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = build_config(&args)?;
    let sequence = RunSequence::from_json_file(&args.input)
        .with_context(|| format!("Failed to load test runs from {}", args.input.display()))?;
    if sequence.len() < 2 {
        tracing::warn!(
            "{} test run(s) given, at least two are needed for a diff",
            sequence.len()
        );
    }

    let analyzer = ExceptionDifferenceAnalyzer::new(config)?;
    let analysis = if args.persist {
        let mut store = analyzer.file_store(&sequence)?;
        analyzer
            .analyze_persistent(&sequence, &mut store)
            .with_context(|| format!("Failed to update snapshots in {}", store.dir().display()))?
    } else {
        analyzer.analyze(&sequence)
    };

    match args.format {
        OutputFormat::Text => print!("{}", report::render_text(&analysis)),
        OutputFormat::Json => println!("{}", report::render_json(&analysis)?),
    }

    Ok(())
}
