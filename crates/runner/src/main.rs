use berg_runner::{
    EngineConfig, JsonLinesFeed, LoggingSink, ScoreThresholdService, SignalPipeline,
};
use std::sync::Arc;

fn print_help() {
    eprintln!(
        r#"berg-replay - Replay a recorded feed through the iceberg signal pipeline

USAGE:
    berg-replay <EVENTS.jsonl> [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --allow-forced      Let the local decision service take force-adjusted signals
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # Replay with the embedded configuration
    berg-replay session.jsonl

    # Replay with a config file, quietly
    RUST_LOG=warn berg-replay session.jsonl --config berg.json
"#
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut events_path: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut allow_forced = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            "--allow-forced" => allow_forced = true,
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
            arg => events_path = Some(arg.to_string()),
        }
        i += 1;
    }

    let Some(events_path) = events_path else {
        print_help();
        std::process::exit(1);
    };

    let config = match config_path {
        Some(path) => {
            log::info!("Loading configuration from: {}", path);
            EngineConfig::from_file(&path)?
        }
        None => {
            log::info!("Using embedded configuration");
            EngineConfig::embedded()?
        }
    };

    let sink = Arc::new(LoggingSink::new());
    let service = Arc::new(ScoreThresholdService::new(allow_forced));
    let mut pipeline = SignalPipeline::new(config, service, sink.clone());

    log::info!("Replaying {}", events_path);
    let mut feed = JsonLinesFeed::open(&events_path)?;
    for event in feed.by_ref() {
        pipeline.replay_event(event).await;
    }

    let stats = pipeline.stats();
    log::info!(
        "Replay done: {} events ({} skipped), {} trades, {} candidates, {} dispatched, {} taken",
        stats.events,
        feed.skipped(),
        stats.trades_processed,
        stats.candidates,
        stats.dispatched,
        stats.taken
    );
    log::info!("Execution sink received {} decisions", sink.decisions().len());

    println!("{}", serde_json::to_string_pretty(&pipeline.snapshot())?);
    Ok(())
}
