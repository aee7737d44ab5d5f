use anyhow::Result;
use tokio::io::BufReader;
use wxalarm_alert::check_condition;
use wxalarm_common::fields::available_fields;
use wxalarm_notify::TransportRegistry;
use wxalarm_server::config::ServerConfig;
use wxalarm_server::feed::Runtime;
use wxalarm_server::logging;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  wxalarm-server run [config.toml]     Evaluate alarms against NDJSON observations on stdin");
    eprintln!("  wxalarm-server check \"<condition>\"   Validate and paraphrase a condition");
    eprintln!("  wxalarm-server fields                 List fields available to conditions");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("check") => {
            let condition = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("check requires a <condition> argument")
            })?;
            let check = check_condition(condition);
            println!("{}", serde_json::to_string_pretty(&check)?);
            if !check.valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some("fields") => {
            println!("{}", serde_json::to_string_pretty(&available_fields())?);
            Ok(())
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        Some("run") => run(args.get(2).map(String::as_str).unwrap_or("config/server.toml")).await,
        _ => {
            print_usage();
            anyhow::bail!("unknown or missing subcommand")
        }
    }
}

async fn run(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    logging::init(&config.log_level)?;
    wxalarm_common::id::init_for_station(&config.station_name);

    tracing::info!(
        config = config_path,
        station = %config.station_name,
        "Starting wxalarm"
    );

    let runtime = Runtime::from_config(&config, TransportRegistry::default())?;
    let stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        summary = runtime.run(stdin) => {
            summary?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, waiting for pending notifications");
            runtime.notifier().flush().await;
        }
    }
    Ok(())
}
