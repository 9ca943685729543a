use std::sync::Arc;
use std::{env, process};

use callrelay::config::Config;
use callrelay::log::{FacadeLogSink, LogSink, Logger};
use callrelay::signaling::relay_config::RelayConfig;
use callrelay::signaling::run::run_signaling_server_with_log;

const CONFIG_ENV: &str = "CALLRELAY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "signaling_server.conf";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // --- Parse CLI args ----------------------------------------------------
    //
    // Supported:
    //   cargo run --bin signaling_server
    //      -> binds to [Signaling] bind_addr, or 0.0.0.0:5000
    //
    //   cargo run --bin signaling_server -- 0.0.0.0:6000
    //      -> binds to 0.0.0.0:6000
    //
    //   cargo run --bin signaling_server -- 127.0.0.1 7000
    //      -> binds to 127.0.0.1:7000

    let args: Vec<String> = env::args().collect();

    let addr_override = match args.len() {
        1 => None,
        2 => Some(args[1].clone()),
        3 => Some(format!("{}:{}", args[1], args[2])),
        _ => {
            eprintln!("Usage:");
            eprintln!("  {}                # listen on [Signaling] bind_addr", args[0]);
            eprintln!("  {} [ADDR]         # e.g. 0.0.0.0:6000", args[0]);
            eprintln!("  {} [IP] [PORT]    # e.g. 127.0.0.1 6000", args[0]);
            eprintln!();
            eprintln!("Config file: ${CONFIG_ENV} or ./{DEFAULT_CONFIG_PATH}");
            process::exit(1);
        }
    };

    // --- Load config -------------------------------------------------------
    let config_path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    let config = match Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[signaling_server] {e}; using defaults");
            Config::empty()
        }
    };

    let mut settings = RelayConfig::from_config(&config);
    if let Some(addr) = addr_override {
        settings = settings.with_bind_addr(addr);
    }

    // --- Start process logger ----------------------------------------------
    //
    // With a [Logging] server_log_path the relay writes its own file;
    // otherwise lines go through env_logger (RUST_LOG) to stderr.
    let _logger;
    let log_sink: Arc<dyn LogSink> = if config.get_non_empty("Logging", "server_log_path").is_some()
    {
        let logger = Logger::start_server(4096, &config);
        eprintln!("[signaling_server] logging to {}", logger.file_path().display());
        let sink: Arc<dyn LogSink> = Arc::new(logger.handle());
        _logger = Some(logger);
        sink
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        _logger = None;
        Arc::new(FacadeLogSink)
    };

    eprintln!("[signaling_server] starting on {}", settings.bind_addr);

    // --- Run relay until Ctrl-C --------------------------------------------
    run_signaling_server_with_log(settings, log_sink).await?;
    Ok(())
}
