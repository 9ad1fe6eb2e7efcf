//! `tablenode` binary: one pipeline step per process.
//!
//! The orchestrator observes only the exit status. Zero means the output
//! table is committed and the connection closed; any other value names the
//! failure class (see [`tablenode::ErrorKind::exit_code`]), with a diagnostic
//! line on stderr.

use std::process::ExitCode;

use tablenode::{Node, NodeConfig, ScoreLogic, Telemetry};

fn main() -> ExitCode {
    init_logging();

    let config = match NodeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return exit_code(e.exit_code());
        }
    };

    let telemetry = build_telemetry(&config);
    let node = Node::new(ScoreLogic::default());
    let result = node.run_with_telemetry(&config, telemetry.as_deref());
    if let Some(t) = &telemetry {
        t.flush();
    }

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(failure) => {
            log::error!(
                "node '{}' failed after {:?}: {}",
                config.model_name,
                failure.report.last_completed(),
                failure.error
            );
            exit_code(failure.error.exit_code())
        }
    }
}

fn init_logging() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // A second init (e.g. in tests) is harmless.
    let _ = builder.try_init();
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

#[cfg(feature = "telemetry")]
fn build_telemetry(config: &NodeConfig) -> Option<Box<dyn Telemetry>> {
    config
        .trace_path
        .as_ref()
        .map(|path| Box::new(tablenode::ParquetTelemetry::new(path)) as Box<dyn Telemetry>)
}

#[cfg(not(feature = "telemetry"))]
fn build_telemetry(config: &NodeConfig) -> Option<Box<dyn Telemetry>> {
    if let Some(path) = &config.trace_path {
        log::warn!(
            "{} is set to '{}' but this build has no telemetry support; traces are not written",
            tablenode::TRACE_PATH_VAR,
            path.display()
        );
    }
    None
}
