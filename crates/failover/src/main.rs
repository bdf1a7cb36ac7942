//! L4 failover monitor binary

use failover::{Config, FailoverActuator, MonitorContext, Scheduler};
use healthcheck::TcpProber;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration errors are fatal and reported before logging is set up
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if config.log_json() {
        common::logging::init_json(config.log_level());
    } else {
        common::logging::init(config.log_level());
    }

    tracing::info!("L4 failover monitor starting");

    let settings = config.to_settings();
    if settings.dry_run {
        tracing::warn!("Dry-run mode: actions are described, not executed");
    }

    let actuator = FailoverActuator::from_settings(&settings)?;
    let context = MonitorContext::new(settings, config.service_specs())?;
    let mut scheduler = Scheduler::new(context, Arc::new(TcpProber::new()), actuator)?;

    tokio::select! {
        _ = scheduler.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Interrupted, stopping");
        }
    }

    Ok(())
}
