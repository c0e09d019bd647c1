use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serialmq_bridge::{Bridge, BridgeConfig, MqttEndpoint};
use serialmq_transport::SerialConnector;
use tracing::info;

use crate::cmd::RunArgs;
use crate::exit::{bridge_error, config_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: RunArgs) -> CliResult<i32> {
    let config = BridgeConfig::load(&args.config)
        .map_err(|err| config_error("failed to load configuration", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (publisher, worker) = MqttEndpoint::connect(&config);
    let connector = SerialConnector::new(config.serial_settings());
    let mut bridge = Bridge::new(connector, publisher.clone(), &config)
        .map_err(|err| bridge_error("failed to build bridge", err))?;

    worker
        .spawn(bridge.inbox(), running.clone())
        .map_err(|err| bridge_error("failed to start mqtt worker", err))?;

    info!(
        config = %args.config.display(),
        serial = %config.serial_port,
        broker = %format!("{}:{}", config.mqtt_ip, config.mqtt_port),
        "serialmq starting"
    );

    let result = bridge.run(&running);

    running.store(false, Ordering::SeqCst);
    publisher.disconnect();
    result.map_err(|err| bridge_error("bridge stopped", err))?;

    info!("serialmq stopped");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
