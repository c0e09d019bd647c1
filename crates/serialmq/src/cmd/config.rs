use serde_json::Value;
use serialmq_bridge::BridgeConfig;

use crate::cmd::ConfigArgs;
use crate::exit::{config_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

pub fn run(args: ConfigArgs, format: OutputFormat) -> CliResult<i32> {
    let config = BridgeConfig::load(&args.config)
        .map_err(|err| config_error("configuration rejected", err))?;

    print_config(&config, format)?;
    Ok(SUCCESS)
}

fn print_config(config: &BridgeConfig, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Table => {
            let mut table = new_table(vec!["KEY", "VALUE"]);
            for (key, value) in entries(config)? {
                table.add_row(vec![key, value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (key, value) in entries(config)? {
                println!("{key:<26} {value}");
            }
        }
        OutputFormat::Raw => {
            let yaml = serde_yaml::to_string(config).map_err(|err| {
                CliError::new(INTERNAL, format!("failed to render configuration: {err}"))
            })?;
            print!("{yaml}");
        }
    }
    Ok(())
}

/// Flatten the configuration into display rows, keyed as in the YAML file.
fn entries(config: &BridgeConfig) -> CliResult<Vec<(String, String)>> {
    let value = serde_json::to_value(config).map_err(|err| {
        CliError::new(INTERNAL, format!("failed to render configuration: {err}"))
    })?;
    let Value::Object(map) = value else {
        return Ok(Vec::new());
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}
