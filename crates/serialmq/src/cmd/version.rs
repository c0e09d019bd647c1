use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    target: String,
    features: Vec<&'static str>,
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("serialmq {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let output = VersionOutput {
        name: "serialmq",
        version: env!("CARGO_PKG_VERSION"),
        target: target_triple(),
        features: active_features(),
    };

    match format {
        OutputFormat::Json => print_json(&output),
        _ => {
            println!("name: {}", output.name);
            println!("version: {}", output.version);
            println!("target: {}", output.target);
            println!("target_os: {}", std::env::consts::OS);
            println!("target_arch: {}", std::env::consts::ARCH);
            println!("features: {}", output.features.join(", "));
        }
    }
    Ok(SUCCESS)
}

fn target_triple() -> String {
    match option_env!("SERIALMQ_BUILD_TARGET") {
        Some(target) => target.to_string(),
        None => format!("{}-unknown-{}", std::env::consts::ARCH, std::env::consts::OS),
    }
}

fn active_features() -> Vec<&'static str> {
    let mut features = vec!["cli"];
    if cfg!(feature = "mqtt") {
        features.push("mqtt");
    }
    if cfg!(feature = "async") {
        features.push("async");
    }
    features
}
