use serde::Serialize;
use serialmq_transport::{available_ports, PortInfo};

use crate::cmd::PortsArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    description: Option<&'a str>,
}

#[derive(Serialize)]
struct PortsOutput<'a> {
    ports: Vec<PortOutput<'a>>,
}

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = available_ports().map_err(|err| transport_error("cannot list serial ports", err))?;
    print_ports(&ports, format);
    Ok(SUCCESS)
}

fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&PortsOutput {
            ports: ports
                .iter()
                .map(|port| PortOutput {
                    name: &port.name,
                    kind: port.kind,
                    description: port.description.as_deref(),
                })
                .collect(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["PORT", "TYPE", "DESCRIPTION"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.to_string(),
                    port.description.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in ports {
                match &port.description {
                    Some(description) => println!("{} ({}) {}", port.name, port.kind, description),
                    None => println!("{} ({})", port.name, port.kind),
                }
            }
        }
        OutputFormat::Raw => {
            for port in ports {
                println!("{}", port.name);
            }
        }
    }
}
