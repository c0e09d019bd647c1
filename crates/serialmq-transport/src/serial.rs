use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Connector;

/// Default read timeout applied to an opened port.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Parameters used to open a serial device.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    /// Line speed in baud.
    pub baud_rate: u32,
    /// Read timeout. Reads return `TimedOut` after this long without data,
    /// which keeps the bridge loop responsive.
    pub timeout: Duration,
}

impl SerialSettings {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An open serial device (8N1, no flow control).
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialLink {
    /// Open the device described by `settings`.
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let port = serialport::new(settings.port.as_str(), settings.baud_rate)
            .timeout(settings.timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .open()
            .map_err(|source| TransportError::Open {
                port: settings.port.clone(),
                source,
            })?;

        info!(
            port = %settings.port,
            baud = settings.baud_rate,
            timeout_ms = settings.timeout.as_millis() as u64,
            "serial port opened"
        );

        Ok(Self {
            port,
            name: settings.port.clone(),
        })
    }

    /// Device path this link was opened with.
    pub fn port_name(&self) -> &str {
        &self.name
    }

    /// Discard bytes the driver buffered before we started reading.
    pub fn clear_input(&self) -> Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|err| TransportError::Io(err.into()))
    }

    /// Change the read timeout on the open device.
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|err| TransportError::Io(err.into()))
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.name)
            .finish()
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        debug!(port = %self.name, "serial port closed");
    }
}

/// Opens [`SerialLink`]s from fixed settings.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    settings: SerialSettings,
}

impl SerialConnector {
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }
}

impl Connector for SerialConnector {
    type Link = SerialLink;

    fn connect(&mut self) -> Result<SerialLink> {
        let link = SerialLink::open(&self.settings)?;
        // Stale bytes from before the (re)connect belong to no frame we can
        // correlate; the decoder would discard most of them anyway.
        if let Err(err) = link.clear_input() {
            debug!(port = %self.settings.port, error = %err, "could not clear input buffer");
        }
        Ok(link)
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.settings.port, self.settings.baud_rate)
    }
}

/// A serial device discovered on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub kind: &'static str,
    pub description: Option<String>,
}

/// List serial devices visible to the OS.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let (kind, description) = match p.port_type {
                SerialPortType::UsbPort(usb) => {
                    let detail = usb
                        .product
                        .or(usb.manufacturer)
                        .unwrap_or_else(|| format!("{:04x}:{:04x}", usb.vid, usb.pid));
                    ("usb", Some(detail))
                }
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                SerialPortType::Unknown => ("unknown", None),
            };
            PortInfo {
                name: p.port_name,
                kind,
                description,
            }
        })
        .collect())
}
