// MIDI output - destination of the software sequencer's messages

use midir::{MidiOutput, MidiOutputConnection};
use tracing::{debug, info};

use crate::error::PlatformError;

/// Destination for raw MIDI messages
pub trait MidiSink: Send {
    fn send(&mut self, message: &[u8]) -> Result<(), PlatformError>;
}

/// Discards everything (headless playback)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MidiSink for NullSink {
    fn send(&mut self, _message: &[u8]) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiPortInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
}

/// List the MIDI output ports; the first one is the default
pub fn list_output_ports(client_name: &str) -> Vec<MidiPortInfo> {
    let mut ports = Vec::new();

    if let Ok(midi_out) = MidiOutput::new(client_name) {
        for (index, port) in midi_out.ports().iter().enumerate() {
            if let Ok(name) = midi_out.port_name(port) {
                ports.push(MidiPortInfo {
                    index,
                    name,
                    is_default: index == 0,
                });
            }
        }
    }

    ports
}

/// Connection to a midir output port
pub struct MidirSink {
    connection: MidiOutputConnection,
    port_name: String,
}

impl MidirSink {
    /// Connect to `port_name`, or to the first port when `None`
    pub fn connect(client_name: &str, port_name: Option<&str>) -> Result<Self, PlatformError> {
        let midi_out =
            MidiOutput::new(client_name).map_err(|e| PlatformError::Device(e.to_string()))?;

        let ports = midi_out.ports();
        let port = match port_name {
            Some(wanted) => ports.iter().find(|p| {
                midi_out
                    .port_name(p)
                    .map(|name| name == wanted)
                    .unwrap_or(false)
            }),
            None => ports.first(),
        };

        let Some(port) = port else {
            return Err(PlatformError::Device(match port_name {
                Some(wanted) => format!("MIDI output '{}' not found", wanted),
                None => "No MIDI output ports available".to_string(),
            }));
        };

        let name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());
        debug!("Connecting MIDI output '{}'", name);

        let connection = midi_out
            .connect(port, "native-midi-output")
            .map_err(|e| PlatformError::Device(e.to_string()))?;

        info!("MIDI output connected: {}", name);
        Ok(Self {
            connection,
            port_name: name,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiSink for MidirSink {
    fn send(&mut self, message: &[u8]) -> Result<(), PlatformError> {
        self.connection
            .send(message)
            .map_err(|e| PlatformError::Device(e.to_string()))
    }
}
