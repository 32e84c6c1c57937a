// MIDI messages and output ports

pub mod event;
pub mod output;

pub use event::{MidiBytes, MidiEvent};
pub use output::{MidiPortInfo, MidiSink, MidirSink, NullSink, list_output_ports};
