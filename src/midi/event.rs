// MIDI channel messages - conversion from SMF events, encoding and volume scaling

/// Controller number of "All Notes Off"
pub const ALL_NOTES_OFF: u8 = 123;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    PolyAftertouch { channel: u8, note: u8, value: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelAftertouch { channel: u8, value: u8 },
    PitchBend { channel: u8, value: u16 },
}

/// Encoded channel message, 2 or 3 bytes long
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiBytes {
    bytes: [u8; 3],
    len: usize,
}

impl MidiBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl MidiEvent {
    /// Convert a message read by the SMF importer
    pub fn from_midly(channel: u8, message: midly::MidiMessage) -> Self {
        use midly::MidiMessage;

        let channel = channel & 0x0F;
        match message {
            MidiMessage::NoteOff { key, vel } => MidiEvent::NoteOff {
                channel,
                note: key.as_int(),
                velocity: vel.as_int(),
            },
            MidiMessage::NoteOn { key, vel } => MidiEvent::NoteOn {
                channel,
                note: key.as_int(),
                velocity: vel.as_int(),
            },
            MidiMessage::Aftertouch { key, vel } => MidiEvent::PolyAftertouch {
                channel,
                note: key.as_int(),
                value: vel.as_int(),
            },
            MidiMessage::Controller { controller, value } => MidiEvent::ControlChange {
                channel,
                controller: controller.as_int(),
                value: value.as_int(),
            },
            MidiMessage::ProgramChange { program } => MidiEvent::ProgramChange {
                channel,
                program: program.as_int(),
            },
            MidiMessage::ChannelAftertouch { vel } => MidiEvent::ChannelAftertouch {
                channel,
                value: vel.as_int(),
            },
            MidiMessage::PitchBend { bend } => MidiEvent::PitchBend {
                channel,
                value: bend.0.as_int(),
            },
        }
    }

    pub fn all_notes_off(channel: u8) -> Self {
        MidiEvent::ControlChange {
            channel: channel & 0x0F,
            controller: ALL_NOTES_OFF,
            value: 0,
        }
    }

    /// Encode as a raw channel message
    pub fn to_bytes(&self) -> MidiBytes {
        let three = |status: u8, channel: u8, a: u8, b: u8| MidiBytes {
            bytes: [status | (channel & 0x0F), a & 0x7F, b & 0x7F],
            len: 3,
        };
        let two = |status: u8, channel: u8, a: u8| MidiBytes {
            bytes: [status | (channel & 0x0F), a & 0x7F, 0],
            len: 2,
        };

        match *self {
            MidiEvent::NoteOff {
                channel,
                note,
                velocity,
            } => three(0x80, channel, note, velocity),
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            } => three(0x90, channel, note, velocity),
            MidiEvent::PolyAftertouch {
                channel,
                note,
                value,
            } => three(0xA0, channel, note, value),
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => three(0xB0, channel, controller, value),
            MidiEvent::ProgramChange { channel, program } => two(0xC0, channel, program),
            MidiEvent::ChannelAftertouch { channel, value } => two(0xD0, channel, value),
            MidiEvent::PitchBend { channel, value } => {
                three(0xE0, channel, (value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8)
            }
        }
    }

    /// Scale note-on velocity by an output gain (0.0 - 1.0)
    ///
    /// A sounding note never drops to velocity 0, which would turn it into a
    /// note-off; a zero gain silences it with velocity 1 instead.
    pub fn scaled(self, gain: f32) -> Self {
        match self {
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            } if velocity > 0 => {
                let scaled = (velocity as f32 * gain.clamp(0.0, 1.0)).round() as u8;
                MidiEvent::NoteOn {
                    channel,
                    note,
                    velocity: scaled.clamp(1, 127),
                }
            }
            other => other,
        }
    }
}
