/// A single MIDI event decoded from a record's payload, timestamped in raw
/// absolute ticks (not yet rebased by `baseTime`).
#[derive(Debug, Clone, PartialEq)]
pub struct MidiEvent {
    pub timestamp: u32,
    pub channel: u8,
    pub kind: MidiEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MidiEventKind {
    NoteOn {
        note: u8,
        velocity: u8,
        duration: u32,
    },
    Cc {
        ctrl: u8,
        value: u8,
    },
    ChannelPressure {
        pressure: u8,
    },
    PitchWheel {
        value: i16,
    },
}

/// A decoded section descriptor (`qSvE`/`qeSM`, type 2), keyed by
/// `(recordNumber, associatedMidiID)`. Its `midi_events`/`section_length`
/// fields are filled in once the matching MIDI payload record is decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiSection {
    pub label: String,
    pub associated_midi_id: u32,
    pub record_number: u32,
    pub section_length: u32,
    pub section_start: u32,
    pub midi_events: Vec<MidiEvent>,
}

impl MidiSection {
    pub fn new(
        label: String,
        associated_midi_id: u32,
        record_number: u32,
        section_length: u32,
        section_start: u32,
    ) -> Self {
        MidiSection {
            label,
            associated_midi_id,
            record_number,
            section_length,
            section_start,
            midi_events: Vec::new(),
        }
    }
}

/// A record attached to a folder node: the part of a `MidiSection` that
/// survives past linking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub record_number: u32,
    /// Position of this section on the track's global timeline.
    pub timestamp: u32,
    pub midi_events: Vec<MidiEvent>,
    pub label: Option<String>,
    pub section_length: u32,
}

impl Record {
    pub fn new(record_number: u32, timestamp: u32) -> Self {
        Record {
            record_number,
            timestamp,
            ..Default::default()
        }
    }
}

/// A node in the two-level folder tree: root -> top-level tracks -> takes.
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub index: u16,
    pub record: Record,
    pub folder_record_number: Option<u32>,
    pub track_name: Option<String>,
    pub folder_contents: Vec<Folder>,
}

impl Folder {
    pub fn new(index: u16) -> Self {
        Folder {
            index,
            record: Record::default(),
            folder_record_number: None,
            track_name: None,
            folder_contents: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Folder::new(0)
    }

    /// The set of distinct top-level track indices present under this node.
    pub fn track_set(&self) -> Vec<u16> {
        let mut seen = Vec::new();
        for folder in &self.folder_contents {
            if !seen.contains(&folder.index) {
                seen.push(folder.index);
            }
        }
        seen
    }
}
