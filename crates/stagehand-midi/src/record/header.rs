use crate::error::RecordError;
use crate::scanner::Scanner;

/// The seven magic identity tags recognised at the start of a record.
pub const IDENTITY_TAGS: [&[u8; 4]; 7] = [
    b"qSvE", b"qeSM", b"qSxT", b"karT", b"tSnI", b"tSxT", b"EvnI",
];

/// The fixed header common to every record, followed by a gap before
/// `dataStart`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader {
    pub identity: [u8; 4],
    pub record_type: u16,
    pub subtype: u32,
    pub record_number: u32,
    pub associated_midi_id: u32,
    pub payload_length: u32,
    /// Absolute offset of the first payload byte.
    pub data_start: usize,
}

impl RecordHeader {
    /// Reads the 36-byte header starting at `offset`, leaving `dataStart`
    /// unread (callers reseek there explicitly, matching the reference
    /// implementation's own `s.pos = dataStart` reset at the top of every
    /// body decoder).
    pub fn read(buffer: &[u8], offset: usize) -> Result<Self, RecordError> {
        let mut scanner = Scanner::at(buffer, offset);
        let missing = || RecordError::TruncatedHeader { offset };

        let identity = scanner.eat_bytes::<4>().ok_or_else(missing)?;
        let record_type = scanner.eat_u16_le().ok_or_else(missing)?;
        let subtype = scanner.eat_u32_le().ok_or_else(missing)?;
        let record_number = scanner.eat_u32_le().ok_or_else(missing)?;
        let associated_midi_id = scanner.eat_u32_le().ok_or_else(missing)?;
        scanner.skip(10).ok_or_else(missing)?;
        let payload_length = scanner.eat_u32_le().ok_or_else(missing)?;
        scanner.skip(4).ok_or_else(missing)?;
        let data_start = scanner.position();

        Ok(RecordHeader {
            identity,
            record_type,
            subtype,
            record_number,
            associated_midi_id,
            payload_length,
            data_start,
        })
    }

    /// The 3-byte blockType peek at `dataStart`, used to tell folder bodies
    /// from MIDI event bodies.
    pub fn block_type(&self, buffer: &[u8]) -> Option<[u8; 2]> {
        let slice = buffer.get(self.data_start..self.data_start + 2)?;
        Some([slice[0], slice[1]])
    }
}
