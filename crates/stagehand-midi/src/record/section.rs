use crate::error::RecordError;
use crate::record::header::RecordHeader;
use crate::scanner::Scanner;
use crate::tree::MidiSection;

/// Decodes a section descriptor (`qSvE`/`qeSM`, type 2). The scanner must
/// already be positioned 3 bytes past `dataStart` -- i.e. just after the
/// blockType peek that every record body decoder starts with -- since this
/// is the one record body that does *not* reseek to `dataStart` first.
pub fn decode(buffer: &[u8], header: &RecordHeader) -> Result<Option<MidiSection>, RecordError> {
    let offset = header.data_start + 3;
    let mut scanner = Scanner::at(buffer, offset);
    let missing = || RecordError::TrackNameTooShort {
        record_number: header.record_number,
        length: 0,
    };

    scanner.skip(5).ok_or_else(missing)?;
    let associated_midi_id = scanner.eat_u32_le().ok_or_else(missing)?;
    scanner.skip(4).ok_or_else(missing)?;
    let section_name_length = scanner.eat_u16_le().ok_or_else(missing)?;

    if section_name_length == 0 {
        return Ok(None);
    }

    let name_bytes = scanner
        .eat_slice(section_name_length as usize)
        .ok_or_else(missing)?;
    let orig_name = String::from_utf8_lossy(name_bytes);
    let name: String = orig_name
        .chars()
        .filter(|c| c.is_alphanumeric() || ".-_ ".contains(*c))
        .collect();

    let mut marker_found = false;
    for _ in 0..100 {
        let byte = scanner.eat_u8().ok_or_else(missing)?;
        if byte == 0x20 {
            marker_found = true;
            break;
        }
    }
    if !marker_found {
        return Err(RecordError::MarkerNotFound {
            record_number: header.record_number,
        });
    }

    scanner.skip(39).ok_or_else(missing)?;
    let section_length = scanner.eat_u24_le().ok_or_else(missing)?;
    scanner.skip(161).ok_or_else(missing)?;
    let section_start = scanner.eat_u24_le().ok_or_else(missing)?;

    Ok(Some(MidiSection::new(
        name,
        associated_midi_id,
        header.record_number,
        section_length,
        section_start,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::header::RecordHeader;

    fn build_section_record(name: &str, section_length: u32, section_start: u32) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"qSvE");
        b.extend_from_slice(&2u16.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&42u32.to_le_bytes()); // recordNumber
        b.extend_from_slice(&7u32.to_le_bytes()); // associatedMidiID (header copy)
        b.extend_from_slice(&[0u8; 10]);
        let payload_len_pos = b.len();
        b.extend_from_slice(&0u32.to_le_bytes()); // payloadLength placeholder
        b.extend_from_slice(&[0u8; 4]);
        let data_start = b.len();

        // blockType peek (3 bytes, arbitrary)
        b.extend_from_slice(&[0, 0, 0]);
        // skip 5
        b.extend_from_slice(&[0u8; 5]);
        // associatedMidiID (body copy)
        b.extend_from_slice(&7u32.to_le_bytes());
        // skip 4
        b.extend_from_slice(&[0u8; 4]);
        // sectionNameLength
        b.extend_from_slice(&(name.len() as u16).to_le_bytes());
        b.extend_from_slice(name.as_bytes());
        // scan for marker within 100 bytes: put it immediately
        b.push(0x20);
        b.extend_from_slice(&[0u8; 39]);
        b.extend_from_slice(&section_length.to_le_bytes()[..3]);
        b.extend_from_slice(&[0u8; 161]);
        b.extend_from_slice(&section_start.to_le_bytes()[..3]);

        let payload_length = (b.len() - data_start) as u32;
        b[payload_len_pos..payload_len_pos + 4].copy_from_slice(&payload_length.to_le_bytes());
        b
    }

    #[test]
    fn decodes_section_descriptor() {
        let bytes = build_section_record("Verse", 0x1000, 0x20);
        let header = RecordHeader::read(&bytes, 0).unwrap();
        let section = decode(&bytes, &header).unwrap().unwrap();
        assert_eq!(section.label, "Verse");
        assert_eq!(section.section_length, 0x1000);
        assert_eq!(section.section_start, 0x20);
        assert_eq!(section.associated_midi_id, 7);
        assert_eq!(section.record_number, 42);
    }

    #[test]
    fn zero_length_name_is_skipped() {
        let bytes = build_section_record("", 0x1000, 0x20);
        let header = RecordHeader::read(&bytes, 0).unwrap();
        assert!(decode(&bytes, &header).unwrap().is_none());
    }
}
