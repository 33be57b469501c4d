use crate::error::FolderDecodeError;
use crate::scanner::Scanner;
use crate::tree::{Folder, Record};

/// Decodes a folder-body MIDI payload (blockType `2000`/`2400`) into child
/// folder/take entries appended to `target.folder_contents`. `target` is
/// already resolved by the caller (root, the matching top-level folder, or
/// root as a fallback "found by reference").
pub fn decode(
    buffer: &[u8],
    data_start: usize,
    payload_length: u32,
) -> Result<Vec<Folder>, FolderDecodeError> {
    let mut scanner = Scanner::at(buffer, data_start);
    let total_buffer_size = payload_length as usize;
    let mut children = Vec::new();

    loop {
        let offset = scanner.position();
        let cmd = scanner
            .eat_u8()
            .ok_or(FolderDecodeError::Truncated { offset })?;
        let missing = || FolderDecodeError::Truncated { offset };

        if cmd == 0xF1 {
            break;
        } else if cmd == 0x20 {
            scanner.skip(3).ok_or_else(missing)?;
            let timestamp = scanner.eat_u32_le().ok_or_else(missing)?;
            scanner.skip(8).ok_or_else(missing)?;
            let folder_record_number = scanner.eat_u32_le().ok_or_else(missing)?;
            let index = scanner.eat_u16_le().ok_or_else(missing)?;
            scanner.skip(10).ok_or_else(missing)?;
            let record_number = scanner.eat_u32_le().ok_or_else(missing)?;
            scanner.skip(44).ok_or_else(missing)?;

            let mut new_folder = Folder::new(index);
            new_folder.record = Record::new(record_number, timestamp);
            new_folder.folder_record_number = Some(folder_record_number);
            children.push(new_folder);
        } else if cmd & 0xF0 == 0x50 {
            scanner.skip(15).ok_or_else(missing)?;
        } else if cmd == 0x00 {
            scanner.skip(63).ok_or_else(missing)?;
        } else if cmd == 0x24 {
            scanner.skip(79).ok_or_else(missing)?;
        } else {
            log::warn!("unknown folder opcode 0x{cmd:02X} at offset {offset}");
            scanner.skip(79).ok_or_else(missing)?;
        }

        let buffer_used = scanner.position() - data_start;
        if buffer_used > total_buffer_size {
            return Err(FolderDecodeError::Overrun { offset: data_start });
        }
        if buffer_used == total_buffer_size {
            break;
        }
    }

    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_entry(timestamp: u32, folder_record_number: u32, index: u16, record_number: u32) -> Vec<u8> {
        let mut b = vec![0x20];
        b.extend_from_slice(&[0u8; 3]);
        b.extend_from_slice(&timestamp.to_le_bytes());
        b.extend_from_slice(&[0u8; 8]);
        b.extend_from_slice(&folder_record_number.to_le_bytes());
        b.extend_from_slice(&index.to_le_bytes());
        b.extend_from_slice(&[0u8; 10]);
        b.extend_from_slice(&record_number.to_le_bytes());
        b.extend_from_slice(&[0u8; 44]);
        b
    }

    #[test]
    fn decodes_two_children() {
        let mut bytes = child_entry(0x9600, 1, 0, 100);
        bytes.extend(child_entry(0x9800, 1, 1, 101));
        bytes.push(0xF1);
        let children = decode(&bytes, 0, bytes.len() as u32).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].record.record_number, 100);
        assert_eq!(children[0].record.timestamp, 0x9600);
        assert_eq!(children[1].index, 1);
        assert_eq!(children[1].record.record_number, 101);
    }
}
