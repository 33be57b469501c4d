use crate::error::RecordError;
use crate::record::header::RecordHeader;
use crate::scanner::Scanner;

/// Decodes a `karT` track-mapping record, reseeking to `dataStart` first.
/// Only meaningful while the most recently decoded descriptor's label is
/// "Root Folder" -- the caller is responsible for gating on that.
pub fn decode(buffer: &[u8], header: &RecordHeader) -> Result<(u32, u32), RecordError> {
    let mut scanner = Scanner::at(buffer, header.data_start);
    let missing = || RecordError::TruncatedHeader {
        offset: header.data_start,
    };
    scanner.skip(4).ok_or_else(missing)?;
    let track_name_block = scanner.eat_u32_le().ok_or_else(missing)?;
    let track_id = scanner.eat_u32_le().ok_or_else(missing)?;
    Ok((track_id, track_name_block))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_track_mapping() {
        let mut b = Vec::new();
        b.extend_from_slice(b"karT");
        b.extend_from_slice(&4u16.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&[0u8; 10]);
        b.extend_from_slice(&16u32.to_le_bytes());
        b.extend_from_slice(&[0u8; 4]);
        b.extend_from_slice(&[0u8; 4]);
        b.extend_from_slice(&99u32.to_le_bytes());
        b.extend_from_slice(&3u32.to_le_bytes());
        let header = RecordHeader::read(&b, 0).unwrap();
        let (track_id, track_name_block) = decode(&b, &header).unwrap();
        assert_eq!(track_id, 3);
        assert_eq!(track_name_block, 99);
    }
}
