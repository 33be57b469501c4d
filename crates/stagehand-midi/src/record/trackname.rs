use crate::error::RecordError;
use crate::record::header::RecordHeader;
use crate::scanner::Scanner;

/// Decodes a `qSxT` track-name record, reseeking to `dataStart` first (this
/// is one of the three body decoders that does, the others being the folder
/// decoder and the `karT` track-mapping decoder).
pub fn decode(buffer: &[u8], header: &RecordHeader) -> Result<Option<String>, RecordError> {
    let mut scanner = Scanner::at(buffer, header.data_start);
    let missing = || RecordError::TrackNameTooShort {
        record_number: header.record_number,
        length: 0,
    };

    let section_length = scanner.eat_u32_le().ok_or_else(missing)?;
    if section_length < 98 {
        return Err(RecordError::TrackNameTooShort {
            record_number: header.record_number,
            length: section_length,
        });
    }
    scanner.skip(94).ok_or_else(missing)?;
    let name_start = scanner.position();

    let scan_bound = (section_length - 98) as usize;
    let mut terminator_index = 0usize;
    for idx in 0..scan_bound {
        let byte = scanner.eat_u8().ok_or_else(missing)?;
        terminator_index = idx;
        if byte == 0 {
            break;
        }
    }

    if terminator_index == 0 {
        return Ok(None);
    }

    let mut scanner = Scanner::at(buffer, name_start);
    let name_bytes = scanner.eat_slice(terminator_index).ok_or_else(missing)?;
    let name = String::from_utf8(name_bytes.to_vec()).map_err(|_| RecordError::TrackNameNotUtf8 {
        record_number: header.record_number,
    })?;

    Ok(Some(name))
}
