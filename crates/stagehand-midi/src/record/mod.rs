pub mod folder;
pub mod header;
pub mod section;
pub mod trackmap;
pub mod trackname;

use crate::context::ParseContext;
use crate::error::{ParseError, RecordError};
use crate::event::{self, EventDecodeOptions};
use crate::tree::{Folder, Record};
use header::RecordHeader;

const FOLDER_BLOCK_TYPES: [[u8; 2]; 2] = [[0x20, 0x00], [0x24, 0x00]];

fn is_folder_block(block_type: [u8; 2]) -> bool {
    FOLDER_BLOCK_TYPES.contains(&block_type)
}

/// Walks the sorted list of magic-tag offsets, decoding and dispatching
/// every record header it finds into `ctx`.
pub fn decode_all(
    buffer: &[u8],
    offsets: &[usize],
    ctx: &mut ParseContext,
    options: EventDecodeOptions,
) -> Result<(), ParseError> {
    for &offset in offsets {
        let header = RecordHeader::read(buffer, offset)?;

        if &header.identity == b"qSxT" {
            if let Some(name) = trackname::decode(buffer, &header)? {
                ctx.track_name_lookup.insert(header.record_number, name);
            }
            continue;
        }

        if header.record_type == 2 && (&header.identity == b"qSvE" || &header.identity == b"qeSM")
        {
            if let Some(descriptor) = section::decode(buffer, &header)? {
                let key = (header.record_number, descriptor.associated_midi_id);
                if ctx.descriptors.contains_key(&key) {
                    return Err(RecordError::DuplicateDescriptor {
                        record_number: header.record_number,
                        midi_id: descriptor.associated_midi_id,
                    }
                    .into());
                }
                ctx.current_is_root_folder = descriptor.label == "Root Folder";
                ctx.descriptors.insert(key, descriptor);
            }
            continue;
        }

        if header.record_type == 1 {
            dispatch_midi_payload(buffer, &header, ctx, options)?;
            continue;
        }

        if header.record_type == 4 && &header.identity == b"karT" && ctx.current_is_root_folder {
            let (track_id, track_name_block) = trackmap::decode(buffer, &header)?;
            if !ctx.track_lookup.contains_key(&track_id) && track_name_block != 0 {
                ctx.track_lookup.insert(track_id, track_name_block);
            }
            continue;
        }

        log::trace!(
            "ignoring record {} type {} at offset {offset}",
            hex::encode(header.identity),
            header.record_type
        );
    }

    Ok(())
}

fn dispatch_midi_payload(
    buffer: &[u8],
    header: &RecordHeader,
    ctx: &mut ParseContext,
    options: EventDecodeOptions,
) -> Result<(), ParseError> {
    let key = (header.record_number, header.associated_midi_id);
    let Some(descriptor) = ctx.descriptors.get(&key).cloned() else {
        ctx.current_is_root_folder = false;
        return Ok(());
    };
    ctx.current_is_root_folder = descriptor.label == "Root Folder";

    let Some(block_type) = header.block_type(buffer) else {
        return Err(RecordError::Overrun {
            offset: header.data_start,
        }
        .into());
    };

    if is_folder_block(block_type) {
        if descriptor.label == "Automation" {
            log::debug!("skipping Automation folder for record {}", header.record_number);
            return Ok(());
        }
        let children = folder::decode(buffer, header.data_start, header.payload_length)?;
        let target = resolve_folder_target(&mut ctx.root, &descriptor);
        target.folder_contents.extend(children);
    } else {
        let payload = buffer
            .get(header.data_start..)
            .ok_or(RecordError::Overrun {
                offset: header.data_start,
            })?;
        let events = event::decode_events(
            payload,
            header.payload_length,
            descriptor.section_length,
            options,
        )
        .map_err(crate::error::ParseError::Event)?;
        if let Some(stored) = ctx.descriptors.get_mut(&key) {
            stored.midi_events = events;
        }
    }

    Ok(())
}

/// Resolves which folder node a folder-body payload's children attach to:
/// the root descriptor always targets root; any other descriptor targets
/// the matching top-level folder by `recordNumber`, falling back to root
/// when no match exists (a "found by reference" payload).
fn resolve_folder_target<'a>(
    root: &'a mut Folder,
    descriptor: &crate::tree::MidiSection,
) -> &'a mut Folder {
    if descriptor.label == "Root Folder" {
        root.record = Record::new(descriptor.record_number, 0);
        return root;
    }
    if let Some(pos) = root
        .folder_contents
        .iter()
        .position(|f| f.record.record_number == descriptor.record_number)
    {
        return &mut root.folder_contents[pos];
    }
    root
}
