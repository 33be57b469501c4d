use crate::context::ParseContext;
use crate::tree::Folder;

/// Attaches every descriptor's decoded events to the matching folder node,
/// then resolves each folder's track name from the two name lookups.
pub fn link(ctx: &mut ParseContext) {
    let descriptors: Vec<_> = ctx
        .descriptors
        .values()
        .filter(|d| !d.midi_events.is_empty())
        .cloned()
        .collect();

    for descriptor in &descriptors {
        let mut match_count = 0;
        for top_level in ctx.root.folder_contents.iter_mut() {
            match_count += associate_folder(top_level, descriptor);
            for sub_folder in top_level.folder_contents.iter_mut() {
                match_count += associate_folder(sub_folder, descriptor);
            }
        }
        if match_count != 1 {
            ctx.warnings.push(format!(
                "unexpected number of matching records ({match_count}) for {}",
                descriptor.record_number
            ));
        }
    }

    resolve_track_names(&mut ctx.root, &ctx.track_lookup, &ctx.track_name_lookup);
}

fn associate_folder(folder: &mut Folder, descriptor: &crate::tree::MidiSection) -> u32 {
    if folder.record.record_number == descriptor.record_number {
        folder.record.midi_events = descriptor.midi_events.clone();
        folder.record.section_length = descriptor.section_length;
        folder.record.label = Some(descriptor.label.clone());
        1
    } else {
        0
    }
}

fn resolve_track_names(
    root: &mut Folder,
    track_lookup: &std::collections::HashMap<u32, u32>,
    track_name_lookup: &std::collections::HashMap<u32, String>,
) {
    for top_level in root.folder_contents.iter_mut() {
        if top_level.track_name.is_none() {
            top_level.track_name = top_level
                .folder_record_number
                .and_then(|reference| track_lookup.get(&reference))
                .and_then(|name_block| track_name_lookup.get(name_block))
                .cloned();
        }
        for sub_folder in top_level.folder_contents.iter_mut() {
            if sub_folder.track_name.is_none() {
                sub_folder.track_name = sub_folder
                    .folder_record_number
                    .and_then(|reference| track_lookup.get(&reference))
                    .and_then(|name_block| track_name_lookup.get(name_block))
                    .cloned();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{MidiEvent, MidiEventKind, MidiSection, Record};

    #[test]
    fn attaches_events_to_matching_folder() {
        let mut ctx = ParseContext::new();
        let mut top = Folder::new(0);
        top.record = Record::new(100, 0x9600);
        ctx.root.folder_contents.push(top);

        let mut descriptor = MidiSection::new("Verse".into(), 7, 100, 0x1000, 0);
        descriptor.midi_events.push(MidiEvent {
            timestamp: 0x9600,
            channel: 0,
            kind: MidiEventKind::NoteOn {
                note: 60,
                velocity: 100,
                duration: 0x400,
            },
        });
        ctx.descriptors.insert((100, 7), descriptor);

        link(&mut ctx);

        assert_eq!(ctx.root.folder_contents[0].record.midi_events.len(), 1);
        assert_eq!(
            ctx.root.folder_contents[0].record.label.as_deref(),
            Some("Verse")
        );
    }
}
