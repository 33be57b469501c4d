//! Exercises the cut-up emitter directly over a hand-built folder tree,
//! covering the maxPerms-capped Cartesian-product scenario.

use stagehand_midi::emit::modes;
use stagehand_midi::song::SongMeta;
use stagehand_midi::tree::{Folder, Record};

fn multi_take_section(index: u16, record_number: u32, timestamp: u32, take_count: u32) -> Folder {
    let mut section = Folder::new(index);
    section.record = Record::new(record_number, timestamp);
    for take_index in 0..take_count {
        let mut take = Folder::new(index);
        take.record = Record::new(record_number * 10 + take_index, 0);
        section.folder_contents.push(take);
    }
    section
}

/// Two multi-take sections of sizes 3 and 4 on the same track, with
/// `maxPerms = 5`: exactly 5 files, in lexicographic choice order.
#[test]
fn caps_permutations_and_orders_lexicographically() {
    let mut root = Folder::root();
    root.folder_contents.push(multi_take_section(0, 200, 0, 3));
    root.folder_contents.push(multi_take_section(0, 201, 0x2000, 4));

    let song = SongMeta {
        bpm: 120.0,
        numerator: 4,
        denominator_exp: 2,
    };

    let outputs = modes::dump_cut_ups(&root, &song, 5);
    assert_eq!(outputs.len(), 5);

    let names: Vec<String> = outputs
        .iter()
        .map(|o| o.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert!(names[0].contains("200_0-201_0"));
    assert!(names[1].contains("200_0-201_1"));
    assert!(names[2].contains("200_0-201_2"));
    assert!(names[3].contains("200_0-201_3"));
    assert!(names[4].contains("200_1-201_0"));
}

/// A track with only one multi-take section produces no cut-ups: the
/// Cartesian product of a single factor is degenerate in this mode.
#[test]
fn single_multi_take_section_produces_no_cut_ups() {
    let mut root = Folder::root();
    root.folder_contents.push(multi_take_section(0, 200, 0, 3));

    let song = SongMeta {
        bpm: 120.0,
        numerator: 4,
        denominator_exp: 2,
    };

    let outputs = modes::dump_cut_ups(&root, &song, -1);
    assert!(outputs.is_empty());
}
