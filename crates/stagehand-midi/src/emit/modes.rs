use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::Config;
use crate::emit::note_router::NoteRouter;
use crate::emit::smf::MidiFileWriter;
use crate::song::{SongMeta, BASE_TIME};
use crate::tree::{Folder, MidiEvent, MidiEventKind};

/// A finished MIDI file plus the path (relative to the run's output
/// directory) it should be written to.
pub struct EmitOutput {
    pub path: PathBuf,
    pub midi: MidiFileWriter,
}

struct NoteFilter {
    velocity_min: u8,
    velocity_max: u8,
    duration_min: u32,
    invert: bool,
}

impl NoteFilter {
    fn keep(&self, velocity: u8, duration: u32) -> bool {
        let mut keep = true;
        if duration < self.duration_min {
            keep = false;
        }
        if velocity < self.velocity_min || velocity > self.velocity_max {
            keep = false;
        }
        if self.invert {
            keep = !keep;
        }
        keep
    }
}

/// `[alnum . _ -]`, truncated to 24 characters -- used for path segments.
pub fn clean_string_for_file(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_alphanumeric() || ".-_".contains(*c))
        .collect();
    cleaned.chars().take(24).collect()
}

fn sections_for_track<'a>(root: &'a Folder, track: u16) -> Vec<&'a Folder> {
    let mut sections: Vec<&Folder> = root
        .folder_contents
        .iter()
        .filter(|f| f.index == track)
        .collect();
    sections.sort_by_key(|f| f.record.timestamp);
    sections
}

fn multi_take_sections_for_track<'a>(root: &'a Folder, track: u16) -> Vec<&'a Folder> {
    let mut sections: Vec<&Folder> = root
        .folder_contents
        .iter()
        .filter(|f| f.index == track && !f.folder_contents.is_empty())
        .collect();
    sections.sort_by_key(|f| f.record.timestamp);
    sections
}

fn track_name(root: &Folder, track: u16) -> String {
    root.folder_contents
        .iter()
        .find(|f| f.index == track)
        .and_then(|f| f.track_name.clone())
        .unwrap_or_default()
}

fn tracks_path(track: u16, name: &str) -> Vec<String> {
    vec!["tracks".into(), format!("{track}_{name}")]
}

fn sections_path(track: u16, name: &str) -> Vec<String> {
    vec!["sections".into(), format!("{track}_{name}")]
}

fn cutups_path(track: u16, name: &str) -> Vec<String> {
    vec!["cutups".into(), format!("{track}_{name}")]
}

fn join_path(segments: &[String], filename: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in segments {
        path.push(segment);
    }
    path.push(filename);
    path
}

fn allocate_midi_file(num_tracks: u16, song: &SongMeta) -> MidiFileWriter {
    let mut midi = MidiFileWriter::new(num_tracks.max(1) as usize, 960);
    midi.track_mut(0)
        .add_time_signature(0, song.numerator, song.denominator_exp);
    midi.track_mut(0).add_tempo(0, song.bpm);
    midi.track_mut(0).add_track_name(0, "Track_0");
    midi
}

/// Renders one event into `midi`'s `track_to_write_to`, rebasing its
/// timestamp by `start_offset` the same way the reference renderer does.
fn render_midi_event(
    start_offset: u32,
    event: &MidiEvent,
    midi: &mut MidiFileWriter,
    track_to_write_to: usize,
    filter: Option<&NoteFilter>,
) {
    let tick = if start_offset > 0 {
        event
            .timestamp
            .wrapping_sub(BASE_TIME)
            .wrapping_add(start_offset.wrapping_sub(0x8700))
    } else {
        event.timestamp.wrapping_sub(BASE_TIME)
    };

    match &event.kind {
        MidiEventKind::NoteOn {
            note,
            velocity,
            duration,
        } => {
            let keep = filter.map(|f| f.keep(*velocity, *duration)).unwrap_or(true);
            if keep {
                midi.track_mut(track_to_write_to)
                    .add_note(tick, event.channel, *note, *duration, *velocity);
            }
        }
        MidiEventKind::Cc { ctrl, value } => {
            midi.track_mut(track_to_write_to)
                .add_controller_event(tick, event.channel, *ctrl, *value);
        }
        MidiEventKind::ChannelPressure { pressure } => {
            midi.track_mut(track_to_write_to)
                .add_channel_pressure(tick, event.channel, *pressure);
        }
        MidiEventKind::PitchWheel { value } => {
            midi.track_mut(track_to_write_to)
                .add_pitch_wheel_event(tick, event.channel, *value);
        }
    }
}

fn dump_section(
    midi: &mut MidiFileWriter,
    events: &[MidiEvent],
    start_offset: u32,
    mut track_to_write_to: usize,
    router: Option<&mut NoteRouter>,
    filter: Option<&NoteFilter>,
    rename_tracks: bool,
    track_map: &HashMap<u8, String>,
) {
    let mut router = router;
    for event in events {
        if let (Some(router), MidiEventKind::NoteOn { note, .. }) = (router.as_deref_mut(), &event.kind) {
            track_to_write_to = router.track_for_note(*note) as usize;
            let note_label = if rename_tracks {
                track_map.get(note).cloned().unwrap_or_else(|| note.to_string())
            } else {
                note.to_string()
            };
            let name = format!("{note}_{note_label}");
            midi.track_mut(track_to_write_to).add_track_name(0, &name);
        }
        render_midi_event(start_offset, event, midi, track_to_write_to, filter);
    }
}

/// One MIDI file per top-level folder (track), sections concatenated on
/// the global timeline; multi-take sections use take 0.
pub fn dump_tracks(root: &Folder, song: &SongMeta) -> Vec<EmitOutput> {
    let mut outputs = Vec::new();
    for &track in root.track_set().iter() {
        let name = clean_string_for_file(&track_name(root, track));
        let mut midi = allocate_midi_file(1, song);
        midi.track_mut(0).add_track_name(0, &name);
        dump_track(root, track, 0, &mut midi, &HashMap::new());
        let path = join_path(&tracks_path(track, &name), &format!("{track}-{name}.mid"));
        outputs.push(EmitOutput { path, midi });
    }
    outputs
}

/// Renders a single track (used by per-track, whole-song, and cut-up
/// modes); `multi_take_choices` maps a multi-take section's record number
/// to the take index to use. Returns the choice vector formatted as text,
/// for cut-up file naming.
fn dump_track(
    root: &Folder,
    track: u16,
    track_to_write_to: usize,
    midi: &mut MidiFileWriter,
    multi_take_choices: &HashMap<u32, usize>,
) -> Option<String> {
    let mut cut_up_text: Option<String> = None;
    let mut most_recent_section_end = 0u32;

    for section in sections_for_track(root, track) {
        let section_end = section.record.timestamp.saturating_add(section.record.section_length);
        if most_recent_section_end > 0 && most_recent_section_end > section.record.timestamp {
            continue;
        }

        if section.folder_contents.is_empty() {
            dump_section(
                midi,
                &section.record.midi_events,
                section.record.timestamp,
                track_to_write_to,
                None,
                None,
                false,
                &HashMap::new(),
            );
        } else {
            let take_idx = *multi_take_choices
                .get(&section.record.record_number)
                .unwrap_or(&0);
            let combo = format!("{}_{}", section.record.record_number, take_idx);
            cut_up_text = Some(match &cut_up_text {
                Some(prev) => format!("{prev}-{combo}"),
                None => combo,
            });
            if let Some(take) = section.folder_contents.get(take_idx) {
                dump_section(
                    midi,
                    &take.record.midi_events,
                    section.record.timestamp,
                    track_to_write_to,
                    None,
                    None,
                    false,
                    &HashMap::new(),
                );
            }
        }
        most_recent_section_end = section_end;
    }

    cut_up_text
}

fn init_multi_take_choices(multi_takes: &[&Folder]) -> HashMap<u32, usize> {
    multi_takes
        .iter()
        .map(|f| (f.record.record_number, 0))
        .collect()
}

/// One file, one track per top-level folder, on the global timeline.
pub fn dump_song(root: &Folder, song: &SongMeta, project_name: &str) -> EmitOutput {
    let track_set = root.track_set();
    let mut midi = allocate_midi_file(track_set.len() as u16, song);
    for (counter, &track) in track_set.iter().enumerate() {
        let multi_takes = multi_take_sections_for_track(root, track);
        let choices = init_multi_take_choices(&multi_takes);
        let name = clean_string_for_file(&track_name(root, track));
        midi.track_mut(counter).add_track_name(0, &name);
        dump_track(root, track, counter, &mut midi, &choices);
    }
    EmitOutput {
        path: join_path(&["full".to_string()], &format!("{project_name}.mid")),
        midi,
    }
}

/// As `dump_tracks`, but every distinct note value is routed to its own
/// track within the file.
pub fn dump_track_stems(root: &Folder, song: &SongMeta, config: &Config) -> Vec<EmitOutput> {
    let mut outputs = Vec::new();
    for &track in root.track_set().iter() {
        let mut router = NoteRouter::new(config.track_limit());
        let sections = sections_for_track(root, track);
        for section in &sections {
            if section.folder_contents.is_empty() {
                router.add_notes(&section.record.midi_events);
            } else if let Some(take) = section.folder_contents.first() {
                router.add_notes(&take.record.midi_events);
            }
        }

        let mut midi = allocate_midi_file(router.track_count(), song);
        let mut most_recent_section_end = 0u32;
        for section in &sections {
            let section_end = section.record.timestamp.saturating_add(section.record.section_length);
            if most_recent_section_end > 0 && most_recent_section_end > section.record.timestamp {
                continue;
            }
            let events = if section.folder_contents.is_empty() {
                &section.record.midi_events
            } else {
                &section.folder_contents[0].record.midi_events
            };
            dump_section(
                &mut midi,
                events,
                section.record.timestamp,
                0,
                Some(&mut router),
                None,
                config.rename_tracks,
                &config.track_map,
            );
            most_recent_section_end = section_end;
        }

        let name = clean_string_for_file(&track_name(root, track));
        let path = join_path(
            &[tracks_path(track, &name), vec!["stems".into()]].concat(),
            &format!("{track}-TStem-{name}.mid"),
        );
        outputs.push(EmitOutput { path, midi });
    }
    outputs
}

/// For tracks with 2+ multi-take sections, enumerates the Cartesian
/// product of take choices, capped at `max_perms` files (`-1` = no cap).
pub fn dump_cut_ups(root: &Folder, song: &SongMeta, max_perms: i32) -> Vec<EmitOutput> {
    let mut outputs = Vec::new();
    for &track in root.track_set().iter() {
        let multi_takes = multi_take_sections_for_track(root, track);
        if multi_takes.len() <= 1 {
            continue;
        }

        let take_sizes: Vec<usize> = multi_takes.iter().map(|f| f.folder_contents.len().max(1)).collect();
        let combinations = cartesian_product(&take_sizes);

        let name = clean_string_for_file(&track_name(root, track));
        for (perm_count, combination) in combinations.into_iter().enumerate() {
            if max_perms != -1 && perm_count as i32 >= max_perms {
                break;
            }
            let mut choices = HashMap::new();
            for (take, &element) in multi_takes.iter().zip(combination.iter()) {
                choices.insert(take.record.record_number, element);
            }
            let mut midi = allocate_midi_file(1, song);
            let cut_up_text = dump_track(root, track, 0, &mut midi, &choices).unwrap_or_default();
            midi.track_mut(0).add_track_name(0, &cut_up_text);
            let path = join_path(
                &cutups_path(track, &name),
                &format!("{track}-CutUp-{cut_up_text}.mid"),
            );
            outputs.push(EmitOutput { path, midi });
        }
    }
    outputs
}

/// Lexicographic Cartesian product of `0..sizes[i]` for each `i`.
fn cartesian_product(sizes: &[usize]) -> Vec<Vec<usize>> {
    let mut result = vec![Vec::new()];
    for &size in sizes {
        let mut next = Vec::new();
        for prefix in &result {
            for value in 0..size {
                let mut combo = prefix.clone();
                combo.push(value);
                next.push(combo);
            }
        }
        result = next;
    }
    if sizes.is_empty() {
        Vec::new()
    } else {
        result
    }
}

fn write_section(
    section: &Folder,
    song: &SongMeta,
    record_no: u32,
    record_label: &str,
    do_stems: bool,
    config: &Config,
    path_segments: Vec<String>,
    filename: String,
    stem_path_segments: Vec<String>,
    stem_filename: String,
) -> EmitOutput {
    let events = &section.record.midi_events;
    if do_stems {
        let mut router = NoteRouter::new(config.track_limit());
        router.add_notes(events);
        let mut midi = allocate_midi_file(router.track_count(), song);
        dump_section(
            &mut midi,
            events,
            0,
            0,
            Some(&mut router),
            None,
            config.rename_tracks,
            &config.track_map,
        );
        EmitOutput {
            path: join_path(&stem_path_segments, &stem_filename),
            midi,
        }
    } else {
        let mut midi = allocate_midi_file(1, song);
        dump_section(&mut midi, events, 0, 0, None, None, false, &HashMap::new());
        midi.track_mut(0).add_track_name(0, record_label);
        let _ = record_no;
        EmitOutput {
            path: join_path(&path_segments, &filename),
            midi,
        }
    }
}

fn dump_section_or_section_stems(root: &Folder, song: &SongMeta, do_stems: bool, config: &Config) -> Vec<EmitOutput> {
    let mut outputs = Vec::new();
    for &track in root.track_set().iter() {
        let track_name_str = clean_string_for_file(&track_name(root, track));
        for section in sections_for_track(root, track) {
            if section.folder_contents.is_empty() {
                let record_label = clean_string_for_file(section.record.label.as_deref().unwrap_or(""));
                let record_no = section.record.record_number;
                let kind = if do_stems { "SStem" } else { "S" };
                outputs.push(write_section(
                    section,
                    song,
                    record_no,
                    &record_label,
                    do_stems,
                    config,
                    sections_path(track, &track_name_str),
                    format!("{track}-S{record_no}-{record_label}.mid"),
                    [sections_path(track, &track_name_str), vec!["stems".into()]].concat(),
                    format!("{track}-{kind}{record_no}-{record_label}.mid"),
                ));
            } else {
                for take in &section.folder_contents {
                    let record_no = section.record.record_number;
                    let record_label = clean_string_for_file(take.record.label.as_deref().unwrap_or(""));
                    let section_index = take.index;
                    let takes_dir = format!("S{record_no}_{record_label}");
                    let kind = if do_stems { "SStem" } else { "S" };
                    outputs.push(write_section(
                        take,
                        song,
                        record_no,
                        &record_label,
                        do_stems,
                        config,
                        [
                            sections_path(track, &track_name_str),
                            vec!["takes".into(), takes_dir.clone()],
                        ]
                        .concat(),
                        format!("{track}-S{record_no}-{record_label}-T{section_index}.mid"),
                        [
                            sections_path(track, &track_name_str),
                            vec!["stems".into(), "takes".into(), takes_dir],
                        ]
                        .concat(),
                        format!("{track}-{kind}{record_no}-{record_label}-T{section_index}.mid"),
                    ));
                }
            }
        }
    }
    outputs
}

pub fn dump_sections(root: &Folder, song: &SongMeta, config: &Config) -> Vec<EmitOutput> {
    dump_section_or_section_stems(root, song, false, config)
}

pub fn dump_section_stems(root: &Folder, song: &SongMeta, config: &Config) -> Vec<EmitOutput> {
    dump_section_or_section_stems(root, song, true, config)
}

/// Three internal tracks per file -- original, filtered, delta -- plus a
/// standalone file containing only the filtered track.
pub fn dump_sections_filtered(root: &Folder, song: &SongMeta, config: &Config) -> Vec<EmitOutput> {
    let mut outputs = Vec::new();
    let duration_min_ticks = (config.duration_min as f64 * song.ticks_per_ms()).round() as u32;

    for &track in root.track_set().iter() {
        let track_name_str = clean_string_for_file(&track_name(root, track));
        for section in sections_for_track(root, track) {
            if section.folder_contents.is_empty() {
                outputs.extend(write_section_filtered(
                    section,
                    track,
                    song,
                    config,
                    duration_min_ticks,
                    [sections_path(track, &track_name_str), vec!["filtered".into()]].concat(),
                    section.record.record_number,
                ));
            } else {
                for take in &section.folder_contents {
                    let label = clean_string_for_file(take.record.label.as_deref().unwrap_or(""));
                    let takes_dir = format!("S{}_{}", section.record.record_number, label);
                    outputs.extend(write_section_filtered(
                        take,
                        track,
                        song,
                        config,
                        duration_min_ticks,
                        [
                            sections_path(track, &track_name_str),
                            vec!["filtered".into(), "takes".into(), takes_dir],
                        ]
                        .concat(),
                        section.record.record_number,
                    ));
                }
            }
        }
    }
    outputs
}

fn write_section_filtered(
    section: &Folder,
    track: u16,
    song: &SongMeta,
    config: &Config,
    duration_min_ticks: u32,
    folder: Vec<String>,
    record_number: u32,
) -> Vec<EmitOutput> {
    let section_label = clean_string_for_file(section.record.label.as_deref().unwrap_or(""));
    let mut outputs = Vec::new();

    let mut midi = allocate_midi_file(3, song);
    let names = [
        format!("Orig_{section_label}"),
        format!("Filtered_{section_label}"),
        format!("Delta_{section_label}"),
    ];

    let filtered_filter = NoteFilter {
        velocity_min: config.velocity_min,
        velocity_max: config.velocity_max,
        duration_min: duration_min_ticks,
        invert: false,
    };
    let delta_filter = NoteFilter {
        velocity_min: config.velocity_min,
        velocity_max: config.velocity_max,
        duration_min: duration_min_ticks,
        invert: true,
    };

    for (i, name) in names.iter().enumerate() {
        let filter = match i {
            1 => Some(&filtered_filter),
            2 => Some(&delta_filter),
            _ => None,
        };
        dump_section(
            &mut midi,
            &section.record.midi_events,
            0,
            i,
            None,
            filter,
            false,
            &HashMap::new(),
        );
        midi.track_mut(i).add_track_name(0, name);
    }
    outputs.push(EmitOutput {
        path: join_path(
            &folder,
            &format!("{track}-deltas-S{record_number}-{section_label}-T{}.mid", section.index),
        ),
        midi,
    });

    let mut filtered_only = allocate_midi_file(1, song);
    dump_section(
        &mut filtered_only,
        &section.record.midi_events,
        0,
        0,
        None,
        Some(&filtered_filter),
        false,
        &HashMap::new(),
    );
    filtered_only.track_mut(0).add_track_name(0, &section_label);
    outputs.push(EmitOutput {
        path: join_path(
            &folder,
            &format!("{track}-S{record_number}-{section_label}-T{}.mid", section.index),
        ),
        midi: filtered_only,
    });

    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Record;

    fn sample_root() -> Folder {
        let mut root = Folder::root();
        let mut top = Folder::new(0);
        top.record = Record::new(100, BASE_TIME);
        top.record.section_length = 0x1000;
        top.record.midi_events.push(MidiEvent {
            timestamp: BASE_TIME,
            channel: 0,
            kind: MidiEventKind::NoteOn {
                note: 60,
                velocity: 100,
                duration: 0x400,
            },
        });
        root.folder_contents.push(top);
        root
    }

    #[test]
    fn dump_tracks_produces_one_file_per_track() {
        let root = sample_root();
        let song = SongMeta {
            bpm: 120.0,
            numerator: 4,
            denominator_exp: 2,
        };
        let outputs = dump_tracks(&root, &song);
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn track_stems_use_track_map_name_when_rename_tracks_is_set() {
        let root = sample_root();
        let song = SongMeta {
            bpm: 120.0,
            numerator: 4,
            denominator_exp: 2,
        };
        let mut config = Config::default();
        config.rename_tracks = true;
        config.track_map.insert(60, "Kick".to_string());

        let outputs = dump_track_stems(&root, &song, &config);
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].midi.track(0).name(), Some("60_Kick"));
    }

    #[test]
    fn cartesian_product_is_lexicographic() {
        let product = cartesian_product(&[3, 4]);
        assert_eq!(product.len(), 12);
        assert_eq!(product[0], vec![0, 0]);
        assert_eq!(product[1], vec![0, 1]);
        assert_eq!(product[4], vec![1, 0]);
    }
}
