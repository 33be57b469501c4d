use crate::error::EventDecodeError;
use crate::scanner::Scanner;
use crate::song::BASE_TIME;
use crate::tree::{MidiEvent, MidiEventKind};

/// Options that feed into pitch-wheel rescaling; everything else about event
/// decoding is fixed by the container format.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDecodeOptions {
    pub override_pitch_bend: bool,
    pub pitch_bend_multiplier: i32,
}

struct TwoPartEvent {
    time: u32,
    value_a: u8,
    value_b: u8,
}

/// Reads the `(time, valueA, valueB)` shape shared by CC, pressure,
/// pitch-wheel and the unemitted 0x5x opcode: 3+4+3+1+1+3 = 15 bytes after
/// the already-consumed opcode byte.
fn read_two_part_event(scanner: &mut Scanner, offset: usize) -> Result<TwoPartEvent, EventDecodeError> {
    let missing = || EventDecodeError::Truncated { offset };
    scanner.skip(3).ok_or_else(missing)?;
    let time = scanner.eat_u32_le().ok_or_else(missing)?;
    scanner.skip(3).ok_or_else(missing)?;
    let value_a = scanner.eat_u8().ok_or_else(missing)?;
    let value_b = scanner.eat_u8().ok_or_else(missing)?;
    scanner.skip(3).ok_or_else(missing)?;
    Ok(TwoPartEvent {
        time,
        value_a,
        value_b,
    })
}

struct LastNoteEvent {
    note: u8,
    timestamp: u32,
}

/// Decodes the opcode stream of a single MIDI payload record into an ordered
/// list of events. `payload` starts at `dataStart`; `payload_length` is the
/// record header's declared length in bytes.
pub fn decode_events(
    payload: &[u8],
    payload_length: u32,
    section_length: u32,
    options: EventDecodeOptions,
) -> Result<Vec<MidiEvent>, EventDecodeError> {
    let mut events = Vec::new();
    let mut scanner = Scanner::new(payload);
    let mut last_note_event: Option<LastNoteEvent> = None;
    let total_buffer_size = payload_length as usize;

    loop {
        let offset = scanner.position();
        let cmd = scanner
            .eat_u8()
            .ok_or(EventDecodeError::Truncated { offset })?;
        let channel = cmd & 0x0F;
        let missing = || EventDecodeError::Truncated { offset };

        match cmd {
            0x90..=0x9F => {
                scanner.skip(3).ok_or_else(missing)?;
                let note_start = scanner.eat_u32_le().ok_or_else(missing)?;
                scanner.skip(3).ok_or_else(missing)?;
                let velocity = scanner.eat_u8().ok_or_else(missing)?;
                let note = scanner.eat_u8().ok_or_else(missing)?;
                scanner.skip(3).ok_or_else(missing)?;
                scanner.skip(7).ok_or_else(missing)?;

                let follow_up = scanner.eat_u8().ok_or_else(missing)?;
                if !(0x80..=0x8F).contains(&follow_up) {
                    return Err(EventDecodeError::MissingNoteOff { offset });
                }

                let extended_bytes = scanner.eat_u32_le().ok_or_else(missing)?;
                let mut duration = scanner.eat_u32_le().ok_or_else(missing)?;
                let _ = extended_bytes;

                let section_end = BASE_TIME + section_length;
                let mut add_note = true;

                if let Some(last) = &last_note_event {
                    if last.note == note && last.timestamp == note_start {
                        add_note = false;
                    }
                }

                if note_start >= section_end {
                    add_note = false;
                } else if note_start.saturating_add(duration) > section_end {
                    duration = section_end - note_start;
                }

                if add_note {
                    events.push(MidiEvent {
                        timestamp: note_start,
                        channel,
                        kind: MidiEventKind::NoteOn {
                            note,
                            velocity,
                            duration,
                        },
                    });
                    last_note_event = Some(LastNoteEvent {
                        note,
                        timestamp: note_start,
                    });
                }
            }
            0x00..=0x0A | 0xFF => {
                scanner.skip(6).ok_or_else(missing)?;
                let follow_up = scanner.eat_u8().ok_or_else(missing)?;
                if follow_up != 0xA8 && follow_up != 0xA7 && follow_up != 0xB5 {
                    log::warn!("unknown internal command 0x{follow_up:02X} at offset {offset}");
                }
                scanner.skip(8).ok_or_else(missing)?;
            }
            0x20..=0x2F | 0x40 => {
                scanner.skip(15).ok_or_else(missing)?;
            }
            0x50..=0x5F => {
                // cc general-purpose controller / synth knobs: diagnostic
                // only, not currently emitted as an event.
                let _ = read_two_part_event(&mut scanner, offset)?;
            }
            0x60..=0x6F => {
                if total_buffer_size == 48 {
                    scanner.skip(31).ok_or_else(missing)?;
                } else {
                    scanner.skip(15).ok_or_else(missing)?;
                }
            }
            0x70..=0x7F => {
                scanner.skip(31).ok_or_else(missing)?;
            }
            0x80..=0x8F | 0xA0..=0xAF | 0xC0..=0xCF => {
                scanner.skip(15).ok_or_else(missing)?;
            }
            0xB0..=0xBF => {
                let event = read_two_part_event(&mut scanner, offset)?;
                let section_end = BASE_TIME + section_length;
                if event.time <= section_end {
                    events.push(MidiEvent {
                        timestamp: event.time,
                        channel,
                        kind: MidiEventKind::Cc {
                            ctrl: event.value_a,
                            value: event.value_b,
                        },
                    });
                }
            }
            0xD0..=0xDF => {
                let event = read_two_part_event(&mut scanner, offset)?;
                let section_end = BASE_TIME + section_length;
                if event.time <= section_end {
                    events.push(MidiEvent {
                        timestamp: event.time,
                        channel,
                        kind: MidiEventKind::ChannelPressure {
                            pressure: event.value_a,
                        },
                    });
                }
            }
            0xE0..=0xEF => {
                let event = read_two_part_event(&mut scanner, offset)?;
                let section_end = BASE_TIME + section_length;
                let raw = ((u32::from(event.value_a) & 0x7F) << 7) | (u32::from(event.value_b) & 0x7F);
                let mut pitch_wheel = raw as i32 - 8192;
                if options.override_pitch_bend {
                    pitch_wheel *= options.pitch_bend_multiplier;
                    pitch_wheel = pitch_wheel.clamp(-8192, 8191);
                }
                if event.time <= section_end {
                    events.push(MidiEvent {
                        timestamp: event.time,
                        channel,
                        kind: MidiEventKind::PitchWheel {
                            value: pitch_wheel as i16,
                        },
                    });
                }
            }
            0xF1 => break,
            0x30..=0x3F | 0x11 | 0x12 => break,
            other => {
                return Err(EventDecodeError::UnrecognisedCommand {
                    opcode: other,
                    offset,
                });
            }
        }

        let buffer_used = scanner.position();
        if buffer_used > total_buffer_size {
            return Err(EventDecodeError::Overrun { offset });
        }
        if buffer_used == total_buffer_size {
            break;
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_on_off_bytes(note_start: u32, note: u8, velocity: u8, duration: u32) -> Vec<u8> {
        let mut b = Vec::new();
        b.push(0x90);
        b.extend_from_slice(&[0u8; 3]);
        b.extend_from_slice(&note_start.to_le_bytes());
        b.extend_from_slice(&[0u8; 3]);
        b.push(velocity);
        b.push(note);
        b.extend_from_slice(&[0u8; 3]);
        b.extend_from_slice(&[0u8; 7]);
        b.push(0x80);
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&duration.to_le_bytes());
        b.push(0xF1);
        b
    }

    #[test]
    fn simple_note_on() {
        let bytes = note_on_off_bytes(BASE_TIME, 60, 100, 0x400);
        let len = bytes.len() as u32;
        let events = decode_events(&bytes, len, 0x1000, EventDecodeOptions::default()).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0].kind {
            MidiEventKind::NoteOn {
                note,
                velocity,
                duration,
            } => {
                assert_eq!(*note, 60);
                assert_eq!(*velocity, 100);
                assert_eq!(*duration, 0x400);
            }
            _ => panic!("expected NoteOn"),
        }
        assert_eq!(events[0].timestamp, BASE_TIME);
    }

    #[test]
    fn note_truncated_to_section_end() {
        let bytes = note_on_off_bytes(BASE_TIME, 60, 100, 0x2000);
        let len = bytes.len() as u32;
        let events = decode_events(&bytes, len, 0x1000, EventDecodeOptions::default()).unwrap();
        match &events[0].kind {
            MidiEventKind::NoteOn { duration, .. } => assert_eq!(*duration, 0x1000),
            _ => panic!("expected NoteOn"),
        }
    }

    #[test]
    fn note_with_huge_duration_truncates_without_overflow() {
        let note_start = 0x9500;
        let bytes = note_on_off_bytes(note_start, 60, 100, 0xFFFF0000);
        let len = bytes.len() as u32;
        let events = decode_events(&bytes, len, 0x1000, EventDecodeOptions::default()).unwrap();
        match &events[0].kind {
            MidiEventKind::NoteOn { duration, .. } => {
                assert_eq!(*duration, BASE_TIME + 0x1000 - note_start)
            }
            _ => panic!("expected NoteOn"),
        }
    }

    #[test]
    fn note_past_section_end_dropped() {
        let bytes = note_on_off_bytes(0xA700, 60, 100, 0x400);
        let len = bytes.len() as u32;
        let events = decode_events(&bytes, len, 0x1000, EventDecodeOptions::default()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn duplicate_note_on_deduped() {
        let mut bytes = note_on_off_bytes(BASE_TIME, 60, 100, 0x400);
        bytes.pop(); // drop the 0xF1 terminator from the first copy
        bytes.extend(note_on_off_bytes(BASE_TIME, 60, 100, 0x400));
        let len = bytes.len() as u32;
        let events = decode_events(&bytes, len, 0x1000, EventDecodeOptions::default()).unwrap();
        assert_eq!(events.len(), 1);
    }

    fn two_part_bytes(opcode: u8, time: u32, value_a: u8, value_b: u8) -> Vec<u8> {
        let mut b = Vec::new();
        b.push(opcode);
        b.extend_from_slice(&[0u8; 3]);
        b.extend_from_slice(&time.to_le_bytes());
        b.extend_from_slice(&[0u8; 3]);
        b.push(value_a);
        b.push(value_b);
        b.extend_from_slice(&[0u8; 3]);
        b.push(0xF1);
        b
    }

    #[test]
    fn pitch_wheel_without_override() {
        let bytes = two_part_bytes(0xE4, BASE_TIME, 0x40, 0x17);
        let len = bytes.len() as u32;
        let events = decode_events(&bytes, len, 0x1000, EventDecodeOptions::default()).unwrap();
        match &events[0].kind {
            MidiEventKind::PitchWheel { value } => assert_eq!(*value, 23),
            _ => panic!("expected PitchWheel"),
        }
    }

    #[test]
    fn pitch_wheel_with_override_clamped() {
        let bytes = two_part_bytes(0xE0, BASE_TIME, 0x7F, 0x7F);
        let len = bytes.len() as u32;
        let opts = EventDecodeOptions {
            override_pitch_bend: true,
            pitch_bend_multiplier: 24,
        };
        let events = decode_events(&bytes, len, 0x1000, opts).unwrap();
        match &events[0].kind {
            MidiEventKind::PitchWheel { value } => assert_eq!(*value, 8191),
            _ => panic!("expected PitchWheel"),
        }
    }

    #[test]
    fn pitch_wheel_moderate_override() {
        let bytes = two_part_bytes(0xE4, BASE_TIME, 0x40, 0x17);
        let len = bytes.len() as u32;
        let opts = EventDecodeOptions {
            override_pitch_bend: true,
            pitch_bend_multiplier: 24,
        };
        let events = decode_events(&bytes, len, 0x1000, opts).unwrap();
        match &events[0].kind {
            MidiEventKind::PitchWheel { value } => assert_eq!(*value, 552),
            _ => panic!("expected PitchWheel"),
        }
    }
}
