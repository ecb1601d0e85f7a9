//! MIDI timing
//!
//! Converts a Standard MIDI File into notes with absolute start and end
//! times in seconds, honouring tempo changes from every track.

use hprep_common::{Error, Result};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::{HashMap, VecDeque};
use std::path::Path;

/// Tempo assumed before the first tempo event (120 BPM)
const DEFAULT_TEMPO_US_PER_QN: u32 = 500_000;

/// One sounded note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    /// Seconds
    pub start: f64,
    /// Seconds
    pub end: f64,
}

/// Notes and overall extent of a parsed MIDI file
#[derive(Debug, Clone, PartialEq)]
pub struct MidiScore {
    notes: Vec<Note>,
    end_time: f64,
}

impl MidiScore {
    /// Score from notes alone; ends with the last note
    pub fn from_notes(notes: Vec<Note>) -> Self {
        let end_time = notes.iter().map(|n| n.end).fold(0.0, f64::max);
        Self { notes, end_time }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read MIDI file {}: {}", path.display(), e),
            ))
        })?;
        Self::parse(&bytes).map_err(|e| match e {
            Error::Midi(msg) => Error::Midi(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let smf = Smf::parse(bytes).map_err(|e| Error::Midi(e.to_string()))?;
        let clock = TickClock::from_smf(&smf)?;

        let mut notes = Vec::new();
        let mut last_event_tick: u64 = 0;

        for (track_idx, track) in smf.tracks.iter().enumerate() {
            let mut tick: u64 = 0;
            // (channel, key) -> pending (start tick, velocity), oldest first
            let mut open: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();

            for event in track {
                tick += event.delta.as_int() as u64;

                match event.kind {
                    TrackEventKind::Midi { channel, message } => {
                        let channel = channel.as_int();
                        match message {
                            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                                open.entry((channel, key.as_int()))
                                    .or_default()
                                    .push_back((tick, vel.as_int()));
                            }
                            MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                                let pending = open
                                    .get_mut(&(channel, key.as_int()))
                                    .and_then(VecDeque::pop_front);
                                if let Some((start_tick, velocity)) = pending {
                                    notes.push(Note {
                                        pitch: key.as_int(),
                                        velocity,
                                        start: clock.seconds(start_tick),
                                        end: clock.seconds(tick),
                                    });
                                    last_event_tick = last_event_tick.max(tick);
                                }
                            }
                            MidiMessage::Controller { .. } | MidiMessage::PitchBend { .. } => {
                                last_event_tick = last_event_tick.max(tick);
                            }
                            _ => {}
                        }
                    }
                    TrackEventKind::Meta(
                        MetaMessage::TimeSignature(..)
                        | MetaMessage::KeySignature(..)
                        | MetaMessage::Lyric(_)
                        | MetaMessage::Text(_),
                    ) => {
                        last_event_tick = last_event_tick.max(tick);
                    }
                    _ => {}
                }
            }

            let dangling: usize = open.values().map(VecDeque::len).sum();
            if dangling > 0 {
                tracing::trace!(track = track_idx, dangling, "Dropping notes without note-off");
            }
        }

        notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));

        Ok(Self {
            notes,
            end_time: clock.seconds(last_event_tick),
        })
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Earliest note onset; `None` for a score without notes
    pub fn first_onset(&self) -> Option<f64> {
        self.notes.iter().map(|n| n.start).reduce(f64::min)
    }

    /// Time of the last note end, controller, pitch bend or marker event
    pub fn end_time(&self) -> f64 {
        self.end_time
    }
}

/// Tick -> seconds conversion
#[derive(Debug)]
struct TickClock {
    /// (tick, seconds at tick, seconds per tick from there on), ascending ticks
    segments: Vec<(u64, f64, f64)>,
}

impl TickClock {
    fn from_smf(smf: &Smf) -> Result<Self> {
        match smf.header.timing {
            Timing::Metrical(ticks_per_qn) => {
                let tpq = ticks_per_qn.as_int();
                if tpq == 0 {
                    return Err(Error::Midi("zero ticks per quarter note".to_string()));
                }

                let mut changes: Vec<(u64, u32)> = Vec::new();
                for track in &smf.tracks {
                    let mut tick: u64 = 0;
                    for event in track {
                        tick += event.delta.as_int() as u64;
                        if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                            changes.push((tick, tempo.as_int()));
                        }
                    }
                }
                changes.sort_by_key(|&(tick, _)| tick);

                let per_tick = |us_per_qn: u32| us_per_qn as f64 / 1_000_000.0 / tpq as f64;
                let mut segments = vec![(0u64, 0.0f64, per_tick(DEFAULT_TEMPO_US_PER_QN))];
                for (tick, us_per_qn) in changes {
                    let (prev_tick, prev_secs, prev_rate) = segments[segments.len() - 1];
                    let secs = prev_secs + (tick - prev_tick) as f64 * prev_rate;
                    if tick == prev_tick {
                        segments.pop();
                    }
                    segments.push((tick, secs, per_tick(us_per_qn)));
                }
                Ok(Self { segments })
            }
            Timing::Timecode(fps, subframes) => {
                let ticks_per_second = fps.as_f32() as f64 * subframes as f64;
                if ticks_per_second <= 0.0 {
                    return Err(Error::Midi("zero SMPTE resolution".to_string()));
                }
                Ok(Self {
                    segments: vec![(0, 0.0, 1.0 / ticks_per_second)],
                })
            }
        }
    }

    fn seconds(&self, tick: u64) -> f64 {
        let idx = self.segments.partition_point(|&(t, _, _)| t <= tick);
        let (seg_tick, seg_secs, rate) = self.segments[idx.saturating_sub(1)];
        seg_secs + (tick - seg_tick) as f64 * rate
    }
}
