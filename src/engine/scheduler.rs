//! Lookahead note scheduler.
//!
//! A periodic tick (every `tick_secs` of audio time) schedules every note
//! whose start falls before `now + lookahead_secs`. Because the horizon is
//! longer than the tick period a delayed tick never produces a late note;
//! latency is bounded by the lookahead window.

use serde::Serialize;
use tracing::debug;

use super::clock::{CancelToken, PeriodicTask};
use crate::config::EngineConfig;
use crate::sequence::{MelodicWalker, RhythmPattern};

/// A note placed on the audio timeline. Times are seconds on the engine
/// clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduledNote {
    pub start: f64,
    /// Rhythmic slot length; the next note starts at `start + duration`.
    pub duration: f64,
    /// How long the gate is held (`duration × gate_ratio`).
    pub gate: f64,
    pub frequency: f64,
    /// Low-pass target the voice chain ramps toward at note onset.
    pub cutoff_hz: f64,
}

impl ScheduledNote {
    pub fn end_of_gate(&self) -> f64 {
        self.start + self.gate
    }
}

#[derive(Debug)]
struct Running {
    walker: MelodicWalker,
    task: PeriodicTask,
    next_note_time: f64,
    note_index: u64,
    cutoff_hz: f64,
}

/// Stopped when `running` is `None`.
#[derive(Debug)]
pub struct NoteScheduler {
    rhythm: RhythmPattern,
    tick_secs: f64,
    lookahead_secs: f64,
    lead_in_secs: f64,
    gate_ratio: f64,
    scale_steps: usize,
    fibonacci_len: usize,
    anchor_root: bool,
    running: Option<Running>,
}

impl NoteScheduler {
    pub fn new(config: &EngineConfig) -> Self {
        NoteScheduler {
            rhythm: RhythmPattern::new(config.tempo_bpm),
            tick_secs: config.tick_secs,
            lookahead_secs: config.lookahead_secs,
            lead_in_secs: config.lead_in_secs,
            gate_ratio: config.gate_ratio,
            scale_steps: config.scale_steps,
            fibonacci_len: config.fibonacci_len,
            anchor_root: config.anchor_root,
            running: None,
        }
    }

    /// Reset the walk around `base_hz` and start ticking at `now`. Any
    /// previous run is cancelled first.
    pub fn start(&mut self, base_hz: f64, cutoff_hz: f64, now: f64) {
        self.stop();
        let walker = MelodicWalker::for_base(base_hz, self.scale_steps, self.fibonacci_len);
        debug!(base_hz, rungs = walker.scale().len(), "scheduler started");
        self.running = Some(Running {
            walker,
            task: PeriodicTask::new(self.tick_secs, now, CancelToken::new()),
            next_note_time: now + self.lead_in_secs,
            note_index: 0,
            cutoff_hz,
        });
    }

    /// Cancel the tick. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.token().cancel();
            debug!(notes = running.note_index, "scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// When the next tick is due, if running.
    pub fn next_tick(&self) -> Option<f64> {
        self.running.as_ref().map(|r| r.task.next_due())
    }

    /// Run the tick if it is due at `now`, returning the notes it scheduled.
    pub fn poll(&mut self, now: f64) -> Vec<ScheduledNote> {
        let horizon = now + self.lookahead_secs;
        let Some(running) = self.running.as_mut() else {
            return Vec::new();
        };
        if !running.task.due(now) {
            return Vec::new();
        }

        let mut notes = Vec::new();
        while running.next_note_time < horizon {
            // Walker notes take their slot from the step they are about to read.
            let (slot, frequency) = if self.anchor_root && running.note_index == 0 {
                (0, running.walker.root())
            } else {
                let slot = running.walker.step_index() % 3;
                (slot, running.walker.next())
            };
            let duration = self.rhythm.duration(slot);
            notes.push(ScheduledNote {
                start: running.next_note_time,
                duration,
                gate: duration * self.gate_ratio,
                frequency,
                cutoff_hz: running.cutoff_hz,
            });
            running.next_note_time += duration;
            running.note_index += 1;
        }
        notes
    }

    /// Start time of the next note not yet scheduled.
    pub fn next_note_time(&self) -> Option<f64> {
        self.running.as_ref().map(|r| r.next_note_time)
    }

    pub fn notes_scheduled(&self) -> u64 {
        self.running.as_ref().map_or(0, |r| r.note_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::PHI;

    fn scheduler() -> NoteScheduler {
        NoteScheduler::new(&EngineConfig::default())
    }

    /// Poll every tick for `secs` of audio time.
    fn run(s: &mut NoteScheduler, from: f64, secs: f64) -> Vec<ScheduledNote> {
        let mut notes = Vec::new();
        let mut t = from;
        while t < from + secs {
            notes.extend(s.poll(t));
            t += 0.001;
        }
        notes
    }

    #[test]
    fn first_note_is_the_root_after_lead_in() {
        let mut s = scheduler();
        s.start(432.0, 9000.0, 0.0);
        let notes = s.poll(0.0);
        assert_eq!(notes.len(), 1, "only the lead-in note fits the horizon");
        let first = notes[0];
        assert!((first.frequency - 432.0).abs() < 1e-9);
        assert!((first.start - 0.1).abs() < 1e-12);
        let beat = 60.0 / 68.0;
        assert!((first.duration - beat).abs() < 1e-12);
        assert!((first.gate - beat * 0.95).abs() < 1e-12);
    }

    #[test]
    fn later_notes_follow_the_walk() {
        let mut s = scheduler();
        s.start(432.0, 9000.0, 0.0);
        let notes = run(&mut s, 0.0, 5.0);
        assert!(notes.len() >= 4);
        // Walker step 0: fib[0] = 1, outward.
        assert!((notes[1].frequency - 432.0 * PHI).abs() < 1e-6);
        // Step 1: fib[1] = 1, outward.
        assert!((notes[2].frequency - 432.0 * PHI).abs() < 1e-6);
        // Step 2: fib[2] = 2, outward.
        assert!((notes[3].frequency - 432.0 * PHI * PHI).abs() < 1e-6);
    }

    #[test]
    fn notes_are_contiguous_and_never_late() {
        let mut s = scheduler();
        s.start(528.0, 2000.0, 0.0);
        let mut t = 0.0;
        let mut last_end: Option<f64> = None;
        while t < 20.0 {
            for note in s.poll(t) {
                assert!(note.start >= t, "note at {} scheduled late at {t}", note.start);
                assert!(note.start < t + 0.15 + 1e-12);
                if let Some(end) = last_end {
                    assert!((note.start - end).abs() < 1e-9, "gap between notes");
                }
                last_end = Some(note.start + note.duration);
                assert_eq!(note.cutoff_hz, 2000.0);
            }
            t += 0.025;
        }
        assert!(s.notes_scheduled() > 20);
    }

    #[test]
    fn rhythm_cycles_through_three_slots() {
        let mut s = scheduler();
        s.start(432.0, 9000.0, 0.0);
        let notes = run(&mut s, 0.0, 6.0);
        let beat = 60.0 / 68.0;
        let expected = [1.0, PHI / 2.0, 1.0 / PHI];
        assert!((notes[0].duration - beat).abs() < 1e-12, "root takes the first slot");
        for (step, note) in notes.iter().skip(1).enumerate().take(6) {
            assert!(
                (note.duration - expected[step % 3] * beat).abs() < 1e-12,
                "walker step {step} has duration {}",
                note.duration
            );
        }
    }

    #[test]
    fn walker_steps_keep_their_own_slot_after_the_root() {
        let mut s = scheduler();
        s.start(432.0, 9000.0, 0.0);
        let notes = run(&mut s, 0.0, 6.0);
        assert!(notes.len() >= 5);
        let beat = 60.0 / 68.0;
        let beats: Vec<f64> = notes[1..=4].iter().map(|n| n.duration / beat).collect();
        let expected = [1.0, PHI / 2.0, 1.0 / PHI, 1.0];
        for (got, want) in beats.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "beats {beats:?}");
        }
        // Walker step 0 lands one rung up and lasts a full beat.
        assert!((notes[1].frequency - 432.0 * PHI).abs() < 1e-6);
        assert!((notes[1].duration - beat).abs() < 1e-12);
    }

    #[test]
    fn without_anchor_slots_follow_the_step_index() {
        let config = EngineConfig {
            anchor_root: false,
            ..Default::default()
        };
        let mut s = NoteScheduler::new(&config);
        s.start(432.0, 9000.0, 0.0);
        let notes = run(&mut s, 0.0, 6.0);
        let beat = 60.0 / 68.0;
        let expected = [1.0, PHI / 2.0, 1.0 / PHI];
        for (i, note) in notes.iter().enumerate().take(6) {
            assert!((note.duration - expected[i % 3] * beat).abs() < 1e-12, "note {i}");
        }
    }

    #[test]
    fn without_anchor_the_walk_starts_immediately() {
        let config = EngineConfig {
            anchor_root: false,
            ..Default::default()
        };
        let mut s = NoteScheduler::new(&config);
        s.start(432.0, 9000.0, 0.0);
        let notes = s.poll(0.0);
        assert!((notes[0].frequency - 432.0 * PHI).abs() < 1e-6);
    }

    #[test]
    fn stop_cancels_and_restart_resets() {
        let mut s = scheduler();
        s.start(432.0, 9000.0, 0.0);
        run(&mut s, 0.0, 3.0);
        s.stop();
        assert!(!s.is_running());
        assert!(s.poll(3.5).is_empty());
        assert_eq!(s.next_tick(), None);
        s.stop();

        s.start(396.0, 9000.0, 4.0);
        let notes = s.poll(4.0);
        assert!((notes[0].frequency - 396.0).abs() < 1e-9);
        assert!((notes[0].start - 4.1).abs() < 1e-9);
    }

    #[test]
    fn one_tick_per_period() {
        let mut s = scheduler();
        s.start(432.0, 9000.0, 0.0);
        s.poll(0.0);
        assert!(s.poll(0.01).is_empty());
        assert!((s.next_tick().unwrap_or_default() - 0.025).abs() < 1e-12);
    }
}
