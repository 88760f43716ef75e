//! Playback cursor.
//!
//! [`Playback`] holds no reference to its replay; every call that reads
//! events takes the replay explicitly, so one replay can drive any number
//! of cursors.

use crate::game::input::InputEvent;
use crate::replay::format::{Checkpoint, Replay};

/// Normal playback speed, in percent.
pub const NORMAL_SPEED: u32 = 100;

/// Where a seek landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeekPoint {
    /// Checkpoint index restored from (`None` means the initial state)
    pub checkpoint: Option<usize>,
    /// First event still to be applied
    pub event_index: usize,
    /// Frame the cursor now stands on
    pub frame: u32,
}

/// Cursor over a replay's events and checkpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Playback {
    next_event: usize,
    next_checkpoint: usize,
    last_checkpoint: Option<usize>,
    frame: u32,
    speed: u32,
    accumulator: u32,
}

impl Default for Playback {
    fn default() -> Self {
        Self::new()
    }
}

impl Playback {
    /// Cursor at frame 0, normal speed.
    pub fn new() -> Self {
        Self {
            next_event: 0,
            next_checkpoint: 0,
            last_checkpoint: None,
            frame: 0,
            speed: NORMAL_SPEED,
            accumulator: 0,
        }
    }

    /// Current frame.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Index of the next unconsumed event.
    pub fn next_event_index(&self) -> usize {
        self.next_event
    }

    /// Last checkpoint passed or restored.
    pub fn last_checkpoint(&self) -> Option<usize> {
        self.last_checkpoint
    }

    /// Speed in percent.
    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// The next event, if it belongs to the current frame.
    ///
    /// Advances by exactly one event per call; callers loop to drain a
    /// frame holding several events.
    pub fn next_event(&mut self, replay: &Replay) -> Option<InputEvent> {
        let event = *replay.events().get(self.next_event)?;
        if event.frame != self.frame {
            return None;
        }
        self.next_event += 1;
        Some(event)
    }

    /// The next checkpoint, if it was taken at the current frame and event
    /// position. Checkpoints the cursor has already moved past are skipped.
    pub fn due_checkpoint(&mut self, replay: &Replay) -> Option<(usize, Checkpoint)> {
        while let Some(&checkpoint) = replay.checkpoints().get(self.next_checkpoint) {
            let index = self.next_checkpoint;
            let position = (checkpoint.frame, checkpoint.event_index as usize);
            if position < (self.frame, self.next_event) {
                self.next_checkpoint += 1;
                continue;
            }
            if position == (self.frame, self.next_event) {
                self.next_checkpoint += 1;
                self.last_checkpoint = Some(index);
                return Some((index, checkpoint));
            }
            return None;
        }
        None
    }

    /// Move to the next frame.
    ///
    /// Events still pending for the frame being left are never delivered.
    pub fn advance_frame(&mut self) {
        self.frame += 1;
    }

    /// Position the cursor on the best checkpoint for reaching `target`.
    ///
    /// Picks the checkpoint with the greatest frame not after `target`, or
    /// the start of the replay if there is none. The caller restores that
    /// state and plays forward to `target`.
    pub fn seek(&mut self, replay: &Replay, target: u32) -> SeekPoint {
        match replay.checkpoint_at_or_before(target) {
            Some((index, checkpoint)) => {
                self.next_event = checkpoint.event_index as usize;
                self.next_checkpoint = index + 1;
                self.last_checkpoint = Some(index);
                self.frame = checkpoint.frame;
            }
            None => {
                self.next_event = 0;
                self.next_checkpoint = 0;
                self.last_checkpoint = None;
                self.frame = 0;
            }
        }
        self.accumulator = 0;
        SeekPoint {
            checkpoint: self.last_checkpoint,
            event_index: self.next_event,
            frame: self.frame,
        }
    }

    /// Set the speed in percent: 0 pauses, 100 is normal, 200 double.
    pub fn set_speed(&mut self, percent: u32) {
        self.speed = percent;
        if percent == 0 {
            self.accumulator = 0;
        }
    }

    /// Ticks to run for one external update at the current speed.
    ///
    /// Fractions carry over, so 50% yields a tick every other call.
    pub fn ticks_due(&mut self) -> u32 {
        let total = self.accumulator.saturating_add(self.speed);
        self.accumulator = total % NORMAL_SPEED;
        total / NORMAL_SPEED
    }

    /// True once every event is consumed and the recorded duration reached.
    pub fn is_exhausted(&self, replay: &Replay) -> bool {
        self.next_event >= replay.event_count() && self.frame >= replay.duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::InputKind;
    use crate::game::ruleset::Ruleset;
    use crate::game::state::{GameState, Outcome};

    fn replay() -> Replay {
        let mut replay = Replay::new(7, "l", "r", true).unwrap();
        let state = GameState::init(7, Ruleset::default()).unwrap();
        let cp = Checkpoint::capture(&state, 0);
        replay.push_checkpoint(cp).unwrap();
        replay.push_event(InputEvent::new(2, InputKind::RotateLeft)).unwrap();
        replay.push_event(InputEvent::new(2, InputKind::RotateLeft)).unwrap();
        replay.push_event(InputEvent::new(5, InputKind::Switch)).unwrap();
        replay.push_checkpoint(Checkpoint { frame: 6, event_index: 3, ..cp }).unwrap();
        replay.push_event(InputEvent::new(8, InputKind::Switch)).unwrap();
        replay.finalize(10, 0, Outcome::Incomplete);
        replay
    }

    #[test]
    fn test_one_event_per_call() {
        let replay = replay();
        let mut playback = Playback::new();
        playback.advance_frame();
        assert_eq!(playback.next_event(&replay), None);
        playback.advance_frame();

        assert_eq!(playback.next_event(&replay).map(|e| e.frame), Some(2));
        assert_eq!(playback.next_event_index(), 1);
        assert_eq!(playback.next_event(&replay).map(|e| e.frame), Some(2));
        assert_eq!(playback.next_event(&replay), None);
        assert_eq!(playback.next_event_index(), 2);
    }

    #[test]
    fn test_due_checkpoints() {
        let replay = replay();
        let mut playback = Playback::new();
        assert_eq!(playback.due_checkpoint(&replay).map(|(i, _)| i), Some(0));
        assert_eq!(playback.due_checkpoint(&replay), None);

        for _ in 0..6 {
            while playback.next_event(&replay).is_some() {}
            playback.advance_frame();
        }
        assert_eq!(playback.frame(), 6);
        assert_eq!(playback.due_checkpoint(&replay).map(|(i, _)| i), Some(1));
        assert_eq!(playback.last_checkpoint(), Some(1));
    }

    #[test]
    fn test_seek() {
        let replay = replay();
        let mut playback = Playback::new();

        let point = playback.seek(&replay, 7);
        assert_eq!(point, SeekPoint { checkpoint: Some(1), event_index: 3, frame: 6 });
        assert_eq!(playback.frame(), 6);

        let point = playback.seek(&replay, 5);
        assert_eq!(point, SeekPoint { checkpoint: Some(0), event_index: 0, frame: 0 });
    }

    #[test]
    fn test_seek_without_checkpoints() {
        let replay = Replay::new(7, "l", "r", true).unwrap();
        let mut playback = Playback::new();
        playback.advance_frame();
        let point = playback.seek(&replay, 3);
        assert_eq!(point, SeekPoint { checkpoint: None, event_index: 0, frame: 0 });
    }

    #[test]
    fn test_speed() {
        let mut playback = Playback::new();
        assert_eq!(playback.ticks_due(), 1);

        playback.set_speed(200);
        assert_eq!(playback.ticks_due(), 2);

        playback.set_speed(50);
        let ticks: Vec<u32> = (0..4).map(|_| playback.ticks_due()).collect();
        assert_eq!(ticks, vec![0, 1, 0, 1]);

        playback.set_speed(0);
        assert_eq!(playback.ticks_due(), 0);
    }

    #[test]
    fn test_huge_speed_saturates() {
        let mut playback = Playback::new();
        playback.set_speed(50);
        assert_eq!(playback.ticks_due(), 0);

        playback.set_speed(u32::MAX);
        assert_eq!(playback.ticks_due(), u32::MAX / NORMAL_SPEED);
        assert_eq!(playback.ticks_due(), u32::MAX / NORMAL_SPEED);
    }

    #[test]
    fn test_exhausted() {
        let replay = replay();
        let mut playback = Playback::new();
        for _ in 0..10 {
            while playback.next_event(&replay).is_some() {}
            assert!(!playback.is_exhausted(&replay));
            playback.advance_frame();
        }
        assert!(playback.is_exhausted(&replay));
    }
}
