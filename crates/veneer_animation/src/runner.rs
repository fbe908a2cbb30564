//! Per-owner tween playback
//!
//! Each animatable facade owns one [`AnimationRunner`]. The runner keeps its
//! tweens in a slotmap alongside their start time and pause state; `tick`
//! advances every playing tween to the current time, reports the values
//! through a sink and hands back the ids of tweens that finished.

use slotmap::{new_key_type, SlotMap};

use crate::tween::{Tween, TweenSink};

new_key_type! {
    /// Handle to a tween registered with an [`AnimationRunner`]
    pub struct TweenId;
}

struct RunningTween {
    tween: Tween,
    start_ms: f64,
    paused_at: Option<f64>,
}

impl RunningTween {
    fn elapsed(&self, now_ms: f64) -> f64 {
        self.paused_at.unwrap_or(now_ms) - self.start_ms
    }
}

/// Plays the tweens of one owner
#[derive(Default)]
pub struct AnimationRunner {
    tweens: SlotMap<TweenId, RunningTween>,
}

impl AnimationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playing a tween from `now_ms`
    pub fn start(&mut self, tween: Tween, now_ms: f64) -> TweenId {
        self.tweens.insert(RunningTween {
            tween,
            start_ms: now_ms,
            paused_at: None,
        })
    }

    /// Remove a tween without reporting anything
    pub fn stop(&mut self, id: TweenId) -> Option<Tween> {
        self.tweens.remove(id).map(|running| running.tween)
    }

    /// Freeze a tween at its current elapsed time
    pub fn pause(&mut self, id: TweenId, now_ms: f64) {
        if let Some(running) = self.tweens.get_mut(id) {
            if running.paused_at.is_none() {
                running.paused_at = Some(now_ms);
            }
        }
    }

    /// Continue a paused tween from where it was frozen
    pub fn resume(&mut self, id: TweenId, now_ms: f64) {
        if let Some(running) = self.tweens.get_mut(id) {
            if let Some(paused_at) = running.paused_at.take() {
                running.start_ms += now_ms - paused_at;
            }
        }
    }

    pub fn is_paused(&self, id: TweenId) -> bool {
        self.tweens
            .get(id)
            .is_some_and(|running| running.paused_at.is_some())
    }

    pub fn contains(&self, id: TweenId) -> bool {
        self.tweens.contains_key(id)
    }

    pub fn get(&self, id: TweenId) -> Option<&Tween> {
        self.tweens.get(id).map(|running| &running.tween)
    }

    /// Elapsed playback time of a tween, excluding paused spans
    pub fn elapsed(&self, id: TweenId, now_ms: f64) -> Option<f64> {
        self.tweens.get(id).map(|running| running.elapsed(now_ms))
    }

    /// Jump a tween to its end, report the final values, and remove it
    pub fn snap_to_end(&mut self, id: TweenId, sink: &mut TweenSink<'_>) -> bool {
        match self.tweens.remove(id) {
            Some(mut running) => {
                running.tween.snap_to_end(sink);
                true
            }
            None => false,
        }
    }

    /// Advance every playing tween to `now_ms`.
    ///
    /// Returns the ids of tweens that completed; they have already been
    /// removed and their final values reported.
    pub fn tick(&mut self, now_ms: f64, sink: &mut TweenSink<'_>) -> Vec<TweenId> {
        let mut finished = Vec::new();
        for (id, running) in self.tweens.iter_mut() {
            if running.paused_at.is_some() {
                continue;
            }
            let elapsed = running.elapsed(now_ms);
            running.tween.goto_elapsed_time(elapsed, sink);
            if running.tween.is_done_at(elapsed) {
                finished.push(id);
            }
        }
        for id in &finished {
            self.tweens.remove(*id);
        }
        finished
    }

    /// Whether any tween is playing (not paused)
    pub fn has_running(&self) -> bool {
        self.tweens
            .values()
            .any(|running| running.paused_at.is_none())
    }

    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    pub fn clear(&mut self) {
        self.tweens.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::TimedTween;
    use veneer_core::Value;

    fn linear(to: f64, duration: f64) -> Tween {
        TimedTween::new("x", Value::from(0.0), Value::from(to), duration).into()
    }

    fn tick(runner: &mut AnimationRunner, now: f64) -> (Option<f64>, Vec<TweenId>) {
        let mut last = None;
        let done = runner.tick(now, &mut |_, v| last = v.as_number());
        (last, done)
    }

    #[test]
    fn test_tick_reports_and_completes() {
        let mut runner = AnimationRunner::new();
        let id = runner.start(linear(10.0, 100.0), 1000.0);

        let (value, done) = tick(&mut runner, 1050.0);
        assert_eq!(value, Some(5.0));
        assert!(done.is_empty());
        assert!(runner.has_running());

        let (value, done) = tick(&mut runner, 1100.0);
        assert_eq!(value, Some(10.0));
        assert_eq!(done, vec![id]);
        assert!(runner.is_empty());
    }

    #[test]
    fn test_pause_freezes_elapsed_time() {
        let mut runner = AnimationRunner::new();
        let id = runner.start(linear(10.0, 100.0), 0.0);

        tick(&mut runner, 20.0);
        runner.pause(id, 20.0);
        assert!(runner.is_paused(id));
        assert!(!runner.has_running());

        let (value, _) = tick(&mut runner, 500.0);
        assert_eq!(value, None);

        runner.resume(id, 500.0);
        assert_eq!(runner.elapsed(id, 530.0), Some(50.0));
        let (value, _) = tick(&mut runner, 530.0);
        assert_eq!(value, Some(5.0));
    }

    #[test]
    fn test_snap_to_end_reports_final_value() {
        let mut runner = AnimationRunner::new();
        let id = runner.start(linear(7.0, 1000.0), 0.0);

        let mut last = None;
        assert!(runner.snap_to_end(id, &mut |_, v| last = v.as_number()));
        assert_eq!(last, Some(7.0));
        assert!(!runner.contains(id));
        assert!(!runner.snap_to_end(id, &mut |_, _| {}));
    }

    #[test]
    fn test_stop_is_silent() {
        let mut runner = AnimationRunner::new();
        let id = runner.start(linear(1.0, 10.0), 0.0);
        assert!(runner.stop(id).is_some());
        let (value, done) = tick(&mut runner, 100.0);
        assert_eq!(value, None);
        assert!(done.is_empty());
    }
}
