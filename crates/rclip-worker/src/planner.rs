//! Random segment planning.
//!
//! A plan walks a cursor from zero through the source, drawing each window
//! length uniformly from the requested range. The window that would run past
//! the end is clamped to the remainder, and a remainder shorter than one
//! second is dropped.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rclip_models::{DurationRange, SegmentWindow};

use crate::config::MAX_CLIPS_PER_SESSION;

/// Shortest window worth transcoding, in seconds.
pub const MIN_WINDOW_SECS: f64 = 1.0;

/// Source of window lengths.
pub trait DurationSource {
    /// Draw a whole number of seconds in `min..=max`.
    fn draw(&mut self, min: u32, max: u32) -> u32;
}

/// [`DurationSource`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomDurations<R> {
    rng: R,
}

impl<R: Rng> RandomDurations<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomDurations<StdRng> {
    /// Generator seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Reproducible generator.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> DurationSource for RandomDurations<R> {
    fn draw(&mut self, min: u32, max: u32) -> u32 {
        self.rng.random_range(min..=max)
    }
}

/// Splits a source duration into consecutive random windows.
#[derive(Debug, Clone, Copy)]
pub struct SegmentPlanner {
    max_clips: usize,
}

impl Default for SegmentPlanner {
    fn default() -> Self {
        Self::new(MAX_CLIPS_PER_SESSION)
    }
}

impl SegmentPlanner {
    pub fn new(max_clips: usize) -> Self {
        Self { max_clips }
    }

    /// Plan windows covering `total_duration` seconds.
    ///
    /// Windows are gap-free and in order. The plan ends at the source end or
    /// after `max_clips` windows, whichever comes first. A non-positive or
    /// non-finite duration yields an empty plan.
    pub fn plan<D>(
        &self,
        total_duration: f64,
        range: DurationRange,
        durations: &mut D,
    ) -> Vec<SegmentWindow>
    where
        D: DurationSource + ?Sized,
    {
        let mut windows = Vec::new();
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return windows;
        }

        let mut cursor = 0.0;
        while cursor < total_duration && windows.len() < self.max_clips {
            let drawn = durations
                .draw(range.min(), range.max())
                .clamp(range.min(), range.max());

            let mut duration = f64::from(drawn);
            if cursor + duration > total_duration {
                duration = total_duration - cursor;
            }
            if duration < MIN_WINDOW_SECS {
                break;
            }

            windows.push(SegmentWindow::new(cursor, duration));
            cursor += duration;
        }

        windows
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed sequence of draws, repeating the last one.
    pub(crate) struct ScriptedDurations {
        script: VecDeque<u32>,
        last: u32,
    }

    impl ScriptedDurations {
        pub(crate) fn new(script: &[u32]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                last: script.last().copied().unwrap_or(1),
            }
        }
    }

    impl DurationSource for ScriptedDurations {
        fn draw(&mut self, _min: u32, _max: u32) -> u32 {
            self.script.pop_front().unwrap_or(self.last)
        }
    }

    fn range(min: u32, max: u32) -> DurationRange {
        DurationRange::new(min, max).unwrap()
    }

    fn assert_well_formed(windows: &[SegmentWindow], total: f64, max: u32, max_clips: usize) {
        let mut expected_start = 0.0;
        for window in windows {
            assert!(window.duration >= MIN_WINDOW_SECS);
            assert!(window.duration <= f64::from(max));
            assert!((window.start - expected_start).abs() < 1e-9);
            expected_start = window.end();
        }
        for pair in windows.windows(2) {
            assert!(pair[1].start > pair[0].start);
        }
        let covered: f64 = windows.iter().map(|w| w.duration).sum();
        assert!(covered <= total + 1e-9);

        let reaches_end = windows
            .last()
            .map(|w| total - w.end() < MIN_WINDOW_SECS)
            .unwrap_or(false);
        assert!(reaches_end || windows.len() == max_clips);
    }

    #[test]
    fn test_forty_five_seconds_scripted() {
        let planner = SegmentPlanner::default();
        let windows = planner.plan(45.0, range(10, 20), &mut ScriptedDurations::new(&[20, 15, 20]));

        assert_eq!(
            windows,
            vec![
                SegmentWindow::new(0.0, 20.0),
                SegmentWindow::new(20.0, 15.0),
                SegmentWindow::new(35.0, 10.0),
            ]
        );
    }

    #[test]
    fn test_zero_duration_is_empty() {
        let planner = SegmentPlanner::default();
        let mut durations = ScriptedDurations::new(&[10]);

        assert!(planner.plan(0.0, range(10, 20), &mut durations).is_empty());
        assert!(planner.plan(-3.0, range(10, 20), &mut durations).is_empty());
        assert!(planner.plan(f64::NAN, range(10, 20), &mut durations).is_empty());
        assert!(planner.plan(f64::INFINITY, range(10, 20), &mut durations).is_empty());
    }

    #[test]
    fn test_source_shorter_than_min() {
        let planner = SegmentPlanner::default();
        let windows = planner.plan(5.0, range(10, 20), &mut ScriptedDurations::new(&[17]));
        assert_eq!(windows, vec![SegmentWindow::new(0.0, 5.0)]);
    }

    #[test]
    fn test_sub_second_source_is_empty() {
        let planner = SegmentPlanner::default();
        let windows = planner.plan(0.6, range(1, 2), &mut ScriptedDurations::new(&[2]));
        assert!(windows.is_empty());
    }

    #[test]
    fn test_sub_second_tail_is_dropped() {
        let planner = SegmentPlanner::default();
        let windows = planner.plan(20.5, range(5, 10), &mut ScriptedDurations::new(&[10, 10, 10]));

        assert_eq!(windows.len(), 2);
        assert!((windows[1].end() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_tail_is_kept() {
        let planner = SegmentPlanner::default();
        let windows = planner.plan(21.5, range(5, 10), &mut ScriptedDurations::new(&[10]));

        assert_eq!(windows.len(), 3);
        assert!((windows[2].duration - 1.5).abs() < 1e-9);
        assert!((windows[2].end() - 21.5).abs() < 1e-9);
    }

    #[test]
    fn test_clip_cap() {
        let planner = SegmentPlanner::default();
        let windows = planner.plan(10_000.0, range(1, 2), &mut ScriptedDurations::new(&[1]));

        assert_eq!(windows.len(), MAX_CLIPS_PER_SESSION);
        assert!((windows.last().unwrap().end() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_draws_are_clamped() {
        let planner = SegmentPlanner::default();
        let windows = planner.plan(100.0, range(10, 20), &mut ScriptedDurations::new(&[3, 99]));

        assert_eq!(windows[0].duration, 10.0);
        assert_eq!(windows[1].duration, 20.0);
    }

    #[test]
    fn test_deterministic_under_fixed_seed() {
        let planner = SegmentPlanner::default();
        let a = planner.plan(600.0, range(10, 20), &mut RandomDurations::seeded(7));
        let b = planner.plan(600.0, range(10, 20), &mut RandomDurations::seeded(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_plans_are_well_formed() {
        let planner = SegmentPlanner::default();
        for seed in 0..200u64 {
            let total = 1.0 + (seed as f64) * 7.3;
            let mut durations = RandomDurations::seeded(seed);
            let windows = planner.plan(total, range(3, 12), &mut durations);
            assert_well_formed(&windows, total, 12, MAX_CLIPS_PER_SESSION);
        }
    }

    #[test]
    fn test_draws_stay_in_range() {
        let mut durations = RandomDurations::seeded(42);
        for _ in 0..1000 {
            let d = durations.draw(10, 20);
            assert!((10..=20).contains(&d));
        }
    }
}
