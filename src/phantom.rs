//! Autonomous "phantom" swipes.
//!
//! Swipes live in a [`TimedEventPool`]: spawned on a fixed interval, eased over
//! their own duration and dropped once finished. Only the newest one drives
//! the lead; older ones run out in the background.

use lyon::math::{point, vector, Point};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use std::f32::consts::TAU;
use std::time::Duration;

use crate::util::{clamp01, ease_in_out};

/// Something with a start time and a duration.
pub trait TimedEvent {
    fn started_at(&self) -> Duration;
    fn duration(&self) -> Duration;

    /// Linear progress in `[0, 1]`.
    fn progress(&self, now: Duration) -> f32 {
        let duration = self.duration().as_secs_f32();
        if duration <= 0.0 {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.started_at()).as_secs_f32();
        clamp01(elapsed / duration)
    }

    fn is_finished(&self, now: Duration) -> bool {
        self.progress(now) >= 1.0
    }
}

/// Small ordered collection of overlapping timed events with a spawn interval.
///
/// Events are kept in creation order. Pushing into a full pool evicts the
/// oldest event.
#[derive(Debug, Clone)]
pub struct TimedEventPool<T> {
    events: SmallVec<[T; 4]>,
    capacity: usize,
    interval: Duration,
    next_spawn_at: Duration,
}

impl<T: TimedEvent> TimedEventPool<T> {
    pub fn new(interval: Duration, capacity: usize, first_spawn_at: Duration) -> Self {
        Self {
            events: SmallVec::new(),
            capacity: capacity.max(1),
            interval,
            next_spawn_at: first_spawn_at,
        }
    }

    /// Drops finished events and returns how many were removed.
    pub fn retire_finished(&mut self, now: Duration) -> usize {
        let before = self.events.len();
        self.events.retain(|event| !event.is_finished(now));
        before - self.events.len()
    }

    pub fn is_due(&self, now: Duration) -> bool {
        now >= self.next_spawn_at
    }

    pub fn next_spawn_at(&self) -> Duration {
        self.next_spawn_at
    }

    /// Postpones the next spawn to no earlier than `at`.
    pub fn defer_until(&mut self, at: Duration) {
        self.next_spawn_at = self.next_spawn_at.max(at);
    }

    pub fn push(&mut self, now: Duration, event: T) {
        if self.events.len() >= self.capacity {
            self.events.remove(0);
        }
        self.events.push(event);
        self.next_spawn_at = now + self.interval;
    }

    /// The most recently pushed event still in the pool.
    pub fn latest(&self) -> Option<&T> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.events.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhantomSwipe {
    pub started_at: Duration,
    pub duration: Duration,
    pub from: Point,
    pub to: Point,
}

impl PhantomSwipe {
    /// Eased position along the swipe.
    pub fn position(&self, now: Duration) -> Point {
        self.from.lerp(self.to, ease_in_out(self.progress(now)))
    }
}

impl TimedEvent for PhantomSwipe {
    fn started_at(&self) -> Duration {
        self.started_at
    }

    fn duration(&self) -> Duration {
        self.duration
    }
}

/// Probability that a swipe is a short flick rather than a long drift.
pub const SHORT_SWIPE_PROBABILITY: f64 = 0.7;
pub const SHORT_SWIPE_SECONDS: (f32, f32) = (0.8, 1.5);
pub const SHORT_SWIPE_DISTANCE: (f32, f32) = (0.25, 0.45);
pub const LONG_SWIPE_SECONDS: (f32, f32) = (3.0, 5.0);
pub const LONG_SWIPE_DISTANCE: (f32, f32) = (0.55, 0.8);
/// Swipes stay inside this margin of the surface.
const SWIPE_MARGIN: f32 = 0.1;

/// Randomized swipe factory.
#[derive(Debug, Clone)]
pub struct PhantomGenerator {
    rng: SmallRng,
}

impl PhantomGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { rng }
    }

    /// A new swipe starting at `origin` (or a random point) at time `now`.
    pub fn next_swipe(&mut self, now: Duration, origin: Option<Point>) -> PhantomSwipe {
        let (seconds, distance) = if self.rng.gen_bool(SHORT_SWIPE_PROBABILITY) {
            (SHORT_SWIPE_SECONDS, SHORT_SWIPE_DISTANCE)
        } else {
            (LONG_SWIPE_SECONDS, LONG_SWIPE_DISTANCE)
        };
        let duration = self.rng.gen_range(seconds.0..=seconds.1);
        let distance = self.rng.gen_range(distance.0..=distance.1);

        let low = SWIPE_MARGIN;
        let high = 1.0 - SWIPE_MARGIN;
        let from = origin.map_or_else(
            || point(self.rng.gen_range(0.2..0.8), self.rng.gen_range(0.2..0.8)),
            |p| point(p.x.clamp(low, high), p.y.clamp(low, high)),
        );

        let angle = self.rng.gen_range(0.0..TAU);
        let mut heading = vector(angle.cos(), angle.sin());
        // Head back toward the middle when the straight line would leave the surface.
        let ahead = from + heading * distance;
        if !(low..=high).contains(&ahead.x) {
            heading.x = -heading.x;
        }
        if !(low..=high).contains(&ahead.y) {
            heading.y = -heading.y;
        }
        let to = from + heading * distance;

        PhantomSwipe {
            started_at: now,
            duration: Duration::from_secs_f32(duration),
            from,
            to: point(to.x.clamp(low, high), to.y.clamp(low, high)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swipe(start_ms: u64, duration_ms: u64) -> PhantomSwipe {
        PhantomSwipe {
            started_at: Duration::from_millis(start_ms),
            duration: Duration::from_millis(duration_ms),
            from: point(0.2, 0.2),
            to: point(0.8, 0.6),
        }
    }

    #[test]
    fn swipe_reaches_its_end_within_its_duration() {
        let s = swipe(1_000, 1_200);
        assert_eq!(s.position(Duration::from_millis(500)), s.from);
        assert_eq!(s.position(Duration::from_millis(2_200)), s.to);
        assert!(s.is_finished(Duration::from_millis(2_200)));
        assert!(!s.is_finished(Duration::from_millis(2_199)));
    }

    #[test]
    fn pool_retires_finished_and_tracks_latest() {
        let mut pool = TimedEventPool::new(Duration::from_secs(2), 3, Duration::ZERO);
        pool.push(Duration::ZERO, swipe(0, 4_000));
        pool.push(Duration::from_secs(2), swipe(2_000, 800));
        assert_eq!(pool.latest().map(|s| s.duration), Some(Duration::from_millis(800)));
        assert_eq!(pool.retire_finished(Duration::from_millis(2_900)), 1);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.latest().map(|s| s.duration), Some(Duration::from_millis(4_000)));
    }

    #[test]
    fn pool_spawns_on_interval_and_evicts_oldest() {
        let mut pool = TimedEventPool::new(Duration::from_secs(2), 2, Duration::from_secs(1));
        assert!(!pool.is_due(Duration::from_millis(999)));
        assert!(pool.is_due(Duration::from_secs(1)));
        pool.push(Duration::from_secs(1), swipe(1_000, 10_000));
        assert!(!pool.is_due(Duration::from_millis(2_999)));
        pool.push(Duration::from_secs(3), swipe(3_000, 10_000));
        pool.push(Duration::from_secs(5), swipe(5_000, 10_000));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.iter().next().map(|s| s.started_at), Some(Duration::from_secs(3)));
    }

    #[test]
    fn defer_never_brings_spawn_forward() {
        let mut pool: TimedEventPool<PhantomSwipe> =
            TimedEventPool::new(Duration::from_secs(2), 3, Duration::from_secs(5));
        pool.defer_until(Duration::from_secs(3));
        assert_eq!(pool.next_spawn_at(), Duration::from_secs(5));
        pool.defer_until(Duration::from_secs(8));
        assert_eq!(pool.next_spawn_at(), Duration::from_secs(8));
    }

    #[test]
    fn generated_swipes_respect_ranges() {
        let mut generator = PhantomGenerator::new(Some(7));
        let mut short = 0;
        for i in 0..500 {
            let s = generator.next_swipe(Duration::from_secs(i), Some(point(0.5, 0.5)));
            let seconds = s.duration.as_secs_f32();
            let is_short = (SHORT_SWIPE_SECONDS.0..=SHORT_SWIPE_SECONDS.1).contains(&seconds);
            let is_long = (LONG_SWIPE_SECONDS.0..=LONG_SWIPE_SECONDS.1).contains(&seconds);
            assert!(is_short || is_long, "duration {seconds}");
            if is_short {
                short += 1;
            }
            for p in [s.from, s.to] {
                assert!((0.1..=0.9).contains(&p.x) && (0.1..=0.9).contains(&p.y));
            }
        }
        assert!((250..450).contains(&short), "short swipes: {short}");
    }
}
