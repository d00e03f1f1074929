//! Timelines and the scheduler that plays them.
//!
//! A `Timeline` is a flat list of segments, each with a start offset, a
//! duration, the tweens it drives and an optional completion cue. Offsets
//! are placed relative to the timeline built so far (`Position`), which
//! replaces nested completion callbacks with plain data.
//!
//! The `Scheduler` owns a virtual clock. It is advanced explicitly by the
//! frame loop (or a test), samples every running segment and returns the
//! cues that came due, in time order. Delayed one-shot cues share the same
//! clock. Nothing is ever cancelled: once scheduled, everything runs.

use crate::game::tween::{Animatable, Ease, PropertyTween, Track};

/// Where a segment starts, relative to the timeline so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Absolute offset from the timeline start (ms)
    At(u32),
    /// Right after the current end
    End,
    /// Gap after the current end (ms)
    AfterEnd(u32),
    /// Overlap with the current end (ms)
    BeforeEnd(u32),
}

#[derive(Debug, Clone)]
pub struct Segment<C> {
    pub start_ms: u32,
    pub duration_ms: u32,
    pub tweens: Vec<PropertyTween>,
    pub ease: Ease,
    pub on_complete: Option<C>,
}

#[derive(Debug, Clone)]
pub struct Timeline<C> {
    segments: Vec<Segment<C>>,
    end_ms: u32,
}

impl<C> Default for Timeline<C> {
    fn default() -> Self {
        Self { segments: Vec::new(), end_ms: 0 }
    }
}

impl<C> Timeline<C> {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve(&self, position: Position) -> u32 {
        match position {
            Position::At(ms) => ms,
            Position::End => self.end_ms,
            Position::AfterEnd(ms) => self.end_ms + ms,
            Position::BeforeEnd(ms) => self.end_ms.saturating_sub(ms),
        }
    }

    /// Append a segment driving `tweens` over `duration_ms`
    pub fn to(
        mut self,
        tweens: impl IntoIterator<Item = PropertyTween>,
        duration_ms: u32,
        position: Position,
    ) -> Self {
        let start_ms = self.resolve(position);
        self.end_ms = self.end_ms.max(start_ms + duration_ms);
        self.segments.push(Segment {
            start_ms,
            duration_ms,
            tweens: tweens.into_iter().collect(),
            ease: Ease::default(),
            on_complete: None,
        });
        self
    }

    /// Set the easing of the last segment
    pub fn ease(mut self, ease: Ease) -> Self {
        if let Some(seg) = self.segments.last_mut() {
            seg.ease = ease;
        }
        self
    }

    /// Attach a completion cue to the last segment
    pub fn then(mut self, cue: C) -> Self {
        if let Some(seg) = self.segments.last_mut() {
            seg.on_complete = Some(cue);
        }
        self
    }

    /// Total length (ms)
    #[cfg(test)]
    pub fn duration_ms(&self) -> u32 {
        self.end_ms
    }

    #[cfg(test)]
    pub fn segments(&self) -> &[Segment<C>] {
        &self.segments
    }
}

struct Running<C> {
    start_ms: u64,
    duration_ms: u32,
    ease: Ease,
    tracks: Vec<Track>,
    on_complete: Option<C>,
    started: bool,
    seq: u64,
}

struct Delayed<C> {
    due_ms: u64,
    cue: C,
    seq: u64,
}

/// Plays timelines and delayed cues against a virtual clock
pub struct Scheduler<C> {
    now_ms: u64,
    running: Vec<Running<C>>,
    delayed: Vec<Delayed<C>>,
    seq: u64,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            running: Vec::new(),
            delayed: Vec::new(),
            seq: 0,
        }
    }
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time (ms since the scheduler was created)
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Start a timeline now
    pub fn play(&mut self, timeline: Timeline<C>) {
        let base = self.now_ms;
        for seg in timeline.segments {
            let seq = self.next_seq();
            self.running.push(Running {
                start_ms: base + seg.start_ms as u64,
                duration_ms: seg.duration_ms,
                ease: seg.ease,
                tracks: seg.tweens.into_iter().map(Track::new).collect(),
                on_complete: seg.on_complete,
                started: false,
                seq,
            });
        }
    }

    /// Fire `cue` once, no earlier than `delay_ms` from now
    pub fn after(&mut self, delay_ms: u32, cue: C) {
        let seq = self.next_seq();
        self.delayed.push(Delayed {
            due_ms: self.now_ms + delay_ms as u64,
            cue,
            seq,
        });
    }

    /// Nothing running or pending
    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.delayed.is_empty()
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.running.len() + self.delayed.len()
    }

    /// Advance the clock, sample every started segment and collect the cues
    /// that came due, ordered by due time then scheduling order.
    pub fn advance<A: Animatable + ?Sized>(&mut self, dt_ms: u32, target: &mut A) -> Vec<C> {
        self.now_ms += dt_ms as u64;
        let now = self.now_ms;
        let mut fired: Vec<(u64, u64, C)> = Vec::new();

        // Earlier segments first so later ones capture their start values
        self.running.sort_by_key(|r| (r.start_ms, r.seq));
        for r in self.running.iter_mut() {
            if now < r.start_ms {
                continue;
            }
            if !r.started {
                for track in r.tracks.iter_mut() {
                    track.begin(&*target);
                }
                r.started = true;
            }
            let t = if r.duration_ms == 0 {
                1.0
            } else {
                ((now - r.start_ms) as f32 / r.duration_ms as f32).min(1.0)
            };
            let k = r.ease.apply(t);
            for track in &r.tracks {
                track.sample(&mut *target, k);
            }
            if t >= 1.0 {
                if let Some(cue) = r.on_complete.take() {
                    fired.push((r.start_ms + r.duration_ms as u64, r.seq, cue));
                }
            }
        }
        self.running
            .retain(|r| !(r.started && now >= r.start_ms + r.duration_ms as u64));

        let mut i = 0;
        while i < self.delayed.len() {
            if self.delayed[i].due_ms <= now {
                let d = self.delayed.swap_remove(i);
                fired.push((d.due_ms, d.seq, d.cue));
            } else {
                i += 1;
            }
        }

        fired.sort_by_key(|(due, seq, _)| (*due, *seq));
        fired.into_iter().map(|(_, _, cue)| cue).collect()
    }
}
