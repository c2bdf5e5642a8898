// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Up or left.
    Backward,
    /// Down or right.
    Forward,
}

impl ScrollDirection {
    pub const fn sign(self) -> i32 {
        match self {
            Self::Backward => -1,
            Self::Forward => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoScrollConfig {
    /// Width of the band along each edge that triggers scrolling.
    pub edge: i32,
    pub interval: Duration,
    pub step: i32,
}

impl Default for AutoScrollConfig {
    fn default() -> Self {
        Self {
            edge: 60,
            interval: Duration::from_millis(16),
            step: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunningScroll {
    direction: ScrollDirection,
    last_tick: Instant,
}

/// Fixed-interval scroll timer driven by pointer proximity to one axis' edges.
///
/// The timer is plain state: it advances only when [`EdgeAutoScroll::pump`]
/// is called, and dropping or stopping it cancels it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeAutoScroll {
    config: AutoScrollConfig,
    running: Option<RunningScroll>,
}

impl EdgeAutoScroll {
    pub const fn new(config: AutoScrollConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }

    pub const fn config(&self) -> AutoScrollConfig {
        self.config
    }

    /// Starts, redirects or stops the timer for a pointer at `pointer` on a
    /// container spanning `start..end` along the scroll axis.
    pub fn track(&mut self, pointer: i32, start: i32, end: i32, now: Instant) {
        let direction = if pointer < start.saturating_add(self.config.edge) {
            Some(ScrollDirection::Backward)
        } else if pointer >= end.saturating_sub(self.config.edge) {
            Some(ScrollDirection::Forward)
        } else {
            None
        };

        match (direction, self.running) {
            (None, _) => self.running = None,
            (Some(direction), Some(running)) if running.direction == direction => {}
            (Some(direction), _) => {
                self.running = Some(RunningScroll {
                    direction,
                    last_tick: now,
                });
            }
        }
    }

    pub fn stop(&mut self) {
        self.running = None;
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn direction(&self) -> Option<ScrollDirection> {
        self.running.map(|running| running.direction)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.running
            .map(|running| running.last_tick + self.config.interval)
    }

    /// Consumes every whole interval elapsed since the last tick and returns
    /// the signed scroll distance they add up to.
    pub fn pump(&mut self, now: Instant) -> i32 {
        let Some(running) = self.running.as_mut() else {
            return 0;
        };

        let interval = self.config.interval.max(Duration::from_millis(1));
        let elapsed = now.saturating_duration_since(running.last_tick);
        let ticks = elapsed.as_nanos() / interval.as_nanos();
        if ticks == 0 {
            return 0;
        }

        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        running.last_tick += interval.saturating_mul(ticks);
        i32::try_from(ticks)
            .unwrap_or(i32::MAX)
            .saturating_mul(self.config.step)
            .saturating_mul(running.direction.sign())
    }
}
