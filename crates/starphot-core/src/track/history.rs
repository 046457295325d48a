use std::collections::VecDeque;

use crate::consts::{ADAPTIVE_RADIUS_WINDOW, DEFAULT_HISTORY_CAPACITY};
use crate::frame::Position;
use crate::stats::mean_stddev;

/// A recorded tracking outcome.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryEntry {
    pub position: Position,
    /// Confidence in [0, 1] of the method that produced the position.
    pub confidence: f64,
}

/// Frame-to-frame displacement between two consecutive recorded positions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    pub dx: f64,
    pub dy: f64,
}

/// Bounded sliding window of recent positions and their velocities.
///
/// Both sequences hold at most `capacity` entries; pushing beyond that
/// evicts the oldest entry first.
#[derive(Clone, Debug)]
pub struct TrackingHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
    velocities: VecDeque<Velocity>,
}

impl Default for TrackingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl TrackingHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
            velocities: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn velocities(&self) -> impl Iterator<Item = &Velocity> {
        self.velocities.iter()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.velocities.clear();
    }

    /// Record a position, deriving a velocity from the previous one.
    pub fn push(&mut self, position: Position, confidence: f64) {
        if let Some(prev) = self.entries.back() {
            self.velocities.push_back(Velocity {
                dx: position.x - prev.position.x,
                dy: position.y - prev.position.y,
            });
        }
        self.entries.push_back(HistoryEntry {
            position,
            confidence: confidence.clamp(0.0, 1.0),
        });

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        while self.velocities.len() > self.capacity {
            self.velocities.pop_front();
        }
    }

    /// Momentum prediction: `expected` shifted by the recency-weighted mean
    /// velocity. The i-th oldest of n velocities has weight (i+1)/n.
    pub fn predict(&self, expected: Position) -> Position {
        if self.entries.len() < 2 || self.velocities.is_empty() {
            return expected;
        }

        let n = self.velocities.len() as f64;
        let mut sum_w = 0.0;
        let mut vx = 0.0;
        let mut vy = 0.0;
        for (i, v) in self.velocities.iter().enumerate() {
            let w = (i + 1) as f64 / n;
            vx += v.dx * w;
            vy += v.dy * w;
            sum_w += w;
        }

        expected.offset(vx / sum_w, vy / sum_w)
    }

    /// Search radius widened by the recent positional scatter:
    /// `clamp(base + 2 * sqrt(std_x^2 + std_y^2), base, 2 * base)`.
    pub fn adaptive_radius(&self, base: f64) -> f64 {
        if self.entries.len() < 3 || base <= 0.0 {
            return base;
        }

        let recent: Vec<&HistoryEntry> = self
            .entries
            .iter()
            .rev()
            .take(ADAPTIVE_RADIUS_WINDOW)
            .collect();
        let xs: Vec<f64> = recent.iter().map(|e| e.position.x).collect();
        let ys: Vec<f64> = recent.iter().map(|e| e.position.y).collect();
        let (_, std_x) = mean_stddev(&xs);
        let (_, std_y) = mean_stddev(&ys);
        let scatter = (std_x * std_x + std_y * std_y).sqrt();

        (base + 2.0 * scatter).clamp(base, 2.0 * base)
    }
}
