//! Time axes and the weights used to evaluate forcing records over a time window.
//!
//! A forcing variable is stored as a sequence of records on a [`TimeAxis`]. Rather
//! than interpolating the data directly, the axis computes [`Weights`]: a short
//! list of `(record index, weight)` pairs. Applying the same weights to a scalar
//! series or to every cell of a gridded variable gives identical temporal
//! semantics for both.
//!
//! The value "at a time step" `[t, t + dt]` is the exact time average of the
//! interpolant over the window, not a point sample.

use crate::errors::{OceanError, OceanResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type FloatValue = f64;
/// Model time in seconds.
pub type Time = f64;

/// How values between two records are reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationStrategy {
    /// Piecewise-linear between records.
    #[default]
    Linear,
    /// Each record holds until the next one (piecewise constant).
    Previous,
}

/// Record weights for evaluating a series at a time or over a window.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    pub terms: Vec<(usize, FloatValue)>,
    /// The query reached outside the stored time range and was clamped to
    /// the nearest endpoint.
    pub clamped: bool,
}

impl Weights {
    fn single(index: usize, clamped: bool) -> Self {
        Self {
            terms: vec![(index, 1.0)],
            clamped,
        }
    }

    /// Weighted sum of `values`, indexed by record.
    pub fn apply(&self, values: &[FloatValue]) -> FloatValue {
        self.terms.iter().map(|(i, w)| w * values[*i]).sum()
    }
}

/// Maps model time onto a repeating forcing period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Periodicity {
    pub period: Time,
    pub reference_time: Time,
}

impl Periodicity {
    pub fn new(period: Time, reference_time: Time) -> OceanResult<Self> {
        if !(period > 0.0 && period.is_finite()) {
            return Err(OceanError::InvalidConfiguration(format!(
                "forcing period must be positive, got {period}"
            )));
        }
        Ok(Self {
            period,
            reference_time,
        })
    }

    /// Position of `t` within the period, in `[reference_time, reference_time + period)`.
    pub fn map(&self, t: Time) -> Time {
        self.reference_time + (t - self.reference_time).rem_euclid(self.period)
    }
}

/// Strictly increasing record times of a forcing variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    values: Vec<Time>,
}

impl TimeAxis {
    pub fn new(values: Vec<Time>) -> OceanResult<Self> {
        if values.is_empty() {
            return Err(OceanError::malformed("time", "time axis has no records"));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(OceanError::malformed(
                "time",
                format!("time axis contains non-finite value {bad}"),
            ));
        }
        if let Some(w) = values.windows(2).find(|w| w[1] <= w[0]) {
            return Err(OceanError::malformed(
                "time",
                format!(
                    "time axis is not strictly increasing ({} followed by {})",
                    w[0], w[1]
                ),
            ));
        }
        Ok(Self { values })
    }

    /// A single-record axis: the data is constant in time.
    pub fn constant() -> Self {
        Self { values: vec![0.0] }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_constant(&self) -> bool {
        self.values.len() == 1
    }

    pub fn values(&self) -> &[Time] {
        &self.values
    }

    pub fn first(&self) -> Time {
        self.values[0]
    }

    pub fn last(&self) -> Time {
        self.values[self.values.len() - 1]
    }

    /// Weights for the interpolated value at `t`.
    pub fn point_weights(&self, t: Time, strategy: InterpolationStrategy) -> Weights {
        let n = self.values.len();
        if n == 1 {
            return Weights::single(0, false);
        }
        if t <= self.first() {
            return Weights::single(0, t < self.first());
        }
        if t >= self.last() {
            return Weights::single(n - 1, t > self.last());
        }

        // first <= t < last, so 0 <= i < n - 1
        let i = self.values.partition_point(|&x| x <= t) - 1;
        match strategy {
            InterpolationStrategy::Previous => Weights::single(i, false),
            InterpolationStrategy::Linear => {
                let (t0, t1) = (self.values[i], self.values[i + 1]);
                let alpha = (t - t0) / (t1 - t0);
                Weights {
                    terms: vec![(i, 1.0 - alpha), (i + 1, alpha)],
                    clamped: false,
                }
            }
        }
    }

    /// Weights for the time average of the interpolant over `[t, t + dt]`.
    ///
    /// A window of zero length degenerates to [`point_weights`](Self::point_weights).
    pub fn window_weights(&self, t: Time, dt: Time, strategy: InterpolationStrategy) -> Weights {
        if self.values.len() == 1 {
            return Weights::single(0, false);
        }
        if dt <= 0.0 {
            return self.point_weights(t, strategy);
        }

        let (t_start, t_end) = (t, t + dt);
        let mut breakpoints = vec![t_start];
        breakpoints.extend(
            self.values
                .iter()
                .copied()
                .filter(|&x| x > t_start && x < t_end),
        );
        breakpoints.push(t_end);

        let mut accumulated: BTreeMap<usize, FloatValue> = BTreeMap::new();
        let mut add = |weights: &Weights, factor: FloatValue| {
            for (i, w) in &weights.terms {
                *accumulated.entry(*i).or_insert(0.0) += w * factor;
            }
        };

        for pair in breakpoints.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let length = b - a;
            match strategy {
                InterpolationStrategy::Linear => {
                    // exact for a linear function on [a, b]
                    add(&self.point_weights(a, strategy), 0.5 * length);
                    add(&self.point_weights(b, strategy), 0.5 * length);
                }
                InterpolationStrategy::Previous => {
                    add(&self.point_weights(a, strategy), length);
                }
            }
        }

        Weights {
            terms: accumulated
                .into_iter()
                .map(|(i, w)| (i, w / dt))
                .filter(|(_, w)| *w != 0.0)
                .collect(),
            clamped: t_start < self.first() || t_end > self.last(),
        }
    }

    /// Window weights for a forcing that repeats with the given periodicity.
    ///
    /// The window is split where it crosses the end of a period and each piece
    /// contributes in proportion to its length.
    pub fn periodic_window_weights(
        &self,
        t: Time,
        dt: Time,
        strategy: InterpolationStrategy,
        periodicity: &Periodicity,
    ) -> Weights {
        if dt <= 0.0 {
            return self.point_weights(periodicity.map(t), strategy);
        }

        let (reference, period) = (periodicity.reference_time, periodicity.period);
        let (t_start, t_end) = (t, t + dt);
        let mut accumulated: BTreeMap<usize, FloatValue> = BTreeMap::new();
        let mut clamped = false;

        // pieces are cut at whole periods counted from the reference time
        let mut k = ((t_start - reference) / period).floor();
        while reference + k * period < t_end {
            let offset = k * period;
            let lo = t_start.max(reference + offset);
            let hi = t_end.min(reference + offset + period);
            k += 1.0;
            if hi <= lo {
                continue;
            }
            let start = (lo - offset).clamp(reference, reference + period);
            let piece = hi - lo;
            let weights = self.window_weights(start, piece, strategy);
            clamped |= weights.clamped;
            for (i, w) in weights.terms {
                *accumulated.entry(i).or_insert(0.0) += w * piece;
            }
        }

        Weights {
            terms: accumulated.into_iter().map(|(i, w)| (i, w / dt)).collect(),
            clamped,
        }
    }
}
