//! The ordered `(t, z, v, aux)` sequence produced by either integration path.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One trajectory row. `aux` holds the acceleration on the fixed-step path
/// and the reconstructed total force on the adaptive path; [`AuxChannel`]
/// records which.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub z: f64,
    pub v: f64,
    pub aux: f64,
}

/// Meaning of the fourth trajectory column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuxChannel {
    Acceleration,
    Force,
}

impl AuxChannel {
    /// Column letter used in export headers (`a` or `f`).
    pub fn symbol(&self) -> &'static str {
        match self {
            AuxChannel::Acceleration => "a",
            AuxChannel::Force => "f",
        }
    }
}

/// Append-only, time-ordered result of one integration run. Samples are
/// pushed in strictly increasing time order by the producers and never
/// removed; a re-run produces a fresh trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    channel: AuxChannel,
    samples: Vec<Sample>,
}

impl Trajectory {
    pub(crate) fn new(channel: AuxChannel) -> Self {
        Self {
            channel,
            samples: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(channel: AuxChannel, capacity: usize) -> Self {
        Self {
            channel,
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Producers uphold the monotonic-time invariant; this is checked in
    /// debug builds.
    pub(crate) fn push(&mut self, sample: Sample) {
        debug_assert!(
            self.samples.last().map_or(true, |last| last.t < sample.t),
            "samples must be appended in increasing time order"
        );
        self.samples.push(sample);
    }

    /// Rebuilds a trajectory from externally produced rows (the import
    /// path), validating the time ordering.
    pub fn from_samples(channel: AuxChannel, samples: Vec<Sample>) -> Result<Self> {
        if !samples.windows(2).all(|w| w[0].t < w[1].t) {
            return Err(Error::config(
                "trajectory samples must be strictly increasing in time",
            ));
        }
        Ok(Self { channel, samples })
    }

    pub fn channel(&self) -> AuxChannel {
        self.channel
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }
}

impl Index<usize> for Trajectory {
    type Output = Sample;

    fn index(&self, index: usize) -> &Sample {
        &self.samples[index]
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
