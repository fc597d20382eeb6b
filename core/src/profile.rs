//! Append-only depth/time history of a single dive.

use std::fmt;
use std::ops::Index;

use crate::error::DecoError;

/// A single depth reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Seconds since the start of the dive.
    pub time: f64,
    /// Metres below the surface.
    pub depth: f64,
}

impl Sample {
    /// The surface at time zero, implicitly preceding every profile.
    pub const ORIGIN: Sample = Sample {
        time: 0.0,
        depth: 0.0,
    };

    pub const fn new(time: f64, depth: f64) -> Self {
        Self { time, depth }
    }

    pub fn is_origin(&self) -> bool {
        *self == Self::ORIGIN
    }

    /// NaN or infinite readings would otherwise slip past every ordering
    /// comparison.
    pub fn check_finite(&self) -> Result<(), DecoError> {
        if self.time.is_finite() && self.depth.is_finite() {
            Ok(())
        } else {
            Err(DecoError::NonFiniteSample {
                time: self.time,
                depth: self.depth,
            })
        }
    }
}

impl From<(f64, f64)> for Sample {
    fn from((time, depth): (f64, f64)) -> Self {
        Self::new(time, depth)
    }
}

type Observer = Box<dyn FnMut(Sample) + Send>;

/// Time-ordered samples with a label and an optional append observer.
pub struct DepthProfile {
    label: String,
    samples: Vec<Sample>,
    observer: Option<Observer>,
}

impl DepthProfile {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            samples: Vec::new(),
            observer: None,
        }
    }

    /// Build a profile from recorded samples, rejecting any that go back in time.
    pub fn from_samples<I, S>(label: impl Into<String>, samples: I) -> Result<Self, DecoError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Sample>,
    {
        let mut profile = Self::new(label);
        for sample in samples {
            let sample = sample.into();
            profile.push(sample)?;
        }
        Ok(profile)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Register the callback fired after every append, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl FnMut(Sample) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Append a sample and notify the observer.
    pub fn add_sample(&mut self, time: f64, depth: f64) -> Result<(), DecoError> {
        let sample = Sample::new(time, depth);
        self.push(sample)?;
        if let Some(observer) = self.observer.as_mut() {
            observer(sample);
        }
        Ok(())
    }

    fn push(&mut self, sample: Sample) -> Result<(), DecoError> {
        sample.check_finite()?;
        let previous = self.last();
        if sample.time < previous.time {
            return Err(DecoError::InvalidSampleOrder {
                previous: previous.time,
                time: sample.time,
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Independent copy of the samples and label. The observer is not copied.
    pub fn duplicate(&self) -> Self {
        Self {
            label: self.label.clone(),
            samples: self.samples.clone(),
            observer: None,
        }
    }

    /// Copy labelled `"<label> (<suffix>)"`.
    pub fn duplicate_as(&self, suffix: &str) -> Self {
        let mut copy = self.duplicate();
        copy.label = format!("{} ({})", self.label, suffix);
        copy
    }

    /// Sample by position; negative indices count back from the end.
    pub fn get(&self, index: isize) -> Option<Sample> {
        let position = if index < 0 {
            self.samples.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.samples.get(position).copied()
    }

    /// Most recent sample, or the implicit origin for an empty profile.
    pub fn last(&self) -> Sample {
        self.samples.last().copied().unwrap_or(Sample::ORIGIN)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

impl Index<usize> for DepthProfile {
    type Output = Sample;

    fn index(&self, index: usize) -> &Sample {
        &self.samples[index]
    }
}

impl fmt::Debug for DepthProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepthProfile")
            .field("label", &self.label)
            .field("samples", &self.samples)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
