//! Moving average over the most recent lux samples.
//!
//! Samples are kept in a fixed-capacity ring. The configured window size may
//! be smaller than the ring capacity `CAP`, but never larger.

use heapless::Deque;

use crate::config::ConfigError;

pub struct Smoother<const CAP: usize> {
    window: Deque<f32, CAP>,
    size: usize,
    alpha: f32,
    ema: Option<f32>,
}

impl<const CAP: usize> Smoother<CAP> {
    pub fn new(size: usize, alpha: f32) -> Result<Self, ConfigError> {
        if size == 0 || size > CAP {
            return Err(ConfigError::WindowSize);
        }
        Ok(Self {
            window: Deque::new(),
            size,
            alpha,
            ema: None,
        })
    }

    /// Add a sample and return the mean of the current window.
    pub fn push(&mut self, sample: f32) -> f32 {
        while self.window.len() >= self.size {
            self.window.pop_front();
        }
        self.window.push_back(sample).ok();

        self.ema = Some(match self.ema {
            None => sample,
            Some(ema) => self.alpha * sample + (1.0 - self.alpha) * ema,
        });

        self.mean().unwrap_or(sample)
    }

    /// Arithmetic mean of the samples present, `None` before the first push.
    pub fn mean(&self) -> Option<f32> {
        match self.window.len() {
            0 => None,
            len => Some(self.window.iter().sum::<f32>() / len as f32),
        }
    }

    /// Exponential moving average, seeded with the first sample.
    pub fn ema(&self) -> Option<f32> {
        self.ema
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
