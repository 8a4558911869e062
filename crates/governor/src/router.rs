//! Confidence router — decides what kind of output a finished task emits.
//!
//! A pure function of the answer's confidence and the clarification attempts
//! spent so far. It performs no generation and no retrieval; keeping it
//! side-effect-free is what makes the three-way split trivially testable.

/// Confidence at or above which an answer ships as-is.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Clarification rounds allowed before a task escalates.
pub const DEFAULT_MAX_CLARIFICATION_ATTEMPTS: u32 = 2;

/// Where a finished task's output is directed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Ship the answer.
    Respond,
    /// Ask the user a clarifying question instead; the caller increments
    /// the attempt counter.
    Clarify,
    /// Hand off to a human.
    Escalate,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceRouter {
    threshold: f32,
    max_attempts: u32,
}

impl Default for ConfidenceRouter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLARIFICATION_ATTEMPTS)
    }
}

impl ConfidenceRouter {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_attempts,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn route(&self, confidence: f32, attempts: u32) -> Route {
        if confidence >= self.threshold {
            Route::Respond
        } else if attempts < self.max_attempts {
            Route::Clarify
        } else {
            Route::Escalate
        }
    }
}
