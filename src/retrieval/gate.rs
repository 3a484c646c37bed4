use super::Candidate;

pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.20;

/// Result of checking the best candidate against the relevance threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateOutcome {
    /// The search returned nothing usable.
    Empty,
    /// The best candidate scored under the threshold.
    BelowThreshold { top_score: f32, threshold: f32 },
    Pass { top_score: f32 },
}

impl GateOutcome {
    #[inline]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }
}

#[inline]
pub fn passes(top_score: f32, threshold: f32) -> bool {
    top_score >= threshold
}

/// Gate on the first (best ranked) candidate only.
pub fn evaluate(candidates: &[Candidate], threshold: f32) -> GateOutcome {
    match candidates.first() {
        None => GateOutcome::Empty,
        Some(top) if passes(top.score, threshold) => GateOutcome::Pass {
            top_score: top.score,
        },
        Some(top) => GateOutcome::BelowThreshold {
            top_score: top.score,
            threshold,
        },
    }
}
