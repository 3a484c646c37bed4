use itertools::Itertools;

use super::Candidate;

/// Number of unique entries kept as generation context.
pub const DEFAULT_CONTEXT_LIMIT: usize = 4;

/// Keep the first occurrence of each primary value, in rank order, up to `limit`.
///
/// Candidates missing either text field are discarded before deduplication,
/// so they never shadow a later complete duplicate.
pub fn dedupe(candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| !c.primary().trim().is_empty() && !c.secondary().trim().is_empty())
        .unique_by(|c| c.primary().to_string())
        .take(limit)
        .collect()
}
