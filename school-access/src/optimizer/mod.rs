//! Quick-win search for new stops.
//!
//! Candidate stops are generated for every zone that misses the coverage
//! threshold, then picked greedily by the coverage they add. Candidates only
//! ever live on graph overlays; the authoritative stop set is untouched.

mod candidates;
mod greedy;


pub use candidates::{Candidate, CandidatePlacement, generate_candidates};
pub use greedy::{OptimizeError, QuickWin, QuickWinConfig, QuickWinOptimizer, QuickWinPlan};
