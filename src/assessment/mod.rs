//! Presentation-side judgements over a finished [`RiskResult`](crate::analysis::risk::RiskResult).
//!
//! - `tiers`: overall-risk bands and the sample confidence score.
//! - `advice`: recommendation text and the what-to-expect lists.

pub mod advice;
pub mod tiers;
