//! Historical weather risk for outdoor plans.
//!
//! Given a location, a calendar day and an activity, samples roughly fifteen
//! years of NASA POWER daily data around that day and reports how often the
//! weather was unfavorable for the activity.

pub mod analysis;
pub mod assessment;
pub mod cache;
pub mod config;
pub mod export;
pub mod ingest;
pub mod locations;
pub mod logging;
pub mod model;
pub mod profiles;
