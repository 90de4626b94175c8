//! Generation planning: slot naming, voice-profile resolution, and
//! the timeline-to-job planner.

pub mod planner;
pub mod slots;
pub mod voices;
