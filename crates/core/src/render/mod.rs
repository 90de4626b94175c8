//! Generation dispatch: rendering-service clients and the two-group
//! job executor.

pub mod client;
pub mod dispatch;
