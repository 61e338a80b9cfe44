//! Delivery strategies.
//!
//! | Strategy | Dispatch behaviour |
//! |----------|--------------------|
//! | [`SyncDistribution`] | runs the handler inline, blocking the publisher |
//! | [`AsyncDistribution`] | runs the handler on a separate task and returns immediately |
//! | [`FanoutDistribution`] | dispatches to each child in registration order |

pub mod async_distribution;
pub mod fanout_distribution;
pub mod sync_distribution;

pub use async_distribution::AsyncDistribution;
pub use fanout_distribution::FanoutDistribution;
pub use sync_distribution::SyncDistribution;
