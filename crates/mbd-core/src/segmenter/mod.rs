//! Range math and chunk planning for ranged fetches.
//!
//! A known content length is cut into fixed-size byte ranges that are
//! requested one after another in ascending order.

mod range;

pub use range::{plan_chunks, Segment};
