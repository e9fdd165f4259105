//! Detection pipeline passes, run in order over a shared `FillState`

pub mod baseline;
pub mod candidates;
pub mod features;
pub mod segments;
pub mod windows;
