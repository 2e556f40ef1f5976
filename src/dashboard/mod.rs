pub mod charts;
pub mod page;
pub mod stats;
