pub mod blank;
pub mod input;
pub mod segment;
pub mod stats;
