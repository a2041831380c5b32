pub mod accumulator;
pub mod executor;
pub mod runner;
pub mod warmup;

pub use accumulator::QueryAccumulator;
pub use executor::execute_once;
pub use runner::{RunSettings, Runner};
pub use warmup::warmup;
