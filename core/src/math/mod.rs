pub mod morphology;
pub mod stats;

pub use morphology::MorphologyHelper;
pub use stats::StatsHelper;
