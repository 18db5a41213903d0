mod assemble;
mod render;
mod run;
mod steps;

pub use run::run;

pub(crate) use steps::{StepSplitter, join_steps};
