mod mapper;
mod persist;
mod run;
#[cfg(test)]
mod tests;

pub use run::run;

#[cfg(test)]
pub(crate) use mapper::RawSubmission;
#[cfg(test)]
pub(crate) use persist::submit_entry;
