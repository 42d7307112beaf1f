pub mod blur;
pub mod dataset;
pub mod duplicate;
pub mod hash;
pub mod loader;
pub mod pipeline;
pub mod record;
pub mod review;
pub mod sorter;

#[cfg(test)]
pub(crate) mod fixtures;
