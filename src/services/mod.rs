pub mod analytics;
pub mod records;
pub mod submissions;
