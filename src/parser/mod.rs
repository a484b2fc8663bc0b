pub mod labels;
pub mod tables;
