pub mod assembler;
pub mod ownership;
pub mod types;
