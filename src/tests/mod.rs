pub mod common;

mod config_assembly;
mod config_validation;
mod label_parsing;
mod route_ownership;
