pub mod assembler;
pub mod cycle;
pub mod errors;
pub mod infra;
pub mod inventory;
pub mod locator;
pub mod model;
pub mod output;
pub mod services;
pub mod stac;
