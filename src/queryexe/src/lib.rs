#[macro_use]
extern crate log;

pub mod query;
pub mod testutil;
