//! Support code for the `memorial` command line: argument parsing, config
//! loading and the JSON reports it prints.

pub mod args;
pub mod report;
pub mod settings;
