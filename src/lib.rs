//! Tool to tally the sequences found between known flank markers in merged mate pairs
pub mod config;
pub mod errors;
pub mod extract;
pub mod handling;
pub mod markers;
pub mod merge;
pub mod output;
pub mod pairing;
pub mod pipeline;
pub mod reads;
pub mod resolver;
pub mod stat;
pub mod store;
#[macro_use]
extern crate clap;
