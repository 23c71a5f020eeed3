extern crate clap;
extern crate gcdisc;

pub mod build;
pub mod check;
pub mod cli;
pub mod error;
pub mod extract;
pub mod info;
pub mod ls;
pub mod utils;
