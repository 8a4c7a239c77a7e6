#![allow(dead_code)]

pub mod fixtures;
mod mocks;

pub use mocks::{MockOutput, MockWriter};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
