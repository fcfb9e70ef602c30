//! Fake text generators for exercising the chat core in tests.

mod generator;

pub use generator::{
    ChunkedGenerator, FailingGenerator, FixedGenerator, FlakyGenerator, RecordingGenerator,
    SlowGenerator, StallingGenerator,
};
