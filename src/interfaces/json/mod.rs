//! JSON fixtures and reports used by the demo binary.

pub mod fixture_reader;
pub mod report_writer;
