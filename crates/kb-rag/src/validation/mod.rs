//! Query domain validation

pub mod domain;

pub use domain::{parse_verdict, DomainValidator, Verdict};
