//! Document inspection helpers

pub mod pdf;

pub use pdf::{check_pdf, PdfTextReport};
