pub mod json;

pub use json::{Validate, ValidatedJson};
