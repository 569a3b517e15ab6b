pub mod sanitizer;

pub use sanitizer::*;
