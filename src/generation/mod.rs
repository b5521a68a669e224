pub mod fields;
pub mod generators;
pub mod resolver;
