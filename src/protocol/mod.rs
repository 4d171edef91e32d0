//! The command protocol: typed commands and their canonical text form.

pub mod command;
pub mod grammar;

pub use command::{Command, EntityType, Operation, Path};
