#![allow(dead_code)] // Each test binary uses a different slice of the helpers

pub mod builders;
pub mod fakes;
pub mod strategies;

pub use builders::*;
pub use fakes::*;
