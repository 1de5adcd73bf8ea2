//! Process-level utilities: binary bootstrap and the wall clock.

pub mod bootstrap;
pub mod clock;
