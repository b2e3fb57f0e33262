//! Domain - pure billing logic with no I/O.

pub mod billing;
