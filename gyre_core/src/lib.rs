//! Core types shared by the gyre runtime crates: arena keys for scheduler
//! components, and the logical-time types (`Timestamp`, `Tag`).

pub mod keys;
pub mod time;
