//! Unit tests mirroring the layout of `src/`

#[allow(dead_code)]
#[path = "../common/mod.rs"]
mod common;

mod algorithm;
