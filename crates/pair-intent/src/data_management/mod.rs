//! Derived data rebuilt from chain logs on every fetch.

pub mod history;
