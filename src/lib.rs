// src/lib.rs
pub mod error;
pub mod report;
pub mod xss;
