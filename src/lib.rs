// src/lib.rs

//! instasheet library: Instagram posts and stories into a spreadsheet.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
