// src/lib.rs

//! fillersync: keeps catalog episode-type lists in sync with a scraped
//! filler roster.

pub mod error;
pub mod matching;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
