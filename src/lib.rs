#![forbid(unsafe_code)]

pub mod cli;
pub mod discover;
pub mod expand;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod formats;
pub mod harvest;
pub mod logging;
pub mod pages;
pub mod run;
