pub mod app;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod lottery;
pub mod output;
pub mod schedule;
