#![forbid(unsafe_code)]

pub mod app;
pub mod atomic;
pub mod cli;
pub mod commands;
pub mod config;
pub mod epub;
pub mod error;
pub mod extract;
pub mod html;
pub mod locator;
pub mod logging;
pub mod markdown;
pub mod package;
pub mod pandoc;
pub mod pdf;
pub mod pipeline;
pub mod preview;
pub mod project;
pub mod stats;
pub mod store;
pub mod style;
pub mod templates;
pub mod toc;
pub mod upload;
