pub mod archive;
pub mod classify;
pub mod cli;
pub mod config;
pub mod entity;
pub mod logparse;
pub mod notify;
pub mod report;
pub mod runner;
