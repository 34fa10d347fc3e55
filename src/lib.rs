pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod engine;
pub mod humanize;
pub mod ledger;
pub mod observability;
pub mod service;
