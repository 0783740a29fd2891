pub mod auth;
pub mod calendar;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod exam;
pub mod filters;
pub mod handlers;
pub mod latex;
pub mod paths;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

#[cfg(test)]
pub mod testing;
