//! trialfinder library
//!
//! A cached, rate-limited client for the ClinicalTrials.gov registry. The
//! binary drives [`service::TrialService`]; the modules are public so the
//! integration tests can reach them.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod service;
pub mod throttle;
