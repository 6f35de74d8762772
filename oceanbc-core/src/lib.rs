//! Core building blocks for ocean boundary-condition models: the model
//! contract and its lifecycle, scalar fields on a partitioned grid, forcing
//! datasets with time averaging, units and configuration.

pub mod config;
pub mod dataset;
pub mod field;
pub mod forcing;
pub mod grid;
pub mod model;
pub mod timeseries;
pub mod units;

pub mod errors;
