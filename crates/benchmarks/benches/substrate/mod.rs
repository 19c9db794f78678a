//! # Substrate Benchmarks
//!
//! One module per component, each exposing `register_benchmarks`:
//! - `bus` - event dispatch by topic and wildcard
//! - `cd_01_data_cache` - content-addressed store, lookups, eviction
//! - `cd_02_stream_channel` - chunk fan-out and backpressure
//! - `cd_03_pipeline` - ordered stage execution

pub mod bus;
pub mod cd_01_data_cache;
pub mod cd_02_stream_channel;
pub mod cd_03_pipeline;
