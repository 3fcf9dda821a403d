#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! The capture session layer: a [`CaptureEngine`] spawns one worker thread
//! per capture handle, drives received batches through the rule pipeline's
//! send decorator and aggregates per-worker counters into shared
//! [`EngineTelemetry`].

mod config;
mod engine;
mod telemetry;

pub use config::{EngineConfig, MAX_WORKERS};
pub use engine::{CaptureEngine, StartError, WorkerExit};
pub use telemetry::{EngineStats, EngineTelemetry};
