//! # Loopsim - Loop-mitigation and NAT measurements on an emulated switched network
//!
//! This library builds a small switched network that contains loops, runs it
//! under different loop-mitigation strategies, and measures reachability and
//! throughput. A second topology variant puts two hosts behind a NAT
//! translator and measures them before and after the translator is fixed.
//!
//! ## Key Features
//!
//! - **Deterministic Topologies**: Four switches in a ring plus a chord, eight hosts, delay-tagged links
//! - **Mitigation Modes**: No mitigation, spanning tree, or an external learning controller
//! - **NAT Provisioning**: Masquerade, return path and port forwards applied exactly once
//! - **Repeated Trials**: Captures on both endpoints around every probe, paced between attempts
//! - **Structured Results**: Ping output parsed into trial results, summaries and JSON/text reports
//! - **Dry Runs**: Every command goes through an executor that can record instead of run
//!
//! ## Architecture
//!
//! - `topology`: Topology model, builder and fabric graph checks
//! - `process`: Typed commands and the executors that run them
//! - `emulation`: Engine that instantiates a topology, plus host and switch handles
//! - `mode`: Operating modes, mitigation controller and convergence strategies
//! - `nat`: NAT rule set and the translator type-state
//! - `harness`: Captures, probes, throughput tests and pacing
//! - `analysis`: Ping parsing, aggregation, transcript analysis and reports
//! - `config` / `config_loader`: YAML configuration with defaults
//! - `orchestrator`: End-to-end scenario runs
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use loopsim::config_loader;
//! use loopsim::emulation::NamespaceEngine;
//! use loopsim::harness::ThreadSleep;
//! use loopsim::mode::RunMode;
//! use loopsim::orchestrator::{Orchestrator, StdinPrompt};
//! use loopsim::process::NamespaceExecutor;
//!
//! let config = config_loader::load_config(None)?;
//! let exec = NamespaceExecutor::new();
//! let engine = NamespaceEngine::new(&exec);
//!
//! let reports = Orchestrator::new(&config, &exec, &engine, &ThreadSleep, &StdinPrompt)
//!     .run(RunMode::WithStp)?;
//!
//! // The capture directory now contains:
//! // - h3_to_h1_attempt1_with_stp.pcap and friends: per-trial captures
//! // - h3_to_h1_attempt1_with_stp.ping.txt: raw probe output
//! // - report_with_stp_<timestamp>.json/.txt: the run report
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! Every field is optional:
//!
//! ```yaml
//! general:
//!   capture_dir: "./captures"
//!   log_level: info
//!   interactive: true
//!
//! harness:
//!   attempts: 3
//!   probe_count: 4
//!   inter_trial_interval: "30s"
//!   throughput_duration: "2m"
//!
//! convergence:
//!   strategy: fixed_delay   # or polled
//!   stp_wait: "30s"
//!   controller_wait: "30s"
//!
//! controller:
//!   ip: 127.0.0.1
//!   port: 6633
//! ```
//!
//! ## Error Handling
//!
//! Modules return `thiserror` enums; the orchestrator and binaries wrap them
//! with `color_eyre` context.

pub mod analysis;
pub mod config;
pub mod config_loader;
pub mod emulation;
pub mod harness;
pub mod mode;
pub mod nat;
pub mod orchestrator;
pub mod process;
pub mod topology;
