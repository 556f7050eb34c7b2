//! seatkit
//!
//! Core of a login session tracking daemon: asynchronous helper jobs and
//! per-session parameter collection.
//!
//! ## Features
//!
//! - [`Job`]: runs a command line with stdout/stderr captured line by line,
//!   reports its exit exactly once, and can be cancelled
//! - [`SessionLeader`]: runs the session-info helper for a login session and
//!   merges its output with caller-supplied override parameters
//! - [`SessionManager`]: registry of leaders keyed by session cookie
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use seatkit::{CollectorConfig, SessionLeader};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let leader = Arc::new(SessionLeader::new(CollectorConfig::from_env()));
//!     leader.set_uid(1000);
//!     leader.set_pid(4242);
//!
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     let started = leader.collect_parameters(
//!         |_leader, parameters, tx: tokio::sync::oneshot::Sender<_>| {
//!             drop(tx.send(parameters));
//!         },
//!         tx,
//!     );
//!     if started {
//!         if let Ok(Some(parameters)) = rx.await {
//!             for parameter in &parameters {
//!                 println!("{parameter}");
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! ## Environment Variables
//!
//! - `SEATKIT_COLLECT_HELPER`: helper command line
//!   (default: `/usr/libexec/ck-collect-session-info`)
//! - `RUST_LOG`: log filter, takes priority over `-v`/`-q`

pub mod cli;
pub mod job;
pub mod runner;
pub mod session;
pub mod telemetry;
pub mod types;

pub use cli::Cli;
pub use job::{Job, JobCompletion, JobExit, JobId};
pub use runner::{CollectOutcome, collect_once, run_collect_with_cli};
pub use session::{LeaderIdentity, OpenSessionRequest, SessionLeader, SessionManager};
pub use types::{
    CollectorConfig, ErrorCode, Parameter, ParameterKind, ParameterSet, ParameterValue, Result,
    SeatError,
};
