//! nrx-remix: remix orchestration for the Neural Remix Engine
//!
//! ```text
//! RemixService ──submit──▶ TaskQueue (WorkerPool) ──▶ RemixOrchestrator
//!      │                                                  │
//!      └──────────── JobTracker ◀── checkpoints ──────────┘
//!                        │
//!                    JobStore (TTL)
//! ```
//!
//! - [`RemixConfig`] and [`PipelineMode`]: resolved once, passed down
//! - Style catalog and [`build_descriptor`]
//! - [`StemSeparator`] / [`MusicGenerator`]: external model contracts
//! - [`JobTracker`] over a [`JobStore`]: staged progress, terminal states

mod collaborators;
mod config;
mod descriptor;
mod error;
mod job;
mod pipeline;
mod service;
mod store;
mod style;
mod worker;

pub use collaborators::{MusicGenerator, StemSeparator};
pub use config::*;
pub use descriptor::*;
pub use error::*;
pub use job::*;
pub use pipeline::*;
pub use service::*;
pub use store::*;
pub use style::*;
pub use worker::*;
