//! farmjob Compiler
//!
//! Turns a job's settings into a task graph for the farm scheduler.
//! Nothing here touches the filesystem or spawns processes; the output is
//! a list of declarative tasks appended to the job.
//!
//! # Pipeline
//!
//! ```text
//! settings ──► defaults / validation ──► output path ({timestamp})
//!                                              │
//! frames ──► chunker ──► one render task per chunk (setup cmds + render cmd)
//!                                              │
//!                          optional preview-video task (depends on all renders)
//!                                              │
//!                                      cleanup of empty optional settings
//! ```

pub mod catalog;
pub mod compiler;
pub mod compose;
pub mod frames;
pub mod job_type;
pub mod lifecycle;
pub mod path_template;
pub mod paths;
pub mod payload;

pub use compiler::Compiler;
pub use frames::{chunk, FrameChunk, FrameSet};
pub use job_type::{JobType, JobTypeRegistry};
pub use payload::{ConfigurationPayload, EmbeddingStrategy};
