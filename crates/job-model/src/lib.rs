//! farmjob Job Model
//!
//! Defines the data contracts exchanged between the host and the compiler:
//! - **Settings:** Typed job settings and their schema definitions
//! - **Job:** A compilation request and the tasks it owns
//! - **Task/Command:** Schedulable work units and the steps they run
//!
//! Everything here serializes to JSON so a host can hand jobs over as
//! files and read compiled task graphs back.

pub mod job;
pub mod settings;
pub mod task;

pub use job::*;
pub use settings::*;
pub use task::*;
