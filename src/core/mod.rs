//! Core pipeline logic for Strata.
//!
//! # Modules
//!
//! - [`frame`] - Lazy frames: recorded operations compiled to one query
//! - [`extract`] - Source resolution and schema inference
//! - [`transform`] - Transform policies, including the default cleaning rules
//! - [`load`] - Validation, daily aggregation, and transactional writes
//! - [`pipeline`] - Orchestration, read helpers, and the scoped lifecycle
//!
//! # Run Workflow
//!
//! 1. **Extract**: Resolve the source and infer its schema, reading no rows
//! 2. **Transform**: Record the policy's operations on the lazy frame
//! 3. **Load**: Materialize the frame once, aggregate per day and event type,
//!    and append both tables in a single transaction
//! 4. **Report**: Return a [`RunResult`](crate::domain::RunResult)
//!
//! # Example
//!
//! ```rust,no_run
//! use strata::config::load_config;
//! use strata::core::pipeline::Pipeline;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pipeline_config.json")?;
//! let mut pipeline = Pipeline::new(config)?;
//!
//! let result = pipeline.run("data/raw/events.csv")?;
//! println!("Loaded: {}", result.events_loaded);
//!
//! for row in pipeline.get_summary(7)? {
//!     println!("{:?} {:?} {}", row.date, row.event_type, row.total_value);
//! }
//!
//! pipeline.close()?;
//! # Ok(())
//! # }
//! ```

pub mod extract;
pub mod frame;
pub mod load;
pub mod pipeline;
pub mod transform;
