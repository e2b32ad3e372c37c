use thiserror::Error;

/// Errors that can occur while assembling a splitter.
///
/// Planning itself has no fatal failure modes: anything the planner cannot
/// prove from statistics degrades to filtering less aggressively, never to
/// dropping data.
#[derive(Debug, Error)]
pub enum TurnstileError {
    /// The catalog schema has no fields
    #[error("schema must have at least one field")]
    EmptySchema,

    /// The catalog holds more blocks than bitmap ordinals can address
    #[error("catalog has {count} blocks, more than a u32 ordinal can address")]
    TooManyBlocks {
        /// Number of blocks handed to the catalog
        count: usize,
    },

    /// The background bitmap build worker could not be started
    #[error("failed to start bitmap build worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}
