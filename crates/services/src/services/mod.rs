pub mod adoption;
pub mod assignment;
pub mod execution_context;
pub mod progress;

pub use adoption::{AdoptionError, AdoptionService};
pub use assignment::{AssignmentError, AssignmentService};
pub use execution_context::{ExecutionContextError, ExecutionContextService};
pub use progress::{ProgressError, ProgressService};
