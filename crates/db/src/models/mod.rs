pub mod domain_adoption;
pub mod domain_task;
pub mod master_task;
pub mod snapshot;
pub mod task_execution;
pub mod user_task;
