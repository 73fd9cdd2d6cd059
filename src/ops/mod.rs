pub mod lead_ops;
pub mod report;
pub mod search;
pub mod selection;
pub mod task_ops;
pub mod update;
pub mod views;
