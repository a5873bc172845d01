pub mod configuration;
pub mod event;
pub mod job;
pub mod node_statistics;
pub mod product;
pub mod scheduled_task;
pub mod site;
pub mod step;
pub mod task;

// Re-export core models for easy access
pub use configuration::{
    ConfigurationParameterInfo, ConfigurationParameterValue, ConfigurationUpdateAction,
    KeyedMessage,
};
pub use event::{EventType, SerializedEvent, UnprocessedEvent};
pub use job::{Job, NewJob, NewJobStep, NewJobTask, StartType};
pub use node_statistics::NodeStatistics;
pub use product::{ArchivedProduct, NewProduct, Product, ProductToArchive};
pub use scheduled_task::{
    NewScheduledTask, RepeatType, ScheduledTask, ScheduledTaskStatus, ScheduledTaskStatusUpdate,
};
pub use site::{Processor, Satellite, Site, Tile};
pub use step::{ExecutionStatistics, NewStep, Step, StepConsoleOutput, StepToRun};
pub use task::{NewTask, Task};
