pub mod pipeline;
pub mod records;
pub mod types;

pub use pipeline::{ActionExecutionDetail, ActionStatus, PipelineExecutionStatus};
pub use records::{
    BuildRecord, BuildSource, PipelineData, PipelineRecord, PipelineSource, ProvisionRecord,
    ProvisionSource, StreamEnd,
};
pub use types::*;
