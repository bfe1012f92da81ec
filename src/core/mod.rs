pub mod engine;
pub mod input;
pub mod outreach;
pub mod pipeline;
pub mod quota;

pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use engine::{OutreachEngine, RunSummary};
pub use outreach::OutreachRunner;
pub use pipeline::OutreachPipeline;
pub use quota::{QuotaCounter, QuotaSnapshot};
