pub use super::handle::TaskHandle;
use crate::core::pipeline::{
    ImportOutcome,
    ProgressEvent,
};

/// Updates crossing from the import worker thread to the polling UI thread.
#[derive(Debug, Clone)]
pub enum ImportUpdate {
    Progress(ProgressEvent),
    Finished(Result<ImportOutcome, String>),
    Cancelled,
}

impl ImportUpdate {
    pub fn kind(&self) -> &'static str {
        match self {
            ImportUpdate::Progress(_) => "progress",
            ImportUpdate::Finished(_) => "finished",
            ImportUpdate::Cancelled => "cancelled",
        }
    }
}
