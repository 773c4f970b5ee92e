use crate::pipeline::cursor_types::{BatchReport, ConversionFailure, ConvertedFile};

#[derive(Clone, Debug)]
pub enum PipelineMsg {
    PipelineStarted,

    // Per file
    FileConverted(ConvertedFile),
    FileFailed(ConversionFailure),
    PipelineProgress(usize, usize),

    // Terminal
    PipelineCompleted(BatchReport),
    PipelineFailed(String),

    LogMessage(String),
}

impl PipelineMsg {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineMsg::PipelineCompleted(_) | PipelineMsg::PipelineFailed(_)
        )
    }
}
