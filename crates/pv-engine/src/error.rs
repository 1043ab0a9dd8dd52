use thiserror::Error;

/// Errors from engine construction and off-real-time reconfiguration.
///
/// Nothing on the event or block path returns an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("requested {requested} voices, at most {max} are supported")]
    TooManyVoices { requested: usize, max: usize },
    #[error("DSP unit has no audio outputs")]
    NoOutputs,
    #[error("DSP unit has {channels} audio channels, at most {max} are supported")]
    TooManyChannels { channels: usize, max: usize },
    #[error("voice {voice} declares a different interface than voice 0")]
    InconsistentInterface { voice: usize },
    #[error("block size {requested} is outside 1..={max}")]
    BlockTooLarge { requested: usize, max: usize },
    #[error("engine must be suspended to change the block size")]
    NotSuspended,
}
