//! Completion service integration

mod openrouter;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

use crate::conversation::ChatTurn;

pub use openrouter::CompletionClient;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Transport unavailable: {0}")]
    Transport(String),
}

/// Something that turns a conversation history into assistant text.
///
/// Implementations absorb service failures into fallback text where they can;
/// an `Err` means no reply could be produced at all.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn generate_response(&self, history: &[ChatTurn]) -> Result<String, CompletionError>;
}

/// Chooses which fallback reply to use
pub trait FallbackPicker: Send + Sync {
    /// Index in `0..len`; `len` is never zero
    fn pick(&self, len: usize) -> usize;
}

/// Uniform choice from the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngPicker;

impl FallbackPicker for ThreadRngPicker {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_rng_picker_stays_in_range() {
        let picker = ThreadRngPicker;
        for _ in 0..200 {
            assert!(picker.pick(4) < 4);
        }
        assert_eq!(picker.pick(1), 0);
    }
}
