/// Streaming status of a node's persisted content.
///
/// Legal transitions:
/// - `NotLoaded → InProgress` (request started)
/// - `InProgress → Ready` (bytes decoded)
/// - `InProgress → NotLoaded` (aborted)
/// - `Ready → NotLoaded` (evicted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamingState {
    #[default]
    NotLoaded,
    InProgress,
    Ready,
}

impl StreamingState {
    pub fn can_transition_to(self, next: StreamingState) -> bool {
        matches!(
            (self, next),
            (StreamingState::NotLoaded, StreamingState::InProgress)
                | (StreamingState::InProgress, StreamingState::Ready)
                | (StreamingState::InProgress, StreamingState::NotLoaded)
                | (StreamingState::Ready, StreamingState::NotLoaded)
        )
    }
}
