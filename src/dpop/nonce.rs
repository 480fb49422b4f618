use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// The most recent `DPoP-Nonce` value received from a server.
///
/// Starts empty, is overwritten by every non-empty nonce and is never
/// cleared. Concurrent updates resolve as last writer wins.
#[derive(Debug, Default)]
pub struct NonceCell {
    current: ArcSwapOption<String>,
}

impl NonceCell {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current nonce, if one has been received.
    #[must_use]
    pub fn current(&self) -> Option<Arc<String>> {
        self.current.load_full()
    }

    /// Stores `nonce` if it is present and non-empty.
    ///
    /// Returns the stored value.
    pub fn update(&self, nonce: Option<String>) -> Option<Arc<String>> {
        let nonce = Arc::new(nonce.filter(|nonce| !nonce.is_empty())?);
        self.current.store(Some(nonce.clone()));
        Some(nonce)
    }
}
