use std::path::PathBuf;
use submit_store::SubmissionStore;

/// Application state for the REST API server
///
/// Cloned into every handler. The store itself is stateless, so the clone is cheap and no
/// locking is involved.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: SubmissionStore,
    /// Directory holding the static landing page (`index.html`)
    pub public_dir: PathBuf,
}

impl AppState {
    pub fn new(store: SubmissionStore, public_dir: PathBuf) -> Self {
        Self { store, public_dir }
    }
}
