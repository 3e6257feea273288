//! Client-side orchestration for one background-removal request at a time.
//!
//! [`UploadController`] owns the session: it validates the selected image,
//! submits it to the removal service while a synthetic progress estimate runs,
//! records success or failure, and allows up to three manual retries. A
//! rendering shell drives it with user actions and connectivity transitions and
//! renders the [`SessionSnapshot`]s it publishes.

pub mod connectivity;
pub mod error;
pub mod media;
pub mod session;
pub mod settings;
pub mod upload;
mod utils;

pub use connectivity::{ConnectivityMonitor, ConnectivitySignal};
pub use error::{FailureKind, RemoteError, UploadError};
pub use media::{HandleRegistry, ImageBlob, ImageHandle, SourceFile};
pub use session::{
    Connectivity, SessionEvent, SessionSnapshot, SessionState, SessionStatus, UploadController,
};
pub use settings::ControllerSettings;
pub use upload::{BackgroundRemover, HttpRemover, ProgressEstimator, RetryPolicy};
pub use utils::logging::init_logging;
