pub mod controller;
pub mod events;
pub mod state;

pub use controller::UploadController;
pub use events::SessionEvent;
pub use state::{Connectivity, SessionSnapshot, SessionState, SessionStatus};
