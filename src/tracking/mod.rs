pub mod actor;
pub mod geo;
pub mod session;

pub use actor::{spawn_session, SessionHandle};
pub use session::TrackingSession;
