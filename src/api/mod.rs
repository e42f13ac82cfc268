// HTTP and WebSocket surface

pub mod router;
pub mod session;

pub use router::create_router;
pub use session::{run_session, Session};
