pub mod config;
pub mod server;
pub mod session;
pub mod view;

pub use config::ServerConfig;
pub use server::FormServer;
pub use session::{Session, SubmitError};
pub use view::Outcome;
