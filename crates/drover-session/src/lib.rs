#![deny(clippy::all)]

mod channel;
mod config;
mod error;
mod handlers;
mod init_guard;
mod keep_alive;
mod registry;
mod session;
mod sleeper;
mod worker;

pub mod test_support;

pub use channel::ChannelError;
pub use channel::Endpoint;
pub use channel::Message;
pub use channel::Reply;
pub use config::SessionConfig;
pub use error::SessionError;
pub use handlers::CommandHandler;
pub use init_guard::GuardOutcome;
pub use init_guard::InitGuard;
pub use keep_alive::KeepAlive;
pub use registry::Browser;
pub use registry::BrowserFactory;
pub use registry::Element;
pub use registry::ElementLookupError;
pub use registry::LaunchError;
pub use registry::NoCurrentBrowser;
pub use registry::SessionParameters;
pub use registry::SessionRegistry;
pub use session::SessionController;
pub use sleeper::MockSleeper;
pub use sleeper::RealSleeper;
pub use sleeper::Sleeper;

pub type Result<T> = std::result::Result<T, SessionError>;
