pub mod api;
pub mod commands;
pub mod completion;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod logging;
pub mod output;
pub mod pages;
pub mod prompt;
pub mod realtime;
pub mod route;
pub mod sample;
pub mod session;
pub mod tui;

pub use api::ApiClient;
pub use config::Config;
pub use error::{QaHubError, Result};
pub use filter::{DateFilter, DateRange};
pub use realtime::{RealtimeListener, StompBroker};
pub use route::Route;
pub use session::{ProjectScope, Session, SessionStore};
