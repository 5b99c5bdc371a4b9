//! Protocol module: wire constants, message rendering, and inbound parsing.

pub mod constants;
pub mod date;
pub mod environment;
pub mod notification;
pub mod search;
pub mod template;

pub use environment::MessageEnvironment;
pub use notification::{notification_set, MessageKind, Notification};
pub use search::parse_search;
pub use template::{TemplateError, TemplateRenderer, TemplateSource};
