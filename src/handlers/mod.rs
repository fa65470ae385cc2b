mod analyze;
mod comment;
mod generate;
mod health;
mod metrics;

pub use analyze::{SESSION_HEADER, analyze_room_handler};
pub use comment::comment_handler;
pub use generate::generate_handler;
pub use health::{health_handler, root_handler};
pub use metrics::metrics_handler;
