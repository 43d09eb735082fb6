pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::*;
pub use handlers::QueueState;
pub use models::*;
pub use router::queue_routes;
pub use services::*;
