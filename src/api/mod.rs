pub mod handlers;
pub mod openapi;
pub mod responses;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
