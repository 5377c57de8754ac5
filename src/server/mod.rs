pub mod dto;
mod products;
pub mod response;
mod router;
mod tags;
pub mod validation;

pub use router::{AppState, create_router};
