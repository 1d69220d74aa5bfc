pub mod guards;
pub mod router;
pub mod routes;

pub use router::{HeraldState, cors_layer, herald_router};
