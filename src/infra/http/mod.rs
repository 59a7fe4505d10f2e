mod middleware;
mod public;

pub use middleware::REQUEST_ID_HEADER;
pub use public::{CACHE_STATUS_HEADER, HttpState, build_router};
