//! Cross-origin access for browser clients served from another port.

use actix_cors::Cors;

/// Open CORS policy: any origin, method and header.
pub fn cors() -> Cors {
    Cors::permissive()
}
