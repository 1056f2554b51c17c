use tower_http::cors::{Any, CorsLayer};

/// The frontend is served from another origin, so every origin is allowed.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any)
}
