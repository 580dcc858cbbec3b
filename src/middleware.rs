// ABOUTME: Response middleware adding security and caching headers to every route
// ABOUTME: Photo images may be cached privately; all other responses are per-session and never stored

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};

// Profile pictures are arbitrary http(s) links, so img-src is wider than the rest
const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
     script-src 'self'; \
     style-src 'self' 'unsafe-inline'; \
     img-src 'self' data: https: http:; \
     connect-src 'self'; \
     frame-ancestors 'none'; \
     base-uri 'self'; \
     form-action 'self'";

const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "same-origin"),
];

/// A stored photo never changes under its id, only disappears.
const IMAGE_CACHE_CONTROL: &str = "private, max-age=3600";

pub async fn security_headers(request: Request<Body>, next: Next) -> Response {
    let serves_image = request.uri().path().ends_with("/image");

    let mut response = next.run(request).await;
    let cacheable = serves_image && response.status().is_success();

    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(if cacheable { IMAGE_CACHE_CONTROL } else { "no-store" }),
    );

    response
}
