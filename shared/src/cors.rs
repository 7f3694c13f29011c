use lambda_http::{
    http::header::{HeaderValue, VARY},
    Body, Error, Response,
};

pub const ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type,Authorization";
pub const EXPOSE_HEADERS: &str = "Location,X-Cache";

pub fn with_cors_headers(mut resp: Response<Body>, allow_origin: &str) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_str(allow_origin).unwrap_or_else(|_| HeaderValue::from_static("*")),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        "Access-Control-Expose-Headers",
        HeaderValue::from_static(EXPOSE_HEADERS),
    );
    if allow_origin != "*" {
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }

    resp
}

pub fn finalize_response(
    resp: Result<Response<Body>, Error>,
    allow_origin: &str,
) -> Result<Response<Body>, Error> {
    resp.map(|r| with_cors_headers(r, allow_origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn empty() -> Response<Body> {
        Response::builder().status(200).body(Body::Empty).unwrap()
    }

    #[rstest]
    fn wildcard_origin_has_no_vary() {
        let resp = with_cors_headers(empty(), "*");
        assert_eq!(resp.headers()["Access-Control-Allow-Origin"], "*");
        assert_eq!(resp.headers()["Access-Control-Allow-Methods"], ALLOW_METHODS);
        assert!(resp.headers().get(VARY).is_none());
    }

    #[rstest]
    fn fixed_origin_varies_on_origin() {
        let resp = with_cors_headers(empty(), "https://app.example.com");
        assert_eq!(
            resp.headers()["Access-Control-Allow-Origin"],
            "https://app.example.com"
        );
        assert_eq!(resp.headers()[VARY], "Origin");
    }

    #[rstest]
    fn invalid_origin_falls_back_to_wildcard() {
        let resp = with_cors_headers(empty(), "bad\norigin");
        assert_eq!(resp.headers()["Access-Control-Allow-Origin"], "*");
    }

    #[rstest]
    fn finalize_passes_errors_through() {
        let failed: Result<Response<Body>, Error> = Err("boom".into());
        assert!(finalize_response(failed, "*").is_err());
    }
}
