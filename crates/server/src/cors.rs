use config::{AnyOrArray, AuthConfig, CorsConfig};
use http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};

/// Builds the layer from an explicit `[server.cors]` section.
pub(super) fn generate(config: &CorsConfig) -> CorsLayer {
    let mut cors_layer = CorsLayer::new().allow_credentials(config.allow_credentials);

    if let Some(origins) = &config.allow_origins {
        cors_layer = cors_layer.allow_origin(match origins {
            AnyOrArray::Any => AllowOrigin::any(),
            AnyOrArray::Explicit(origins) => origin_matcher(origins.iter().map(|origin| &origin[..url::Position::BeforePath])),
        });
    }

    if let Some(max_age) = config.max_age {
        cors_layer = cors_layer.max_age(max_age);
    }

    if let Some(methods) = &config.allow_methods {
        cors_layer = cors_layer.allow_methods(match methods {
            AnyOrArray::Any => AllowMethods::any(),
            AnyOrArray::Explicit(methods) => {
                let mut methods = methods.clone();

                // Preflights must always pass
                if !methods.contains(&Method::OPTIONS) {
                    methods.push(Method::OPTIONS);
                }

                AllowMethods::list(methods)
            }
        });
    }

    if let Some(headers) = &config.allow_headers {
        cors_layer = cors_layer.allow_headers(match headers {
            AnyOrArray::Any => AllowHeaders::any(),
            AnyOrArray::Explicit(headers) => AllowHeaders::list(header_names(headers.iter().map(|h| h.as_str()))),
        });
    }

    if let Some(headers) = &config.expose_headers {
        cors_layer = cors_layer.expose_headers(match headers {
            AnyOrArray::Any => ExposeHeaders::any(),
            AnyOrArray::Explicit(headers) => ExposeHeaders::list(header_names(headers.iter().map(|h| h.as_str()))),
        });
    }

    cors_layer
}

/// The default policy: the allowed origins may call the MCP endpoints from a browser.
pub(super) fn restrictive(auth: &AuthConfig, credential_header: &str) -> CorsLayer {
    let allowed_headers = header_names(
        [
            header::AUTHORIZATION.as_str(),
            header::CONTENT_TYPE.as_str(),
            mcp::SESSION_HEADER,
            credential_header,
        ]
        .into_iter(),
    );

    CorsLayer::new()
        .allow_origin(origin_matcher(auth.allowed_origins.iter().map(String::as_str)))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(allowed_headers)
        .expose_headers([HeaderName::from_static(mcp::SESSION_HEADER)])
}

/// Exact origins, plus glob patterns when an origin contains glob syntax.
fn origin_matcher<'a>(origins: impl Iterator<Item = &'a str>) -> AllowOrigin {
    let mut constants = Vec::new();
    let mut globs = Vec::new();

    for origin in origins {
        let origin = origin.trim_end_matches('/');

        if origin.chars().any(|c| "?*[]{}!\\".contains(c)) {
            globs.push(origin.to_owned());
        } else if let Ok(value) = HeaderValue::from_str(origin) {
            constants.push(value);
        } else {
            log::warn!("Ignoring CORS origin that is not a valid header value: {origin}");
        }
    }

    if globs.is_empty() {
        return AllowOrigin::list(constants);
    }

    AllowOrigin::predicate(move |origin, _| {
        constants.contains(origin)
            || origin
                .to_str()
                .is_ok_and(|origin| globs.iter().any(|glob| fast_glob::glob_match(glob, origin)))
    })
}

fn header_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<HeaderName> {
    names
        .filter_map(|name| match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => Some(name),
            Err(_) => {
                log::warn!("Ignoring invalid CORS header name: {name}");
                None
            }
        })
        .collect()
}
