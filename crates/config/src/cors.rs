use std::{fmt::Display, str::FromStr, time::Duration};

use ascii::AsciiString;
use duration_str::deserialize_option_duration;
use serde::Deserialize;
use url::Url;

/// Explicit CORS policy for the HTTP endpoints.
#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// If false (or not defined), credentials are not allowed in requests
    pub allow_credentials: bool,
    /// Origins from which we allow requests, globs are accepted
    pub allow_origins: Option<AnyOrUrlArray>,
    /// Maximum time between OPTIONS and the next request
    #[serde(deserialize_with = "deserialize_option_duration")]
    pub max_age: Option<Duration>,
    /// HTTP methods allowed to the endpoint.
    pub allow_methods: Option<AnyOrHttpMethodArray>,
    /// Headers allowed in incoming requests
    pub allow_headers: Option<AnyOrAsciiStringArray>,
    /// Headers exposed from the OPTIONS request
    pub expose_headers: Option<AnyOrAsciiStringArray>,
}

/// Origins, either `*` or a list of URLs.
pub type AnyOrUrlArray = AnyOrArray<Url>;

/// Methods, either `*` or a list of method names.
pub type AnyOrHttpMethodArray = AnyOrArray<http::Method>;

/// Header names, either `*` or a list of names.
pub type AnyOrAsciiStringArray = AnyOrArray<AsciiString>;

/// Either the wildcard `*` or an explicit list of values.
///
/// A single non-wildcard string is accepted as a one-element list.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyOrArray<T> {
    /// Any value is allowed.
    Any,
    /// Only these values are allowed.
    Explicit(Vec<T>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAnyOrArray {
    One(String),
    Many(Vec<String>),
}

impl<'de, T> Deserialize<'de> for AnyOrArray<T>
where
    T: FromStr<Err: Display>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let values = match RawAnyOrArray::deserialize(deserializer)? {
            RawAnyOrArray::One(value) if value == "*" => return Ok(AnyOrArray::Any),
            RawAnyOrArray::One(value) => vec![value],
            RawAnyOrArray::Many(values) => values,
        };

        values
            .iter()
            .map(|value| value.parse::<T>().map_err(serde::de::Error::custom))
            .collect::<Result<Vec<_>, _>>()
            .map(AnyOrArray::Explicit)
    }
}
