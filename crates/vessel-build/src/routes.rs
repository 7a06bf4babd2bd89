//! Routing table synthesis.

use std::collections::BTreeMap;

use serde::Serialize;

/// Cache header for fingerprinted and static assets (one year).
pub const IMMUTABLE_CACHE_CONTROL: &str = "max-age=31557600";

/// One ordered routing rule. Evaluation order is the sequence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Route {
    /// Attach response headers to requests matching `src`
    Headers {
        src: String,
        headers: BTreeMap<String, String>,
    },
    /// Control directive such as `filesystem`
    Handle { handle: String },
    /// Send requests matching `src` to `dest`
    Destination { src: String, dest: String },
}

impl Route {
    pub fn cached(src: impl Into<String>) -> Self {
        Self::Headers {
            src: src.into(),
            headers: BTreeMap::from([(
                "cache-control".to_owned(),
                IMMUTABLE_CACHE_CONTROL.to_owned(),
            )]),
        }
    }

    pub fn filesystem() -> Self {
        Self::Handle {
            handle: "filesystem".to_owned(),
        }
    }

    pub fn catch_all(function: &str) -> Self {
        Self::Destination {
            src: "/(.*)".to_owned(),
            dest: format!("/{function}"),
        }
    }

    pub fn is_filesystem(&self) -> bool {
        matches!(self, Self::Handle { handle } if handle == "filesystem")
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Self::Destination { src, .. } if src == "/(.*)")
    }
}

/// Build the routing table.
///
/// Order: public-path cache rule, one cache rule per static file,
/// filesystem passthrough, catch-all to `function`. Paths are matched
/// literally; regex metacharacters in them are escaped.
pub fn synthesize<'a>(
    public_path: &str,
    static_files: impl IntoIterator<Item = &'a str>,
    function: &str,
) -> Vec<Route> {
    let mut routes = vec![Route::cached(format!("/{}.+", regex::escape(public_path)))];
    routes.extend(
        static_files
            .into_iter()
            .map(|file| Route::cached(format!("/{}", regex::escape(file)))),
    );
    routes.push(Route::filesystem());
    routes.push(Route::catch_all(function));
    routes
}
