// SPDX-License-Identifier: Apache-2.0

use crate::canonical::sorted_query_string;
use crate::md5_hex;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Query parameters that change presentation only and never the cached payload.
pub const PRESENTATION_PARAMS: [&str; 2] = ["format", "view"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyError(pub String);

impl std::fmt::Display for CacheKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CacheKeyError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheNamespace {
    Filer,
    FilerExternalApi,
    Genomics,
    Advp,
    View,
    Root,
    QueryCache,
}

impl CacheNamespace {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Filer => "filer",
            Self::FilerExternalApi => "filer_external_api",
            Self::Genomics => "genomics",
            Self::Advp => "advp",
            Self::View => "view",
            Self::Root => "root",
            Self::QueryCache => "query_cache",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CacheKeyError> {
        match raw {
            "filer" => Ok(Self::Filer),
            "filer_external_api" => Ok(Self::FilerExternalApi),
            "genomics" => Ok(Self::Genomics),
            "advp" => Ok(Self::Advp),
            "view" => Ok(Self::View),
            "" | "root" => Ok(Self::Root),
            "query_cache" => Ok(Self::QueryCache),
            other => Err(CacheKeyError(format!("unknown cache namespace: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKeyQualifier {
    Cursor,
    ResultSize,
}

impl CacheKeyQualifier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cursor => "pagination-cursor",
            Self::ResultSize => "pagination-result-size",
        }
    }
}

/// Identity of a cached response: the raw `endpoint?sorted-params` string plus its namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub key: String,
    pub namespace: CacheNamespace,
}

impl CacheKey {
    #[must_use]
    pub fn new(key: impl Into<String>, namespace: CacheNamespace) -> Self {
        Self {
            key: key.into(),
            namespace,
        }
    }

    /// Builds the key for a request path (path parameters included) and its query pairs.
    /// `:` is the key delimiter of the backing store, so it is replaced by `_`.
    pub fn from_request<'a, I>(path: &str, params: I) -> Result<Self, CacheKeyError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let namespace = CacheNamespace::parse(path.split('/').nth(1).unwrap_or_default())?;
        let query = sorted_query_string(params, &PRESENTATION_PARAMS).replace(':', "_");
        Ok(Self::new(format!("{path}?{query}"), namespace))
    }

    #[must_use]
    pub fn encrypt(&self) -> String {
        md5_hex(self.key.as_bytes())
    }

    /// Raw key with the `page` parameter removed; fingerprint of the unpaged result.
    pub fn no_page(&self) -> Result<String, CacheKeyError> {
        remove_query_prop(&self.key, "page")
    }

    /// Key of a pagination entry for the unpaged result `raw`. Tables built
    /// for different page sizes never share an entry.
    #[must_use]
    pub fn qualified(raw: &str, qualifier: CacheKeyQualifier, page_size: u64) -> String {
        md5_hex(format!("{raw}{}{page_size}", qualifier.as_str()).as_bytes())
    }
}

pub fn remove_query_prop(key: &str, prop: &str) -> Result<String, CacheKeyError> {
    let pattern = Regex::new(&format!(r"\b{}=[^&]*&?", regex::escape(prop)))
        .map_err(|e| CacheKeyError(e.to_string()))?;
    let stripped = pattern.replace_all(key, "");
    Ok(stripped.trim_end_matches('&').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_key_excludes_presentation_params_and_escapes_colons() {
        let key = CacheKey::from_request(
            "/filer/data",
            [
                ("track", "NGEN000611"),
                ("span", "chr19:1000-2000"),
                ("format", "bed"),
                ("page", "2"),
            ],
        )
        .expect("key");
        assert_eq!(key.namespace, CacheNamespace::Filer);
        assert_eq!(
            key.key,
            "/filer/data?page=2&span=chr19_1000-2000&track=NGEN000611"
        );
    }

    #[test]
    fn no_page_strips_page_anywhere_in_the_query() {
        let middle = CacheKey::new("/filer/data?content=full&page=3&span=x", CacheNamespace::Filer);
        assert_eq!(middle.no_page().expect("strip"), "/filer/data?content=full&span=x");
        let last = CacheKey::new("/filer/data?content=full&page=3", CacheNamespace::Filer);
        assert_eq!(last.no_page().expect("strip"), "/filer/data?content=full");
        let none = CacheKey::new("/filer/data?per_page=3", CacheNamespace::Filer);
        assert_eq!(none.no_page().expect("strip"), "/filer/data?per_page=3");
    }

    #[test]
    fn unknown_namespace_is_rejected() {
        let err = CacheKey::from_request("/nope/x", std::iter::empty()).expect_err("namespace");
        assert!(err.0.contains("nope"));
    }

    #[test]
    fn qualified_keys_differ_per_qualifier_and_page_size() {
        let raw = "/filer/data?span=x";
        assert_ne!(
            CacheKey::qualified(raw, CacheKeyQualifier::Cursor, 100),
            CacheKey::qualified(raw, CacheKeyQualifier::ResultSize, 100)
        );
        assert_ne!(
            CacheKey::qualified(raw, CacheKeyQualifier::Cursor, 100),
            CacheKey::qualified(raw, CacheKeyQualifier::Cursor, 101)
        );
        assert_eq!(
            CacheKey::qualified(raw, CacheKeyQualifier::Cursor, 100),
            md5_hex(b"/filer/data?span=xpagination-cursor100")
        );
    }
}
