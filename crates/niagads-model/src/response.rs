// SPDX-License-Identifier: Apache-2.0

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

macro_rules! response_enum {
    ($(#[$meta:meta])* $name:ident, $param:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Case-insensitive match against the variant names.
            pub fn parse(input: &str) -> Result<Self, ParseError> {
                let upper = input.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseError::InvalidValue($param, input.to_string())),
                }
            }

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }
    };
}

response_enum!(
    /// Kind of information a track query returns.
    ResponseContent, "content" {
        Full => "FULL",
        Counts => "COUNTS",
        Ids => "IDS",
        Summary => "SUMMARY",
        Urls => "URLS",
    }
);

response_enum!(
    ResponseFormat, "format" {
        Json => "JSON",
        Text => "TEXT",
        Vcf => "VCF",
        Bed => "BED",
    }
);

response_enum!(
    ResponseView, "view" {
        Table => "TABLE",
        IgvBrowser => "IGV_BROWSER",
        Default => "DEFAULT",
    }
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCursor {
    pub page: u64,
    pub total_num_pages: u64,
    pub paged_num_records: Option<u64>,
    pub total_num_records: Option<u64>,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            page: 1,
            total_num_pages: 1,
            paged_num_records: None,
            total_num_records: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestData {
    pub request_id: String,
    pub endpoint: String,
    pub parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RequestData {
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        endpoint: impl Into<String>,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            endpoint: endpoint.into(),
            parameters,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    pub request: RequestData,
    pub pagination: PaginationCursor,
    pub data: Vec<T>,
}

impl<T> PagedResponse<T> {
    /// A terminal "no results" page: one page, zero records, and an explanatory message.
    #[must_use]
    pub fn empty(request: RequestData, message: impl Into<String>) -> Self {
        Self {
            request: request.with_message(message),
            pagination: PaginationCursor {
                paged_num_records: Some(0),
                total_num_records: Some(0),
                ..PaginationCursor::default()
            },
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleResponse<T> {
    pub request: RequestData,
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!(ResponseContent::parse("full").expect("full"), ResponseContent::Full);
        assert_eq!(ResponseFormat::parse("Bed").expect("bed"), ResponseFormat::Bed);
        assert_eq!(
            ResponseView::parse("igv_browser").expect("igv"),
            ResponseView::IgvBrowser
        );
        assert!(ResponseContent::parse("everything").is_err());
    }

    #[test]
    fn empty_page_carries_message_and_zero_counts() {
        let page: PagedResponse<String> = PagedResponse::empty(
            RequestData::new("req-1", "/filer/data/search", BTreeMap::new()),
            "nothing here",
        );
        let json = serde_json::to_value(&page).expect("json");
        assert_eq!(json["data"], serde_json::json!([]));
        assert_eq!(json["request"]["message"], "nothing here");
        assert_eq!(json["pagination"]["total_num_pages"], 1);
        assert_eq!(json["pagination"]["total_num_records"], 0);
    }
}
