// SPDX-License-Identifier: Apache-2.0

//! Track metadata filter expressions: `field op value`, joined by `and` or `;`.
//! Values substitute `_` for spaces, e.g. `assay eq histone_modification`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Keys of `biosample_characteristics` searched by a `biosample` filter.
pub const BIOSAMPLE_FIELDS: [&str; 7] = [
    "life_stage",
    "biosample_term",
    "system_category",
    "tissue_category",
    "biosample_display",
    "biosample_summary",
    "biosample_term_id",
];

const EXAMPLE_EXPRESSION: &str = "datasource eq GTEx and biosample like astrocyte";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParseError {
    pub expression: String,
    pub message: String,
}

impl Display for FilterParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unable to parse `filter` expression: {}; {}. Example expression: {EXAMPLE_EXPRESSION}. \
             Test conditions must substitute an underscore (_) for spaces, e.g., histone modification \
             should be written as histone_modification",
            self.expression, self.message
        )
    }
}

impl std::error::Error for FilterParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Biosample,
    Antibody,
    Assay,
    Feature,
    Analysis,
    Classification,
    Category,
    Datasource,
}

impl FilterField {
    pub const ALL: [Self; 8] = [
        Self::Biosample,
        Self::Antibody,
        Self::Assay,
        Self::Feature,
        Self::Analysis,
        Self::Classification,
        Self::Category,
        Self::Datasource,
    ];

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == raw)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Biosample => "biosample",
            Self::Antibody => "antibody",
            Self::Assay => "assay",
            Self::Feature => "feature",
            Self::Analysis => "analysis",
            Self::Classification => "classification",
            Self::Category => "category",
            Self::Datasource => "datasource",
        }
    }

    /// Column of the track metadata table the field filters on.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Biosample => "biosample_characteristics",
            Self::Antibody => "antibody_target",
            Self::Assay => "assay",
            Self::Feature => "feature_type",
            Self::Analysis => "analysis",
            Self::Classification => "classification",
            Self::Category => "data_category",
            Self::Datasource => "data_source",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
    Like,
}

impl FilterOp {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "eq" => Some(Self::Eq),
            "neq" => Some(Self::Neq),
            "like" => Some(Self::Like),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub field: FilterField,
    pub op: FilterOp,
    /// Test value with `_` already expanded to spaces.
    pub value: String,
}

fn tokenize(expression: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for word in expression.split_whitespace() {
        let mut rest = word;
        while let Some(pos) = rest.find(';') {
            if pos > 0 {
                tokens.push(&rest[..pos]);
            }
            tokens.push(";");
            rest = &rest[pos + 1..];
        }
        if !rest.is_empty() {
            tokens.push(rest);
        }
    }
    tokens
}

fn is_value_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Parses a full expression; every token must belong to a `field op value` triple
/// or a join keyword between triples.
pub fn parse_filter_expression(expression: &str) -> Result<Vec<MetadataFilter>, FilterParseError> {
    let fail = |message: String| FilterParseError {
        expression: expression.to_string(),
        message,
    };
    let tokens = tokenize(expression);
    if tokens.is_empty() {
        return Err(fail("empty expression".to_string()));
    }

    let mut filters = Vec::new();
    let mut idx = 0;
    while idx < tokens.len() {
        let field_raw = tokens[idx];
        let op = tokens.get(idx + 1).copied();
        let value = tokens.get(idx + 2).copied();
        let field = FilterField::parse(field_raw).ok_or_else(|| {
            let allowed: Vec<&str> = FilterField::ALL.iter().map(|f| f.as_str()).collect();
            fail(format!(
                "unknown filter field `{field_raw}`; expected one of {}",
                allowed.join(", ")
            ))
        })?;
        let (Some(op_raw), Some(value)) = (op, value) else {
            return Err(fail(format!("incomplete filter triple starting at `{field_raw}`")));
        };
        let op = FilterOp::parse(op_raw).ok_or_else(|| {
            fail(format!(
                "unknown operator `{op_raw}`; expected one of eq, neq, like"
            ))
        })?;
        if !is_value_token(value) {
            return Err(fail(format!("invalid test value `{value}`")));
        }
        filters.push(MetadataFilter {
            field,
            op,
            value: value.replace('_', " "),
        });
        idx += 3;
        if matches!(tokens.get(idx), Some(&"and") | Some(&";")) {
            idx += 1;
            if idx == tokens.len() {
                return Err(fail("expression ends with a join".to_string()));
            }
        }
    }
    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_joined_triples() {
        let parsed =
            parse_filter_expression("datasource eq GTEx and biosample like brain_cortex;assay neq ChIP-seq")
                .expect("parse");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].field, FilterField::Datasource);
        assert_eq!(parsed[1].value, "brain cortex");
        assert_eq!(parsed[2].op, FilterOp::Neq);
        assert_eq!(parsed[2].field.column(), "assay");
    }

    #[test]
    fn rejects_unknown_fields_and_operators() {
        assert!(parse_filter_expression("tissue eq brain").is_err());
        assert!(parse_filter_expression("assay gt 5").is_err());
        assert!(parse_filter_expression("assay eq").is_err());
        assert!(parse_filter_expression("assay eq x and").is_err());
        assert!(parse_filter_expression("assay eq x%").is_err());
        assert!(parse_filter_expression("   ").is_err());
    }

    #[test]
    fn error_message_carries_the_expression() {
        let err = parse_filter_expression("bogus eq 1").expect_err("bogus");
        assert!(err.to_string().contains("bogus eq 1"));
    }
}
