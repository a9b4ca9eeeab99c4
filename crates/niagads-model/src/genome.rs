// SPDX-License-Identifier: Apache-2.0

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Assembly {
    GRCh37,
    GRCh38,
}

impl Assembly {
    /// Accepts `GRCh37`/`GRCh38` and the UCSC aliases `hg19`/`hg38`, ignoring case.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty("assembly"));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "grch37" | "hg19" => Ok(Self::GRCh37),
            "grch38" | "hg38" => Ok(Self::GRCh38),
            _ => Err(ParseError::InvalidValue("assembly", trimmed.to_string())),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GRCh37 => "GRCh37",
            Self::GRCh38 => "GRCh38",
        }
    }

    /// Genome build label understood by the FILER API.
    #[must_use]
    pub const fn filer_genome_build(self) -> &'static str {
        match self {
            Self::GRCh37 => "hg19",
            Self::GRCh38 => "hg38",
        }
    }
}

impl Display for Assembly {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human chromosome, stored in `chrN` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chromosome(String);

impl Chromosome {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty("chromosome"));
        }
        let bare = trimmed
            .strip_prefix("chr")
            .or_else(|| trimmed.strip_prefix("CHR"))
            .or_else(|| trimmed.strip_prefix("Chr"))
            .unwrap_or(trimmed);
        let upper = bare.to_ascii_uppercase();
        let valid = match upper.as_str() {
            "X" | "Y" | "M" | "MT" => true,
            n => n
                .parse::<u8>()
                .map(|v| (1..=22).contains(&v) && !n.starts_with('0'))
                .unwrap_or(false),
        };
        if !valid {
            return Err(ParseError::InvalidValue("chromosome", trimmed.to_string()));
        }
        Ok(Self(format!("chr{upper}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Genomic interval `chrN:start-end`, start <= end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub chromosome: Chromosome,
    pub start: u64,
    pub end: u64,
}

impl Span {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty("span"));
        }
        let format_error = || {
            ParseError::InvalidFormat(format!(
                "Invalid genomic span: `{trimmed}`; for a chromosome, N, please specify as chrN:start-end or N:start-end"
            ))
        };
        let (chrom_raw, coords) = trimmed.split_once(':').ok_or_else(format_error)?;
        let (start_raw, end_raw) = coords.split_once('-').ok_or_else(format_error)?;
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(start_raw) || !all_digits(end_raw) {
            return Err(format_error());
        }
        let chromosome = Chromosome::parse(chrom_raw).map_err(|_| {
            ParseError::InvalidFormat(format!(
                "Invalid genomic span: `{trimmed}`; invalid chromosome `{chrom_raw}`"
            ))
        })?;
        let start = start_raw.parse::<u64>().map_err(|_| format_error())?;
        let end = end_raw.parse::<u64>().map_err(|_| format_error())?;
        if start > end {
            return Err(ParseError::InvalidFormat(format!(
                "Invalid genomic span: `{trimmed}`; start coordinate must be <= end"
            )));
        }
        Ok(Self {
            chromosome,
            start,
            end,
        })
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome.as_str(), self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembly_accepts_ucsc_aliases() {
        assert_eq!(Assembly::parse("hg19").expect("hg19"), Assembly::GRCh37);
        assert_eq!(Assembly::parse("grch38").expect("grch38"), Assembly::GRCh38);
        assert_eq!(Assembly::GRCh38.filer_genome_build(), "hg38");
        assert!(Assembly::parse("mm10").is_err());
    }

    #[test]
    fn span_normalizes_chromosome_prefix() {
        let span = Span::parse("19:10000-40000").expect("span");
        assert_eq!(span.to_string(), "chr19:10000-40000");
        assert_eq!(
            Span::parse("chrX:1-1").expect("x").chromosome.as_str(),
            "chrX"
        );
    }

    #[test]
    fn span_rejects_bad_input() {
        assert!(Span::parse("chr23:1-2").is_err());
        assert!(Span::parse("chr1:20-10").is_err());
        assert!(Span::parse("chr1:1_000-2").is_err());
        assert!(Span::parse("chr1-1-2").is_err());
        assert!(Span::parse("chr01:1-2").is_err());
        assert!(Span::parse("").is_err());
    }
}
