use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GenomicOpsError;

/// A genomic interval in display coordinates (1-based, inclusive), as written
/// in `chr1:1,000-2,000`.
///
/// Ordering of `start` and `end` is not checked; liftOver reports inverted
/// intervals as unmapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
}

impl Region {
    /// Single-line BED record (0-based, half-open) for the same interval.
    pub fn to_bed_line(&self) -> String {
        format!("{}\t{}\t{}\n", self.chrom, self.start - 1, self.end)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

impl FromStr for Region {
    type Err = GenomicOpsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || GenomicOpsError::InvalidRegion(value.to_string());

        let (chrom, coords) = value.split_once(':').ok_or_else(invalid)?;
        if chrom.is_empty() || coords.contains(':') {
            return Err(invalid());
        }

        let coords = coords.replace(',', "");
        let (start, end) = coords.split_once('-').ok_or_else(invalid)?;
        if end.contains('-') {
            return Err(invalid());
        }
        let start = start.trim().parse::<i64>().map_err(|_| invalid())?;
        let end = end.trim().parse::<i64>().map_err(|_| invalid())?;

        Ok(Self {
            chrom: chrom.to_string(),
            start,
            end,
        })
    }
}

/// Host families UCSC publishes prebuilt `liftOver` executables for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    LinuxX86_64,
    MacOsX86_64,
}

impl Platform {
    pub fn current() -> Result<Self, GenomicOpsError> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Result<Self, GenomicOpsError> {
        let os = os.to_lowercase();
        if os.contains("linux") {
            return Ok(Platform::LinuxX86_64);
        }
        if os.contains("darwin") || os.contains("mac") {
            return Ok(Platform::MacOsX86_64);
        }
        Err(GenomicOpsError::UnsupportedPlatform(os))
    }

    /// Directory name under the UCSC `admin/exe` download root.
    pub fn folder(&self) -> &'static str {
        match self {
            Platform::LinuxX86_64 => "linux.x86_64",
            Platform::MacOsX86_64 => "macOSX.x86_64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.folder())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_region_valid() {
        let region: Region = "chr1:1000-2000".parse().unwrap();
        assert_eq!(region.chrom, "chr1");
        assert_eq!(region.start, 1000);
        assert_eq!(region.end, 2000);
    }

    #[test]
    fn parse_region_strips_thousands_separators() {
        let region: Region = "chrX:1,234,567-1,300,000".parse().unwrap();
        assert_eq!(region.start, 1_234_567);
        assert_eq!(region.end, 1_300_000);
    }

    #[test]
    fn parse_region_rejects_malformed_input() {
        for input in [
            "invalid_region",
            "chr1:1000",
            "chr1-1000-2000",
            "chr1:abc-def",
            "chr1:1000-2000-3000",
            "chr1:2:1000-2000",
            ":1000-2000",
            "chr1:-5-10",
            "",
        ] {
            let err = input.parse::<Region>().unwrap_err();
            assert_matches!(err, GenomicOpsError::InvalidRegion(ref raw) if raw == input);
            assert!(err.to_string().contains("chr1:1000-2000"));
        }
    }

    #[test]
    fn bed_line_is_zero_based_half_open() {
        let region: Region = "chr1:1000-1100".parse().unwrap();
        assert_eq!(region.to_bed_line(), "chr1\t999\t1100\n");
        assert_eq!(region.to_string(), "chr1:1000-1100");
    }

    #[test]
    fn platform_detection() {
        assert_eq!(Platform::from_os("linux").unwrap().folder(), "linux.x86_64");
        assert_eq!(Platform::from_os("macos").unwrap().folder(), "macOSX.x86_64");
        assert_eq!(Platform::from_os("Darwin").unwrap(), Platform::MacOsX86_64);
        let err = Platform::from_os("windows").unwrap_err();
        assert_matches!(err, GenomicOpsError::UnsupportedPlatform(_));
    }
}
