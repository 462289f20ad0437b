use anyhow::{anyhow, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where frames come from.
///
/// A bare number is a capture device index, anything with a `scheme://` prefix
/// is a stream URL, and everything else is a filesystem path. URLs are passed
/// to the decoding backend untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    Device(u32),
    Path(PathBuf),
    Url(String),
}

impl SourceSpec {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(anyhow!("source must not be empty"));
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            let index = raw
                .parse::<u32>()
                .map_err(|_| anyhow!("device index {} is out of range", raw))?;
            return Ok(Self::Device(index));
        }
        if raw.contains("://") {
            return Ok(Self::Url(raw.to_string()));
        }
        Ok(Self::Path(PathBuf::from(raw)))
    }
}

impl FromStr for SourceSpec {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(index) => write!(f, "{}", index),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}
