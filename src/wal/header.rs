//! WAL file header (§4.I, §6): line 1 of every `*.wal` file is
//! `MDCWAL01|1|<utcIso8601>`.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::{Error, Result};

const MAGIC: &str = "MDCWAL01";
const FORMAT_VERSION: &str = "1";

#[derive(Debug, Clone, Copy)]
pub struct WalHeader {
    pub created_at: OffsetDateTime,
}

impl WalHeader {
    pub fn new(created_at: OffsetDateTime) -> Self {
        Self { created_at }
    }

    pub fn to_line(self) -> String {
        format!(
            "{MAGIC}|{FORMAT_VERSION}|{}\n",
            self.created_at
                .format(&Rfc3339)
                .expect("OffsetDateTime always formats as RFC3339")
        )
    }

    /// Parses line 1 of a WAL file. An invalid header means the whole file
    /// is skipped with a warning (§4.I Failure handling) — the caller logs,
    /// this just reports `Err`.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut parts = line.splitn(3, '|');
        let magic = parts.next().ok_or_else(|| Error::MalformedHeader(line.to_string()))?;
        let version = parts.next().ok_or_else(|| Error::MalformedHeader(line.to_string()))?;
        let timestamp = parts.next().ok_or_else(|| Error::MalformedHeader(line.to_string()))?;
        if magic != MAGIC || version != FORMAT_VERSION {
            return Err(Error::MalformedHeader(line.to_string()));
        }
        let created_at = OffsetDateTime::parse(timestamp, &Rfc3339)
            .map_err(|_| Error::MalformedHeader(line.to_string()))?;
        Ok(Self { created_at })
    }
}
