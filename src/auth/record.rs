use super::dkim::DkimRecord;
use super::dmarc::DmarcRecord;
use super::spf::SpfRecord;

/// Any validated authentication record. Only records that parsed end up
/// here.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRecord {
    Dkim(DkimRecord),
    Dmarc(DmarcRecord),
    Spf(SpfRecord),
}

impl AuthRecord {
    pub fn raw(&self) -> &str {
        match self {
            Self::Dkim(record) => &record.raw,
            Self::Dmarc(record) => &record.raw,
            Self::Spf(record) => &record.raw,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dkim(_) => "DKIM",
            Self::Dmarc(_) => "DMARC",
            Self::Spf(_) => "SPF",
        }
    }
}

impl From<DkimRecord> for AuthRecord {
    fn from(record: DkimRecord) -> Self {
        Self::Dkim(record)
    }
}

impl From<DmarcRecord> for AuthRecord {
    fn from(record: DmarcRecord) -> Self {
        Self::Dmarc(record)
    }
}

impl From<SpfRecord> for AuthRecord {
    fn from(record: SpfRecord) -> Self {
        Self::Spf(record)
    }
}
