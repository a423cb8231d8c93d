use super::RecordType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxRecord {
    pub priority: u16,
    pub exchange: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvRecord {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoaRecord {
    pub nsname: String,
    pub hostmaster: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minttl: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaaRecord {
    pub critical: bool,
    pub tag: String,
    pub value: String,
}

/// Parsed rdata of one answer record, one variant per supported [`RecordType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RecordData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    MX(MxRecord),
    TXT(String),
    CNAME(String),
    NS(String),
    SRV(SrvRecord),
    PTR(String),
    SOA(SoaRecord),
    CAA(CaaRecord),
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::A(_) => RecordType::A,
            RecordData::AAAA(_) => RecordType::AAAA,
            RecordData::MX(_) => RecordType::MX,
            RecordData::TXT(_) => RecordType::TXT,
            RecordData::CNAME(_) => RecordType::CNAME,
            RecordData::NS(_) => RecordType::NS,
            RecordData::SRV(_) => RecordType::SRV,
            RecordData::PTR(_) => RecordType::PTR,
            RecordData::SOA(_) => RecordType::SOA,
            RecordData::CAA(_) => RecordType::CAA,
        }
    }

    /// The single-string payload of A, AAAA, TXT, CNAME, NS and PTR records.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RecordData::A(ip) => Some(ip.to_string()),
            RecordData::AAAA(ip) => Some(ip.to_string()),
            RecordData::TXT(s)
            | RecordData::CNAME(s)
            | RecordData::NS(s)
            | RecordData::PTR(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::A(ip) => write!(f, "{}", ip),
            RecordData::AAAA(ip) => write!(f, "{}", ip),
            RecordData::MX(mx) => write!(f, "{} {}", mx.priority, mx.exchange),
            RecordData::TXT(s) => write!(f, "\"{}\"", s),
            RecordData::CNAME(s) | RecordData::NS(s) | RecordData::PTR(s) => write!(f, "{}", s),
            RecordData::SRV(srv) => write!(
                f,
                "{} {} {} {}",
                srv.priority, srv.weight, srv.port, srv.target
            ),
            RecordData::SOA(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.nsname,
                soa.hostmaster,
                soa.serial,
                soa.refresh,
                soa.retry,
                soa.expire,
                soa.minttl
            ),
            RecordData::CAA(caa) => write!(
                f,
                "{} {} \"{}\"",
                if caa.critical { 128 } else { 0 },
                caa.tag,
                caa.value
            ),
        }
    }
}
