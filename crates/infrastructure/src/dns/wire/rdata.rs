//! Per-type rdata layouts.
//!
//! Embedded names may be compressed, so parsing reads from the whole message
//! buffer starting at [`ResourceRecord::rdata_offset`].

use super::message::{read_u16, read_u32, ResourceRecord};
use super::name::{decode_name, write_name, CompressionTable};
use ferrous_resolver_domain::{
    CaaRecord, DomainError, MxRecord, RecordData, RecordType, SoaRecord, SrvRecord,
};
use std::net::{Ipv4Addr, Ipv6Addr};

const MAX_CHARACTER_STRING: usize = 255;
const CAA_CRITICAL: u8 = 0x80;

pub fn parse_rdata(message: &[u8], rr: &ResourceRecord) -> Result<RecordData, DomainError> {
    let record_type = rr.record_type().ok_or_else(|| {
        DomainError::MalformedMessage(format!("unsupported record type {}", rr.rtype))
    })?;

    let reader = RdataReader {
        message,
        start: rr.rdata_offset,
        end: rr.rdata_offset + rr.rdata.len(),
        record_type,
    };
    if reader.end > message.len() {
        return Err(reader.malformed("rdata extends past end of message"));
    }

    match record_type {
        RecordType::A => {
            let b = reader.exact(4)?;
            Ok(RecordData::A(Ipv4Addr::new(b[0], b[1], b[2], b[3])))
        }
        RecordType::AAAA => {
            let b = reader.exact(16)?;
            let mut octets = [0u8; 16];
            octets.copy_from_slice(b);
            Ok(RecordData::AAAA(Ipv6Addr::from(octets)))
        }
        RecordType::CNAME => Ok(RecordData::CNAME(reader.name_at(reader.start)?.0)),
        RecordType::NS => Ok(RecordData::NS(reader.name_at(reader.start)?.0)),
        RecordType::PTR => Ok(RecordData::PTR(reader.name_at(reader.start)?.0)),
        RecordType::MX => {
            let priority = reader.u16_at(reader.start)?;
            let (exchange, _) = reader.name_at(reader.start + 2)?;
            Ok(RecordData::MX(MxRecord { priority, exchange }))
        }
        RecordType::SRV => {
            let priority = reader.u16_at(reader.start)?;
            let weight = reader.u16_at(reader.start + 2)?;
            let port = reader.u16_at(reader.start + 4)?;
            let (target, _) = reader.name_at(reader.start + 6)?;
            Ok(RecordData::SRV(SrvRecord {
                priority,
                weight,
                port,
                target,
            }))
        }
        RecordType::SOA => {
            let (nsname, next) = reader.name_at(reader.start)?;
            let (hostmaster, next) = reader.name_at(next)?;
            if next + 20 != reader.end {
                return Err(reader.malformed("expected 20 bytes of timers after names"));
            }
            Ok(RecordData::SOA(SoaRecord {
                nsname,
                hostmaster,
                serial: read_u32(message, next)?,
                refresh: read_u32(message, next + 4)?,
                retry: read_u32(message, next + 8)?,
                expire: read_u32(message, next + 12)?,
                minttl: read_u32(message, next + 16)?,
            }))
        }
        RecordType::TXT => {
            let data = &rr.rdata;
            let mut text = String::new();
            let mut pos = 0;
            while pos < data.len() {
                let len = data[pos] as usize;
                let chunk = data
                    .get(pos + 1..pos + 1 + len)
                    .ok_or_else(|| reader.malformed("character-string overruns rdata"))?;
                text.push_str(&String::from_utf8_lossy(chunk));
                pos += 1 + len;
            }
            Ok(RecordData::TXT(text))
        }
        RecordType::CAA => {
            let data = &rr.rdata;
            if data.len() < 2 {
                return Err(reader.malformed("missing flags or tag length"));
            }
            let tag_len = data[1] as usize;
            let tag = data
                .get(2..2 + tag_len)
                .ok_or_else(|| reader.malformed("tag overruns rdata"))?;
            Ok(RecordData::CAA(CaaRecord {
                critical: data[0] & CAA_CRITICAL != 0,
                tag: String::from_utf8_lossy(tag).into_owned(),
                value: String::from_utf8_lossy(&data[2 + tag_len..]).into_owned(),
            }))
        }
    }
}

struct RdataReader<'a> {
    message: &'a [u8],
    start: usize,
    end: usize,
    record_type: RecordType,
}

impl<'a> RdataReader<'a> {
    fn malformed(&self, detail: &str) -> DomainError {
        DomainError::MalformedMessage(format!(
            "{} record at offset {}: {}",
            self.record_type, self.start, detail
        ))
    }

    fn exact(&self, len: usize) -> Result<&'a [u8], DomainError> {
        if self.end - self.start != len {
            return Err(self.malformed(&format!(
                "expected {} bytes of rdata, got {}",
                len,
                self.end - self.start
            )));
        }
        Ok(&self.message[self.start..self.end])
    }

    fn u16_at(&self, offset: usize) -> Result<u16, DomainError> {
        if offset + 2 > self.end {
            return Err(self.malformed("rdata too short"));
        }
        read_u16(self.message, offset)
    }

    fn name_at(&self, offset: usize) -> Result<(String, usize), DomainError> {
        if offset >= self.end {
            return Err(self.malformed("missing domain name"));
        }
        let (name, next) = decode_name(self.message, offset)
            .map_err(|e| self.malformed(&e.to_string()))?;
        if next > self.end {
            return Err(self.malformed("domain name overruns rdata"));
        }
        Ok((name, next))
    }
}

/// Appends the wire rdata for `data` (without the rdlength prefix).
pub fn write_rdata(
    buf: &mut Vec<u8>,
    table: &mut CompressionTable,
    data: &RecordData,
) -> Result<(), DomainError> {
    match data {
        RecordData::A(ip) => buf.extend_from_slice(&ip.octets()),
        RecordData::AAAA(ip) => buf.extend_from_slice(&ip.octets()),
        RecordData::CNAME(name) | RecordData::NS(name) | RecordData::PTR(name) => {
            write_name(buf, name, Some(table))?
        }
        RecordData::MX(mx) => {
            buf.extend_from_slice(&mx.priority.to_be_bytes());
            write_name(buf, &mx.exchange, Some(table))?;
        }
        RecordData::SRV(srv) => {
            buf.extend_from_slice(&srv.priority.to_be_bytes());
            buf.extend_from_slice(&srv.weight.to_be_bytes());
            buf.extend_from_slice(&srv.port.to_be_bytes());
            // RFC 2782: the target is never compressed
            write_name(buf, &srv.target, None)?;
        }
        RecordData::SOA(soa) => {
            write_name(buf, &soa.nsname, Some(table))?;
            write_name(buf, &soa.hostmaster, Some(table))?;
            for value in [soa.serial, soa.refresh, soa.retry, soa.expire, soa.minttl] {
                buf.extend_from_slice(&value.to_be_bytes());
            }
        }
        RecordData::TXT(text) => {
            let bytes = text.as_bytes();
            if bytes.is_empty() {
                buf.push(0);
            }
            for chunk in bytes.chunks(MAX_CHARACTER_STRING) {
                buf.push(chunk.len() as u8);
                buf.extend_from_slice(chunk);
            }
        }
        RecordData::CAA(caa) => {
            if caa.tag.is_empty() || caa.tag.len() > MAX_CHARACTER_STRING {
                return Err(DomainError::EncodingError(format!(
                    "CAA tag '{}' must be 1-255 bytes",
                    caa.tag
                )));
            }
            buf.push(if caa.critical { CAA_CRITICAL } else { 0 });
            buf.push(caa.tag.len() as u8);
            buf.extend_from_slice(caa.tag.as_bytes());
            buf.extend_from_slice(caa.value.as_bytes());
        }
    }
    Ok(())
}
