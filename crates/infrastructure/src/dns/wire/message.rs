//! DNS message layout (RFC 1035 §4.1)
//!
//! ```text
//! +---------------------+
//! |        Header       |  12 bytes: id, flags, qd/an/ns/ar counts
//! +---------------------+
//! |       Question      |  name + type + class
//! +---------------------+
//! |        Answer       |  resource records
//! +---------------------+
//! |      Authority      |
//! +---------------------+
//! |      Additional     |
//! +---------------------+
//! ```

use super::name::{decode_name, write_name, CompressionTable};
use super::rdata::write_rdata;
use ferrous_resolver_domain::{DomainError, Rcode, RecordData, RecordType};

pub const HEADER_LEN: usize = 12;
pub const CLASS_IN: u16 = 1;
pub const TYPE_OPT: u16 = 41;

const RR_META_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub rcode: Rcode,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            qr: false,
            opcode: 0,
            aa: false,
            tc: false,
            rd: false,
            ra: false,
            rcode: Rcode::NoError,
        }
    }
}

impl Flags {
    pub fn query(recursion_desired: bool) -> Self {
        Self {
            rd: recursion_desired,
            ..Self::default()
        }
    }

    pub fn response(rcode: Rcode) -> Self {
        Self {
            qr: true,
            rd: true,
            ra: true,
            rcode,
            ..Self::default()
        }
    }

    pub fn from_u16(bits: u16) -> Self {
        Self {
            qr: bits & 0x8000 != 0,
            opcode: ((bits >> 11) & 0x0F) as u8,
            aa: bits & 0x0400 != 0,
            tc: bits & 0x0200 != 0,
            rd: bits & 0x0100 != 0,
            ra: bits & 0x0080 != 0,
            rcode: Rcode::from_u8((bits & 0x000F) as u8),
        }
    }

    pub fn to_u16(&self) -> u16 {
        let mut bits = 0u16;
        if self.qr {
            bits |= 0x8000;
        }
        bits |= ((self.opcode & 0x0F) as u16) << 11;
        if self.aa {
            bits |= 0x0400;
        }
        if self.tc {
            bits |= 0x0200;
        }
        if self.rd {
            bits |= 0x0100;
        }
        if self.ra {
            bits |= 0x0080;
        }
        bits | self.rcode.to_u8() as u16
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    pub fn record_type(&self) -> Option<RecordType> {
        RecordType::from_u16(self.qtype)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    pub rdata: Vec<u8>,
    /// Where `rdata` starts in the source buffer; compressed names inside
    /// rdata are resolved relative to that buffer.
    pub rdata_offset: usize,
}

impl ResourceRecord {
    pub fn record_type(&self) -> Option<RecordType> {
        RecordType::from_u16(self.rtype)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub id: u16,
    pub flags: Flags,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authorities: Vec<ResourceRecord>,
    pub additionals: Vec<ResourceRecord>,
}

impl Message {
    pub fn is_response(&self) -> bool {
        self.flags.qr
    }

    pub fn rcode(&self) -> Rcode {
        self.flags.rcode
    }

    pub fn is_truncated(&self) -> bool {
        self.flags.tc
    }

    pub fn answers_of(&self, record_type: RecordType) -> impl Iterator<Item = &ResourceRecord> {
        let code = record_type.to_u16();
        self.answers.iter().filter(move |rr| rr.rtype == code)
    }
}

/// Builds a standard query: one question, class IN, RD set iff requested.
pub fn encode_query(
    id: u16,
    name: &str,
    record_type: RecordType,
    recursion_desired: bool,
) -> Result<Vec<u8>, DomainError> {
    let mut writer = MessageWriter::new(id, Flags::query(recursion_desired));
    writer.question(name, record_type)?;
    Ok(writer.finish())
}

/// Appends an EDNS(0) OPT pseudo-record (RFC 6891) and bumps ARCOUNT.
pub fn append_edns(
    buf: &mut Vec<u8>,
    udp_payload_size: u16,
    dnssec_ok: bool,
) -> Result<(), DomainError> {
    if buf.len() < HEADER_LEN {
        return Err(DomainError::EncodingError(
            "cannot append OPT record to a message without header".into(),
        ));
    }

    let arcount = u16::from_be_bytes([buf[10], buf[11]]);
    let arcount = arcount.checked_add(1).ok_or_else(|| {
        DomainError::EncodingError("additional section count overflow".into())
    })?;
    buf[10..12].copy_from_slice(&arcount.to_be_bytes());

    buf.push(0);
    buf.extend_from_slice(&TYPE_OPT.to_be_bytes());
    buf.extend_from_slice(&udp_payload_size.to_be_bytes());
    let ext_flags: u32 = if dnssec_ok { 0x0000_8000 } else { 0 };
    buf.extend_from_slice(&ext_flags.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    Ok(())
}

pub fn decode_message(buf: &[u8]) -> Result<Message, DomainError> {
    if buf.len() < HEADER_LEN {
        return Err(DomainError::MalformedMessage(format!(
            "message is {} bytes, shorter than the {}-byte header",
            buf.len(),
            HEADER_LEN
        )));
    }

    let id = read_u16(buf, 0)?;
    let flags = Flags::from_u16(read_u16(buf, 2)?);
    let qdcount = read_u16(buf, 4)? as usize;
    let ancount = read_u16(buf, 6)? as usize;
    let nscount = read_u16(buf, 8)? as usize;
    let arcount = read_u16(buf, 10)? as usize;

    let mut offset = HEADER_LEN;

    let mut questions = Vec::with_capacity(qdcount.min(16));
    for _ in 0..qdcount {
        let (name, next) = decode_name(buf, offset)?;
        let qtype = read_u16(buf, next)?;
        let qclass = read_u16(buf, next + 2)?;
        questions.push(Question {
            name,
            qtype,
            qclass,
        });
        offset = next + 4;
    }

    let (answers, offset) = decode_section(buf, offset, ancount)?;
    let (authorities, offset) = decode_section(buf, offset, nscount)?;
    let (additionals, _) = decode_section(buf, offset, arcount)?;

    Ok(Message {
        id,
        flags,
        questions,
        answers,
        authorities,
        additionals,
    })
}

fn decode_section(
    buf: &[u8],
    mut offset: usize,
    count: usize,
) -> Result<(Vec<ResourceRecord>, usize), DomainError> {
    let mut records = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let (name, next) = decode_name(buf, offset)?;
        if next + RR_META_LEN > buf.len() {
            return Err(DomainError::MalformedMessage(format!(
                "resource record header at offset {} is truncated",
                next
            )));
        }

        let rtype = read_u16(buf, next)?;
        let class = read_u16(buf, next + 2)?;
        let ttl = read_u32(buf, next + 4)?;
        let rdlength = read_u16(buf, next + 8)? as usize;

        let rdata_offset = next + RR_META_LEN;
        let rdata_end = rdata_offset + rdlength;
        if rdata_end > buf.len() {
            return Err(DomainError::MalformedMessage(format!(
                "rdata of type {} at offset {} claims {} bytes, only {} remain",
                rtype,
                rdata_offset,
                rdlength,
                buf.len() - rdata_offset
            )));
        }

        records.push(ResourceRecord {
            name,
            rtype,
            class,
            ttl,
            rdata: buf[rdata_offset..rdata_end].to_vec(),
            rdata_offset,
        });
        offset = rdata_end;
    }
    Ok((records, offset))
}

pub(crate) fn read_u16(buf: &[u8], offset: usize) -> Result<u16, DomainError> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| {
            DomainError::MalformedMessage(format!("expected 2 bytes at offset {}", offset))
        })
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> Result<u32, DomainError> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| {
            DomainError::MalformedMessage(format!("expected 4 bytes at offset {}", offset))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Question,
    Answer,
    Authority,
    Additional,
}

/// Incremental message encoder with name compression.
///
/// Entries must be added in section order (questions, answers, authority,
/// additional); counts are patched into the header by [`MessageWriter::finish`].
pub struct MessageWriter {
    buf: Vec<u8>,
    table: CompressionTable,
    counts: [u16; 4],
    section: Section,
}

impl MessageWriter {
    pub fn new(id: u16, flags: Flags) -> Self {
        let mut buf = Vec::with_capacity(512);
        buf.extend_from_slice(&id.to_be_bytes());
        buf.extend_from_slice(&flags.to_u16().to_be_bytes());
        buf.extend_from_slice(&[0u8; 8]);
        Self {
            buf,
            table: CompressionTable::new(),
            counts: [0; 4],
            section: Section::Question,
        }
    }

    pub fn question(
        &mut self,
        name: &str,
        record_type: RecordType,
    ) -> Result<&mut Self, DomainError> {
        self.enter(Section::Question)?;
        write_name(&mut self.buf, name, Some(&mut self.table))?;
        self.buf.extend_from_slice(&record_type.to_u16().to_be_bytes());
        self.buf.extend_from_slice(&CLASS_IN.to_be_bytes());
        Ok(self)
    }

    pub fn answer(
        &mut self,
        name: &str,
        ttl: u32,
        data: &RecordData,
    ) -> Result<&mut Self, DomainError> {
        self.record(Section::Answer, name, ttl, data)
    }

    pub fn authority(
        &mut self,
        name: &str,
        ttl: u32,
        data: &RecordData,
    ) -> Result<&mut Self, DomainError> {
        self.record(Section::Authority, name, ttl, data)
    }

    pub fn additional(
        &mut self,
        name: &str,
        ttl: u32,
        data: &RecordData,
    ) -> Result<&mut Self, DomainError> {
        self.record(Section::Additional, name, ttl, data)
    }

    pub fn finish(mut self) -> Vec<u8> {
        for (i, count) in self.counts.iter().enumerate() {
            let at = 4 + i * 2;
            self.buf[at..at + 2].copy_from_slice(&count.to_be_bytes());
        }
        self.buf
    }

    fn record(
        &mut self,
        section: Section,
        name: &str,
        ttl: u32,
        data: &RecordData,
    ) -> Result<&mut Self, DomainError> {
        self.enter(section)?;
        write_name(&mut self.buf, name, Some(&mut self.table))?;
        self.buf
            .extend_from_slice(&data.record_type().to_u16().to_be_bytes());
        self.buf.extend_from_slice(&CLASS_IN.to_be_bytes());
        self.buf.extend_from_slice(&ttl.to_be_bytes());

        let rdlength_at = self.buf.len();
        self.buf.extend_from_slice(&[0, 0]);
        write_rdata(&mut self.buf, &mut self.table, data)?;

        let rdlength = self.buf.len() - rdlength_at - 2;
        let rdlength = u16::try_from(rdlength).map_err(|_| {
            DomainError::EncodingError(format!("rdata of {} bytes exceeds 65535", rdlength))
        })?;
        self.buf[rdlength_at..rdlength_at + 2].copy_from_slice(&rdlength.to_be_bytes());
        Ok(self)
    }

    fn enter(&mut self, section: Section) -> Result<(), DomainError> {
        if section < self.section {
            return Err(DomainError::EncodingError(format!(
                "cannot add a {:?} entry after the {:?} section",
                section, self.section
            )));
        }
        let idx = section as usize;
        self.counts[idx] = self.counts[idx].checked_add(1).ok_or_else(|| {
            DomainError::EncodingError(format!("too many {:?} entries", section))
        })?;
        self.section = section;
        Ok(())
    }
}
