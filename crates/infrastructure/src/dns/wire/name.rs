//! Domain name encoding (RFC 1035 §3.1, §4.1.4)
//!
//! Names are a sequence of length-prefixed labels terminated by a zero byte.
//! A label length byte with the top two bits set (`0xC0`) is instead the first
//! half of a 14-bit pointer to an earlier occurrence of the remaining suffix.

use ferrous_resolver_domain::domain_name::{MAX_ENCODED_LEN, MAX_LABEL_LEN};
use ferrous_resolver_domain::DomainError;
use std::collections::{HashMap, HashSet};

pub const POINTER_TAG: u8 = 0xC0;

/// Largest offset a compression pointer can address.
pub const MAX_POINTER_OFFSET: usize = 0x3FFF;

/// Lowercased suffix -> offset where that suffix was written.
pub type CompressionTable = HashMap<String, u16>;

/// Encodes `name` as a standalone label sequence, without compression.
pub fn encode_name(name: &str) -> Result<Vec<u8>, DomainError> {
    let mut buf = Vec::with_capacity(name.len() + 2);
    write_name(&mut buf, name, None)?;
    Ok(buf)
}

/// Appends `name` to `buf`.
///
/// With a compression table, the longest suffix already present in the table
/// is replaced by a pointer, and every suffix written here is recorded for
/// later names. Offsets are positions in `buf`, so `buf` must hold the whole
/// message from its first header byte.
pub fn write_name(
    buf: &mut Vec<u8>,
    name: &str,
    mut table: Option<&mut CompressionTable>,
) -> Result<(), DomainError> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    let labels: Vec<&str> = if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('.').collect()
    };

    let mut encoded_len = 1;
    for label in &labels {
        if label.is_empty() {
            return Err(DomainError::EncodingError(format!(
                "empty label in '{}'",
                name
            )));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DomainError::EncodingError(format!(
                "label '{}' is {} bytes (max {})",
                label,
                label.len(),
                MAX_LABEL_LEN
            )));
        }
        encoded_len += label.len() + 1;
    }
    if encoded_len > MAX_ENCODED_LEN {
        return Err(DomainError::EncodingError(format!(
            "name '{}' encodes to {} bytes (max {})",
            name, encoded_len, MAX_ENCODED_LEN
        )));
    }

    for i in 0..labels.len() {
        if let Some(table) = table.as_deref_mut() {
            let suffix = labels[i..].join(".").to_ascii_lowercase();
            if let Some(&offset) = table.get(&suffix) {
                let pointer = 0xC000 | offset;
                buf.extend_from_slice(&pointer.to_be_bytes());
                return Ok(());
            }
            if buf.len() <= MAX_POINTER_OFFSET {
                table.insert(suffix, buf.len() as u16);
            }
        }

        let label = labels[i];
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }

    buf.push(0);
    Ok(())
}

/// Reads the name starting at `offset`.
///
/// Returns the dotted name (empty for the root) and the offset just past the
/// name as it appears at `offset`: after the terminating zero byte, or two
/// bytes past the first pointer when the name is compressed.
pub fn decode_name(buf: &[u8], offset: usize) -> Result<(String, usize), DomainError> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = offset;
    let mut resume_at: Option<usize> = None;
    let mut visited: HashSet<usize> = HashSet::new();
    let mut encoded_len = 1;

    loop {
        let len = *buf.get(pos).ok_or_else(|| {
            DomainError::MalformedMessage(format!(
                "name at offset {} runs past end of message ({} bytes)",
                offset,
                buf.len()
            ))
        })?;

        match len & POINTER_TAG {
            POINTER_TAG => {
                let low = *buf.get(pos + 1).ok_or_else(|| {
                    DomainError::MalformedMessage(format!("truncated pointer at offset {}", pos))
                })?;
                let target = (((len & !POINTER_TAG) as usize) << 8) | low as usize;

                if target >= buf.len() {
                    return Err(DomainError::MalformedMessage(format!(
                        "pointer at offset {} targets {} beyond message length {}",
                        pos,
                        target,
                        buf.len()
                    )));
                }
                if !visited.insert(target) {
                    return Err(DomainError::MalformedMessage(format!(
                        "compression loop: offset {} visited twice",
                        target
                    )));
                }

                if resume_at.is_none() {
                    resume_at = Some(pos + 2);
                }
                pos = target;
            }
            0x00 => {
                if len == 0 {
                    pos += 1;
                    break;
                }

                let start = pos + 1;
                let end = start + len as usize;
                if end > buf.len() {
                    return Err(DomainError::MalformedMessage(format!(
                        "label at offset {} overruns message",
                        pos
                    )));
                }

                encoded_len += len as usize + 1;
                if encoded_len > MAX_ENCODED_LEN {
                    return Err(DomainError::MalformedMessage(format!(
                        "name at offset {} exceeds {} bytes",
                        offset, MAX_ENCODED_LEN
                    )));
                }

                labels.push(String::from_utf8_lossy(&buf[start..end]).into_owned());
                pos = end;
            }
            other => {
                return Err(DomainError::MalformedMessage(format!(
                    "unsupported label type 0x{:02X} at offset {}",
                    other, pos
                )));
            }
        }
    }

    Ok((labels.join("."), resume_at.unwrap_or(pos)))
}
