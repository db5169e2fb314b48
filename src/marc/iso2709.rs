//! ISO 2709 encoding
//!
//! The writer lays out the leader, a directory of `tag + length(4) + offset(5)`
//! entries, then the field data. Lengths and offsets are in bytes. Leader
//! positions 0-4 (record length) and 12-16 (base address) are recomputed and
//! position 9 is set to `a` since output is always UTF-8.

use super::record::{is_control_tag, DataField, MarcField, MarcRecord, Subfield};
use crate::domain::MappingError;

const FIELD_TERMINATOR: u8 = 0x1E;
const SUBFIELD_DELIMITER: u8 = 0x1F;
const RECORD_TERMINATOR: u8 = 0x1D;
const LEADER_LEN: usize = 24;
const MAX_RECORD_LEN: usize = 99_999;
const MAX_FIELD_LEN: usize = 9_999;

/// Encode a record as ISO 2709 bytes
///
/// # Errors
///
/// Returns [`MappingError::Encoding`] when the leader is not 24 ASCII
/// characters, a tag is not 3 characters, a field exceeds 9999 bytes, or the
/// record exceeds 99999 bytes.
pub fn write_record(record: &MarcRecord) -> Result<Vec<u8>, MappingError> {
    if record.leader.len() != LEADER_LEN || !record.leader.is_ascii() {
        return Err(MappingError::Encoding(format!(
            "Leader must be {LEADER_LEN} ASCII characters, got '{}'",
            record.leader
        )));
    }

    let mut data_area = Vec::new();
    let mut directory = Vec::new();

    for field in &record.fields {
        let tag = field.tag();
        if tag.len() != 3 {
            return Err(MappingError::Encoding(format!("Invalid tag '{tag}'")));
        }
        let start = data_area.len();
        match field {
            MarcField::Control(c) => {
                data_area.extend_from_slice(c.value.as_bytes());
            }
            MarcField::Data(d) => {
                push_char(&mut data_area, d.ind1);
                push_char(&mut data_area, d.ind2);
                for subfield in &d.subfields {
                    data_area.push(SUBFIELD_DELIMITER);
                    push_char(&mut data_area, subfield.code);
                    data_area.extend_from_slice(subfield.value.as_bytes());
                }
            }
        }
        data_area.push(FIELD_TERMINATOR);
        let length = data_area.len() - start;
        if length > MAX_FIELD_LEN {
            return Err(MappingError::Encoding(format!(
                "Field {tag} is {length} bytes, the directory allows {MAX_FIELD_LEN}"
            )));
        }
        if start > MAX_RECORD_LEN {
            return Err(MappingError::Encoding(format!(
                "Field {tag} starts at offset {start}, past {MAX_RECORD_LEN}"
            )));
        }

        directory.extend_from_slice(tag.as_bytes());
        directory.extend_from_slice(format!("{length:04}").as_bytes());
        directory.extend_from_slice(format!("{start:05}").as_bytes());
    }
    directory.push(FIELD_TERMINATOR);

    let base_address = LEADER_LEN + directory.len();
    let record_length = base_address + data_area.len() + 1;
    if record_length > MAX_RECORD_LEN {
        return Err(MappingError::Encoding(format!(
            "Record length {record_length} exceeds {MAX_RECORD_LEN} bytes"
        )));
    }

    let mut leader = record.leader.as_bytes().to_vec();
    leader[0..5].copy_from_slice(format!("{record_length:05}").as_bytes());
    leader[9] = b'a';
    leader[12..17].copy_from_slice(format!("{base_address:05}").as_bytes());

    let mut out = Vec::with_capacity(record_length);
    out.extend_from_slice(&leader);
    out.extend_from_slice(&directory);
    out.extend_from_slice(&data_area);
    out.push(RECORD_TERMINATOR);
    Ok(out)
}

fn push_char(buf: &mut Vec<u8>, c: char) {
    let mut tmp = [0u8; 4];
    buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
}

/// Decode one ISO 2709 record
///
/// # Errors
///
/// Returns [`MappingError::InvalidMarc`] on a short buffer, a malformed
/// directory, or field data that is not UTF-8.
pub fn read_record(bytes: &[u8]) -> Result<MarcRecord, MappingError> {
    if bytes.len() < LEADER_LEN + 1 {
        return Err(MappingError::InvalidMarc("Record shorter than leader".to_string()));
    }
    if !bytes[..LEADER_LEN].is_ascii() {
        return Err(MappingError::InvalidMarc("Leader is not ASCII".to_string()));
    }
    let leader = String::from_utf8_lossy(&bytes[..LEADER_LEN]).into_owned();
    let base_address: usize = leader[12..17]
        .parse()
        .map_err(|_| MappingError::InvalidMarc(format!("Bad base address in '{leader}'")))?;
    if base_address > bytes.len() || base_address <= LEADER_LEN {
        return Err(MappingError::InvalidMarc(format!(
            "Base address {base_address} outside record"
        )));
    }

    let directory = &bytes[LEADER_LEN..base_address - 1];
    if directory.len() % 12 != 0 || !directory.is_ascii() {
        return Err(MappingError::InvalidMarc(
            "Directory is not ASCII entries of 12 bytes".to_string(),
        ));
    }

    let mut record = MarcRecord {
        leader,
        fields: Vec::new(),
    };
    for entry in directory.chunks(12) {
        let entry = std::str::from_utf8(entry)
            .map_err(|e| MappingError::InvalidMarc(format!("Directory is not ASCII: {e}")))?;
        let tag = &entry[0..3];
        let length: usize = entry[3..7]
            .parse()
            .map_err(|_| MappingError::InvalidMarc(format!("Bad field length in '{entry}'")))?;
        let offset: usize = entry[7..12]
            .parse()
            .map_err(|_| MappingError::InvalidMarc(format!("Bad field offset in '{entry}'")))?;
        let start = base_address + offset;
        let end = start + length;
        if end > bytes.len() || length == 0 {
            return Err(MappingError::InvalidMarc(format!(
                "Field {tag} runs past end of record"
            )));
        }
        // drop the field terminator
        let data = std::str::from_utf8(&bytes[start..end - 1])
            .map_err(|e| MappingError::InvalidMarc(format!("Field {tag} is not UTF-8: {e}")))?;

        if is_control_tag(tag) {
            record.add_control_field(tag, data);
        } else {
            record.add_data_field(parse_data_field(tag, data)?);
        }
    }
    Ok(record)
}

fn parse_data_field(tag: &str, data: &str) -> Result<DataField, MappingError> {
    let mut parts = data.split('\u{1F}');
    let indicators: Vec<char> = parts.next().unwrap_or_default().chars().collect();
    if indicators.len() != 2 {
        return Err(MappingError::InvalidMarc(format!(
            "Field {tag} has {} indicator characters",
            indicators.len()
        )));
    }
    let mut field = DataField::new(tag, indicators[0], indicators[1]);
    for part in parts {
        let mut chars = part.chars();
        if let Some(code) = chars.next() {
            field.subfields.push(Subfield::new(code, chars.as_str()));
        }
    }
    Ok(field)
}
