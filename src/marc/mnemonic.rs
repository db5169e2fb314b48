//! Line oriented text rendering
//!
//! ```text
//! =LDR  00000nam a2200000 a 4500
//! =001  in00000000001
//! =245  10$aTitle$cWriter
//! ```
//!
//! Blank indicators are shown as `\`. Used by test fixtures, where a readable
//! diff matters more than a binary one.

use super::record::{MarcField, MarcRecord, BLANK};
use std::fmt::Write;

/// Render a record as mnemonic text, one field per line
pub fn to_mnemonic(record: &MarcRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=LDR  {}", record.leader);
    for field in &record.fields {
        match field {
            MarcField::Control(c) => {
                let _ = writeln!(out, "={}  {}", c.tag, c.value.replace(' ', "\\"));
            }
            MarcField::Data(d) => {
                let _ = write!(out, "={}  {}{}", d.tag, show(d.ind1), show(d.ind2));
                for s in &d.subfields {
                    let _ = write!(out, "${}{}", s.code, s.value);
                }
                out.push('\n');
            }
        }
    }
    out
}

fn show(indicator: char) -> char {
    if indicator == BLANK {
        '\\'
    } else {
        indicator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::record::DataField;

    #[test]
    fn test_render() {
        let mut record = MarcRecord::new();
        record.add_control_field("008", "200101s2020    xx");
        record.add_data_field(
            DataField::new("245", BLANK, '0')
                .with_subfield('a', "Title")
                .with_subfield('c', "Writer"),
        );
        let text = to_mnemonic(&record);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=LDR  00000nam a2200000 a 4500");
        assert_eq!(lines[1], "=008  200101s2020\\\\\\\\xx");
        assert_eq!(lines[2], "=245  \\0$aTitle$cWriter");
    }
}
