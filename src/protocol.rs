//! Line protocol spoken to the remote dashboard. The dashboard frames on
//! `\n`, so every message ends with exactly one.

use core::fmt::Write;

use heapless::String;

use crate::crypto::DataBlock;

pub const DATA_PREFIX: &str = "DATA: ";

pub const ALERT_LINE: &str = "SECURITY ALERT: SANDBOX COMPROMISED\n";

/// `"DATA: " + 16 * "XX " + "\n"`
pub const DATA_LINE_LEN: usize = DATA_PREFIX.len() + 16 * 3 + 1;

pub type DataLine = String<64>;

/// Each byte as two uppercase hex digits followed by a space, e.g.
/// `DATA: 3C 46 B9 ... 75 \n`.
pub fn data_line(block: &DataBlock) -> DataLine {
    let mut line = DataLine::new();
    // Capacity covers DATA_LINE_LEN; writes cannot fail.
    let _ = line.push_str(DATA_PREFIX);
    for byte in block {
        let _ = write!(line, "{byte:02X} ");
    }
    let _ = line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_line_format() {
        let mut block = [0u8; 16];
        block[0] = 0x3C;
        block[1] = 0x0a;
        block[15] = 0xFF;
        let line = data_line(&block);
        assert_eq!(
            line.as_str(),
            "DATA: 3C 0A 00 00 00 00 00 00 00 00 00 00 00 00 00 FF \n"
        );
        assert_eq!(line.len(), DATA_LINE_LEN);
    }

    #[test]
    fn alert_is_a_single_line() {
        assert_eq!(ALERT_LINE.matches('\n').count(), 1);
        assert!(ALERT_LINE.ends_with('\n'));
    }
}
