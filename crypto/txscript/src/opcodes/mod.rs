//! Opcode values, classification and script parsing.

use jio_txscript_errors::TxScriptError;

macro_rules! opcodes {
    ($($name:ident = $value:literal),* $(,)?) => {
        $(pub const $name: u8 = $value;)*

        fn named_opcode(value: u8) -> Option<&'static str> {
            match value {
                $($value => Some(stringify!($name)),)*
                _ => None,
            }
        }
    };
}

opcodes! {
    OP_0 = 0x00,
    OP_PUSHDATA1 = 0x4c,
    OP_PUSHDATA2 = 0x4d,
    OP_PUSHDATA4 = 0x4e,
    OP_1NEGATE = 0x4f,
    OP_RESERVED = 0x50,
    OP_1 = 0x51,
    OP_2 = 0x52,
    OP_3 = 0x53,
    OP_4 = 0x54,
    OP_5 = 0x55,
    OP_6 = 0x56,
    OP_7 = 0x57,
    OP_8 = 0x58,
    OP_9 = 0x59,
    OP_10 = 0x5a,
    OP_11 = 0x5b,
    OP_12 = 0x5c,
    OP_13 = 0x5d,
    OP_14 = 0x5e,
    OP_15 = 0x5f,
    OP_16 = 0x60,

    OP_NOP = 0x61,
    OP_VER = 0x62,
    OP_IF = 0x63,
    OP_NOTIF = 0x64,
    OP_VERIF = 0x65,
    OP_VERNOTIF = 0x66,
    OP_ELSE = 0x67,
    OP_ENDIF = 0x68,
    OP_VERIFY = 0x69,
    OP_RETURN = 0x6a,

    OP_TOALTSTACK = 0x6b,
    OP_FROMALTSTACK = 0x6c,
    OP_2DROP = 0x6d,
    OP_2DUP = 0x6e,
    OP_3DUP = 0x6f,
    OP_2OVER = 0x70,
    OP_2ROT = 0x71,
    OP_2SWAP = 0x72,
    OP_IFDUP = 0x73,
    OP_DEPTH = 0x74,
    OP_DROP = 0x75,
    OP_DUP = 0x76,
    OP_NIP = 0x77,
    OP_OVER = 0x78,
    OP_PICK = 0x79,
    OP_ROLL = 0x7a,
    OP_ROT = 0x7b,
    OP_SWAP = 0x7c,
    OP_TUCK = 0x7d,

    OP_CAT = 0x7e,
    OP_SUBSTR = 0x7f,
    OP_LEFT = 0x80,
    OP_RIGHT = 0x81,
    OP_SIZE = 0x82,

    OP_INVERT = 0x83,
    OP_AND = 0x84,
    OP_OR = 0x85,
    OP_XOR = 0x86,
    OP_EQUAL = 0x87,
    OP_EQUALVERIFY = 0x88,
    OP_RESERVED1 = 0x89,
    OP_RESERVED2 = 0x8a,

    OP_1ADD = 0x8b,
    OP_1SUB = 0x8c,
    OP_2MUL = 0x8d,
    OP_2DIV = 0x8e,
    OP_NEGATE = 0x8f,
    OP_ABS = 0x90,
    OP_NOT = 0x91,
    OP_0NOTEQUAL = 0x92,
    OP_ADD = 0x93,
    OP_SUB = 0x94,
    OP_MUL = 0x95,
    OP_DIV = 0x96,
    OP_MOD = 0x97,
    OP_LSHIFT = 0x98,
    OP_RSHIFT = 0x99,
    OP_BOOLAND = 0x9a,
    OP_BOOLOR = 0x9b,
    OP_NUMEQUAL = 0x9c,
    OP_NUMEQUALVERIFY = 0x9d,
    OP_NUMNOTEQUAL = 0x9e,
    OP_LESSTHAN = 0x9f,
    OP_GREATERTHAN = 0xa0,
    OP_LESSTHANOREQUAL = 0xa1,
    OP_GREATERTHANOREQUAL = 0xa2,
    OP_MIN = 0xa3,
    OP_MAX = 0xa4,
    OP_WITHIN = 0xa5,

    OP_SHA256 = 0xa8,
    OP_CHECKMULTISIGECDSA = 0xa9,
    OP_BLAKE2B = 0xaa,
    OP_CHECKSIGECDSA = 0xab,
    OP_CHECKSIG = 0xac,
    OP_CHECKSIGVERIFY = 0xad,
    OP_CHECKMULTISIG = 0xae,
    OP_CHECKMULTISIGVERIFY = 0xaf,
    OP_CHECKLOCKTIMEVERIFY = 0xb0,
    OP_CHECKSEQUENCEVERIFY = 0xb1,
}

pub const OP_FALSE: u8 = OP_0;
pub const OP_TRUE: u8 = OP_1;
pub const OP_DATA_1: u8 = 0x01;
pub const OP_DATA_32: u8 = 0x20;
pub const OP_DATA_33: u8 = 0x21;
pub const OP_DATA_65: u8 = 0x41;
pub const OP_DATA_75: u8 = 0x4b;

pub fn opcode_name(value: u8) -> String {
    match value {
        OP_DATA_1..=OP_DATA_75 => format!("OP_DATA_{value}"),
        _ => named_opcode(value).map(str::to_string).unwrap_or_else(|| format!("OP_UNKNOWN{value}")),
    }
}

/// Opcodes that fail the script wherever they appear, executed or not
pub fn is_disabled(value: u8) -> bool {
    matches!(
        value,
        OP_CAT
            | OP_SUBSTR
            | OP_LEFT
            | OP_RIGHT
            | OP_INVERT
            | OP_AND
            | OP_OR
            | OP_XOR
            | OP_2MUL
            | OP_2DIV
            | OP_MUL
            | OP_DIV
            | OP_MOD
            | OP_LSHIFT
            | OP_RSHIFT
    )
}

/// Reserved opcodes that fail even inside an unexecuted branch
pub fn is_always_illegal(value: u8) -> bool {
    matches!(value, OP_VERIF | OP_VERNOTIF)
}

pub fn is_conditional(value: u8) -> bool {
    matches!(value, OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF)
}

pub fn is_push(value: u8) -> bool {
    value <= OP_16
}

/// Opcode with its pushed data, if any
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedOpcode {
    pub value: u8,
    pub data: Vec<u8>,
}

impl ParsedOpcode {
    pub fn name(&self) -> String {
        opcode_name(self.value)
    }

    pub fn is_push(&self) -> bool {
        is_push(self.value)
    }

    /// Enforces the shortest possible encoding for the pushed data
    pub fn check_minimal_data_push(&self) -> Result<(), TxScriptError> {
        let data_len = self.data.len();
        let expected = match data_len {
            0 => OP_0,
            1 if (1..=16).contains(&self.data[0]) => OP_1 + self.data[0] - 1,
            1 if self.data[0] == 0x81 => OP_1NEGATE,
            2..=75 | 1 => data_len as u8,
            76..=255 => OP_PUSHDATA1,
            256..=65535 => OP_PUSHDATA2,
            _ => OP_PUSHDATA4,
        };
        if self.value != expected {
            return Err(TxScriptError::MinimalData(format!(
                "{} bytes pushed with {} instead of {}",
                data_len,
                opcode_name(self.value),
                opcode_name(expected)
            )));
        }
        Ok(())
    }
}

/// Parses a full script. Any truncated push fails the whole script.
pub fn parse_script(script: &[u8]) -> Result<Vec<ParsedOpcode>, TxScriptError> {
    let mut opcodes = Vec::new();
    let mut pos = 0;
    while pos < script.len() {
        let value = script[pos];
        pos += 1;
        let data_len = match value {
            OP_DATA_1..=OP_DATA_75 => value as usize,
            OP_PUSHDATA1 => read_len(script, &mut pos, 1)?,
            OP_PUSHDATA2 => read_len(script, &mut pos, 2)?,
            OP_PUSHDATA4 => read_len(script, &mut pos, 4)?,
            _ => 0,
        };
        let available = script.len() - pos;
        if data_len > available {
            return Err(TxScriptError::MalformedPush(data_len, available));
        }
        opcodes.push(ParsedOpcode { value, data: script[pos..pos + data_len].to_vec() });
        pos += data_len;
    }
    Ok(opcodes)
}

fn read_len(script: &[u8], pos: &mut usize, width: usize) -> Result<usize, TxScriptError> {
    let available = script.len() - *pos;
    if available < width {
        return Err(TxScriptError::MalformedPush(width, available));
    }
    let mut bytes = [0u8; 4];
    bytes[..width].copy_from_slice(&script[*pos..*pos + width]);
    *pos += width;
    Ok(u32::from_le_bytes(bytes) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_push_forms() {
        let mut script = vec![OP_0, 0x02, 0xaa, 0xbb, OP_PUSHDATA1, 0x01, 0xcc, OP_PUSHDATA2, 0x01, 0x00, 0xdd, OP_CHECKSIG];
        script.extend_from_slice(&[OP_PUSHDATA4, 0x01, 0x00, 0x00, 0x00, 0xee]);
        let ops = parse_script(&script).unwrap();
        let data: Vec<_> = ops.iter().map(|op| op.data.clone()).collect();
        assert_eq!(data, vec![vec![], vec![0xaa, 0xbb], vec![0xcc], vec![0xdd], vec![], vec![0xee]]);
        assert_eq!(ops[4].value, OP_CHECKSIG);
    }

    #[test]
    fn truncated_push_is_malformed() {
        assert_eq!(parse_script(&[0x03, 0x01]), Err(TxScriptError::MalformedPush(3, 1)));
        assert_eq!(parse_script(&[OP_PUSHDATA2, 0x01]), Err(TxScriptError::MalformedPush(2, 1)));
    }

    #[test]
    fn minimal_push_rules() {
        let op = |value: u8, data: Vec<u8>| ParsedOpcode { value, data };
        assert!(op(OP_0, vec![]).check_minimal_data_push().is_ok());
        assert!(op(OP_5, vec![5]).check_minimal_data_push().is_ok());
        assert!(op(0x01, vec![5]).check_minimal_data_push().is_err());
        assert!(op(0x01, vec![0x81]).check_minimal_data_push().is_err());
        assert!(op(0x01, vec![0x42]).check_minimal_data_push().is_ok());
        assert!(op(OP_PUSHDATA1, vec![0; 10]).check_minimal_data_push().is_err());
        assert!(op(OP_PUSHDATA1, vec![0; 80]).check_minimal_data_push().is_ok());
    }

    #[test]
    fn names() {
        assert_eq!(opcode_name(OP_CHECKSIG), "OP_CHECKSIG");
        assert_eq!(opcode_name(0x20), "OP_DATA_32");
        assert_eq!(opcode_name(0xfe), "OP_UNKNOWN254");
    }
}
