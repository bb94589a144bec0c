use jio_txscript_errors::TxScriptError;

pub type Stack = Vec<Vec<u8>>;

/// Default byte length of numeric operands
pub const DEFAULT_SCRIPT_NUM_LEN: usize = 4;

/// Byte length of lock time operands
pub const LOCK_TIME_SCRIPT_NUM_LEN: usize = 8;

/// Minimal little-endian sign-magnitude encoding
pub fn serialize_i64(value: i64) -> Vec<u8> {
    if value == 0 {
        return vec![];
    }
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut out = Vec::with_capacity(9);
    while magnitude > 0 {
        out.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }
    // the most significant bit carries the sign, so it needs its own byte when taken
    let last = out.len() - 1;
    if out[last] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        out[last] |= 0x80;
    }
    out
}

pub fn deserialize_i64(bytes: &[u8], max_len: usize) -> Result<i64, TxScriptError> {
    if bytes.len() > max_len {
        return Err(TxScriptError::NumberTooBig(format!("numeric value encoded as {:02x?} is {} bytes which exceeds the max allowed of {}", bytes, bytes.len(), max_len)));
    }
    check_minimal_number(bytes)?;
    let Some((&last, _)) = bytes.split_last() else {
        return Ok(0);
    };
    let mut magnitude: u64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        let byte = if i == bytes.len() - 1 { byte & 0x7f } else { *byte };
        magnitude |= (byte as u64) << (8 * i);
    }
    let magnitude = magnitude as i64;
    Ok(if last & 0x80 != 0 { -magnitude } else { magnitude })
}

fn check_minimal_number(bytes: &[u8]) -> Result<(), TxScriptError> {
    let Some((&last, rest)) = bytes.split_last() else {
        return Ok(());
    };
    // a zero last byte (ignoring the sign) is only needed when the previous byte uses its top bit
    if last & 0x7f == 0 && rest.last().map_or(true, |b| b & 0x80 == 0) {
        return Err(TxScriptError::MinimalData(format!("numeric value encoded as {bytes:02x?} is not minimally encoded")));
    }
    Ok(())
}

/// Any non-zero byte is true, except a lone sign bit (negative zero)
pub fn as_bool(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        None => false,
        Some((&last, rest)) => rest.iter().any(|b| *b != 0) || (last != 0 && last != 0x80),
    }
}

pub fn bool_bytes(value: bool) -> Vec<u8> {
    if value {
        vec![1]
    } else {
        vec![]
    }
}

pub trait DataStack {
    /// Fails unless at least `n` items are present
    fn require(&self, n: usize) -> Result<(), TxScriptError>;
    fn pop_item(&mut self) -> Result<Vec<u8>, TxScriptError>;
    fn pop_items<const N: usize>(&mut self) -> Result<[Vec<u8>; N], TxScriptError>;
    fn peek_item(&self, depth: usize) -> Result<&Vec<u8>, TxScriptError>;
    fn pop_num(&mut self) -> Result<i64, TxScriptError>;
    fn pop_nums<const N: usize>(&mut self) -> Result<[i64; N], TxScriptError>;
    fn peek_num(&self, max_len: usize) -> Result<i64, TxScriptError>;
    fn pop_bool(&mut self) -> Result<bool, TxScriptError>;
    fn push_num(&mut self, value: i64);
    fn push_bool(&mut self, value: bool);
}

impl DataStack for Stack {
    fn require(&self, n: usize) -> Result<(), TxScriptError> {
        if self.len() < n {
            return Err(TxScriptError::InvalidStackOperation(n, self.len()));
        }
        Ok(())
    }

    fn pop_item(&mut self) -> Result<Vec<u8>, TxScriptError> {
        self.pop().ok_or(TxScriptError::InvalidStackOperation(1, 0))
    }

    /// Items come back in stack order: the last one was the top
    fn pop_items<const N: usize>(&mut self) -> Result<[Vec<u8>; N], TxScriptError> {
        self.require(N)?;
        let split = self.len() - N;
        let items: Vec<Vec<u8>> = self.drain(split..).collect();
        items.try_into().map_err(|_| TxScriptError::Internal("stack drain size mismatch".into()))
    }

    fn peek_item(&self, depth: usize) -> Result<&Vec<u8>, TxScriptError> {
        self.require(depth + 1)?;
        Ok(&self[self.len() - 1 - depth])
    }

    fn pop_num(&mut self) -> Result<i64, TxScriptError> {
        let item = self.pop_item()?;
        deserialize_i64(&item, DEFAULT_SCRIPT_NUM_LEN)
    }

    fn pop_nums<const N: usize>(&mut self) -> Result<[i64; N], TxScriptError> {
        let items = self.pop_items::<N>()?;
        let mut nums = [0i64; N];
        for (num, item) in nums.iter_mut().zip(items.iter()) {
            *num = deserialize_i64(item, DEFAULT_SCRIPT_NUM_LEN)?;
        }
        Ok(nums)
    }

    fn peek_num(&self, max_len: usize) -> Result<i64, TxScriptError> {
        deserialize_i64(self.peek_item(0)?, max_len)
    }

    fn pop_bool(&mut self) -> Result<bool, TxScriptError> {
        Ok(as_bool(&self.pop_item()?))
    }

    fn push_num(&mut self, value: i64) {
        self.push(serialize_i64(value));
    }

    fn push_bool(&mut self, value: bool) {
        self.push(bool_bytes(value));
    }
}
