use crate::data_stack::serialize_i64;
use crate::opcodes::{OP_0, OP_1, OP_1NEGATE, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4};

/// Builds scripts with canonical (minimal) pushes
#[derive(Default, Clone, Debug)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.script)
    }

    pub fn add_op(&mut self, opcode: u8) -> &mut Self {
        self.script.push(opcode);
        self
    }

    pub fn add_ops(&mut self, opcodes: &[u8]) -> &mut Self {
        self.script.extend_from_slice(opcodes);
        self
    }

    /// Pushes `data` using the shortest encoding the engine accepts as minimal
    pub fn add_data(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        match len {
            0 => {
                self.script.push(OP_0);
                return self;
            }
            1 if (1..=16).contains(&data[0]) => {
                self.script.push(OP_1 + data[0] - 1);
                return self;
            }
            1 if data[0] == 0x81 => {
                self.script.push(OP_1NEGATE);
                return self;
            }
            1..=75 => self.script.push(len as u8),
            76..=255 => {
                self.script.push(OP_PUSHDATA1);
                self.script.push(len as u8);
            }
            256..=65535 => {
                self.script.push(OP_PUSHDATA2);
                self.script.extend_from_slice(&(len as u16).to_le_bytes());
            }
            _ => {
                self.script.push(OP_PUSHDATA4);
                self.script.extend_from_slice(&(len as u32).to_le_bytes());
            }
        }
        self.script.extend_from_slice(data);
        self
    }

    pub fn add_i64(&mut self, value: i64) -> &mut Self {
        match value {
            0 => self.add_op(OP_0),
            -1 => self.add_op(OP_1NEGATE),
            1..=16 => self.add_op(OP_1 + value as u8 - 1),
            _ => self.add_data(&serialize_i64(value)),
        }
    }

    pub fn add_lock_time(&mut self, lock_time: u64) -> &mut Self {
        self.add_i64(lock_time as i64)
    }
}
