pub mod hex {
    /// Hex rendering for byte containers, used by `Debug` impls of scripts and payloads
    pub trait ToHex {
        fn to_hex(&self) -> String;
    }

    impl<T: AsRef<[u8]> + ?Sized> ToHex for T {
        fn to_hex(&self) -> String {
            hex::encode(self.as_ref())
        }
    }

    /// Parses hex, returning `None` on odd length or bad digits
    pub fn from_hex(s: &str) -> Option<Vec<u8>> {
        hex::decode(s).ok()
    }
}

pub use serde_bytes;
