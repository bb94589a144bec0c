//! GHOSTDAG: selected parent, mergeset colouring, blue score and blue work.

pub mod protocol;

pub use protocol::GhostdagProtocol;
