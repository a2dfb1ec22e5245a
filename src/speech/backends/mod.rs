//! Wire protocols, one per synthesizer style

pub mod accent;
pub mod bns;
pub mod dectalk;
pub mod doubletalk;
pub mod generic;

/// ASCII digits for a level or marker number
pub(crate) fn digits(n: u32) -> Vec<u8> {
    n.to_string().into_bytes()
}
