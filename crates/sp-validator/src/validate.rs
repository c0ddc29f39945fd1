use sha2::{Digest, Sha256};

use crate::{block::Block, header::Header};

/// Hex-encoded SHA-256 digest of a header's canonical serialisation.
pub fn hash(header: &Header) -> String {
    header.hash_hex()
}

/// True iff `hash(previous_hash ‖ decimal(proof))` begins with four hex zero
/// digits. The concatenation is over UTF-8 bytes; difficulty is fixed.
pub fn valid_proof(previous_hash: &str, proof: u64) -> bool {
    let preimage = format!("{previous_hash}{proof}");
    let digest = hex::encode(Sha256::digest(preimage.as_bytes()));
    digest.starts_with("0000")
}

/// True iff `block` correctly extends `previous_block`: contiguous index,
/// matching previous-hash linkage, and a satisfied proof-of-work predicate.
pub fn valid_block(block: &Block, previous_block: &Block) -> bool {
    valid_header_pair(&block.header, &previous_block.header)
}

/// Same check as [`valid_block`] but operating directly on headers, used by
/// both full-chain and header-only (SPV) validation.
pub fn valid_header_pair(header: &Header, previous_header: &Header) -> bool {
    header.index == previous_header.index + 1
        && header.previous_hash == hash(previous_header)
        && valid_proof(&header.previous_hash, header.proof)
}

/// True iff `chain` is non-empty, starts with the canonical genesis block,
/// and every adjacent pair satisfies [`valid_block`].
pub fn valid_chain(chain: &[Block]) -> bool {
    match chain.first() {
        None => false,
        Some(first) if *first != Block::genesis() => false,
        _ => chain.windows(2).all(|w| valid_block(&w[1], &w[0])),
    }
}

/// Header-only counterpart of [`valid_chain`], used by SPV nodes that never
/// hold full block bodies.
pub fn valid_headers(headers: &[Header]) -> bool {
    match headers.first() {
        None => false,
        Some(first) if *first != Header::genesis() => false,
        _ => headers.windows(2).all(|w| valid_header_pair(&w[1], &w[0])),
    }
}
