pub mod block;
pub mod header;
pub mod validate;

pub use block::Block;
pub use header::Header;
pub use validate::{hash, valid_block, valid_chain, valid_header_pair, valid_headers, valid_proof};
