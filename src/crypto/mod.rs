//! Cryptographic utilities: canonical JSON hashing and chain hash computation.

mod hash;

pub use hash::{
    canonicalize_json, compute_event_hash, content_digest, payload_hash, sha256, EventHashParams,
    DOMAIN_EVENT,
};
