//! constants.rs
//! Wire-level constants and transfer defaults shared across layers.

/// Size units. Chunk sizes are configured in megabytes.
pub const KILOBYTE: usize = 1024;
pub const MEGABYTE: usize = 1024 * KILOBYTE;
pub const GIGABYTE: usize = 1024 * MEGABYTE;

/// Recommended chunk size (MB) for uploads and staging.
pub const REC_CHUNK_MB: usize = 1;
/// Upper bound for a configured chunk size (MB).
pub const MAX_CHUNK_MB: usize = 100;
/// Upper bound for a configured chunk size (bytes).
pub const MAX_CHUNK_SIZE: usize = MAX_CHUNK_MB * MEGABYTE;
/// Default chunk size (bytes).
pub const DEFAULT_CHUNK_SIZE: usize = REC_CHUNK_MB * MEGABYTE;

/// Maximum obfuscate/deobfuscate tasks in flight per transfer.
pub const MAX_WORKERS: usize = 5;
/// Maximum concurrent range fetches while staging a download.
pub const MAX_STAGING_REQ: usize = 8;
/// Hard cap accepted by config validation for either limit.
pub const MAX_CONCURRENCY_CAP: usize = 64;

/// Default range header name and unit prefix ("Range: bytes=0-1023").
pub const DEFAULT_RANGE_HEADER: &str = "Range";
pub const DEFAULT_RANGE_UNIT: &str = "bytes";

/// Environment overrides for logging.
pub const ENV_LOG_LEVEL: &str = "OBFS_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "OBFS_LOG_FORMAT";

/// Stable algorithm identifiers (u16), mirrored by `codec::Algorithm`.
pub mod algo_ids {
    pub const XOR: u16      = 0x0001;
    pub const BASE64: u16   = 0x0002;
    pub const AES: u16      = 0x0003;
    pub const BLOWFISH: u16 = 0x0004;
    pub const TWOFISH: u16  = 0x0005;
    pub const CHACHA20: u16 = 0x0006;
    pub const DEFLATE: u16  = 0x0007;
}

/// HKDF `info` prefix binding derived keys to this wire contract version.
pub const KDF_INFO_PREFIX: &str = "obfs/v1";
