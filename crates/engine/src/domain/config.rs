/// Centralized defaults for the engine.
/// All opinionated defaults should be defined here for consistency.
pub struct EngineDefaults;

impl EngineDefaults {
    // Trust defaults
    pub const ANCHOR_CERTIFICATES_ONLY: bool = false; // System anchors are consulted unless restricted
    pub const MAX_CHAIN_LENGTH: usize = 16; // Longer chains are reported as Invalid

    // Decode defaults
    pub const MAX_ARCHIVE_SIZE: usize = 16 * 1024 * 1024; // 16 MB
    pub const MAX_KDF_ITERATIONS: u32 = 10_000_000;
    pub const MAX_BAGS: usize = 4096;
    pub const MAX_NESTING_DEPTH: usize = 8; // safeContentsBag recursion

    // Anchor store defaults
    pub const SYSTEM_ANCHOR_SOURCE: &'static str = "system";
}

/// Configurable per-call limits to bound the work a hostile archive can cause.
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    /// Max size of the encoded archive.
    pub max_archive_size: usize,
    /// Max iteration count accepted for any KDF (MAC, PBE, PBKDF2).
    pub max_kdf_iterations: u32,
    /// Max number of safe bags across the whole archive.
    pub max_bags: usize,
    /// Max depth of nested safeContentsBag structures.
    pub max_nesting_depth: usize,
}

impl DecodeLimits {
    /// Opinionated production defaults.
    pub fn defaults() -> Self {
        Self {
            max_archive_size: EngineDefaults::MAX_ARCHIVE_SIZE,
            max_kdf_iterations: EngineDefaults::MAX_KDF_ITERATIONS,
            max_bags: EngineDefaults::MAX_BAGS,
            max_nesting_depth: EngineDefaults::MAX_NESTING_DEPTH,
        }
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::defaults()
    }
}
