//! The handshake's 64-bit reserved word. Bit semantics are delegated to an
//! external extension registry; this type only knows how to get/set bits
//! and names the handful of reserved bits in common circulation.

/// Negotiated-extensions bitfield carried in the handshake's reserved word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u64);

impl Capabilities {
    /// BEP 5 (DHT): bit 0 of the last reserved byte.
    pub const DHT: u8 = 0;
    /// BEP 6 (Fast Extension): bit 2 of the last reserved byte.
    pub const FAST_EXTENSION: u8 = 2;
    /// BEP 10 (Extension Protocol): bit 4 of the fifth reserved byte
    /// (overall bit 20, counting from the least significant bit of the
    /// big-endian-encoded 8-byte word).
    pub const EXTENSION_PROTOCOL: u8 = 20;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn has(self, bit: u8) -> bool {
        debug_assert!(bit < 64);
        self.0 & (1 << bit) != 0
    }

    #[must_use]
    pub fn set(self, bit: u8) -> Self {
        debug_assert!(bit < 64);
        Self(self.0 | (1 << bit))
    }

    #[must_use]
    pub fn clear(self, bit: u8) -> Self {
        debug_assert!(bit < 64);
        Self(self.0 & !(1 << bit))
    }

    pub fn supports_fast_extension(self) -> bool {
        self.has(Self::FAST_EXTENSION)
    }

    pub fn supports_dht(self) -> bool {
        self.has(Self::DHT)
    }

    pub fn supports_extension_protocol(self) -> bool {
        self.has(Self::EXTENSION_PROTOCOL)
    }
}

impl From<u64> for Capabilities {
    fn from(bits: u64) -> Self {
        Self::from_bits(bits)
    }
}

impl From<Capabilities> for u64 {
    fn from(caps: Capabilities) -> Self {
        caps.bits()
    }
}
