/// Byte order used for `d`/`D` float payloads.
///
/// Integers are always big-endian. Floats were historically written in the
/// host's native order; both ends of one deployment must use the same setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatOrder {
    /// Host byte order, compatible with existing peers.
    #[default]
    Native,
    /// Network byte order, matching the integer encoding.
    BigEndian,
}

/// Default maximum container nesting accepted by the parser.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Parser and renderer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Byte order of float payloads. Default: native.
    pub float_order: FloatOrder,
    /// Maximum container nesting depth accepted by the parser.
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            float_order: FloatOrder::Native,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FloatOrder {
    pub(crate) fn f32_to_bytes(self, value: f32) -> [u8; 4] {
        match self {
            FloatOrder::Native => value.to_ne_bytes(),
            FloatOrder::BigEndian => value.to_be_bytes(),
        }
    }

    pub(crate) fn f64_to_bytes(self, value: f64) -> [u8; 8] {
        match self {
            FloatOrder::Native => value.to_ne_bytes(),
            FloatOrder::BigEndian => value.to_be_bytes(),
        }
    }

    pub(crate) fn f32_from_bytes(self, bytes: [u8; 4]) -> f32 {
        match self {
            FloatOrder::Native => f32::from_ne_bytes(bytes),
            FloatOrder::BigEndian => f32::from_be_bytes(bytes),
        }
    }

    pub(crate) fn f64_from_bytes(self, bytes: [u8; 8]) -> f64 {
        match self {
            FloatOrder::Native => f64::from_ne_bytes(bytes),
            FloatOrder::BigEndian => f64::from_be_bytes(bytes),
        }
    }
}
