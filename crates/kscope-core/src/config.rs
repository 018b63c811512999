//! # Target Configuration
//!
//! ABI facts about the inspected target that the type index cannot learn
//! from debug information alone.
//!
//! ## Environment Variables
//!
//! - `KSCOPE_WORD_SIZE`: address width in bytes (`4` or `8`)
//! - `KSCOPE_BYTE_ORDER`: `little` or `big` (default: `little`)

use std::env;

use gimli::RunTimeEndian;

use crate::error::{KscopeError, KscopeResult};

/// Description of the target ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetConfig
{
    /// Address width in bytes; `None` until known
    pub word_size: Option<u8>,
    /// Byte order of target memory
    pub byte_order: RunTimeEndian,
}

impl Default for TargetConfig
{
    fn default() -> Self
    {
        Self {
            word_size: None,
            byte_order: RunTimeEndian::Little,
        }
    }
}

impl TargetConfig
{
    /// Configuration with no word size and little-endian byte order
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    #[must_use]
    pub fn with_word_size(mut self, word_size: u8) -> Self
    {
        self.word_size = Some(word_size);
        self
    }

    #[must_use]
    pub fn with_byte_order(mut self, byte_order: RunTimeEndian) -> Self
    {
        self.byte_order = byte_order;
        self
    }

    /// Read the configuration from `KSCOPE_WORD_SIZE` and `KSCOPE_BYTE_ORDER`.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if a variable is set to an unsupported value.
    pub fn from_env() -> KscopeResult<Self>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> KscopeResult<Self>
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("KSCOPE_WORD_SIZE") {
            let word_size = match raw.trim() {
                "4" => 4,
                "8" => 8,
                other => {
                    return Err(KscopeError::InvalidArgument(format!(
                        "KSCOPE_WORD_SIZE must be 4 or 8, got '{other}'"
                    )))
                }
            };
            config.word_size = Some(word_size);
        }

        if let Some(raw) = lookup("KSCOPE_BYTE_ORDER") {
            config.byte_order = match raw.trim().to_lowercase().as_str() {
                "little" | "le" => RunTimeEndian::Little,
                "big" | "be" => RunTimeEndian::Big,
                other => {
                    return Err(KscopeError::InvalidArgument(format!(
                        "KSCOPE_BYTE_ORDER must be 'little' or 'big', got '{other}'"
                    )))
                }
            };
        }

        Ok(config)
    }
}
