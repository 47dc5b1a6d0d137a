//! Decode and encode options.

use std::error::Error;
use std::fmt;

/// What the decoder does with a closed enum's undeclared value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UnknownEnumPolicy {
    /// Keep the value as an unknown varint field so it survives a
    /// re-encode.
    #[default]
    PreserveAsUnknown,
    /// Fail with [`DecodeError::UnknownEnumValue`](crate::DecodeError::UnknownEnumValue).
    Reject,
}

/// Invalid option values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionsError {
    /// What is wrong.
    pub reason: String,
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid options: {}", self.reason)
    }
}

impl Error for OptionsError {}

/// Decoder configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum sub-message and group nesting. Default: 100.
    pub max_depth: u32,
    /// Point string and bytes fields into the input instead of copying.
    /// Only honoured by [`Decoder::decode_shared`](crate::Decoder::decode_shared),
    /// which can keep the input alive. Default: false.
    pub alias: bool,
    /// Fail with `MissingRequired` when a required field is absent
    /// anywhere in the decoded tree. Default: false.
    pub check_required: bool,
    /// Reject string fields that are not UTF-8. Default: true.
    pub validate_utf8: bool,
    /// Closed-enum handling. Default: preserve as unknown.
    pub unknown_enum: UnknownEnumPolicy,
    /// Drop unknown fields instead of retaining them. Default: false.
    pub discard_unknown: bool,
}

impl DecodeOptions {
    /// Default nesting limit.
    pub const DEFAULT_MAX_DEPTH: u32 = 100;

    /// Set the nesting limit.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enable or disable aliasing.
    pub fn with_alias(mut self, alias: bool) -> Self {
        self.alias = alias;
        self
    }

    /// Enable or disable required-field checking.
    pub fn with_check_required(mut self, check: bool) -> Self {
        self.check_required = check;
        self
    }

    /// Enable or disable UTF-8 validation.
    pub fn with_validate_utf8(mut self, validate: bool) -> Self {
        self.validate_utf8 = validate;
        self
    }

    /// Set the closed-enum policy.
    pub fn with_unknown_enum(mut self, policy: UnknownEnumPolicy) -> Self {
        self.unknown_enum = policy;
        self
    }

    /// Enable or disable dropping of unknown fields.
    pub fn with_discard_unknown(mut self, discard: bool) -> Self {
        self.discard_unknown = discard;
        self
    }

    /// Check option consistency.
    ///
    /// # Errors
    ///
    /// A zero `max_depth` would reject every sub-message.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_depth == 0 {
            return Err(OptionsError {
                reason: "max_depth must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            alias: false,
            check_required: false,
            validate_utf8: true,
            unknown_enum: UnknownEnumPolicy::default(),
            discard_unknown: false,
        }
    }
}

/// Encoder configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Sort extensions by number and interleave retained unknown fields
    /// with known fields by number, so equal messages produce equal
    /// bytes. Default: false.
    pub deterministic: bool,
    /// Leave retained unknown fields out of the output. Default: false.
    pub skip_unknown: bool,
    /// Omit implicit-presence singular fields holding their default
    /// value. When false, such scalars, strings and bytes are written
    /// even when zero or empty. Default: true.
    pub skip_defaults: bool,
    /// Fail with `MissingRequired` when a required field is absent.
    /// Default: false.
    pub check_required: bool,
    /// Maximum nesting, guarding against cycles built by hand. Default: 100.
    pub max_depth: u32,
}

impl EncodeOptions {
    /// Default nesting limit.
    pub const DEFAULT_MAX_DEPTH: u32 = 100;

    /// Deterministic output.
    pub fn deterministic() -> Self {
        Self {
            deterministic: true,
            ..Self::default()
        }
    }

    /// Enable or disable deterministic output.
    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Enable or disable omission of unknown fields.
    pub fn with_skip_unknown(mut self, skip: bool) -> Self {
        self.skip_unknown = skip;
        self
    }

    /// Enable or disable omission of default-valued implicit fields.
    pub fn with_skip_defaults(mut self, skip: bool) -> Self {
        self.skip_defaults = skip;
        self
    }

    /// Enable or disable required-field checking.
    pub fn with_check_required(mut self, check: bool) -> Self {
        self.check_required = check;
        self
    }

    /// Set the nesting limit.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Check option consistency.
    ///
    /// # Errors
    ///
    /// A zero `max_depth` would reject every sub-message.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_depth == 0 {
            return Err(OptionsError {
                reason: "max_depth must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            deterministic: false,
            skip_unknown: false,
            skip_defaults: true,
            check_required: false,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_defaults() {
        let o = DecodeOptions::default();
        assert_eq!(o.max_depth, 100);
        assert!(o.validate_utf8);
        assert!(!o.alias);
        assert_eq!(o.unknown_enum, UnknownEnumPolicy::PreserveAsUnknown);
        assert!(o.validate().is_ok());
    }

    #[test]
    fn zero_depth_invalid() {
        assert!(DecodeOptions::default().with_max_depth(0).validate().is_err());
        assert!(EncodeOptions::default().with_max_depth(0).validate().is_err());
    }

    #[test]
    fn builders_chain() {
        let o = DecodeOptions::default()
            .with_alias(true)
            .with_discard_unknown(true)
            .with_unknown_enum(UnknownEnumPolicy::Reject);
        assert!(o.alias && o.discard_unknown);
        assert!(EncodeOptions::deterministic().deterministic);
        assert!(EncodeOptions::default().skip_defaults);
        assert!(!EncodeOptions::default().with_skip_defaults(false).skip_defaults);
    }
}
