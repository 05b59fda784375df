//! Error types for color-management operations.

use thiserror::Error;

/// Result type alias using [`ColorError`].
pub type ColorResult<T> = std::result::Result<T, ColorError>;

/// Errors that can occur while building color-management objects.
///
/// Most color lookups degrade to identity fallbacks instead of
/// erroring (see the crate docs); this enum covers the construction
/// paths where the caller has to know something went wrong.
#[derive(Debug, Error)]
pub enum ColorError {
    /// A conversion matrix could not be inverted.
    #[error("conversion matrix for '{space}' is singular")]
    SingularMatrix {
        /// Name of the space the matrix was meant for
        space: String,
    },

    /// A profile hue/sat table had the wrong length for its declared
    /// divisions.
    #[error("hue/sat table length {got} does not match {hue}x{sat}x{val} divisions (expected {expected})")]
    TableSizeMismatch {
        /// Declared hue divisions
        hue: u32,
        /// Declared saturation divisions
        sat: u32,
        /// Declared value divisions
        val: u32,
        /// Expected flat length (`hue * sat * val * 3`)
        expected: usize,
        /// Actual flat length
        got: usize,
    },

    /// Two maps passed to weighted interpolation disagree on division
    /// counts.
    #[error("hue/sat maps have mismatched divisions: {a_hue}x{a_sat}x{a_val} vs {b_hue}x{b_sat}x{b_val}")]
    DivisionMismatch {
        /// First map hue divisions
        a_hue: u32,
        /// First map saturation divisions
        a_sat: u32,
        /// First map value divisions
        a_val: u32,
        /// Second map hue divisions
        b_hue: u32,
        /// Second map saturation divisions
        b_sat: u32,
        /// Second map value divisions
        b_val: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = ColorError::SingularMatrix {
            space: "TestRGB".into(),
        };
        assert!(err.to_string().contains("TestRGB"));

        let err = ColorError::TableSizeMismatch {
            hue: 6,
            sat: 6,
            val: 1,
            expected: 108,
            got: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("108"));
        assert!(msg.contains("100"));
    }
}
