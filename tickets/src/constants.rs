//! Ticket system constants.

/// Bytes of entropy in a generated token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Longest scanner text accepted as a legacy bare token.
pub const MAX_BARE_TOKEN_LEN: usize = 256;

/// Largest QR module scale the encoder will draw, in pixels per module.
pub const MAX_QR_MODULE_SCALE: u32 = 32;

/// Prefix of the data URI wrapping a rendered artifact.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Store operation names, used in errors, logs and metric labels.
pub mod operations {
    /// Inserting a newly issued ticket.
    pub const INSERT: &str = "insert";

    /// Looking a ticket up by token.
    pub const FIND: &str = "find";

    /// The conditional `issued → redeemed` update.
    pub const COMPARE_AND_SET: &str = "compare_and_set";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length_in_hex() {
        assert_eq!(TOKEN_BYTES * 2, 64);
    }
}
