/// How the end of a quoted string is recognised.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum QuoteScan {
    /// A `"` closes the string unless the character right before it is a
    /// backslash. A string whose content ends in an escaped backslash
    /// (`"a\\"`) is therefore not closed by its final quote.
    #[default]
    PrecedingChar,
    /// Escape sequences are consumed as a unit, so `"a\\"` closes normally.
    EscapeAware,
}

/// Handling of the `OK\n` acknowledgement that may open the stream.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Preamble {
    #[default]
    DiscardAck,
    Keep,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ParseLimits {
    /// Upper bound on the characters of any single field; `None` is unbounded.
    pub max_token_chars: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ParserConfig {
    pub limits: ParseLimits,
    pub quote_scan: QuoteScan,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ConvertConfig {
    pub parser: ParserConfig,
    pub preamble: Preamble,
}
