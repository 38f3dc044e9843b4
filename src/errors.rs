use thiserror::Error;

/// Failures surfaced to callers.
///
/// Soft outcomes are not errors: a no-match from the match engine is `None`
/// and an unplaceable patch is a `false` entry in the applied results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A delta string did not follow the tab-separated `=N`/`-N`/`+text`
    /// grammar, or a count was negative or not a number.
    #[error("malformed delta token: {0:?}")]
    MalformedDelta(String),

    /// A delta consumed more or less of the source text than it has.
    #[error("delta does not span the source text")]
    DeltaSourceMismatch,

    /// A patch block did not follow the `@@ -s,l +s,l @@` header and
    /// `+`/`-`/` ` line format.
    #[error("malformed patch line: {0:?}")]
    MalformedPatch(String),

    /// The line-mode encoder ran out of token space: the inputs hold more
    /// distinct lines than the synthetic alphabet can index.
    #[error("too many distinct lines for line-mode tokens")]
    TokenSpaceExhausted,

    /// A match pattern exceeded the Bitap bit-width ceiling.
    #[error("match pattern longer than {0} characters")]
    PatternTooLong(usize),
}
