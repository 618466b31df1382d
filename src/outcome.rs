//! The five-valued status algebra every internal reader and walker function
//! threads through the AVIF box walk.
//!
//! `Outcome<T>` stands in for `Result` here on purpose: `Truncated` and
//! `Invalid` are both "not `Found`", but they must never be folded into one
//! another before reaching the public API (spec: truncation is retryable,
//! invalidity is terminal). A plain two-armed `Result<T, E>` invites exactly
//! that mistake, so the full five-way split is spelled out instead.

/// Outcome of a single read, search, or semantic check inside the walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome<T> {
    /// The requested bytes were readable and the semantic check passed.
    Found(T),
    /// Bytes were readable and parsed cleanly, but the thing we looked for
    /// is not present in the region we searched.
    NotFound,
    /// The request lies within the declared file size but beyond the bytes
    /// currently available. Retryable: more data may resolve it.
    Truncated,
    /// The request lies beyond the declared file size, or content violates
    /// the format. Terminal.
    Invalid,
    /// A parser self-limit was hit (box-count budget, size overflow).
    Aborted,
}

impl<T> Outcome<T> {
    /// Re-type a non-`Found` outcome to any `U`, for early-return propagation
    /// across functions whose `Found` payloads differ.
    ///
    /// # Panics
    /// Panics if called on `Found`; callers must match that arm themselves.
    pub(crate) fn erase<U>(self) -> Outcome<U> {
        match self {
            Outcome::Found(_) => unreachable!("erase() called on Outcome::Found"),
            Outcome::NotFound => Outcome::NotFound,
            Outcome::Truncated => Outcome::Truncated,
            Outcome::Invalid => Outcome::Invalid,
            Outcome::Aborted => Outcome::Aborted,
        }
    }

    pub(crate) fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Found(v) => Outcome::Found(f(v)),
            other => other.erase(),
        }
    }

    pub(crate) fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }
}

/// Propagate anything that isn't `Found` out of the enclosing function,
/// otherwise bind the found value. The ordinary-pattern-matching equivalent
/// of `?`, kept as a macro only to avoid repeating the five-armed match at
/// every call site; control flow itself stays in plain `match`/`return`.
macro_rules! found_or_return {
    ($outcome:expr) => {
        match $outcome {
            $crate::outcome::Outcome::Found(v) => v,
            other => return other.erase(),
        }
    };
}

pub(crate) use found_or_return;
