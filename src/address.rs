use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

// "%I00033" -> ("%I", "00033"); anything after the digits is ignored
static ADDRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(%[A-Za-z]+)([0-9]+)").unwrap());

/// an I/O address reduced to a comparable key, e.g. ("%IW", 12)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NormalizedAddress {
    pub(crate) prefix: String,
    pub(crate) number: u64,
}

impl NormalizedAddress {
    pub(crate) fn new(prefix: &str, number: u64) -> Self {
        Self {
            prefix: prefix.to_ascii_uppercase(),
            number,
        }
    }
}

impl Display for NormalizedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.prefix, self.number)
    }
}

/// Convert a textual address like "%I00033" or "%i33" into its normalized form.
///
/// Zero padding and the case of the prefix letters do not matter, so both examples
/// produce ("%I", 33). Returns None for anything that is not a located address.
pub(crate) fn normalize_address(address: &str) -> Option<NormalizedAddress> {
    if !address.starts_with('%') {
        return None;
    }
    let captures = ADDRESS_REGEX.captures(address)?;
    // a digit string that overflows u64 can't correspond to any real offset
    let number = captures[2].parse::<u64>().ok()?;

    Some(NormalizedAddress::new(&captures[1], number))
}

/// check if a base address token is a plain state RAM offset
pub(crate) fn is_numeric_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}
