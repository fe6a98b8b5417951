use regex::Regex;

/// Minimal shape check for email addresses: `<non-space>+@<non-space>+.<non-space>+`.
///
/// Deliverability is the mail transport's problem; this only rejects obviously malformed input.
pub fn is_valid_email(s: &str) -> bool {
    let re = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
    re.is_match(s)
}
