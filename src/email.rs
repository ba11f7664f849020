use once_cell::sync::Lazy;
use rand::seq::IndexedRandom;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9a-z._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,64}$")
        .expect("email pattern is a valid regex")
});

/// Heuristic email address recognition.
pub struct Email;

impl Email {
    /// Known-valid addresses for demos and randomized tests.
    pub const SAMPLES: [&'static str; 6] = [
        "alice@example.com",
        "bob.smith@example.org",
        "carol+newsletter@mail.example.net",
        "dave_99@sub.domain.io",
        "eve%ops@example.co.uk",
        "FRANK@EXAMPLE.COM",
    ];

    pub fn is_valid(candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        EMAIL_PATTERN.is_match(candidate)
    }

    pub fn random_sample() -> &'static str {
        Self::SAMPLES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(Self::SAMPLES[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_are_valid() {
        for sample in Email::SAMPLES {
            assert!(Email::is_valid(sample), "{sample} should be valid");
        }
        assert!(Email::is_valid(Email::random_sample()));
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(!Email::is_valid(""));
        assert!(!Email::is_valid("alice.example.com"));
        assert!(!Email::is_valid("alice@example"));
        assert!(!Email::is_valid("alice@example.c"));
        assert!(!Email::is_valid("@example.com"));
        assert!(!Email::is_valid("alice smith@example.com"));
    }

    #[test]
    fn test_whole_string_match() {
        assert!(!Email::is_valid("mailto:alice@example.com"));
        assert!(!Email::is_valid("alice@example.com/path"));
        assert!(!Email::is_valid("see alice@example.com"));
    }
}
