//! Passcode gate guarding the session.

use crate::{error::Result, Error};
use std::fmt;
use std::str::FromStr;

/// A four-digit passcode.
#[derive(Clone, PartialEq, Eq)]
pub struct Passcode(String);

impl Passcode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Passcode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Passcode(s.to_string()))
        } else {
            Err(Error::MalformedPasscode)
        }
    }
}

// Keeps the code out of logs.
impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passcode(****)")
    }
}

/// Compares user input against the configured passcode.
///
/// No lockout: every failed attempt can simply be retried.
#[derive(Debug, Clone)]
pub struct PasscodeGate {
    passcode: Passcode,
    failed_attempts: u32,
}

impl PasscodeGate {
    pub fn new(passcode: Passcode) -> Self {
        Self {
            passcode,
            failed_attempts: 0,
        }
    }

    /// Check an attempt. Surrounding whitespace is ignored.
    pub fn check(&mut self, input: &str) -> bool {
        let ok = input.trim() == self.passcode.as_str();
        if ok {
            tracing::info!("Passcode accepted");
        } else {
            self.failed_attempts = self.failed_attempts.saturating_add(1);
            tracing::debug!(attempts = self.failed_attempts, "Passcode rejected");
        }
        ok
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passcode_must_be_four_digits() {
        assert!("1234".parse::<Passcode>().is_ok());
        assert_eq!("123".parse::<Passcode>(), Err(Error::MalformedPasscode));
        assert_eq!("12345".parse::<Passcode>(), Err(Error::MalformedPasscode));
        assert_eq!("12a4".parse::<Passcode>(), Err(Error::MalformedPasscode));
        assert_eq!("١٢٣٤".parse::<Passcode>(), Err(Error::MalformedPasscode));
    }

    #[test]
    fn check_allows_unlimited_retries() {
        let mut gate = PasscodeGate::new("2580".parse().unwrap());
        for _ in 0..10 {
            assert!(!gate.check("0000"));
        }
        assert_eq!(gate.failed_attempts(), 10);
        assert!(gate.check(" 2580\n"));
    }

    #[test]
    fn debug_hides_code() {
        let passcode: Passcode = "2580".parse().unwrap();
        assert!(!format!("{passcode:?}").contains("2580"));
    }
}
