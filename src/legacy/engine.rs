//! Collaborator contracts
//!
//! The record-layer engine and the handshake driver are external to this
//! crate's core; `Session` consumes them through these traits.

use super::outcome::IoOutcome;
use std::fmt;

/// TLS alert description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlertDescription(u8);

impl AlertDescription {
    pub const CLOSE_NOTIFY: AlertDescription = AlertDescription(0);
    pub const UNEXPECTED_MESSAGE: AlertDescription = AlertDescription(10);
    pub const BAD_RECORD_MAC: AlertDescription = AlertDescription(20);
    pub const RECORD_OVERFLOW: AlertDescription = AlertDescription(22);
    pub const HANDSHAKE_FAILURE: AlertDescription = AlertDescription(40);
    pub const BAD_CERTIFICATE: AlertDescription = AlertDescription(42);
    pub const CERTIFICATE_EXPIRED: AlertDescription = AlertDescription(45);
    pub const CERTIFICATE_UNKNOWN: AlertDescription = AlertDescription(46);
    pub const ILLEGAL_PARAMETER: AlertDescription = AlertDescription(47);
    pub const UNKNOWN_CA: AlertDescription = AlertDescription(48);
    pub const DECODE_ERROR: AlertDescription = AlertDescription(50);
    pub const DECRYPT_ERROR: AlertDescription = AlertDescription(51);
    pub const PROTOCOL_VERSION: AlertDescription = AlertDescription(70);
    pub const INTERNAL_ERROR: AlertDescription = AlertDescription(80);
    pub const USER_CANCELED: AlertDescription = AlertDescription(90);
    pub const MISSING_EXTENSION: AlertDescription = AlertDescription(109);
    pub const UNRECOGNIZED_NAME: AlertDescription = AlertDescription(112);
    pub const NO_APPLICATION_PROTOCOL: AlertDescription = AlertDescription(120);

    const NAMED: [(AlertDescription, &'static str); 18] = [
        (Self::CLOSE_NOTIFY, "close_notify"),
        (Self::UNEXPECTED_MESSAGE, "unexpected_message"),
        (Self::BAD_RECORD_MAC, "bad_record_mac"),
        (Self::RECORD_OVERFLOW, "record_overflow"),
        (Self::HANDSHAKE_FAILURE, "handshake_failure"),
        (Self::BAD_CERTIFICATE, "bad_certificate"),
        (Self::CERTIFICATE_EXPIRED, "certificate_expired"),
        (Self::CERTIFICATE_UNKNOWN, "certificate_unknown"),
        (Self::ILLEGAL_PARAMETER, "illegal_parameter"),
        (Self::UNKNOWN_CA, "unknown_ca"),
        (Self::DECODE_ERROR, "decode_error"),
        (Self::DECRYPT_ERROR, "decrypt_error"),
        (Self::PROTOCOL_VERSION, "protocol_version"),
        (Self::INTERNAL_ERROR, "internal_error"),
        (Self::USER_CANCELED, "user_canceled"),
        (Self::MISSING_EXTENSION, "missing_extension"),
        (Self::UNRECOGNIZED_NAME, "unrecognized_name"),
        (Self::NO_APPLICATION_PROTOCOL, "no_application_protocol"),
    ];

    /// Create alert description from its wire value
    pub fn from_u8(code: u8) -> Self {
        AlertDescription(code)
    }

    /// Wire value
    pub fn as_u8(self) -> u8 {
        self.0
    }

    /// Look up a description by name, accepting `_` or space separators
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().replace(' ', "_").to_ascii_lowercase();
        Self::NAMED
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(alert, _)| *alert)
    }

    /// Get alert name, if it is a known one
    pub fn name(&self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(alert, _)| alert == self)
            .map(|(_, n)| *n)
    }

    /// close_notify and user_canceled are warnings, everything else is fatal
    pub fn is_fatal(&self) -> bool {
        *self != Self::CLOSE_NOTIFY && *self != Self::USER_CANCELED
    }
}

impl fmt::Display for AlertDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "alert({})", self.0),
        }
    }
}

/// Record-layer engine consumed by `Session`
///
/// Every call is non-blocking and reports progress as an `IoOutcome`.
pub trait RecordLayer {
    /// Consume up to `buf.len()` bytes of application data
    fn read_application_data(&mut self, buf: &mut [u8]) -> IoOutcome;

    /// Copy up to `buf.len()` bytes of application data without consuming it
    fn peek_application_data(&mut self, buf: &mut [u8]) -> IoOutcome;

    /// Accept up to `buf.len()` bytes of application data for sending
    fn write_application_data(&mut self, buf: &[u8]) -> IoOutcome;

    /// Flush buffered but unsent records
    fn send_pending_output(&mut self) -> IoOutcome;

    /// Queue and send an alert
    fn send_alert(&mut self, alert: AlertDescription) -> IoOutcome;

    /// Decrypted application data buffered inside the engine
    fn pending_application_data(&self) -> isize;

    /// Whether the peer's close-notify has been received
    fn close_notify_received(&mut self) -> bool;
}

/// Drives the handshake to completion
pub trait HandshakeDriver {
    /// Positive once the handshake is complete; zero or negative results
    /// (pending or failed) are returned to the legacy caller verbatim.
    fn drive_handshake(&mut self) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_names() {
        assert_eq!(AlertDescription::CLOSE_NOTIFY.name(), Some("close_notify"));
        assert_eq!(AlertDescription::from_u8(40), AlertDescription::HANDSHAKE_FAILURE);
        assert_eq!(AlertDescription::from_u8(200).name(), None);
        assert_eq!(AlertDescription::from_u8(200).to_string(), "alert(200)");
    }

    #[test]
    fn test_alert_from_name() {
        assert_eq!(
            AlertDescription::from_name("handshake failure"),
            Some(AlertDescription::HANDSHAKE_FAILURE)
        );
        assert_eq!(
            AlertDescription::from_name("Unknown_CA"),
            Some(AlertDescription::UNKNOWN_CA)
        );
        assert_eq!(AlertDescription::from_name("no such alert"), None);
    }

    #[test]
    fn test_alert_severity() {
        assert!(!AlertDescription::CLOSE_NOTIFY.is_fatal());
        assert!(!AlertDescription::USER_CANCELED.is_fatal());
        assert!(AlertDescription::DECODE_ERROR.is_fatal());
    }
}
