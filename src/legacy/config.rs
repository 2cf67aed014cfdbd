//! Session configuration
//!
//! Both settings are also toggleable on a live `Session`.

/// Legacy session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionConfig {
    pub(crate) partial_write: bool,
    pub(crate) quiet_shutdown: bool,
}

impl SessionConfig {
    /// Legacy defaults: no partial writes, full close-notify exchange
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a write call to report fewer bytes than requested
    pub fn partial_write(mut self, enable: bool) -> Self {
        self.partial_write = enable;
        self
    }

    /// Skip the close-notify exchange on shutdown
    pub fn quiet_shutdown(mut self, enable: bool) -> Self {
        self.quiet_shutdown = enable;
        self
    }

    pub fn is_partial_write(&self) -> bool {
        self.partial_write
    }

    pub fn is_quiet_shutdown(&self) -> bool {
        self.quiet_shutdown
    }
}
