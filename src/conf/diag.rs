//! Configuration diagnostics.
//!
//! Three channels, matching what opers expect to see during a rehash:
//! `error` (the load/validate run is going to fail), `status` (warnings and
//! chatter) and `progress`. Before the daemon has fully booted everything
//! also goes to stderr so a broken config is visible without a log file;
//! afterwards lines go to the log and, if wired up, the opers notice channel.

use log::{error, info};

/// Receives every diagnostic line once the daemon is booted; the network
/// subsystem implements this to relay lines to online opers.
pub trait NoticeSink: Send + Sync {
    fn notice(&self, line: &str);
}

#[derive(Default)]
pub struct Diag {
    booted: bool,
    errors: Vec<String>,
    sink: Option<Box<dyn NoticeSink>>,
}

impl std::fmt::Debug for Diag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diag")
            .field("booted", &self.booted)
            .field("errors", &self.errors)
            .finish()
    }
}

impl Diag {
    pub fn new(booted: bool) -> Self {
        Diag {
            booted,
            errors: Vec::new(),
            sink: None,
        }
    }

    /// Flips the sink over from stderr to the log once boot completes.
    pub fn set_booted(&mut self, booted: bool) {
        self.booted = booted;
    }

    pub fn set_sink(&mut self, sink: Box<dyn NoticeSink>) {
        self.sink = Some(sink);
    }

    /// An error the configuration cannot be committed with.
    pub fn error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if !self.booted {
            eprintln!("[error] {msg}");
        }
        error!("config error: {msg}");
        if let Some(sink) = &self.sink {
            sink.notice(&format!("error: {msg}"));
        }
        self.errors.push(msg);
    }

    /// A warning or informational line; never fails a load.
    pub fn status(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if !self.booted {
            eprintln!("* {msg}");
        }
        info!("{msg}");
        if let Some(sink) = &self.sink {
            sink.notice(&msg);
        }
    }

    /// Progress chatter ("Loading config file ..").
    pub fn progress(&mut self, msg: impl Into<String>) {
        self.status(msg);
    }

    /// The `N errors encountered` summary line. Routed like an error but not
    /// counted as one.
    pub fn summary(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if !self.booted {
            eprintln!("[error] {msg}");
        }
        error!("config error: {msg}");
        if let Some(sink) = &self.sink {
            sink.notice(&format!("error: {msg}"));
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Every error line collected so far, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}
