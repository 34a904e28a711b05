//! Output channel isolation for the fetch engine
//!
//! The MCP transport owns stdout. The fetch engine gets a [`DiagnosticWriter`]
//! for its progress text instead of the process streams, and a [`QuietGuard`]
//! silences every such writer for as long as it is alive.
//!
//! Suppression is reference counted: overlapping guards from interleaved
//! requests keep the channel quiet until the last one is dropped. Guards never
//! touch the underlying target, so once the last guard is gone the channel is
//! exactly what it was before.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Where diagnostic output goes when it is not suppressed
#[derive(Debug, Clone)]
pub enum DiagnosticTarget {
    /// The process's standard error stream
    Stderr,
    /// Drop everything
    Discard,
    /// An in-memory buffer
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl DiagnosticTarget {
    /// Whether two targets write to the same place
    pub fn same_as(&self, other: &DiagnosticTarget) -> bool {
        match (self, other) {
            (DiagnosticTarget::Stderr, DiagnosticTarget::Stderr) => true,
            (DiagnosticTarget::Discard, DiagnosticTarget::Discard) => true,
            (DiagnosticTarget::Buffer(a), DiagnosticTarget::Buffer(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Shared diagnostic channel with a suppression count
#[derive(Debug, Clone)]
pub struct OutputChannels {
    target: DiagnosticTarget,
    suppressed: Arc<AtomicUsize>,
}

impl OutputChannels {
    /// Create channels writing to the given target
    pub fn new(target: DiagnosticTarget) -> Self {
        Self {
            target,
            suppressed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Channels writing to stderr, never stdout
    pub fn stderr() -> Self {
        Self::new(DiagnosticTarget::Stderr)
    }

    /// Channels writing to a fresh in-memory buffer, returned alongside
    pub fn capture() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        (Self::new(DiagnosticTarget::Buffer(buffer.clone())), buffer)
    }

    /// The current target
    pub fn target(&self) -> &DiagnosticTarget {
        &self.target
    }

    /// Silence all writers until the returned guard is dropped
    pub fn suppress(&self) -> QuietGuard {
        self.suppressed.fetch_add(1, Ordering::SeqCst);
        QuietGuard {
            suppressed: self.suppressed.clone(),
        }
    }

    /// Whether at least one guard is alive
    pub fn is_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::SeqCst) > 0
    }

    /// Number of live guards
    pub fn depth(&self) -> usize {
        self.suppressed.load(Ordering::SeqCst)
    }

    /// A writer for the fetch engine's diagnostic output
    pub fn writer(&self) -> DiagnosticWriter {
        DiagnosticWriter {
            channels: self.clone(),
        }
    }
}

impl Default for OutputChannels {
    fn default() -> Self {
        Self::stderr()
    }
}

/// Keeps the diagnostic channel silent while alive
#[must_use = "output is only suppressed while the guard is held"]
#[derive(Debug)]
pub struct QuietGuard {
    suppressed: Arc<AtomicUsize>,
}

impl Drop for QuietGuard {
    fn drop(&mut self) {
        self.suppressed.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `io::Write` handed to the fetch engine
#[derive(Debug, Clone)]
pub struct DiagnosticWriter {
    channels: OutputChannels,
}

impl Write for DiagnosticWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.channels.is_suppressed() {
            return Ok(buf.len());
        }
        match &self.channels.target {
            DiagnosticTarget::Stderr => io::stderr().write(buf),
            DiagnosticTarget::Discard => Ok(buf.len()),
            DiagnosticTarget::Buffer(buffer) => {
                let mut buffer = buffer
                    .lock()
                    .map_err(|_| io::Error::other("diagnostic buffer poisoned"))?;
                buffer.extend_from_slice(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.channels.target {
            DiagnosticTarget::Stderr => io::stderr().flush(),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8(buffer.lock().unwrap().clone()).unwrap()
    }

    #[test]
    fn test_writes_pass_through_without_guard() {
        let (channels, buffer) = OutputChannels::capture();
        let mut writer = channels.writer();
        writeln!(writer, "hello").unwrap();
        assert_eq!(contents(&buffer), "hello\n");
    }

    #[test]
    fn test_guard_discards_and_restores() {
        let (channels, buffer) = OutputChannels::capture();
        let before = channels.target().clone();
        let mut writer = channels.writer();

        {
            let _quiet = channels.suppress();
            writeln!(writer, "noise").unwrap();
            assert!(channels.is_suppressed());
        }

        assert!(!channels.is_suppressed());
        assert!(channels.target().same_as(&before));
        writeln!(writer, "after").unwrap();
        assert_eq!(contents(&buffer), "after\n");
    }

    #[test]
    fn test_guard_restores_on_error_path() {
        let (channels, buffer) = OutputChannels::capture();

        fn failing(channels: &OutputChannels) -> Result<(), String> {
            let _quiet = channels.suppress();
            writeln!(channels.writer(), "noise").map_err(|e| e.to_string())?;
            Err("engine failed".to_string())
        }

        assert!(failing(&channels).is_err());
        assert_eq!(channels.depth(), 0);
        writeln!(channels.writer(), "visible").unwrap();
        assert_eq!(contents(&buffer), "visible\n");
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let (channels, buffer) = OutputChannels::capture();
        let inner = channels.clone();

        let result = std::panic::catch_unwind(move || {
            let _quiet = inner.suppress();
            panic!("engine panicked");
        });

        assert!(result.is_err());
        assert!(!channels.is_suppressed());
        writeln!(channels.writer(), "visible").unwrap();
        assert_eq!(contents(&buffer), "visible\n");
    }

    #[test]
    fn test_overlapping_guards_keep_suppression() {
        let (channels, buffer) = OutputChannels::capture();
        let mut writer = channels.writer();

        let first = channels.suppress();
        let second = channels.suppress();
        drop(first);

        // The second window is still open
        writeln!(writer, "still quiet").unwrap();
        assert_eq!(channels.depth(), 1);

        drop(second);
        writeln!(writer, "loud").unwrap();
        assert_eq!(contents(&buffer), "loud\n");
    }

    #[test]
    fn test_guard_held_across_await() {
        let (channels, buffer) = OutputChannels::capture();
        tokio_test::block_on(async {
            let _quiet = channels.suppress();
            tokio::task::yield_now().await;
            writeln!(channels.writer(), "noise").unwrap();
        });
        assert!(contents(&buffer).is_empty());
        assert!(!channels.is_suppressed());
    }

    #[test]
    fn test_same_as() {
        let (a, _) = OutputChannels::capture();
        let (b, _) = OutputChannels::capture();
        assert!(a.target().same_as(&a.clone().target().clone()));
        assert!(!a.target().same_as(b.target()));
        assert!(DiagnosticTarget::Stderr.same_as(&DiagnosticTarget::Stderr));
        assert!(!DiagnosticTarget::Stderr.same_as(&DiagnosticTarget::Discard));
    }
}
