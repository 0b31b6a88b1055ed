//! Script engine contract
//!
//! The orchestrator treats script evaluation as an opaque capability:
//! run script text against two append-only output sinks, produce a result
//! value or a failure description, and honour an out-of-band interrupt.
//!
//! Implementations live outside this crate (see `scriptor-lua`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Terminal result of a single engine run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Script finished; carries its final value rendered as text
    Success(String),
    /// Script raised an error
    Failure { message: String, stack_trace: String },
    /// Run was cut short by [`InterruptHandle::interrupt`]
    Aborted,
}

/// Capability to evaluate one script
///
/// `run` is synchronous and may block for the whole script execution, so
/// callers are expected to invoke it from a dedicated blocking worker.
/// Output must be written to the sinks as it is produced, not at the end.
pub trait ScriptEngine: Send + Sync + 'static {
    fn run(
        &self,
        script: &str,
        stdout: OutputBuffer,
        stderr: OutputBuffer,
        interrupt: InterruptHandle,
    ) -> Outcome;
}

/// Append-only byte sink readable at any time
///
/// Clones share the same underlying buffer. Every snapshot is a prefix of
/// every later snapshot.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, bytes: &[u8]) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(bytes);
    }

    /// Everything written so far, decoded as lossy UTF-8
    ///
    /// A multi-byte character still being written is held back until its
    /// last byte arrives, so this is safe to call while the writer runs.
    pub fn snapshot(&self) -> String {
        let buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(complete_prefix(&buffer)).into_owned()
    }

    /// Everything written, with an unfinished trailing character replaced
    ///
    /// Meant for when the writer is done; extends every earlier [`snapshot`](Self::snapshot).
    pub fn snapshot_lossy(&self) -> String {
        let buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Longest prefix of `bytes` that does not end inside a UTF-8 sequence
///
/// Invalid bytes stay in the prefix; only a truncated tail is cut.
fn complete_prefix(bytes: &[u8]) -> &[u8] {
    let mut start = 0;
    loop {
        match std::str::from_utf8(&bytes[start..]) {
            Ok(_) => return bytes,
            Err(e) => match e.error_len() {
                Some(len) => start += e.valid_up_to() + len,
                None => return &bytes[..start + e.valid_up_to()],
            },
        }
    }
}

/// Shared flag used to ask a running engine to abort
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request interruption. Calling it more than once has no extra effect.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_output_buffer_accumulates() {
        let buffer = OutputBuffer::new();
        assert!(buffer.is_empty());

        buffer.append(b"Hello, ");
        let first = buffer.snapshot();
        buffer.append(b"World!\n");
        let second = buffer.snapshot();

        assert_eq!(first, "Hello, ");
        assert_eq!(second, "Hello, World!\n");
        assert!(second.starts_with(&first));
        assert_eq!(buffer.len(), 14);
    }

    #[test]
    fn test_output_buffer_clones_share_state() {
        let buffer = OutputBuffer::new();
        let writer = buffer.clone();

        let handle = thread::spawn(move || {
            for _ in 0..100 {
                writer.append(b"x");
            }
        });
        handle.join().unwrap();

        assert_eq!(buffer.snapshot(), "x".repeat(100));
    }

    #[test]
    fn test_output_buffer_lossy_utf8() {
        let buffer = OutputBuffer::new();
        buffer.append(&[b'o', b'k', 0xff]);
        assert_eq!(buffer.snapshot(), "ok\u{fffd}");
    }

    #[test]
    fn test_output_buffer_holds_back_split_character() {
        let buffer = OutputBuffer::new();
        let e_acute = "é".as_bytes();

        buffer.append(b"x");
        buffer.append(&e_acute[..1]);
        let first = buffer.snapshot();
        buffer.append(&e_acute[1..]);
        let second = buffer.snapshot();

        assert_eq!(first, "x");
        assert_eq!(second, "xé");
        assert!(second.starts_with(&first));
    }

    #[test]
    fn test_output_buffer_invalid_byte_before_split_character() {
        let buffer = OutputBuffer::new();
        buffer.append(&[b'a', 0xff, 0xe2, 0x82]);
        assert_eq!(buffer.snapshot(), "a\u{fffd}");
        assert_eq!(buffer.snapshot_lossy(), "a\u{fffd}\u{fffd}");

        buffer.append(&[0xac]);
        assert_eq!(buffer.snapshot(), "a\u{fffd}€");
    }

    #[test]
    fn test_snapshot_lossy_keeps_truncated_tail() {
        let buffer = OutputBuffer::new();
        buffer.append(b"x");
        buffer.append(&"é".as_bytes()[..1]);

        let lossy = buffer.snapshot_lossy();
        assert_eq!(lossy, "x\u{fffd}");
        assert!(lossy.starts_with(&buffer.snapshot()));
    }

    #[test]
    fn test_interrupt_handle() {
        let handle = InterruptHandle::new();
        let observer = handle.clone();
        assert!(!observer.is_interrupted());

        handle.interrupt();
        handle.interrupt();
        assert!(observer.is_interrupted());
    }
}
