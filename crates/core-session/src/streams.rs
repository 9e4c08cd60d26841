//! Stdout/stderr capture routing.
//!
//! Producers write through a [`CaptureHandle`] (any thread; the channel
//! serializes lines), the render thread drains with
//! [`StreamRouter::pump_all`] and dispatches each line as a payload to
//! every event whose form binds the matching system slot. Empty lines are
//! dropped. Dropping the router closes the channel, detaching all
//! handles.

use std::io::{self, Write};

use crossbeam_channel::{Receiver, Sender, unbounded};
use core_screen::{BindKind, DataRef, SlotStore, SysRef};
use tracing::debug;

use crate::build::BuiltScreen;
use crate::dispatch::{DispatchPayload, dispatch_event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone)]
pub struct SysLine {
    pub stream: SysStream,
    pub line: String,
}

const MAX_LINE_BYTES: usize = 4096;

/// Line-splitting writer attached to one system stream. Carriage returns
/// are dropped; an overlong line is flushed early.
pub struct CaptureHandle {
    stream: SysStream,
    tx: Sender<SysLine>,
    partial: String,
}

impl CaptureHandle {
    fn emit(&mut self) {
        if self.partial.is_empty() {
            return; // empty lines are dropped
        }
        let line = std::mem::take(&mut self.partial);
        let _ = self.tx.send(SysLine {
            stream: self.stream,
            line,
        });
    }

    /// Convenience for call sites that produce whole lines.
    pub fn write_line(&mut self, line: &str) {
        for c in line.chars() {
            self.push_char(c);
        }
        self.emit();
    }

    fn push_char(&mut self, c: char) {
        if self.partial.len() > MAX_LINE_BYTES {
            self.emit();
        }
        match c {
            '\n' => self.emit(),
            '\r' => {}
            other => self.partial.push(other),
        }
    }
}

impl Write for CaptureHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for c in String::from_utf8_lossy(buf).chars() {
            self.push_char(c);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit();
        Ok(())
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.emit();
    }
}

/// One router serves all built screens; events subscribe by binding
/// `.sys.stdout` / `.sys.stderr`.
pub struct StreamRouter {
    tx: Sender<SysLine>,
    rx: Receiver<SysLine>,
    stdout_events: Vec<String>,
    stderr_events: Vec<String>,
}

impl StreamRouter {
    /// Discover the union of system-stream events across screens and
    /// attach once.
    pub fn attach_for_many(builts: &[&BuiltScreen]) -> StreamRouter {
        let (tx, rx) = unbounded();
        let mut stdout_events: Vec<String> = Vec::new();
        let mut stderr_events: Vec<String> = Vec::new();

        let mut add_unique = |list: &mut Vec<String>, name: &str| {
            if !list.iter().any(|n| n == name) {
                list.push(name.to_string());
            }
        };

        for built in builts {
            for event in built.events_by_name.values() {
                for binding in &event.bindings {
                    if binding.bind_kind != BindKind::Str {
                        continue;
                    }
                    match binding.data_ref {
                        DataRef::System(SysRef::Stdout) => {
                            add_unique(&mut stdout_events, &event.name);
                        }
                        DataRef::System(SysRef::Stderr) => {
                            add_unique(&mut stderr_events, &event.name);
                        }
                        _ => {}
                    }
                }
            }
        }

        debug!(
            target: "session.streams",
            stdout_events = stdout_events.len(),
            stderr_events = stderr_events.len(),
            "stream router attached"
        );
        StreamRouter {
            tx,
            rx,
            stdout_events,
            stderr_events,
        }
    }

    pub fn has_subscribers(&self, stream: SysStream) -> bool {
        match stream {
            SysStream::Stdout => !self.stdout_events.is_empty(),
            SysStream::Stderr => !self.stderr_events.is_empty(),
        }
    }

    /// A writer for one stream; clone-free, create as many as needed.
    pub fn capture(&self, stream: SysStream) -> CaptureHandle {
        CaptureHandle {
            stream,
            tx: self.tx.clone(),
            partial: String::new(),
        }
    }

    /// Drain captured lines and dispatch into every built screen whose
    /// event map contains a subscribed event. Returns true if anything
    /// was dispatched (the caller should re-render).
    pub fn pump_all(&self, builts: &mut [BuiltScreen], store: &mut dyn SlotStore) -> bool {
        let mut changed = false;
        for item in self.rx.try_iter().collect::<Vec<_>>() {
            let payload = DispatchPayload::text(item.line);
            let targets = match item.stream {
                SysStream::Stdout => &self.stdout_events,
                SysStream::Stderr => &self.stderr_events,
            };
            for event_name in targets {
                for built in builts.iter_mut() {
                    if built.root.is_none() {
                        continue;
                    }
                    if !built.events_by_name.contains_key(event_name) {
                        continue;
                    }
                    let _ = dispatch_event(built, event_name, store, Some(&payload));
                    changed = true;
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::tests::built_screen;
    use core_screen::FixedSlotStore;
    use core_widget::WidgetPayload;

    fn buffer_lines(built: &BuiltScreen) -> Vec<String> {
        let id = built.figures_for_event["log_update"][0].clone();
        let obj = built.figure_object_by_id[&id].clone();
        let node = obj.borrow();
        let WidgetPayload::Buffer(bb) = &node.payload else {
            panic!("buffer payload")
        };
        bb.lines.iter().map(|l| l.text.clone()).collect()
    }

    #[test]
    fn stdout_lines_route_to_buffer_in_emission_order() {
        let mut store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        let router = StreamRouter::attach_for_many(&[&built]);
        assert!(router.has_subscribers(SysStream::Stdout));
        assert!(!router.has_subscribers(SysStream::Stderr));

        let mut out = router.capture(SysStream::Stdout);
        out.write_all(b"hello\nworld\n").unwrap();

        let mut builts = vec![std::mem::take(&mut built)];
        assert!(router.pump_all(&mut builts, &mut store));
        assert_eq!(buffer_lines(&builts[0]), vec!["hello", "world"]);
    }

    #[test]
    fn empty_lines_are_dropped() {
        let mut store = FixedSlotStore::new();
        let built = built_screen(&store);
        let router = StreamRouter::attach_for_many(&[&built]);
        let mut out = router.capture(SysStream::Stdout);
        out.write_all(b"\n\na\n\r\n").unwrap();

        let mut builts = vec![built];
        router.pump_all(&mut builts, &mut store);
        assert_eq!(buffer_lines(&builts[0]), vec!["a"]);
    }

    #[test]
    fn partial_line_flushes_on_drop() {
        let mut store = FixedSlotStore::new();
        let built = built_screen(&store);
        let router = StreamRouter::attach_for_many(&[&built]);
        {
            let mut out = router.capture(SysStream::Stdout);
            out.write_all(b"no newline").unwrap();
        }
        let mut builts = vec![built];
        assert!(router.pump_all(&mut builts, &mut store));
        assert_eq!(buffer_lines(&builts[0]), vec!["no newline"]);
    }

    #[test]
    fn unsubscribed_stream_routes_nowhere() {
        let mut store = FixedSlotStore::new();
        let built = built_screen(&store);
        let router = StreamRouter::attach_for_many(&[&built]);
        let mut err = router.capture(SysStream::Stderr);
        err.write_line("lost");
        let mut builts = vec![built];
        assert!(!router.pump_all(&mut builts, &mut store));
    }

    #[test]
    fn exact_count_roundtrip() {
        let mut store = FixedSlotStore::new();
        let built = built_screen(&store);
        let router = StreamRouter::attach_for_many(&[&built]);
        let mut out = router.capture(SysStream::Stdout);
        const N: usize = 25;
        for i in 0..N {
            out.write_line(&format!("line {i}"));
        }
        let mut builts = vec![built];
        router.pump_all(&mut builts, &mut store);
        let lines = buffer_lines(&builts[0]);
        assert_eq!(lines.len(), N);
        assert_eq!(lines[0], "line 0");
        assert_eq!(lines[N - 1], "line 24");
    }

    #[test]
    fn producers_may_write_from_other_threads() {
        let mut store = FixedSlotStore::new();
        let built = built_screen(&store);
        let router = StreamRouter::attach_for_many(&[&built]);
        let mut out = router.capture(SysStream::Stdout);
        let handle = std::thread::spawn(move || {
            out.write_line("from thread");
        });
        handle.join().unwrap();
        let mut builts = vec![built];
        assert!(router.pump_all(&mut builts, &mut store));
    }
}
