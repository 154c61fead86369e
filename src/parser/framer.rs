use super::types::{Event, Framed};

/// Prefix of every line that belongs to the debugger protocol.
pub const MARKER: &str = "~>";

/// Line-oriented state machine that turns debuggee output into events.
///
/// Callers must hand over complete lines; a partial line at the end of a
/// chunk is framed as if it were complete.
#[derive(Debug, Default)]
pub struct EventFramer {
    current: Option<Event>,
}

impl EventFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an event header has been seen but not yet terminated.
    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn feed(&mut self, chunk: &str) -> Vec<Framed> {
        chunk
            .lines()
            .filter_map(|line| self.feed_line(line))
            .collect()
    }

    pub fn feed_line(&mut self, line: &str) -> Option<Framed> {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix(MARKER) else {
            return Some(Framed::Output(line.to_string()));
        };

        match self.current.as_mut() {
            None => {
                if !rest.is_empty() {
                    let event = open_event(rest);
                    if !event.name.is_empty() {
                        self.current = Some(event);
                    }
                }
                None
            }
            Some(event) if !rest.is_empty() => {
                event.data.push(rest.to_string());
                None
            }
            Some(_) => self.current.take().map(|event| Framed::Event(close_event(event))),
        }
    }
}

fn open_event(header: &str) -> Event {
    let split = header.rfind(':').or_else(|| header.rfind('@'));
    match split {
        Some(pos) => Event {
            name: header[..pos].to_string(),
            extra: Some(header[pos + 1..].to_string()),
            data: Vec::new(),
        },
        None => Event::new(header),
    }
}

fn close_event(mut event: Event) -> Event {
    if let Some(name) = event.name.strip_suffix('{') {
        event.name = name.to_string();
    }
    event.extra = event
        .extra
        .map(|extra| extra.strip_suffix('{').map(str::to_string).unwrap_or(extra))
        .filter(|extra| !extra.is_empty());
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::EventKind;

    fn single_event(framed: Vec<Framed>) -> Event {
        let mut events: Vec<_> = framed
            .into_iter()
            .filter_map(|f| match f {
                Framed::Event(e) => Some(e),
                Framed::Output(_) => None,
            })
            .collect();
        assert_eq!(events.len(), 1, "expected exactly one event");
        events.remove(0)
    }

    #[test]
    fn plain_lines_are_output() {
        let mut framer = EventFramer::new();
        let framed = framer.feed("hello\nworld\n");
        assert_eq!(
            framed,
            vec![
                Framed::Output("hello".to_string()),
                Framed::Output("world".to_string())
            ]
        );
        assert!(!framer.is_open());
    }

    #[test]
    fn frames_event_with_data() {
        let mut framer = EventFramer::new();
        let event = single_event(framer.feed("~>StackTrace{\n~>@C:\\a.bmx<1,2>\n~>Function Main\n~>\n"));
        assert_eq!(event.name, "StackTrace");
        assert_eq!(event.extra, None);
        assert_eq!(event.data, vec!["@C:\\a.bmx<1,2>", "Function Main"]);
        assert_eq!(event.kind(), EventKind::External);
    }

    #[test]
    fn header_splits_on_last_colon() {
        let mut framer = EventFramer::new();
        let event = single_event(framer.feed("~>Unhandled Exception:Null object access{\n~>\n"));
        assert_eq!(event.name, "Unhandled Exception");
        assert_eq!(event.extra.as_deref(), Some("Null object access"));
        assert_eq!(event.kind(), EventKind::Internal);
    }

    #[test]
    fn header_splits_on_at_sign_without_colon() {
        let mut framer = EventFramer::new();
        let event = single_event(framer.feed("~>DumpObject@1f2e{\n~>\n"));
        assert_eq!(event.name, "DumpObject");
        assert_eq!(event.extra.as_deref(), Some("1f2e"));
    }

    #[test]
    fn empty_extra_is_cleared() {
        let mut framer = EventFramer::new();
        let event = single_event(framer.feed("~>DebugStop:{\n~>\n"));
        assert_eq!(event.name, "DebugStop");
        assert_eq!(event.extra, None);
    }

    #[test]
    fn output_interleaved_with_event_is_forwarded() {
        let mut framer = EventFramer::new();
        let framed = framer.feed("~>Dump{\nprinted\n~>a=1\n~>\n");
        assert_eq!(framed[0], Framed::Output("printed".to_string()));
        let Framed::Event(event) = &framed[1] else {
            panic!("expected event");
        };
        assert_eq!(event.data, vec!["a=1"]);
    }

    #[test]
    fn bare_marker_without_open_event_is_ignored() {
        let mut framer = EventFramer::new();
        assert!(framer.feed("~>\n~>\n").is_empty());
        assert!(!framer.is_open());
    }

    #[test]
    fn event_spans_chunks() {
        let mut framer = EventFramer::new();
        assert!(framer.feed("~>Dump{\r\n~>x=1\r\n").is_empty());
        assert!(framer.is_open());
        let event = single_event(framer.feed("~>y=2\r\n~>\r\n"));
        assert_eq!(event.data, vec!["x=1", "y=2"]);
        assert!(!framer.is_open());
    }

    #[test]
    fn fault_message_breaks_first_sentence() {
        let mut event = Event::new("Unhandled Exception");
        event.extra = Some("Null object access.Access at line 5.".to_string());
        assert_eq!(
            event.fault_message().as_deref(),
            Some("Unhandled Exception: Null object access.\nAccess at line 5.")
        );
        assert_eq!(Event::new("DebugStop").fault_message(), None);
    }
}
