use super::references::{ReferenceAllocator, ReferenceId};
use std::collections::{BTreeMap, HashMap};

/// Scope label the debuggee prints for a frame without locals.
pub const NO_LOCALS: &str = "Local <local>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: String,
    pub line: i64,
    pub column: i64,
}

impl SourceLocation {
    /// File name part of `path`; the debuggee may report Windows paths.
    pub fn name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A call-stack entry owning exactly one scope.
    Real { scope: ReferenceId },
    /// The synthetic frame grouping every real scope.
    AppStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationHint {
    Normal,
    Subtle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub id: ReferenceId,
    pub name: String,
    pub source: SourceLocation,
    pub kind: FrameKind,
}

impl StackFrame {
    pub fn is_app_stack(&self) -> bool {
        self.kind == FrameKind::AppStack
    }

    pub fn presentation_hint(&self) -> PresentationHint {
        match self.kind {
            FrameKind::Real { .. } => PresentationHint::Normal,
            FrameKind::AppStack => PresentationHint::Subtle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub reference: ReferenceId,
    pub name: String,
    /// Id of the owning frame.
    pub frame: ReferenceId,
}

/// Everything learned from one `t` dump. Replaced wholesale on the next
/// stack-trace request.
#[derive(Debug, Default)]
pub struct StackSnapshot {
    /// In the order returned to the client.
    pub frames: Vec<StackFrame>,
    /// Keyed by owning frame id.
    pub scopes: BTreeMap<ReferenceId, Scope>,
    /// Raw variable lines keyed by scope reference.
    pub dumps: HashMap<ReferenceId, Vec<String>>,
}

impl StackSnapshot {
    /// Interprets the data lines of a stack dump:
    ///
    /// ```text
    /// @C:\app\main.bmx<10,3>
    /// Function Foo()
    /// Local x:Int=5
    /// ```
    ///
    /// A frame whose scope label is [`NO_LOCALS`] is dropped. Frames are
    /// prepended as they complete, and when at least one frame survives a
    /// synthetic application-stack frame is put in front of them.
    pub fn build(lines: &[String], refs: &mut ReferenceAllocator) -> Self {
        let mut snapshot = Self::default();
        let mut awaiting_label: Option<(ReferenceId, SourceLocation)> = None;
        let mut current_scope: Option<ReferenceId> = None;
        let mut last_kept: Option<SourceLocation> = None;

        for line in lines {
            if let Some((id, source)) = awaiting_label.take() {
                if line == NO_LOCALS {
                    log::trace!("dropping frame {id} without locals");
                    continue;
                }

                let scope = refs.allocate();
                snapshot.scopes.insert(
                    id,
                    Scope {
                        reference: scope,
                        name: line.clone(),
                        frame: id,
                    },
                );
                current_scope = Some(scope);
                snapshot.frames.insert(
                    0,
                    StackFrame {
                        id,
                        name: frame_name(line).to_string(),
                        source: source.clone(),
                        kind: FrameKind::Real { scope },
                    },
                );
                last_kept = Some(source);
                continue;
            }

            if let Some(source) = parse_frame_header(line) {
                awaiting_label = Some((refs.allocate(), source));
                current_scope = None;
            } else if let Some(scope) = current_scope {
                snapshot.dumps.entry(scope).or_default().push(line.clone());
            } else {
                log::trace!("ignoring stack line outside any scope: {line}");
            }
        }

        if let Some(source) = last_kept {
            let innermost = snapshot
                .frames
                .last()
                .map(|frame| frame.name.as_str())
                .unwrap_or_default();
            let app_stack = StackFrame {
                id: refs.allocate(),
                name: format!("<{innermost}>"),
                source,
                kind: FrameKind::AppStack,
            };
            snapshot.frames.insert(0, app_stack);
        }

        snapshot
    }

    pub fn frame(&self, id: ReferenceId) -> Option<&StackFrame> {
        self.frames.iter().find(|frame| frame.id == id)
    }

    pub fn is_app_stack(&self, id: ReferenceId) -> bool {
        self.frame(id).is_some_and(StackFrame::is_app_stack)
    }

    pub fn is_root_scope(&self, reference: ReferenceId) -> bool {
        self.scopes.values().any(|scope| scope.reference == reference)
    }

    pub fn has_dump(&self, reference: ReferenceId) -> bool {
        self.dumps
            .get(&reference)
            .is_some_and(|lines| !lines.is_empty())
    }

    /// Scopes listed under `frame_id`. The application-stack frame lists
    /// every real scope; a real frame lists its own scope unless it is empty
    /// and `show_empty` is off.
    pub fn scopes_for(&self, frame_id: ReferenceId, show_empty: bool) -> Vec<&Scope> {
        if self.is_app_stack(frame_id) {
            return self
                .scopes
                .values()
                .rev()
                .filter(|scope| !self.is_app_stack(scope.frame))
                .collect();
        }

        self.scopes
            .get(&frame_id)
            .filter(|scope| show_empty || self.has_dump(scope.reference))
            .into_iter()
            .collect()
    }
}

/// `@<path><line,column>`
fn parse_frame_header(line: &str) -> Option<SourceLocation> {
    let rest = line.strip_prefix('@')?.strip_suffix('>')?;
    let path_end = rest.rfind('<')?;
    let mut position = rest[path_end + 1..].split(',');
    let mut next_number = || {
        position
            .next()
            .and_then(|n| n.trim().parse::<i64>().ok())
            .unwrap_or(0)
    };

    Some(SourceLocation {
        path: rest[..path_end].to_string(),
        line: next_number(),
        column: next_number(),
    })
}

/// Drops the leading kind word: `Function Foo()` becomes `Foo()`.
fn frame_name(label: &str) -> &str {
    label.split_once(' ').map_or(label, |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn parses_frame_header() {
        let loc = parse_frame_header("@C:\\app\\main.bmx<10,3>").unwrap();
        assert_eq!(loc.path, "C:\\app\\main.bmx");
        assert_eq!(loc.line, 10);
        assert_eq!(loc.column, 3);
        assert_eq!(loc.name(), "main.bmx");

        assert!(parse_frame_header("Local x:Int=5").is_none());
        assert!(parse_frame_header("@no position").is_none());
    }

    #[test]
    fn frame_without_locals_is_dropped() {
        let mut refs = ReferenceAllocator::new();
        let snapshot =
            StackSnapshot::build(&lines(&["@C:\\app\\main.bmx<10,3>", NO_LOCALS]), &mut refs);
        assert!(snapshot.frames.is_empty());
        assert!(snapshot.scopes.is_empty());
        assert!(snapshot.dumps.is_empty());
    }

    #[test]
    fn single_frame_with_variable() {
        let mut refs = ReferenceAllocator::new();
        let snapshot = StackSnapshot::build(
            &lines(&["@C:\\app\\main.bmx<10,3>", "Function Foo()", "x:Int = 5"]),
            &mut refs,
        );

        assert_eq!(snapshot.frames.len(), 2);
        let app = &snapshot.frames[0];
        assert!(app.is_app_stack());
        assert_eq!(app.name, "<Foo()>");
        assert_eq!(app.presentation_hint(), PresentationHint::Subtle);

        let frame = &snapshot.frames[1];
        assert_eq!(frame.id, 1);
        assert_eq!(frame.name, "Foo()");
        assert_eq!(frame.source.line, 10);
        assert_eq!(frame.kind, FrameKind::Real { scope: 2 });
        assert_eq!(app.source, frame.source);

        assert_eq!(snapshot.scopes.len(), 1);
        assert_eq!(snapshot.scopes[&1].name, "Function Foo()");
        assert_eq!(snapshot.dumps[&2], vec!["x:Int = 5".to_string()]);
        assert_eq!(app.id, 3);
    }

    #[test]
    fn later_frames_come_first() {
        let mut refs = ReferenceAllocator::new();
        let snapshot = StackSnapshot::build(
            &lines(&[
                "@/src/main.bmx<1,1>",
                "Function Main",
                "Local a:Int=1",
                "@/src/util.bmx<20,5>",
                "Function Helper",
                "Local b:Int=2",
                "Local c:Int=3",
            ]),
            &mut refs,
        );

        let names: Vec<_> = snapshot.frames.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["<Main>", "Helper", "Main"]);
        assert_eq!(snapshot.frames[0].source.path, "/src/util.bmx");
        assert_eq!(snapshot.dumps[&4].len(), 2);

        let mut ids: Vec<_> = snapshot.frames.iter().map(|f| f.id).collect();
        ids.extend(snapshot.scopes.values().map(|s| s.reference));
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count, "reference ids must be distinct");
    }

    #[test]
    fn lines_after_dropped_frame_are_ignored() {
        let mut refs = ReferenceAllocator::new();
        let snapshot = StackSnapshot::build(
            &lines(&["stray", "@/a.bmx<1,1>", NO_LOCALS, "Local z:Int=0"]),
            &mut refs,
        );
        assert!(snapshot.frames.is_empty());
        assert!(snapshot.dumps.is_empty());
    }

    #[test]
    fn scopes_for_frames() {
        let mut refs = ReferenceAllocator::new();
        let snapshot = StackSnapshot::build(
            &lines(&[
                "@/a.bmx<1,1>",
                "Function Main",
                "Local a:Int=1",
                "@/b.bmx<2,1>",
                "Method Update",
            ]),
            &mut refs,
        );

        let app = snapshot.frames[0].id;
        let all: Vec<_> = snapshot
            .scopes_for(app, false)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(all, vec!["Method Update", "Function Main"]);

        assert_eq!(snapshot.scopes_for(1, false).len(), 1);
        assert!(snapshot.scopes_for(3, false).is_empty());
        assert_eq!(snapshot.scopes_for(3, true).len(), 1);
        assert!(snapshot.scopes_for(99, true).is_empty());
        assert!(snapshot.is_root_scope(4));
        assert!(!snapshot.is_root_scope(3));
    }
}
