//! `__form` binding parsing: no traversal, bounded indexed slots plus the
//! two system stream sources.

use ahash::AHashMap;

use crate::model::EventKind;

/// Declared local type of a binding (`str`, `vec`, `num`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindKind {
    Str,
    Vec,
    Num,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysRef {
    Stdout,
    Stderr,
}

/// A parsed data path: `.strN` / `.vecN` / `.numN` / `.sys.stdout` /
/// `.sys.stderr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataRef {
    Str(usize),
    Vec(usize),
    Num(usize),
    System(SysRef),
}

pub fn parse_bind_kind(local_name: &str) -> Option<BindKind> {
    match local_name.to_ascii_lowercase().as_str() {
        "str" => Some(BindKind::Str),
        "vec" => Some(BindKind::Vec),
        "num" => Some(BindKind::Num),
        _ => None,
    }
}

/// Charset `[A-Za-z0-9._]`, leading dot required, `..` forbidden. The
/// decoder may drop interior dots of system paths (`sysstdout`), accepted
/// as aliases.
pub fn parse_data_path(path: &str) -> Option<DataRef> {
    if path.len() < 2 || !path.starts_with('.') {
        return None;
    }
    if !path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    {
        return None;
    }
    if path.contains("..") {
        return None;
    }

    let name = &path[1..];
    match name {
        "sys.stdout" | "sysstdout" => return Some(DataRef::System(SysRef::Stdout)),
        "sys.stderr" | "sysstderr" => return Some(DataRef::System(SysRef::Stderr)),
        _ => {}
    }

    let parse_indexed = |prefix: &str| -> Option<usize> {
        let rest = name.strip_prefix(prefix)?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse().ok()
    };

    if let Some(i) = parse_indexed("str") {
        return Some(DataRef::Str(i));
    }
    if let Some(i) = parse_indexed("vec") {
        return Some(DataRef::Vec(i));
    }
    if let Some(i) = parse_indexed("num") {
        return Some(DataRef::Num(i));
    }
    None
}

/// A `str` binding may target `.strN` or a system string source.
pub fn kind_ok(bind: BindKind, data: &DataRef) -> bool {
    match bind {
        BindKind::Str => matches!(data, DataRef::Str(_) | DataRef::System(_)),
        BindKind::Vec => matches!(data, DataRef::Vec(_)),
        BindKind::Num => matches!(data, DataRef::Num(_)),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBinding {
    pub bind_kind: BindKind,
    pub data_ref: DataRef,
    /// Path text as written, for diagnostics.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEvent {
    pub kind: EventKind,
    pub name: String,
    pub label: Option<String>,
    pub color: Option<String>,
    pub bindings: Vec<ResolvedBinding>,
}

pub type ResolvedEventMap = AHashMap<String, ResolvedEvent>;

pub fn first_binding_of_kind(event: &ResolvedEvent, want: BindKind) -> Option<&ResolvedBinding> {
    event.bindings.iter().find(|b| b.bind_kind == want)
}

pub fn event_has_system_binding(event: &ResolvedEvent) -> bool {
    event
        .bindings
        .iter()
        .any(|b| matches!(b.data_ref, DataRef::System(_)))
}
