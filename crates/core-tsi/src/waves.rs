//! Wave identity and runtime signals.

use std::fmt::Write as _;

use crate::directives::PayloadKind;

pub type WaveId = u64;

/// Identity carried through a whole experiment plus a within-wave item id.
///
/// A source emitting a lazy sequence stamps items `{wave.id, wave.i + k}`;
/// downstream nodes preserve `{id, i}` for causality tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Wave {
    pub id: WaveId,
    pub i: u64,
}

/// Opaque tensor payload. The runtime routes it; it never interprets the
/// numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorData {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl TensorData {
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Self {
        Self { shape, values }
    }
}

/// Runtime signal: either an opaque tensor or text.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Tensor(TensorData),
    Text(String),
}

impl Signal {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Signal::Tensor(_) => PayloadKind::Tensor,
            Signal::Text(_) => PayloadKind::String,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Signal::Text(s) => Some(s),
            Signal::Tensor(_) => None,
        }
    }

    /// Short human form used by runtime meta-traces.
    pub fn summarize(&self) -> String {
        const PREVIEW: usize = 48;
        match self {
            Signal::Text(s) => {
                let mut out = format!(":str bytes={}", s.len());
                if !s.is_empty() {
                    if s.len() <= PREVIEW {
                        let _ = write!(out, " text={s:?}");
                    } else {
                        let cut = s
                            .char_indices()
                            .map(|(i, c)| i + c.len_utf8())
                            .take_while(|&e| e <= PREVIEW)
                            .last()
                            .unwrap_or(0);
                        let _ = write!(out, " text=\"{}...\"", &s[..cut]);
                    }
                }
                out
            }
            Signal::Tensor(t) => {
                let dims: Vec<String> = t.shape.iter().map(|d| d.to_string()).collect();
                format!(":tensor shape=[{}]", dims.join(","))
            }
        }
    }
}

pub fn tensor_signal(t: TensorData) -> Signal {
    Signal::Tensor(t)
}

pub fn string_signal(s: impl Into<String>) -> Signal {
    Signal::Text(s.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_kind_matches_variant() {
        assert_eq!(string_signal("x").kind(), PayloadKind::String);
        assert_eq!(
            tensor_signal(TensorData::new(vec![2, 3], vec![0.0; 6])).kind(),
            PayloadKind::Tensor
        );
    }

    #[test]
    fn summaries_are_compact() {
        assert_eq!(
            string_signal("hi").summarize(),
            ":str bytes=2 text=\"hi\""
        );
        let long = "x".repeat(100);
        assert!(string_signal(long).summarize().ends_with("...\""));
        assert_eq!(
            tensor_signal(TensorData::new(vec![4, 2], vec![0.0; 8])).summarize(),
            ":tensor shape=[4,2]"
        );
    }
}
