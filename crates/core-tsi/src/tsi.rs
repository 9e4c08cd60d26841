//! The step-driven node contract.

use std::any::Any;

use thiserror::Error;

use crate::directives::{DirectiveId, DirectiveSpec};
use crate::waves::{Signal, TensorData, Wave, string_signal, tensor_signal};

pub type TsiId = u64;

/// Opaque runtime context; the board/session can hang whatever it wants
/// here and nodes downcast to what they expect.
#[derive(Default)]
pub struct TsiContext {
    user: Option<Box<dyn Any>>,
}

impl TsiContext {
    pub fn with_user(user: impl Any) -> Self {
        Self {
            user: Some(Box::new(user)),
        }
    }

    pub fn user<T: Any>(&self) -> Option<&T> {
        self.user.as_ref().and_then(|u| u.downcast_ref())
    }

    pub fn user_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.user.as_mut().and_then(|u| u.downcast_mut())
    }
}

/// One ingress token delivered to one input directive.
#[derive(Debug, Clone)]
pub struct Ingress {
    pub directive: DirectiveId,
    pub signal: Signal,
}

/// Output interface. The runtime owns routing and broadcasting; a node only
/// names the out-directive it is emitting on.
pub trait Emitter {
    fn emit(&mut self, wave: Wave, out_directive: DirectiveId, signal: Signal);

    fn emit_text(&mut self, wave: Wave, out_directive: DirectiveId, text: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(wave, out_directive, string_signal(text));
    }

    fn emit_tensor(&mut self, wave: Wave, out_directive: DirectiveId, tensor: TensorData)
    where
        Self: Sized,
    {
        self.emit(wave, out_directive, tensor_signal(tensor));
    }
}

/// Scheduling hint; a deterministic circuit replays identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Determinism {
    Deterministic,
    SeededStochastic,
    Nondeterministic,
}

#[derive(Debug, Clone, Error)]
#[error("tsi `{tsi}` step failed: {reason}")]
pub struct StepError {
    pub tsi: String,
    pub reason: String,
}

impl StepError {
    pub fn new(tsi: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tsi: tsi.into(),
            reason: reason.into(),
        }
    }
}

/// A TSI is a step-driven process: the runtime delivers one ingress token
/// (wave + directive + signal) and the node emits zero or more output
/// tokens. The runtime serializes `step` calls; nodes need no internal
/// synchronization.
pub trait Tsi {
    fn type_name(&self) -> &str;
    fn instance_name(&self) -> &str;
    fn id(&self) -> TsiId;

    /// Concrete-type escape hatch for owners inspecting their nodes after a
    /// run (sinks expose their captured items this way).
    fn as_any(&self) -> &dyn Any;

    fn directives(&self) -> &[DirectiveSpec];

    fn is_sink(&self) -> bool {
        false
    }

    fn determinism(&self) -> Determinism {
        Determinism::Deterministic
    }

    /// Respond to one ingress token. An error terminates the current wave.
    fn step(
        &mut self,
        wave: Wave,
        ingress: Ingress,
        ctx: &mut TsiContext,
        out: &mut dyn Emitter,
    ) -> Result<(), StepError>;

    fn reset(&mut self, _ctx: &mut TsiContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_downcasts_user_state() {
        let mut cx = TsiContext::with_user(41u32);
        assert_eq!(cx.user::<u32>(), Some(&41));
        *cx.user_mut::<u32>().unwrap() += 1;
        assert_eq!(cx.user::<u32>(), Some(&42));
        assert!(cx.user::<String>().is_none());
    }
}
