//! Built-in nodes: a text fan-out source, a text transform, and
//! capacity-bounded sinks. These are enough to stand up a decoded board and
//! exercise the runtime end to end.

use std::any::Any;

use crate::directives::{DirectiveDir, DirectiveId, DirectiveSpec, PayloadKind, directive};
use crate::tsi::{Emitter, Ingress, StepError, Tsi, TsiContext, TsiId};
use crate::waves::{Signal, Wave, string_signal};

const FAN_SOURCE_DIRECTIVES: [DirectiveSpec; 3] = [
    directive(
        DirectiveId::Payload,
        DirectiveDir::In,
        PayloadKind::String,
        "command text; each whitespace token becomes one item",
    ),
    directive(
        DirectiveId::Payload,
        DirectiveDir::Out,
        PayloadKind::String,
        "one item per command token",
    ),
    directive(
        DirectiveId::Meta,
        DirectiveDir::Out,
        PayloadKind::String,
        "runtime trace",
    ),
];

/// Splits its command payload on whitespace and emits one item per token,
/// incrementing the within-wave index for each.
pub struct TextFanSource {
    id: TsiId,
    instance_name: String,
}

impl TextFanSource {
    pub fn new(id: TsiId, instance_name: impl Into<String>) -> Self {
        Self {
            id,
            instance_name: instance_name.into(),
        }
    }
}

impl Tsi for TextFanSource {
    fn type_name(&self) -> &str {
        "tsi.source.text"
    }

    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn id(&self) -> TsiId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn directives(&self) -> &[DirectiveSpec] {
        &FAN_SOURCE_DIRECTIVES
    }

    fn step(
        &mut self,
        wave: Wave,
        ingress: Ingress,
        _ctx: &mut TsiContext,
        out: &mut dyn Emitter,
    ) -> Result<(), StepError> {
        let Signal::Text(command) = ingress.signal else {
            return Err(StepError::new(
                &self.instance_name,
                "expected string command payload",
            ));
        };
        for (k, token) in command.split_whitespace().enumerate() {
            let item_wave = Wave {
                id: wave.id,
                i: wave.i + k as u64,
            };
            out.emit(item_wave, DirectiveId::Payload, string_signal(token));
        }
        Ok(())
    }
}

const TRANSFORM_DIRECTIVES: [DirectiveSpec; 3] = [
    directive(DirectiveId::Payload, DirectiveDir::In, PayloadKind::String, ""),
    directive(
        DirectiveId::Payload,
        DirectiveDir::Out,
        PayloadKind::String,
        "uppercased input",
    ),
    directive(
        DirectiveId::Meta,
        DirectiveDir::Out,
        PayloadKind::String,
        "runtime trace",
    ),
];

/// Uppercases text payloads, preserving wave identity.
pub struct TextTransform {
    id: TsiId,
    instance_name: String,
}

impl TextTransform {
    pub fn new(id: TsiId, instance_name: impl Into<String>) -> Self {
        Self {
            id,
            instance_name: instance_name.into(),
        }
    }
}

impl Tsi for TextTransform {
    fn type_name(&self) -> &str {
        "tsi.map.upper"
    }

    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn id(&self) -> TsiId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn directives(&self) -> &[DirectiveSpec] {
        &TRANSFORM_DIRECTIVES
    }

    fn step(
        &mut self,
        wave: Wave,
        ingress: Ingress,
        _ctx: &mut TsiContext,
        out: &mut dyn Emitter,
    ) -> Result<(), StepError> {
        let Signal::Text(text) = ingress.signal else {
            return Err(StepError::new(&self.instance_name, "expected string payload"));
        };
        out.emit(wave, DirectiveId::Payload, string_signal(text.to_uppercase()));
        Ok(())
    }
}

const SINK_STR_DIRECTIVES: [DirectiveSpec; 1] = [directive(
    DirectiveId::Payload,
    DirectiveDir::In,
    PayloadKind::String,
    "captured item",
)];
const SINK_TENSOR_DIRECTIVES: [DirectiveSpec; 1] = [directive(
    DirectiveId::Payload,
    DirectiveDir::In,
    PayloadKind::Tensor,
    "captured item",
)];

/// Capacity-bounded sink: accepts ingress, stores `(wave, signal)` for
/// later inspection, emits nothing. Oldest items fall off when full.
pub struct SinkBuffer {
    id: TsiId,
    instance_name: String,
    kind: PayloadKind,
    capacity: usize,
    items: Vec<(Wave, Signal)>,
}

impl SinkBuffer {
    pub fn new(
        id: TsiId,
        instance_name: impl Into<String>,
        kind: PayloadKind,
        capacity: usize,
    ) -> Self {
        Self {
            id,
            instance_name: instance_name.into(),
            kind,
            capacity: capacity.max(1),
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[(Wave, Signal)] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Tsi for SinkBuffer {
    fn type_name(&self) -> &str {
        match self.kind {
            PayloadKind::String => "tsi.sink.text",
            PayloadKind::Tensor => "tsi.sink.tensor",
        }
    }

    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn id(&self) -> TsiId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_sink(&self) -> bool {
        true
    }

    fn directives(&self) -> &[DirectiveSpec] {
        match self.kind {
            PayloadKind::String => &SINK_STR_DIRECTIVES,
            PayloadKind::Tensor => &SINK_TENSOR_DIRECTIVES,
        }
    }

    fn step(
        &mut self,
        wave: Wave,
        ingress: Ingress,
        _ctx: &mut TsiContext,
        _out: &mut dyn Emitter,
    ) -> Result<(), StepError> {
        if self.items.len() == self.capacity {
            self.items.remove(0);
        }
        self.items.push((wave, ingress.signal));
        Ok(())
    }

    fn reset(&mut self, _ctx: &mut TsiContext) {
        self.items.clear();
    }
}
