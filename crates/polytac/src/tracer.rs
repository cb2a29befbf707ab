//! Lowering trace infrastructure.
//!
//! Provides a trait-based tracing system for the lowering engine with
//! zero-cost abstraction: with [`NoopTracer`] every hook compiles away
//! through monomorphization, so production lowering pays nothing.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (production default) |
//! | [`StderrTracer`] | Human-readable lowering log to stderr |
//! | [`RecordingTracer`] | Full event recording for post-mortem inspection |
//!
//! The engine is parameterized as `Lowerer<N, T: LowerTracer>`; callers
//! choose the tracer when constructing an adapter.

use crate::ir::{Instruction, Opcode};

/// Trace event emitted during lowering.
///
/// Used by [`RecordingTracer`] to capture a full lowering trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A statement handler was dispatched for a node kind.
    Stmt { kind: String },
    /// An expression handler was dispatched for a node kind.
    Expr { kind: String },
    /// No handler existed; the node degraded to a `SYMBOLIC` placeholder.
    Fallback { kind: String },
    /// An instruction was appended to the stream.
    Emit { index: usize, opcode: Opcode },
    /// A function or class scaffold was entered.
    ScaffoldEnter { name: String },
    /// A function or class scaffold was completed.
    ScaffoldExit { name: String },
}

/// Hook points invoked by the engine during one `lower()` call.
///
/// All methods have empty default bodies, so implementations override only
/// what they need.
pub trait LowerTracer {
    /// A statement handler is about to run for `kind`.
    fn on_stmt(&mut self, kind: &str) {
        let _ = kind;
    }

    /// An expression handler is about to run for `kind`.
    fn on_expr(&mut self, kind: &str) {
        let _ = kind;
    }

    /// No handler was registered for `kind`; a `SYMBOLIC` fallback follows.
    fn on_fallback(&mut self, kind: &str) {
        let _ = kind;
    }

    /// `inst` was appended at position `index` in the stream.
    fn on_emit(&mut self, index: usize, inst: &Instruction) {
        let _ = (index, inst);
    }

    /// A function/class scaffold named `name` was entered.
    fn on_scaffold_enter(&mut self, name: &str) {
        let _ = name;
    }

    /// The scaffold named `name` finished.
    fn on_scaffold_exit(&mut self, name: &str) {
        let _ = name;
    }
}

/// Zero-cost tracer; every hook is a no-op the optimizer removes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl LowerTracer for NoopTracer {}

/// Logs lowering progress to stderr in a human-readable form.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer {
    depth: usize,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LowerTracer for StderrTracer {
    fn on_stmt(&mut self, kind: &str) {
        eprintln!("{:indent$}stmt {kind}", "", indent = self.depth * 2);
    }

    fn on_expr(&mut self, kind: &str) {
        eprintln!("{:indent$}expr {kind}", "", indent = self.depth * 2);
    }

    fn on_fallback(&mut self, kind: &str) {
        eprintln!("{:indent$}fallback {kind}", "", indent = self.depth * 2);
    }

    fn on_emit(&mut self, index: usize, inst: &Instruction) {
        eprintln!("{:indent$}[{index}] {inst}", "", indent = self.depth * 2);
    }

    fn on_scaffold_enter(&mut self, name: &str) {
        eprintln!("{:indent$}enter {name}", "", indent = self.depth * 2);
        self.depth += 1;
    }

    fn on_scaffold_exit(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        eprintln!("{:indent$}exit {name}", "", indent = self.depth * 2);
    }
}

/// Records every trace event for post-mortem inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded events, in emission order.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Consumes the tracer, returning the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl LowerTracer for RecordingTracer {
    fn on_stmt(&mut self, kind: &str) {
        self.events.push(TraceEvent::Stmt { kind: kind.to_owned() });
    }

    fn on_expr(&mut self, kind: &str) {
        self.events.push(TraceEvent::Expr { kind: kind.to_owned() });
    }

    fn on_fallback(&mut self, kind: &str) {
        self.events.push(TraceEvent::Fallback { kind: kind.to_owned() });
    }

    fn on_emit(&mut self, index: usize, inst: &Instruction) {
        self.events.push(TraceEvent::Emit {
            index,
            opcode: inst.opcode(),
        });
    }

    fn on_scaffold_enter(&mut self, name: &str) {
        self.events.push(TraceEvent::ScaffoldEnter { name: name.to_owned() });
    }

    fn on_scaffold_exit(&mut self, name: &str) {
        self.events.push(TraceEvent::ScaffoldExit { name: name.to_owned() });
    }
}
