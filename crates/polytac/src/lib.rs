#![doc = include_str!("../../../README.md")]

mod adapters;
mod canon;
mod engine;
mod error;
mod ir;
mod location;
mod tracer;
mod tree;

pub use crate::{
    adapters::{Language, lower_source},
    canon::{
        ENTRY_LABEL, FALSE_LITERAL, NONE_LITERAL, TRUE_LITERAL, UNIT_RETURN, USER_LABEL_PREFIX, ZERO_RETURN,
        class_ref, function_ref,
    },
    engine::{
        CatchClause, ExprHandler, Lowerer, MAX_LOWER_DEPTH, ParamBindingFn, Profile, StmtHandler, StoreHandler,
        SwitchArm,
    },
    error::{CorruptTree, LowerError, ParseError},
    ir::{ArgRegs, InstKind, Instruction, Opcode, Reg, render},
    location::{Point, SourceLocation, UNKNOWN_FILE},
    tracer::{LowerTracer, NoopTracer, RecordingTracer, StderrTracer, TraceEvent},
    tree::{SourceParser, SourceTree, TreeNode},
};
