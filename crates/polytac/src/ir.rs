//! The flat three-address IR emitted by the lowering engine.
//!
//! An instruction stream is the whole contract between the frontends and the
//! downstream passes (CFG construction, dataflow, VM execution). Instructions
//! are immutable once emitted and appear in exact emission order.
//!
//! The opcode set is closed. Payloads are carried as tagged variants
//! ([`InstKind`]) so the emission contract is enforced at compile time, while
//! the record view ([`Instruction::operands`] and friends) and the textual
//! rendering preserve the string-operand contract downstream passes consume.

use std::fmt;

use smallvec::SmallVec;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::location::SourceLocation;

/// A virtual register, rendered as `%N`.
///
/// Registers are allocated from a per-lowering counter and never reused, so
/// each result register is written exactly once within one instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Reg(u32);

impl Reg {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw register ordinal.
    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Short inline vector for call argument registers.
pub type ArgRegs = SmallVec<[Reg; 4]>;

/// The closed opcode set.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    Label,
    Const,
    LoadVar,
    StoreVar,
    LoadField,
    StoreField,
    LoadIndex,
    StoreIndex,
    NewObject,
    NewArray,
    Binop,
    Unop,
    CallFunction,
    CallMethod,
    CallUnknown,
    Branch,
    BranchIf,
    Return,
    Throw,
    Symbolic,
}

/// Tagged instruction payloads.
///
/// `Reg` fields hold register references; `String` fields hold names,
/// verbatim literal text, operator text, tags, or label names. Operator text
/// is never normalized across languages; the executor is the single point
/// that interprets operator semantics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InstKind {
    /// Names a point in the instruction stream.
    Label { name: String },
    /// Materializes a literal string.
    Const { dest: Reg, value: String },
    /// Reads a named variable.
    LoadVar { dest: Reg, name: String },
    /// Writes a named variable.
    StoreVar { name: String, src: Reg },
    /// Reads `object.field`.
    LoadField { dest: Reg, object: Reg, field: String },
    /// Writes `object.field`.
    StoreField { object: Reg, field: String, src: Reg },
    /// Reads `object[index]`.
    LoadIndex { dest: Reg, object: Reg, index: Reg },
    /// Writes `object[index]`.
    StoreIndex { object: Reg, index: Reg, src: Reg },
    /// Allocates a tagged object (`"dict"`, `"set"`, `"enum:Color"`, ...).
    NewObject { dest: Reg, tag: String },
    /// Allocates a tagged array/tuple/set of a given size.
    NewArray { dest: Reg, tag: String, size: Reg },
    /// Binary operation; `op` is raw operator text.
    Binop { dest: Reg, op: String, lhs: Reg, rhs: Reg },
    /// Unary operation; `op` is raw operator text.
    Unop { dest: Reg, op: String, operand: Reg },
    /// Call by static name.
    CallFunction { dest: Reg, name: String, args: ArgRegs },
    /// Method call on an object register.
    CallMethod {
        dest: Reg,
        object: Reg,
        method: String,
        args: ArgRegs,
    },
    /// Call through a computed target register.
    CallUnknown { dest: Reg, target: Reg, args: ArgRegs },
    /// Unconditional jump.
    Branch { target: String },
    /// Conditional jump; both targets always present.
    BranchIf {
        cond: Reg,
        true_target: String,
        false_target: String,
    },
    /// Returns a value.
    Return { value: Reg },
    /// Raises an exception value.
    Throw { value: Reg },
    /// Placeholder for unsupported or inherently opaque constructs.
    Symbolic { dest: Reg, hint: String },
}

impl InstKind {
    /// The opcode tag of this payload.
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Label { .. } => Opcode::Label,
            Self::Const { .. } => Opcode::Const,
            Self::LoadVar { .. } => Opcode::LoadVar,
            Self::StoreVar { .. } => Opcode::StoreVar,
            Self::LoadField { .. } => Opcode::LoadField,
            Self::StoreField { .. } => Opcode::StoreField,
            Self::LoadIndex { .. } => Opcode::LoadIndex,
            Self::StoreIndex { .. } => Opcode::StoreIndex,
            Self::NewObject { .. } => Opcode::NewObject,
            Self::NewArray { .. } => Opcode::NewArray,
            Self::Binop { .. } => Opcode::Binop,
            Self::Unop { .. } => Opcode::Unop,
            Self::CallFunction { .. } => Opcode::CallFunction,
            Self::CallMethod { .. } => Opcode::CallMethod,
            Self::CallUnknown { .. } => Opcode::CallUnknown,
            Self::Branch { .. } => Opcode::Branch,
            Self::BranchIf { .. } => Opcode::BranchIf,
            Self::Return { .. } => Opcode::Return,
            Self::Throw { .. } => Opcode::Throw,
            Self::Symbolic { .. } => Opcode::Symbolic,
        }
    }

    /// The destination register, if this opcode produces a value.
    #[must_use]
    pub fn result_reg(&self) -> Option<Reg> {
        match self {
            Self::Const { dest, .. }
            | Self::LoadVar { dest, .. }
            | Self::LoadField { dest, .. }
            | Self::LoadIndex { dest, .. }
            | Self::NewObject { dest, .. }
            | Self::NewArray { dest, .. }
            | Self::Binop { dest, .. }
            | Self::Unop { dest, .. }
            | Self::CallFunction { dest, .. }
            | Self::CallMethod { dest, .. }
            | Self::CallUnknown { dest, .. }
            | Self::Symbolic { dest, .. } => Some(*dest),
            Self::Label { .. }
            | Self::StoreVar { .. }
            | Self::StoreField { .. }
            | Self::StoreIndex { .. }
            | Self::Branch { .. }
            | Self::BranchIf { .. }
            | Self::Return { .. }
            | Self::Throw { .. } => None,
        }
    }

    /// The label name, present iff this is a `LABEL`.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Label { name } => Some(name),
            _ => None,
        }
    }

    /// The ordered string-operand view of this instruction.
    ///
    /// Literals and names appear verbatim; register operands render as `%N`;
    /// `BRANCH_IF` joins its two targets with a comma into a single operand,
    /// matching the serialized contract.
    #[must_use]
    pub fn operands(&self) -> Vec<String> {
        fn regs(args: &ArgRegs) -> impl Iterator<Item = String> + '_ {
            args.iter().map(ToString::to_string)
        }
        match self {
            Self::Label { .. } => vec![],
            Self::Const { value, .. } => vec![value.clone()],
            Self::LoadVar { name, .. } => vec![name.clone()],
            Self::StoreVar { name, src } => vec![name.clone(), src.to_string()],
            Self::LoadField { object, field, .. } => vec![object.to_string(), field.clone()],
            Self::StoreField { object, field, src } => {
                vec![object.to_string(), field.clone(), src.to_string()]
            }
            Self::LoadIndex { object, index, .. } => vec![object.to_string(), index.to_string()],
            Self::StoreIndex { object, index, src } => {
                vec![object.to_string(), index.to_string(), src.to_string()]
            }
            Self::NewObject { tag, .. } => vec![tag.clone()],
            Self::NewArray { tag, size, .. } => vec![tag.clone(), size.to_string()],
            Self::Binop { op, lhs, rhs, .. } => vec![op.clone(), lhs.to_string(), rhs.to_string()],
            Self::Unop { op, operand, .. } => vec![op.clone(), operand.to_string()],
            Self::CallFunction { name, args, .. } => {
                let mut ops = vec![name.clone()];
                ops.extend(regs(args));
                ops
            }
            Self::CallMethod {
                object, method, args, ..
            } => {
                let mut ops = vec![object.to_string(), method.clone()];
                ops.extend(regs(args));
                ops
            }
            Self::CallUnknown { target, args, .. } => {
                let mut ops = vec![target.to_string()];
                ops.extend(regs(args));
                ops
            }
            Self::Branch { target } => vec![target.clone()],
            Self::BranchIf {
                cond,
                true_target,
                false_target,
            } => vec![cond.to_string(), format!("{true_target},{false_target}")],
            Self::Return { value } => vec![value.to_string()],
            Self::Throw { value } => vec![value.to_string()],
            Self::Symbolic { hint, .. } => vec![hint.clone()],
        }
    }
}

/// One emitted IR instruction: a tagged payload plus its source span.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Instruction {
    pub kind: InstKind,
    pub location: SourceLocation,
}

impl Instruction {
    #[must_use]
    pub fn new(kind: InstKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    /// The opcode tag.
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        self.kind.opcode()
    }

    /// The destination register, if any.
    #[must_use]
    pub fn result_reg(&self) -> Option<Reg> {
        self.kind.result_reg()
    }

    /// The label name for `LABEL` instructions.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.kind.label()
    }

    /// The ordered string-operand view.
    #[must_use]
    pub fn operands(&self) -> Vec<String> {
        self.kind.operands()
    }
}

impl fmt::Display for Instruction {
    /// Renders the one-line diagnostic form:
    /// `OPCODE result_reg = operand operand ...`, result elided for opcodes
    /// that produce none.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode())?;
        if let Some(dest) = self.result_reg() {
            write!(f, " {dest} =")?;
        }
        for operand in self.operands() {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// Renders an instruction stream in the one-instruction-per-line textual
/// form used for diagnostics and tests.
#[must_use]
pub fn render(instructions: &[Instruction]) -> String {
    let mut out = String::new();
    for inst in instructions {
        out.push_str(&inst.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;

    fn at_unknown(kind: InstKind) -> Instruction {
        Instruction::new(kind, SourceLocation::unknown())
    }

    #[test]
    fn opcode_names_round_trip() {
        assert_eq!(Opcode::LoadVar.to_string(), "LOAD_VAR");
        assert_eq!("BRANCH_IF".parse::<Opcode>().unwrap(), Opcode::BranchIf);
        assert_eq!(<&'static str>::from(Opcode::CallUnknown), "CALL_UNKNOWN");
    }

    #[test]
    fn branch_if_targets_join_with_comma() {
        let inst = at_unknown(InstKind::BranchIf {
            cond: Reg::new(3),
            true_target: "if_true_1".to_owned(),
            false_target: "if_false_2".to_owned(),
        });
        assert_eq!(inst.operands(), vec!["%3", "if_true_1,if_false_2"]);
        assert_eq!(inst.to_string(), "BRANCH_IF %3 if_true_1,if_false_2");
    }

    #[test]
    fn result_registers_only_on_value_producers() {
        let call = at_unknown(InstKind::CallFunction {
            dest: Reg::new(2),
            name: "add".to_owned(),
            args: smallvec![Reg::new(0), Reg::new(1)],
        });
        assert_eq!(call.result_reg(), Some(Reg::new(2)));
        assert_eq!(call.to_string(), "CALL_FUNCTION %2 = add %0 %1");

        let branch = at_unknown(InstKind::Branch {
            target: "while_cond_0".to_owned(),
        });
        assert_eq!(branch.result_reg(), None);
    }

    #[test]
    fn label_field_present_iff_label() {
        let label = at_unknown(InstKind::Label { name: "entry".to_owned() });
        assert_eq!(label.label(), Some("entry"));
        assert!(label.operands().is_empty());

        let ret = at_unknown(InstKind::Return { value: Reg::new(0) });
        assert_eq!(ret.label(), None);
    }

    #[test]
    fn serde_round_trip_preserves_stream() {
        let stream = vec![
            at_unknown(InstKind::Label { name: "entry".to_owned() }),
            at_unknown(InstKind::Const {
                dest: Reg::new(0),
                value: "42".to_owned(),
            }),
            at_unknown(InstKind::StoreVar {
                name: "x".to_owned(),
                src: Reg::new(0),
            }),
        ];
        let json = serde_json::to_string(&stream).unwrap();
        let back: Vec<Instruction> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stream);
    }
}
