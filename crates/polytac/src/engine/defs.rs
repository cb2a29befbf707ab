//! Definition lowerers: functions, classes, parameters, store targets.
//!
//! Function and class bodies are emitted inline in the flat stream,
//! bracketed by a branch-over so linear fallthrough never enters a body:
//!
//! ```text
//! BRANCH end_<name>_A
//! LABEL func_<name>_B
//!   ... parameters, body, implicit return ...
//! LABEL end_<name>_A
//! CONST "<function:<name>@func_<name>_B>"
//! STORE_VAR <name>
//! ```
//!
//! The reference constant ties call sites to the body's entry label for the
//! downstream CFG builder and VM.

use super::Lowerer;
use crate::{
    canon,
    ir::Reg,
    tracer::LowerTracer,
    tree::TreeNode,
};

impl<N: TreeNode, T: LowerTracer> Lowerer<N, T> {
    // ------------------------------------------------------------------
    // Scaffolds
    // ------------------------------------------------------------------

    /// Emits the branch-over/label bracket for a function-shaped body and
    /// returns a register holding the `<function:name@label>` reference.
    ///
    /// `lower_inner` emits parameters and body between the entry label and
    /// the implicit return.
    pub fn emit_function_scaffold(&mut self, node: &N, name: &str, lower_inner: impl FnOnce(&mut Self)) -> Reg {
        self.tracer_mut().on_scaffold_enter(name);
        let end_label = self.fresh_label(&format!("end_{name}"));
        let entry_label = self.fresh_label(&format!("func_{name}"));
        self.branch_at(node, &end_label);
        self.label_at(node, &entry_label);
        lower_inner(self);
        self.emit_implicit_return(node);
        self.label_at(node, &end_label);
        let reference = canon::function_ref(name, &entry_label);
        let reg = self.const_at(node, reference);
        self.tracer_mut().on_scaffold_exit(name);
        reg
    }

    /// Class-shaped analogue of [`Self::emit_function_scaffold`] with
    /// `class_` / `end_class_` labels and a `<class:...>` reference. Class
    /// bodies have no implicit return.
    pub fn emit_class_scaffold(&mut self, node: &N, name: &str, lower_inner: impl FnOnce(&mut Self)) -> Reg {
        self.tracer_mut().on_scaffold_enter(name);
        let end_label = self.fresh_label(&format!("end_class_{name}"));
        let entry_label = self.fresh_label(&format!("class_{name}"));
        self.branch_at(node, &end_label);
        self.label_at(node, &entry_label);
        lower_inner(self);
        self.label_at(node, &end_label);
        let reference = canon::class_ref(name, &entry_label);
        let reg = self.const_at(node, reference);
        self.tracer_mut().on_scaffold_exit(name);
        reg
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    /// Lowers a parameter list: one `SYMBOLIC "param:<name>"` plus one
    /// `STORE_VAR <name>` pair per parameter, in declaration order.
    pub fn lower_parameters(&mut self, params_node: &N) {
        // A bare identifier (single-parameter arrow functions) is itself
        // the parameter.
        if self.profile.name_node_types.contains(&params_node.kind()) {
            self.lower_single_param(params_node);
            return;
        }
        for param in self.useful_children(params_node) {
            self.lower_single_param(&param);
        }
    }

    /// Lowers one parameter node.
    pub fn lower_single_param(&mut self, param: &N) {
        let Some(name) = self.param_name(param) else {
            return;
        };
        let hint = format!("param:{name}");
        let value = self.symbolic_at(param, &hint);
        self.store_var_at(param, &name, value);
    }

    /// Extracts the bound name from a parameter node: the adapter hook
    /// first, then a `name` field, then an identifier-shaped node itself,
    /// then the first identifier-shaped named descendant.
    #[must_use]
    pub fn param_name(&self, param: &N) -> Option<String> {
        if let Some(hook) = self.profile.param_binding {
            return hook(self, param);
        }
        self.default_param_name(param)
    }

    /// The engine's generic parameter-name extraction.
    #[must_use]
    pub fn default_param_name(&self, param: &N) -> Option<String> {
        if self.profile.name_node_types.contains(&param.kind()) {
            return Some(self.text(param));
        }
        if let Some(name) = param.child_by_field_name("name") {
            return Some(self.text(&name));
        }
        self.find_name_descendant(param).map(|n| self.text(&n))
    }

    /// Depth-first search for the first identifier-shaped named node.
    #[must_use]
    pub fn find_name_descendant(&self, node: &N) -> Option<N> {
        for child in node.named_children() {
            if self.profile.name_node_types.contains(&child.kind()) {
                return Some(child);
            }
            if let Some(found) = self.find_name_descendant(&child) {
                return Some(found);
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Function and class definitions
    // ------------------------------------------------------------------

    /// Function definition statement over the profile's name/params/body
    /// fields: scaffold, parameters, body, then `STORE_VAR <name>` of the
    /// function reference.
    pub fn lower_function_def(&mut self, node: &N) {
        let name = node
            .child_by_field_name(self.profile.func_name_field)
            .map_or_else(|| "anonymous".to_owned(), |n| self.text(&n));
        let params = node.child_by_field_name(self.profile.func_params_field);
        let body = node.child_by_field_name(self.profile.func_body_field);
        let reference = self.lower_function_parts(node, &name, params.as_ref(), body.as_ref());
        self.store_var_at(node, &name, reference);
    }

    /// Scaffold + parameters + body, returning the reference register.
    /// `current_function_name` is set for the duration of the body so
    /// adapters with "assignment to function name returns" semantics can
    /// consult it.
    pub fn lower_function_parts(&mut self, node: &N, name: &str, params: Option<&N>, body: Option<&N>) -> Reg {
        let params = params.cloned();
        let body = body.cloned();
        let enclosing = self.current_function_name.replace(name.to_owned());
        let reference = self.emit_function_scaffold(node, name, |lw| {
            if let Some(params) = &params {
                lw.lower_parameters(params);
            }
            if let Some(body) = &body {
                lw.lower_block(body);
            }
        });
        self.current_function_name = enclosing;
        reference
    }

    /// Anonymous function (lambda / closure / block): scaffolds under a
    /// unique synthetic name and returns the reference register. The body
    /// may be a block or a bare expression; expression bodies emit an
    /// explicit `RETURN` of their value.
    pub fn lower_anonymous_function(&mut self, node: &N, prefix: &str, params: Option<&N>, body: Option<&N>) -> Reg {
        let name = self.fresh_synthetic(prefix);
        let params = params.cloned();
        let body = body.cloned();
        self.emit_function_scaffold(node, &name, |lw| {
            if let Some(params) = &params {
                lw.lower_parameters(params);
            }
            if let Some(body) = &body {
                if lw.profile.block_node_types.contains(&body.kind()) || lw.stmt_dispatch.contains_key(body.kind()) {
                    lw.lower_block(body);
                } else {
                    let value = lw.lower_expr(body);
                    lw.emit_return(body, value);
                }
            }
        })
    }

    /// Class definition statement over the profile's name/body fields.
    pub fn lower_class_def(&mut self, node: &N) {
        let name = node
            .child_by_field_name(self.profile.class_name_field)
            .map_or_else(|| "anonymous".to_owned(), |n| self.text(&n));
        let body = node.child_by_field_name(self.profile.class_body_field);
        let reference = self.emit_class_scaffold(node, &name, |lw| {
            if let Some(body) = &body {
                lw.lower_block(body);
            }
        });
        self.store_var_at(node, &name, reference);
    }

    // ------------------------------------------------------------------
    // Store targets
    // ------------------------------------------------------------------

    /// Classifies an assignment LHS and emits the matching store. Adapters
    /// with extra target shapes (pointer dereference, sigiled variables)
    /// override via the profile hook and delegate back to
    /// [`Self::default_store_target`] for the shared cases.
    pub fn lower_store_target(&mut self, target: &N, value: Reg) {
        if let Some(hook) = self.profile.store_target {
            hook(self, target, value);
            return;
        }
        self.default_store_target(target, value);
    }

    /// Variable / field / index store classification.
    pub fn default_store_target(&mut self, target: &N, value: Reg) {
        let kind = target.kind();
        if kind == self.profile.paren_expr_type {
            if let Some(inner) = self.useful_children(target).into_iter().next() {
                self.lower_store_target(&inner, value);
                return;
            }
        }
        if self.profile.name_node_types.contains(&kind) {
            let name = self.text(target);
            self.store_var_at(target, name, value);
            return;
        }
        if kind == self.profile.attribute_node_type {
            let object = self.field_or_nth(target, self.profile.attr_object_field, 0);
            let attr = self.field_or_nth(target, self.profile.attr_attribute_field, 1);
            if let (Some(object), Some(attr)) = (object, attr) {
                let obj_reg = self.lower_expr(&object);
                let field = self.text(&attr);
                self.emit_store_field(target, obj_reg, &field, value);
                return;
            }
        }
        if self.profile.subscript_node_types.contains(&kind) {
            let object = self.field_or_nth(target, self.profile.subscript_value_field, 0);
            let index = target
                .child_by_field_name(self.profile.subscript_index_field)
                .or_else(|| self.useful_children(target).into_iter().nth(1));
            if let (Some(object), Some(index)) = (object, index) {
                let obj_reg = self.lower_expr(&object);
                let idx_reg = self.lower_expr(&index);
                self.emit_store_index(target, obj_reg, idx_reg, value);
                return;
            }
        }
        // Conservative: store under the raw source text so the name flows
        // through downstream analyses untouched.
        let name = self.text(target);
        self.store_var_at(target, name, value);
    }

    /// Destructuring: element `i` of a tuple/list pattern receives
    /// `value[i]` through a recursive store, so nested patterns unfold.
    pub fn lower_pattern_elements(&mut self, elements: &[N], value: Reg) {
        for (i, element) in elements.iter().enumerate() {
            let idx = self.const_at(element, i.to_string());
            let item = {
                let dest = self.fresh_reg();
                self.push_at(
                    element,
                    crate::ir::InstKind::LoadIndex {
                        dest,
                        object: value,
                        index: idx,
                    },
                );
                dest
            };
            self.lower_store_target(element, item);
        }
    }

    // ------------------------------------------------------------------
    // User-level goto labels
    // ------------------------------------------------------------------

    /// Emits a `user_`-prefixed label for a source-level label name.
    pub fn emit_user_label(&mut self, node: &N, name: &str) {
        let label = format!("{}{name}", canon::USER_LABEL_PREFIX);
        self.label_at(node, label);
    }

    /// Emits a branch to a `user_`-prefixed label.
    pub fn emit_user_goto(&mut self, node: &N, name: &str) {
        let target = format!("{}{name}", canon::USER_LABEL_PREFIX);
        self.branch_at(node, target);
    }
}
