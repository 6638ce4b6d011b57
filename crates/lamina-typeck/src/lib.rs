mod error;
mod types;

#[cfg(test)]
mod tests;

pub use error::{TypeError, TypeErrorKind};
pub use types::{Cell, CellId, CellStore, Constraint, Ty};

use la_arena::ArenaMap;
use lamina_ast::{Binding, ExprId, ExprKind, Program, Span, TypeAnn};
use smol_str::SmolStr;
use std::collections::HashMap;

// ── Result ───────────────────────────────────────────────────────

/// Inferred types for a whole program. Every stored type is fully
/// substituted through the cell store; no unification cell that was
/// resolved during inference leaks into a consumer.
#[derive(Debug)]
pub struct TypeckResult {
    /// Inferred type for every expression node.
    pub expr_types: ArenaMap<ExprId, Ty>,
    /// Generalized type of each top-level binding, in program order.
    pub binding_types: Vec<(SmolStr, Ty)>,
}

// ── Public API ───────────────────────────────────────────────────

/// Type-check a program, in binding order. Fails on the first
/// unresolvable node; later bindings are not checked.
pub fn check(program: &Program) -> Result<TypeckResult, TypeError> {
    let mut checker = TypeChecker::new(program);
    for binding in &program.bindings {
        checker.check_binding(binding)?;
    }
    Ok(checker.finish())
}

// ── Type checker ─────────────────────────────────────────────────

struct TypeChecker<'a> {
    program: &'a Program,
    cells: CellStore,

    /// Records the inferred type of every expression.
    expr_types: ArenaMap<ExprId, Ty>,
    /// Generalized binding types, in program order.
    binding_types: Vec<(SmolStr, Ty)>,

    /// Scope stack of (name, type); the innermost entry is last.
    scope: Vec<(SmolStr, Ty)>,
    /// Names of currently-rigid poly variables.
    bound_vars: Vec<SmolStr>,
}

impl<'a> TypeChecker<'a> {
    fn new(program: &'a Program) -> Self {
        Self {
            program,
            cells: CellStore::new(),
            expr_types: ArenaMap::default(),
            binding_types: Vec::new(),
            scope: Vec::new(),
            bound_vars: Vec::new(),
        }
    }

    fn finish(self) -> TypeckResult {
        // Apply the final substitution to all recorded expression types.
        let mut expr_types = ArenaMap::default();
        for (id, ty) in self.expr_types.iter() {
            expr_types.insert(id, self.apply(ty));
        }
        TypeckResult {
            expr_types,
            binding_types: self.binding_types,
        }
    }

    fn expr_ty(&self, id: ExprId) -> Ty {
        match self.expr_types.get(id) {
            Some(ty) => ty.clone(),
            None => panic!("compiler bug: no type recorded for expression"),
        }
    }

    /// Render a type for diagnostics, dereferencing resolved cells.
    fn display(&self, ty: &Ty) -> String {
        self.apply(ty).to_string()
    }

    // ── Substitution ─────────────────────────────────────────────

    /// Dereference resolved cells transparently, structurally.
    fn apply(&self, ty: &Ty) -> Ty {
        match ty {
            Ty::Unif(id) => match self.cells.resolved(*id) {
                Some(resolved) => self.apply(&resolved.clone()),
                None => ty.clone(),
            },
            Ty::Fn(param, ret) => Ty::Fn(
                Box::new(self.apply(param)),
                Box::new(self.apply(ret)),
            ),
            _ => ty.clone(),
        }
    }

    // ── Cells and constraints ────────────────────────────────────

    /// Resolve a cell and verify its deferred constraints against the
    /// resolution. The cell stays resolved even when a constraint fails:
    /// the whole pass aborts on the error.
    fn resolve_cell(&mut self, id: CellId, ty: Ty, span: Span) -> Result<(), TypeError> {
        if matches!(ty, Ty::Unif(other) if other == id) {
            return Ok(());
        }
        let constraints = self.cells.resolve(id, ty.clone());
        for constraint in &constraints {
            if !self.constraint_holds(constraint, &ty) {
                return Err(TypeError::new(
                    TypeErrorKind::ConstraintViolation(self.display(&ty)),
                    span,
                ));
            }
        }
        Ok(())
    }

    fn constraint_holds(&mut self, constraint: &Constraint, ty: &Ty) -> bool {
        match constraint {
            Constraint::Numeric { expected } => self.numericness(ty, *expected) == *expected,
        }
    }

    /// Whether a type is a base numeric kind. Asking about an unresolved
    /// cell defers the question onto that cell as a recorded constraint
    /// and reports the expected answer.
    fn numericness(&mut self, ty: &Ty, expected: bool) -> bool {
        match self.apply(ty) {
            Ty::Base(_) => true,
            Ty::Poly(_) | Ty::Fn(_, _) => false,
            Ty::Unif(id) => {
                self.cells.add_constraint(id, Constraint::Numeric { expected });
                expected
            }
        }
    }

    // ── Structural comparison ────────────────────────────────────

    /// Structural agreement up to cell resolution. Comparing against an
    /// unresolved cell resolves it: unification, not a pure predicate.
    fn types_agree(&mut self, t1: &Ty, t2: &Ty, span: Span) -> Result<bool, TypeError> {
        let t1 = self.apply(t1);
        let t2 = self.apply(t2);

        if t1 == t2 {
            return Ok(true);
        }

        match (&t1, &t2) {
            (Ty::Fn(p1, r1), Ty::Fn(p2, r2)) => {
                Ok(self.types_agree(p1, p2, span)? && self.types_agree(r1, r2, span)?)
            }
            (Ty::Fn(_, _), _) | (_, Ty::Fn(_, _)) => Ok(false),
            (Ty::Unif(id), other) | (other, Ty::Unif(id)) => {
                self.resolve_cell(*id, (*other).clone(), span)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // ── Application solving ──────────────────────────────────────

    /// Directional unification at an application: the parameter type
    /// drives the argument type. Free poly variables are bound in the
    /// per-call-site solution map instead of mutating any state.
    fn solve(
        &mut self,
        param: &Ty,
        arg: &Ty,
        solutions: &mut HashMap<SmolStr, Ty>,
        span: Span,
    ) -> Result<(), TypeError> {
        let param = self.apply(param);
        let arg = self.apply(arg);

        if param == arg {
            return Ok(());
        }

        match &param {
            // A free poly variable instantiates at this call site.
            Ty::Poly(name) if !self.bound_vars.contains(name) => {
                if let Some(existing) = solutions.get(name).cloned() {
                    if !self.types_agree(&existing, &arg, span)? {
                        return Err(TypeError::new(
                            TypeErrorKind::OccursCheck {
                                name: name.clone(),
                                first: self.display(&existing),
                                second: self.display(&arg),
                            },
                            span,
                        ));
                    }
                }
                solutions.insert(name.clone(), arg);
                Ok(())
            }

            // Base kinds and rigid poly variables demand a structural
            // match; agreement resolves an unresolved argument cell.
            Ty::Base(_) | Ty::Poly(_) => {
                if !self.types_agree(&param, &arg, span)? {
                    return Err(TypeError::new(
                        TypeErrorKind::TypeMismatch(format!(
                            "expected {}, got {}",
                            self.display(&param),
                            self.display(&arg)
                        )),
                        span,
                    ));
                }
                Ok(())
            }

            Ty::Fn(p_param, p_ret) => match &arg {
                // Split the unresolved argument cell into an arrow of two
                // fresh cells, then re-unify against the split.
                Ty::Unif(cell) => {
                    let arrow = Ty::Fn(
                        Box::new(Ty::Unif(self.cells.fresh())),
                        Box::new(Ty::Unif(self.cells.fresh())),
                    );
                    self.resolve_cell(*cell, arrow.clone(), span)?;
                    self.solve(&param, &arrow, solutions, span)
                }
                Ty::Fn(a_param, a_ret) => {
                    self.solve(p_param, a_param, solutions, span)?;
                    self.solve(p_ret, a_ret, solutions, span)
                }
                _ => Err(TypeError::new(
                    TypeErrorKind::TypeMismatch(format!(
                        "expected {}, got {}",
                        self.display(&param),
                        self.display(&arg)
                    )),
                    span,
                )),
            },

            Ty::Unif(cell) => self.resolve_cell(*cell, arg.clone(), span),
        }
    }

    /// Substitute call-site solutions for free poly variables in the
    /// return type; uncovered free variables pass through unchanged.
    fn instantiate(&self, ty: &Ty, solutions: &HashMap<SmolStr, Ty>) -> Ty {
        match ty {
            Ty::Poly(name) if !self.bound_vars.contains(name) => {
                solutions.get(name).cloned().unwrap_or_else(|| ty.clone())
            }
            Ty::Fn(param, ret) => Ty::Fn(
                Box::new(self.instantiate(param, solutions)),
                Box::new(self.instantiate(ret, solutions)),
            ),
            _ => ty.clone(),
        }
    }

    // ── Generalization ───────────────────────────────────────────

    /// Resolve every unification cell still reachable from `ty` into a
    /// fresh rigid poly variable namespaced by the binding's name, so
    /// distinct bindings never share a generalized variable. The
    /// namespace extends with `_` through parameter positions and `'`
    /// through return positions.
    fn terminate(&mut self, ty: &Ty, namespace: &str, span: Span) -> Result<Ty, TypeError> {
        match self.apply(ty) {
            Ty::Fn(param, ret) => {
                let param = self.terminate(&param, &format!("{}_", namespace), span)?;
                let ret = self.terminate(&ret, &format!("{}'", namespace), span)?;
                Ok(Ty::Fn(Box::new(param), Box::new(ret)))
            }
            Ty::Unif(id) => {
                let fresh = Ty::Poly(SmolStr::new(format!("{}_u", namespace)));
                self.resolve_cell(id, fresh.clone(), span)?;
                Ok(fresh)
            }
            other => Ok(other),
        }
    }

    // ── Checking ─────────────────────────────────────────────────

    fn check_binding(&mut self, binding: &Binding) -> Result<(), TypeError> {
        // Self-binding: the name resolves to a fresh cell inside its own
        // expression. This is name resolution, not recursion; the cell is
        // generalized only after the whole expression checks.
        let self_ty = Ty::Unif(self.cells.fresh());
        self.scope.push((binding.name.clone(), self_ty));
        let checked = self.check_expr(binding.value);
        self.scope.pop();
        checked?;

        let expr_ty = self.expr_ty(binding.value);
        let generalized = self.terminate(&expr_ty, binding.name.as_str(), binding.span)?;
        self.binding_types.push((binding.name.clone(), generalized.clone()));
        self.scope.push((binding.name.clone(), generalized));
        Ok(())
    }

    fn check_expr(&mut self, id: ExprId) -> Result<(), TypeError> {
        let program = self.program;
        let expr = &program.exprs[id];
        match &expr.kind {
            ExprKind::Num { value, declared } => self.check_num(id, *value, declared, expr.span),
            ExprKind::Var(name) => self.check_var(id, name, expr.span),
            ExprKind::Abs {
                param,
                param_ann,
                body,
                ..
            } => self.check_abs(id, param, param_ann, *body),
            ExprKind::App { func, arg } => self.check_app(id, *func, *arg, expr.span),
            ExprKind::Arith { lhs, rhs, .. } => self.check_arith(id, *lhs, *rhs, expr.span),
        }
    }

    fn check_num(
        &mut self,
        id: ExprId,
        value: f64,
        declared: &TypeAnn,
        span: Span,
    ) -> Result<(), TypeError> {
        match declared {
            TypeAnn::Base(base) => {
                if base.is_integer() && value.fract() != 0.0 {
                    return Err(TypeError::new(
                        TypeErrorKind::NonIntegerLiteral {
                            value,
                            ty: base.to_string(),
                        },
                        span,
                    ));
                }
                self.expr_types.insert(id, Ty::Base(*base));
                Ok(())
            }
            other => Err(TypeError::new(
                TypeErrorKind::NonNumericLiteralType(other.to_string()),
                span,
            )),
        }
    }

    fn check_var(&mut self, id: ExprId, name: &SmolStr, span: Span) -> Result<(), TypeError> {
        // The innermost binding wins name resolution.
        let ty = self
            .scope
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, ty)| ty.clone());
        match ty {
            Some(ty) => {
                self.expr_types.insert(id, ty);
                Ok(())
            }
            None => Err(TypeError::new(
                TypeErrorKind::UnboundVariable(name.clone()),
                span,
            )),
        }
    }

    fn check_abs(
        &mut self,
        id: ExprId,
        param: &SmolStr,
        param_ann: &TypeAnn,
        body: ExprId,
    ) -> Result<(), TypeError> {
        let param_ty = lower_ann(param_ann);

        // Poly variables named in the annotation are rigid for the body.
        let rigid_base = self.bound_vars.len();
        collect_poly_vars(param_ann, &mut self.bound_vars);
        self.scope.push((param.clone(), param_ty.clone()));

        let checked = self.check_expr(body);

        self.scope.pop();
        self.bound_vars.truncate(rigid_base);
        checked?;

        let body_ty = self.expr_ty(body);
        self.expr_types
            .insert(id, Ty::Fn(Box::new(param_ty), Box::new(body_ty)));
        Ok(())
    }

    fn check_app(
        &mut self,
        id: ExprId,
        func: ExprId,
        arg: ExprId,
        span: Span,
    ) -> Result<(), TypeError> {
        self.check_expr(func)?;
        self.check_expr(arg)?;

        let fn_ty = self.apply(&self.expr_ty(func));
        let (param_ty, ret_ty) = match fn_ty {
            Ty::Fn(param, ret) => (param, ret),
            other => {
                return Err(TypeError::new(
                    TypeErrorKind::NotAFunction(other.to_string()),
                    span,
                ))
            }
        };

        let arg_ty = self.expr_ty(arg);
        let mut solutions = HashMap::new();
        self.solve(&param_ty, &arg_ty, &mut solutions, span)?;
        log::debug!("call-site solutions at [{}:{}]: {:?}", span.start, span.end, solutions);

        let result = self.instantiate(&ret_ty, &solutions);
        self.expr_types.insert(id, result);
        Ok(())
    }

    fn check_arith(
        &mut self,
        id: ExprId,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> Result<(), TypeError> {
        self.check_expr(lhs)?;
        self.check_expr(rhs)?;

        let lhs_ty = self.apply(&self.expr_ty(lhs));
        let rhs_ty = self.apply(&self.expr_ty(rhs));

        for ty in [&lhs_ty, &rhs_ty] {
            match ty {
                Ty::Fn(_, _) => {
                    return Err(TypeError::new(
                        TypeErrorKind::TypeMismatch(format!(
                            "functions cannot be operands of arithmetic (found {})",
                            self.display(ty)
                        )),
                        span,
                    ))
                }
                Ty::Poly(_) => {
                    return Err(TypeError::new(
                        TypeErrorKind::PolymorphicOperand(self.display(ty)),
                        span,
                    ))
                }
                _ => {}
            }
        }

        if !self.types_agree(&lhs_ty, &rhs_ty, span)? {
            return Err(TypeError::new(
                TypeErrorKind::TypeMismatch(format!(
                    "arithmetic operands disagree: {} vs {}",
                    self.display(&lhs_ty),
                    self.display(&rhs_ty)
                )),
                span,
            ));
        }

        if !self.numericness(&lhs_ty, true) {
            return Err(TypeError::new(
                TypeErrorKind::TypeMismatch(format!(
                    "only numeric values can be operands of arithmetic, got {}",
                    self.display(&lhs_ty)
                )),
                span,
            ));
        }

        let result = self.apply(&lhs_ty);
        self.expr_types.insert(id, result);
        Ok(())
    }
}

// ── Annotation lowering ──────────────────────────────────────────

/// Lower a syntactic annotation into the type representation.
fn lower_ann(ann: &TypeAnn) -> Ty {
    match ann {
        TypeAnn::Base(base) => Ty::Base(*base),
        TypeAnn::Poly(name) => Ty::Poly(name.clone()),
        TypeAnn::Fn(param, ret) => {
            Ty::Fn(Box::new(lower_ann(param)), Box::new(lower_ann(ret)))
        }
    }
}

/// Collect poly variable names appearing in an annotation.
fn collect_poly_vars(ann: &TypeAnn, out: &mut Vec<SmolStr>) {
    match ann {
        TypeAnn::Base(_) => {}
        TypeAnn::Poly(name) => out.push(name.clone()),
        TypeAnn::Fn(param, ret) => {
            collect_poly_vars(param, out);
            collect_poly_vars(ret, out);
        }
    }
}
