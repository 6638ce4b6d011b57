pub mod runtime;
pub mod types;

pub use types::{conversion_kit, ty_to_wat, ValTy};

use lamina_ast::{ArithOp, Binding, ExprId, ExprKind, Program};
use lamina_typeck::{Ty, TypeckResult};
use smol_str::SmolStr;

// ── Error ────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("cannot export `{name}`: its type {ty} is still polymorphic")]
    UnsupportedPolymorphicAbstraction { name: SmolStr, ty: String },

    #[error("no concrete representation for type {ty}")]
    UnrepresentableType { ty: String },
}

// ── Public API ───────────────────────────────────────────────────

/// Compile a type-checked program to a WebAssembly text module.
///
/// Every top-level binding becomes one exported no-argument function;
/// every lambda lifts into a flat function dispatched through the
/// function table as a (table index, context handle) closure.
pub fn compile_module(
    program: &Program,
    types: &TypeckResult,
) -> Result<String, CodegenError> {
    let compiler = WatCompiler {
        program,
        types,
        funcs: Vec::new(),
        sigs: Vec::new(),
        table_offset: 0,
    };
    compiler.compile()
}

// ── Compiler ─────────────────────────────────────────────────────

struct WatCompiler<'a> {
    program: &'a Program,
    types: &'a TypeckResult,

    /// Lifted lambda bodies, pushed in table-index order.
    funcs: Vec<LiftedFn>,
    /// Synthesized call-site signatures, in synthesis order.
    sigs: Vec<String>,
    /// Module-wide function table offset counter.
    table_offset: u32,
}

struct LiftedFn {
    name: String,
    code: String,
    table_index: u32,
}

/// Per-binding generation state.
struct BindingCx {
    /// Binding name: the namespace for lifted functions and signatures.
    name: SmolStr,
    /// Running lambda counter within this binding.
    depth: u32,
    /// In-scope values: index 0 is the innermost parameter; index >= 1
    /// is reached by walking that many outer links of the context chain.
    scope: Vec<(SmolStr, Ty)>,
}

impl<'a> WatCompiler<'a> {
    fn compile(mut self) -> Result<String, CodegenError> {
        let program = self.program;
        let mut out = String::from("(module\n");
        out.push_str(&runtime::runtime_support());

        for (index, binding) in program.bindings.iter().enumerate() {
            let code = self.compile_binding(binding, index)?;
            out.push_str(&code);
        }

        // One table sized to the synthesized-closure count, with an
        // ascending element segment.
        out.push_str(&format!("  (table {} funcref)\n", self.funcs.len()));
        if !self.funcs.is_empty() {
            self.funcs.sort_by_key(|f| f.table_index);
            let names = self
                .funcs
                .iter()
                .map(|f| format!("${}", f.name))
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!("  (elem (i32.const 0) {})\n", names));
        }

        for func in &self.funcs {
            out.push_str(&func.code);
        }
        for sig in &self.sigs {
            out.push_str(sig);
        }
        out.push_str(")\n");

        log::debug!(
            "emitted module: {} bindings, {} lifted functions, {} signatures",
            program.bindings.len(),
            self.funcs.len(),
            self.sigs.len()
        );
        Ok(out)
    }

    /// Look up the inferred type of an expression.
    fn expr_ty(&self, id: ExprId) -> Ty {
        match self.types.expr_types.get(id) {
            Some(ty) => ty.clone(),
            None => panic!("compiler bug: no type recorded for expression"),
        }
    }

    /// A top-level binding compiles to one exported no-argument function
    /// returning the binding's monomorphic representation.
    fn compile_binding(
        &mut self,
        binding: &Binding,
        index: usize,
    ) -> Result<String, CodegenError> {
        let ty = self.types.binding_types[index].1.clone();
        if matches!(ty, Ty::Poly(_)) {
            // An export must commit to one concrete result representation.
            return Err(CodegenError::UnsupportedPolymorphicAbstraction {
                name: binding.name.clone(),
                ty: ty.to_string(),
            });
        }
        let result_vt = ty_to_wat(&ty)?;

        let mut cx = BindingCx {
            name: binding.name.clone(),
            depth: 0,
            scope: Vec::new(),
        };
        let body = self.compile_expr(&mut cx, binding.value)?;

        Ok(format!(
            "  (func ${name} (result {result_vt})\n    (local $closure_tmp i32)\n    (local $context i32)\n    {body})\n  (export \"{name}\" (func ${name}))\n",
            name = binding.name,
        ))
    }

    fn compile_expr(&mut self, cx: &mut BindingCx, id: ExprId) -> Result<String, CodegenError> {
        let program = self.program;
        let expr = &program.exprs[id];
        match &expr.kind {
            ExprKind::Num { value, .. } => self.compile_num(id, *value),
            ExprKind::Var(name) => self.compile_var(cx, id, name),
            ExprKind::Abs { param, body, .. } => self.compile_abs(cx, id, param, *body),
            ExprKind::App { func, arg } => self.compile_app(cx, id, *func, *arg),
            ExprKind::Arith { op, lhs, rhs } => self.compile_arith(cx, id, *op, *lhs, *rhs),
        }
    }

    fn compile_num(&mut self, id: ExprId, value: f64) -> Result<String, CodegenError> {
        let vt = ty_to_wat(&self.expr_ty(id))?;
        Ok(match vt {
            ValTy::I32 => format!("(i32.const {})", value as i64),
            ValTy::I64 => format!("(i64.const {})", value as i64),
            ValTy::F32 => format!("(f32.const {:?})", value),
            ValTy::F64 => format!("(f64.const {:?})", value),
        })
    }

    fn compile_var(
        &mut self,
        cx: &BindingCx,
        id: ExprId,
        name: &SmolStr,
    ) -> Result<String, CodegenError> {
        match cx.scope.iter().position(|(n, _)| n == name) {
            // The innermost parameter is a plain local.
            Some(0) => Ok(format!("(local.get ${})", name)),
            // A captured variable walks exactly `offset` outer links.
            Some(offset) => {
                let vt = ty_to_wat(&self.expr_ty(id))?;
                Ok(format!(
                    "(call $read_{}_from_context (i32.const {}) (local.get $context))",
                    vt, offset
                ))
            }
            // Anything not lexically in scope is a top-level binding.
            None => Ok(format!("(call ${})", name)),
        }
    }

    fn compile_arith(
        &mut self,
        cx: &mut BindingCx,
        id: ExprId,
        op: ArithOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<String, CodegenError> {
        let vt = ty_to_wat(&self.expr_ty(id))?;
        let lhs_code = self.compile_expr(cx, lhs)?;
        let rhs_code = self.compile_expr(cx, rhs)?;
        Ok(format!(
            "({}.{} {} {})",
            vt,
            arith_word(op, vt),
            lhs_code,
            rhs_code
        ))
    }

    /// Lift a lambda into a flat function taking its parameter plus the
    /// implicit context handle, and compile to a closure-creation call.
    fn compile_abs(
        &mut self,
        cx: &mut BindingCx,
        id: ExprId,
        param: &SmolStr,
        body: ExprId,
    ) -> Result<String, CodegenError> {
        let fn_ty = self.expr_ty(id);
        let (param_ty, ret_ty) = match fn_ty {
            Ty::Fn(p, r) => (*p, *r),
            other => panic!("compiler bug: lambda typed {} instead of a function type", other),
        };

        let fn_name = format!("{}_{}", cx.name, cx.depth);
        let param_vt = ty_to_wat(&param_ty)?;
        let ret_vt = ty_to_wat(&ret_ty)?;

        // Depth 0 starts a fresh chain holding the parameter; deeper
        // lambdas extend the chain of their enclosing abstraction.
        let context_init = if cx.depth == 0 {
            format!(
                "(local.set $context (call $create_context_{} (local.get ${})))",
                param_vt, param
            )
        } else {
            format!(
                "(local.set $context (call $alloc_context_var_{} (local.get ${}) (local.get $context)))",
                param_vt, param
            )
        };

        cx.scope.insert(0, (param.clone(), param_ty));
        cx.depth += 1;
        let body_code = self.compile_expr(cx, body);
        cx.scope.remove(0);
        let body_code = body_code?;

        let code = format!(
            "  (func ${fn_name} (param ${param} {param_vt}) (param $context i32) (result {ret_vt})\n    (local $closure_tmp i32)\n    {context_init}\n    {body_code})\n",
        );

        let table_index = self.table_offset;
        self.table_offset += 1;
        self.funcs.push(LiftedFn {
            name: fn_name,
            code,
            table_index,
        });

        // The lambda's compiled value: a closure over the chain as it
        // stands at this creation point.
        Ok(format!(
            "(call $create_closure (i32.const {}) (local.get $context))",
            table_index
        ))
    }

    /// Compile an application into an indirect call through the table,
    /// with a synthesized per-call-site signature and any conversions a
    /// polymorphic/concrete boundary demands.
    fn compile_app(
        &mut self,
        cx: &mut BindingCx,
        id: ExprId,
        func: ExprId,
        arg: ExprId,
    ) -> Result<String, CodegenError> {
        let fn_ty = self.expr_ty(func);
        let (param_ty, ret_ty) = match fn_ty {
            Ty::Fn(p, r) => (*p, *r),
            other => panic!("compiler bug: application head typed {}", other),
        };
        let expected_ty = self.expr_ty(id);
        let arg_ty = self.expr_ty(arg);

        let sig_name = format!("_sig_{}_{}", cx.name, self.sigs.len());
        let param_vt = ty_to_wat(&param_ty)?;
        let ret_vt = ty_to_wat(&ret_ty)?;
        self.sigs.push(format!(
            "  (type ${sig_name} (func (param {param_vt}) (param i32) (result {ret_vt})))\n",
        ));

        let mut arg_code = self.compile_expr(cx, arg)?;
        if matches!(param_ty, Ty::Poly(_)) && !matches!(arg_ty, Ty::Poly(_)) {
            let (into_container, _) = conversion_kit(ty_to_wat(&arg_ty)?);
            for op in into_container {
                arg_code = format!("({} {})", op, arg_code);
            }
        }

        let func_code = self.compile_expr(cx, func)?;
        let mut call = format!(
            "(call_indirect (type ${sig_name}) {arg_code} (local.set $closure_tmp {func_code}) (call $get_context_from_closure (local.get $closure_tmp)) (call $get_fref_from_closure (local.get $closure_tmp)))",
        );
        if matches!(ret_ty, Ty::Poly(_)) && !matches!(expected_ty, Ty::Poly(_)) {
            let (_, out_of_container) = conversion_kit(ty_to_wat(&expected_ty)?);
            for op in out_of_container {
                call = format!("({} {})", op, call);
            }
        }
        Ok(call)
    }
}

fn arith_word(op: ArithOp, vt: ValTy) -> &'static str {
    match op {
        ArithOp::Add => "add",
        ArithOp::Sub => "sub",
        ArithOp::Mul => "mul",
        // Integer division is signed; floats have a single division.
        ArithOp::Div => match vt {
            ValTy::I32 | ValTy::I64 => "div_s",
            ValTy::F32 | ValTy::F64 => "div",
        },
    }
}

// ── Tests ────────────────────────────────────────────────────────
