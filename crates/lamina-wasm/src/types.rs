use lamina_ast::BaseTy;
use lamina_typeck::Ty;
use std::fmt;

use crate::CodegenError;

/// A WebAssembly value type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValTy {
    I32,
    I64,
    F32,
    F64,
}

impl ValTy {
    pub fn name(self) -> &'static str {
        match self {
            ValTy::I32 => "i32",
            ValTy::I64 => "i64",
            ValTy::F32 => "f32",
            ValTy::F64 => "f64",
        }
    }
}

impl fmt::Display for ValTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Map an inferred type to its value representation.
///
/// Base kinds map to the matching scalar; a monomorphic function type is
/// an `i32` closure handle; a polymorphic value travels in the `i64`
/// fixed-width container. An unresolved unification cell has no
/// representation.
pub fn ty_to_wat(ty: &Ty) -> Result<ValTy, CodegenError> {
    match ty {
        Ty::Base(BaseTy::I32) => Ok(ValTy::I32),
        Ty::Base(BaseTy::I64) => Ok(ValTy::I64),
        Ty::Base(BaseTy::F32) => Ok(ValTy::F32),
        Ty::Base(BaseTy::F64) => Ok(ValTy::F64),
        Ty::Fn(_, _) => Ok(ValTy::I32),
        Ty::Poly(_) => Ok(ValTy::I64),
        Ty::Unif(_) => Err(CodegenError::UnrepresentableType { ty: ty.to_string() }),
    }
}

/// Instruction sequences moving a concrete value into and out of the
/// polymorphic `i64` container: integers widen/narrow, floats reinterpret
/// their bit pattern. The container width itself converts as the identity.
pub fn conversion_kit(vt: ValTy) -> (&'static [&'static str], &'static [&'static str]) {
    match vt {
        ValTy::I32 => (&["i64.extend_i32_s"], &["i32.wrap_i64"]),
        ValTy::I64 => (&[], &[]),
        ValTy::F32 => (
            &["f64.promote_f32", "i64.reinterpret_f64"],
            &["f64.reinterpret_i64", "f32.demote_f64"],
        ),
        ValTy::F64 => (&["i64.reinterpret_f64"], &["f64.reinterpret_i64"]),
    }
}
