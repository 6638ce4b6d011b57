use super::*;

fn check_src(source: &str) -> Result<TypeckResult, TypeError> {
    let (program, parse_errors) = lamina_parser::parse(source);
    assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);
    check(&program)
}

fn check_ok(source: &str) -> TypeckResult {
    match check_src(source) {
        Ok(result) => result,
        Err(e) => panic!("unexpected type error: {}", e),
    }
}

fn check_err(source: &str) -> TypeErrorKind {
    match check_src(source) {
        Ok(_) => panic!("expected a type error, got none"),
        Err(e) => e.kind,
    }
}

fn binding_ty(result: &TypeckResult, name: &str) -> String {
    result
        .binding_types
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, ty)| ty.to_string())
        .unwrap_or_else(|| panic!("no binding named {}", name))
}

// ── Passing programs ─────────────────────────────────────────────

#[test]
fn literal_arithmetic() {
    let result = check_ok("main = 2 + 3;");
    assert_eq!(binding_ty(&result, "main"), "I32");
}

#[test]
fn float_arithmetic_defaults_to_f64() {
    let result = check_ok("main = 1.5 + 2.5;");
    assert_eq!(binding_ty(&result, "main"), "F64");
}

#[test]
fn annotated_lambda() {
    let result = check_ok("addOne = \\x:I32. x + 1;");
    assert_eq!(binding_ty(&result, "addOne"), "I32 -> I32");
}

#[test]
fn application_instantiates_nothing_when_monomorphic() {
    let result = check_ok("addOne = \\x:I32. x + 1; r = addOne(41);");
    assert_eq!(binding_ty(&result, "r"), "I32");
}

#[test]
fn identity_is_polymorphic() {
    let result = check_ok("id = \\x:a. x;");
    assert_eq!(binding_ty(&result, "id"), "a -> a");
}

#[test]
fn polymorphic_application_picks_concrete_type() {
    let result = check_ok("id = \\x:a. x; r = id(41);");
    assert_eq!(binding_ty(&result, "r"), "I32");
}

#[test]
fn generalization_is_scoped_per_binding() {
    // Applying id at I32 must not constrain a later application of id2
    // at F64, even though both annotations use the same variable name.
    let result = check_ok(
        "id = \\x:a. x;
         id2 = \\x:a. x;
         r1 = id(41);
         r2 = id2(2.5:F64);",
    );
    assert_eq!(binding_ty(&result, "r1"), "I32");
    assert_eq!(binding_ty(&result, "r2"), "F64");
}

#[test]
fn one_binding_applied_at_two_types() {
    // Each call site instantiates the generalized variable independently.
    let result = check_ok("id = \\x:a. x; r1 = id(41); r2 = id(2.5:F64);");
    assert_eq!(binding_ty(&result, "r1"), "I32");
    assert_eq!(binding_ty(&result, "r2"), "F64");
}

#[test]
fn nested_captures() {
    let result = check_ok("f = \\x:I32. \\y:I32. \\z:I32. x;");
    assert_eq!(binding_ty(&result, "f"), "I32 -> I32 -> I32 -> I32");
}

#[test]
fn higher_order_parameter() {
    let result = check_ok("apply = \\f:a -> b. \\x:a. f x;");
    assert_eq!(binding_ty(&result, "apply"), "(a -> b) -> a -> b");
}

#[test]
fn rigid_variable_matches_itself() {
    let result = check_ok("twice = \\f:a -> a. \\x:a. f (f x);");
    assert_eq!(binding_ty(&result, "twice"), "(a -> a) -> a -> a");
}

#[test]
fn self_reference_generalizes_to_fresh_variable() {
    // The self-binding cell is never applied, so it survives to
    // generalization and becomes a binding-namespaced variable.
    let result = check_ok("f = f;");
    assert_eq!(binding_ty(&result, "f"), "f_u");
}

#[test]
fn argument_cell_splits_against_function_parameter() {
    // g's self cell is passed where `I32 -> I32` is expected; the cell
    // splits into an arrow of fresh cells and unifies component-wise.
    let result = check_ok("g = (\\h:I32 -> I32. h 1) g;");
    assert_eq!(binding_ty(&result, "g"), "I32");
}

#[test]
fn expression_types_are_fully_applied() {
    let (program, parse_errors) = lamina_parser::parse("g = (\\h:I32 -> I32. h 1) g;");
    assert!(parse_errors.is_empty());
    let result = check(&program).expect("type error");
    for (_, ty) in result.expr_types.iter() {
        fn has_cell(ty: &Ty) -> bool {
            match ty {
                Ty::Unif(_) => true,
                Ty::Fn(p, r) => has_cell(p) || has_cell(r),
                _ => false,
            }
        }
        assert!(!has_cell(ty), "unresolved cell leaked: {}", ty);
    }
}

#[test]
fn determinism() {
    let source = "id = \\x:a. x; r = id(41); s = \\f:a -> b. \\x:a. f x;";
    let first = check_ok(source);
    let second = check_ok(source);
    let render = |result: &TypeckResult| {
        result
            .binding_types
            .iter()
            .map(|(n, t)| format!("{}: {}", n, t))
            .collect::<Vec<_>>()
            .join("\n")
    };
    assert_eq!(render(&first), render(&second));
}

// ── Failing programs ─────────────────────────────────────────────

#[test]
fn unbound_variable() {
    assert!(matches!(
        check_err("bad = y;"),
        TypeErrorKind::UnboundVariable(name) if name == "y"
    ));
}

#[test]
fn first_error_in_binding_order_wins() {
    // `bad` fails before `worse` is ever looked at.
    assert!(matches!(
        check_err("bad = y; worse = 1 2;"),
        TypeErrorKind::UnboundVariable(_)
    ));
}

#[test]
fn literal_head_is_not_a_function() {
    assert!(matches!(
        check_err("r = 1 2;"),
        TypeErrorKind::NotAFunction(_)
    ));
}

#[test]
fn self_application_of_recursive_binding_fails() {
    // The self-binding cell never simplifies to a function type.
    assert!(matches!(
        check_err("f = \\x:I32. f x;"),
        TypeErrorKind::NotAFunction(_)
    ));
}

#[test]
fn mixed_kind_arithmetic() {
    assert!(matches!(
        check_err("f = \\x:I32. \\y:F64. x + y;"),
        TypeErrorKind::TypeMismatch(_)
    ));
}

#[test]
fn polymorphic_operand() {
    assert!(matches!(
        check_err("f = \\x:a. x + x;"),
        TypeErrorKind::PolymorphicOperand(_)
    ));
}

#[test]
fn function_operand() {
    assert!(matches!(
        check_err("f = \\g:I32 -> I32. g + 1;"),
        TypeErrorKind::TypeMismatch(_)
    ));
}

#[test]
fn fractional_integer_literal() {
    assert!(matches!(
        check_err("a = 3.5:I32;"),
        TypeErrorKind::NonIntegerLiteral { .. }
    ));
}

#[test]
fn integral_float_literal_is_fine() {
    let result = check_ok("a = 41:F64;");
    assert_eq!(binding_ty(&result, "a"), "F64");
}

#[test]
fn poly_declared_literal() {
    assert!(matches!(
        check_err("a = 5:t;"),
        TypeErrorKind::NonNumericLiteralType(_)
    ));
}

#[test]
fn argument_kind_mismatch() {
    assert!(matches!(
        check_err("f = \\x:I32. x; r = f(2.5:F64);"),
        TypeErrorKind::TypeMismatch(_)
    ));
}

#[test]
fn conflicting_instantiations_of_one_variable() {
    // `a` solves to I32 in parameter position and F64 in return position
    // of the same call site.
    assert!(matches!(
        check_err("sel = \\f:a -> a. f; bad = sel(\\x:I32. 2.5:F64);"),
        TypeErrorKind::OccursCheck { .. }
    ));
}

#[test]
fn deferred_numeric_constraint_violated_at_generalization() {
    // The operand cell picks up a numeric constraint from the arithmetic
    // but never resolves, so generalizing it into a poly variable
    // violates the constraint.
    assert!(matches!(
        check_err("d = d * d;"),
        TypeErrorKind::ConstraintViolation(_)
    ));
}

#[test]
fn rigid_variable_rejects_concrete_argument() {
    // Inside the lambda, `a` is rigid; passing a concrete I32 where the
    // rigid variable is demanded is a mismatch.
    assert!(matches!(
        check_err("f = \\g:a -> a. \\x:a. g 1;"),
        TypeErrorKind::TypeMismatch(_)
    ));
}
