//! Runtime support routines emitted inline into every module.
//!
//! Context nodes (captured lexical state) and closures live in two
//! append-only bump regions of linear memory, addressed by monotonically
//! increasing integer handles (handle = cell index; address = region base
//! + handle * stride). Nothing is freed or mutated after creation, and
//! every outer link points at a strictly earlier node.

use std::fmt::Write;

/// Memory layout constants.
pub const CONTEXT_REGION_START: u32 = 0x1000;
/// 8-byte value slot + 4-byte outer handle, padded to 16.
pub const CONTEXT_NODE_SIZE: u32 = 16;
pub const CLOSURE_REGION_START: u32 = 0x40000;
/// Function table index + context handle.
pub const CLOSURE_CELL_SIZE: u32 = 8;
/// 64KiB pages; 1MiB bounds the heap for one compiled program run.
pub const INITIAL_PAGES: u32 = 16;

/// Handle sentinel for "no outer link". Walking past it is a defect and
/// traps via `unreachable`.
pub const NO_OUTER: i32 = -1;

/// Scalar kinds a context node's value slot can hold.
pub const SCALAR_KINDS: [&str; 4] = ["i32", "i64", "f32", "f64"];

/// Emit the memory, the two region counters, and every support routine.
pub fn runtime_support() -> String {
    let mut out = String::new();
    out.push_str(&format!("  (memory {})\n", INITIAL_PAGES));
    out.push_str("  (global $context_count (mut i32) (i32.const 0))\n");
    out.push_str("  (global $closure_count (mut i32) (i32.const 0))\n");
    for kind in SCALAR_KINDS {
        emit_context_fns(&mut out, kind);
    }
    emit_closure_fns(&mut out);
    out
}

/// `create_context_{t}`, `alloc_context_var_{t}`, `read_{t}_from_context`
/// for one scalar kind.
fn emit_context_fns(out: &mut String, kind: &str) {
    let start = CONTEXT_REGION_START;
    let size = CONTEXT_NODE_SIZE;

    // New outermost node: value stored, no outer link.
    writeln!(
        out,
        "  (func $create_context_{kind} (param $value {kind}) (result i32)
    (local $handle i32)
    (local $addr i32)
    (local.set $handle (global.get $context_count))
    (local.set $addr (i32.add (i32.const {start}) (i32.mul (local.get $handle) (i32.const {size}))))
    ({kind}.store (local.get $addr) (local.get $value))
    (i32.store offset=8 (local.get $addr) (i32.const {NO_OUTER}))
    (global.set $context_count (i32.add (local.get $handle) (i32.const 1)))
    (local.get $handle))"
    )
    .unwrap();

    // New node chained to an existing outer handle.
    writeln!(
        out,
        "  (func $alloc_context_var_{kind} (param $value {kind}) (param $outer i32) (result i32)
    (local $handle i32)
    (local $addr i32)
    (local.set $handle (global.get $context_count))
    (local.set $addr (i32.add (i32.const {start}) (i32.mul (local.get $handle) (i32.const {size}))))
    ({kind}.store (local.get $addr) (local.get $value))
    (i32.store offset=8 (local.get $addr) (local.get $outer))
    (global.set $context_count (i32.add (local.get $handle) (i32.const 1)))
    (local.get $handle))"
    )
    .unwrap();

    // Walk exactly `offset` outer links, then load the stored value.
    writeln!(
        out,
        "  (func $read_{kind}_from_context (param $offset i32) (param $context i32) (result {kind})
    (block $done
      (loop $walk
        (br_if $done (i32.eqz (local.get $offset)))
        (if (i32.eq (local.get $context) (i32.const {NO_OUTER})) (then (unreachable)))
        (local.set $context (i32.load offset=8 (i32.add (i32.const {start}) (i32.mul (local.get $context) (i32.const {size})))))
        (local.set $offset (i32.sub (local.get $offset) (i32.const 1)))
        (br $walk)))
    ({kind}.load (i32.add (i32.const {start}) (i32.mul (local.get $context) (i32.const {size})))))"
    )
    .unwrap();
}

fn emit_closure_fns(out: &mut String) {
    let start = CLOSURE_REGION_START;
    let size = CLOSURE_CELL_SIZE;

    writeln!(
        out,
        "  (func $create_closure (param $fref i32) (param $context i32) (result i32)
    (local $handle i32)
    (local $addr i32)
    (local.set $handle (global.get $closure_count))
    (local.set $addr (i32.add (i32.const {start}) (i32.mul (local.get $handle) (i32.const {size}))))
    (i32.store (local.get $addr) (local.get $fref))
    (i32.store offset=4 (local.get $addr) (local.get $context))
    (global.set $closure_count (i32.add (local.get $handle) (i32.const 1)))
    (local.get $handle))"
    )
    .unwrap();

    writeln!(
        out,
        "  (func $get_fref_from_closure (param $closure i32) (result i32)
    (i32.load (i32.add (i32.const {start}) (i32.mul (local.get $closure) (i32.const {size})))))"
    )
    .unwrap();

    writeln!(
        out,
        "  (func $get_context_from_closure (param $closure i32) (result i32)
    (i32.load offset=4 (i32.add (i32.const {start}) (i32.mul (local.get $closure) (i32.const {size})))))"
    )
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_routines_assemble_alone() {
        let module = format!("(module\n{})", runtime_support());
        wat::parse_str(&module).expect("runtime support does not assemble");
    }

    #[test]
    fn every_scalar_kind_gets_its_routines() {
        let text = runtime_support();
        for kind in SCALAR_KINDS {
            assert!(text.contains(&format!("$create_context_{}", kind)));
            assert!(text.contains(&format!("$alloc_context_var_{}", kind)));
            assert!(text.contains(&format!("$read_{}_from_context", kind)));
        }
        assert!(text.contains("$create_closure"));
        assert!(text.contains("$get_fref_from_closure"));
        assert!(text.contains("$get_context_from_closure"));
    }
}
