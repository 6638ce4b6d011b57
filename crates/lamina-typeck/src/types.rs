use lamina_ast::BaseTy;
use smol_str::SmolStr;
use std::fmt;

// ── Types ────────────────────────────────────────────────────────

pub type CellId = u32;

#[derive(Clone, Debug, PartialEq)]
pub enum Ty {
    /// Concrete base numeric kind.
    Base(BaseTy),
    /// Polymorphic type variable, rigid only within its generalizing
    /// binding's scope.
    Poly(SmolStr),
    /// Function type: curried, right-associative.
    Fn(Box<Ty>, Box<Ty>),
    /// Reference to a unification cell in the `CellStore`.
    Unif(CellId),
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Base(base) => write!(f, "{}", base),
            Ty::Poly(name) => write!(f, "{}", name),
            Ty::Unif(id) => write!(f, "#{}", id),
            Ty::Fn(param, ret) => {
                // A function-typed parameter needs parentheses.
                if matches!(**param, Ty::Fn(_, _)) {
                    write!(f, "({}) -> {}", param, ret)
                } else {
                    write!(f, "{} -> {}", param, ret)
                }
            }
        }
    }
}

// ── Unification cells ────────────────────────────────────────────

/// A deferred constraint recorded on a not-yet-resolved cell, as tagged
/// data rather than an opaque predicate. All recorded constraints must
/// hold at resolution time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// The cell must (or must not) resolve to a base numeric kind.
    Numeric { expected: bool },
}

#[derive(Clone, Debug, Default)]
pub struct Cell {
    pub resolved: Option<Ty>,
    pub constraints: Vec<Constraint>,
}

/// Arena of unification cells indexed by `CellId`. Each cell is
/// write-once-then-immutable: resolving the same cell twice is a
/// compiler defect.
#[derive(Debug, Default)]
pub struct CellStore {
    cells: Vec<Cell>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn fresh(&mut self) -> CellId {
        let id = self.cells.len() as CellId;
        self.cells.push(Cell::default());
        id
    }

    pub fn resolved(&self, id: CellId) -> Option<&Ty> {
        self.cells[id as usize].resolved.as_ref()
    }

    /// Resolve a cell, returning its recorded constraints for the caller
    /// to verify against the resolution.
    pub fn resolve(&mut self, id: CellId, ty: Ty) -> Vec<Constraint> {
        let cell = &mut self.cells[id as usize];
        if cell.resolved.is_some() {
            panic!("compiler bug: unification cell #{} resolved twice", id);
        }
        cell.resolved = Some(ty);
        cell.constraints.clone()
    }

    pub fn add_constraint(&mut self, id: CellId, constraint: Constraint) {
        let cell = &mut self.cells[id as usize];
        if cell.resolved.is_some() {
            panic!(
                "compiler bug: constraint recorded on already-resolved cell #{}",
                id
            );
        }
        cell.constraints.push(constraint);
    }
}
