// src/sema/scope.rs

use rustc_hash::FxHashMap;

use crate::frontend::Symbol;
use crate::sema::entity::{EntityArena, EntityId};

/// Handle to a lexical scope in the [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A lexical region mapping names to entities. Scopes form a tree rooted at
/// the universe scope; each checker's file scope is a child of the universe.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// Children in opening order; walked in order at teardown so unused
    /// variable warnings come out deterministically.
    pub children: Vec<ScopeId>,
    elements: FxHashMap<Symbol, EntityId>,
    /// Insertion order of `elements`, for deterministic iteration.
    inserted: Vec<EntityId>,
}

impl Scope {
    fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            elements: FxHashMap::default(),
            inserted: Vec::new(),
        }
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> &[EntityId] {
        &self.inserted
    }
}

/// Flat storage for scopes.
#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new scope under `parent` and splice it into the parent's
    /// child list.
    pub fn open(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(parent));
        if let Some(parent) = parent {
            self.scopes[parent.0 as usize].children.push(id);
        }
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Install an entity in a scope. If a sibling with the same name already
    /// exists the existing entity is returned and the scope is unchanged;
    /// the caller reports "redeclared". The anonymous name never reaches the
    /// element map, so `_` can be bound any number of times.
    pub fn insert(
        &mut self,
        id: ScopeId,
        name: Symbol,
        entity: EntityId,
        entities: &mut EntityArena,
        blank: Symbol,
    ) -> Option<EntityId> {
        if name != blank {
            let scope = &mut self.scopes[id.0 as usize];
            if let Some(&existing) = scope.elements.get(&name) {
                return Some(existing);
            }
            scope.elements.insert(name, entity);
            scope.inserted.push(entity);
        }
        let slot = &mut entities.get_mut(entity).scope;
        if slot.is_none() {
            *slot = Some(id);
        }
        None
    }

    /// Walk the parent chain; return the first entity with this name and the
    /// scope it came from.
    pub fn lookup(&self, from: ScopeId, name: Symbol) -> Option<(ScopeId, EntityId)> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(&entity) = scope.elements.get(&name) {
                return Some((id, entity));
            }
            current = scope.parent;
        }
        None
    }

    /// Scope-local lookup only; used for redeclaration detection.
    pub fn lookup_current(&self, id: ScopeId, name: Symbol) -> Option<EntityId> {
        self.get(id).elements.get(&name).copied()
    }

    /// True if `ancestor` is `scope` or one of its transitive parents.
    pub fn is_ancestor(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Span;
    use crate::sema::entity::EntityKind;
    use crate::sema::type_arena::TypeId;

    fn var(entities: &mut EntityArena, name: Symbol) -> EntityId {
        entities.alloc(
            EntityKind::Variable {
                used: false,
                address_taken: false,
            },
            name,
            Span::default(),
            TypeId::INVALID,
        )
    }

    #[test]
    fn insert_detects_redeclaration() {
        let mut scopes = ScopeArena::new();
        let mut entities = EntityArena::new();
        let blank = Symbol(999);
        let root = scopes.open(None);
        let first = var(&mut entities, Symbol(1));
        let second = var(&mut entities, Symbol(1));

        assert_eq!(scopes.insert(root, Symbol(1), first, &mut entities, blank), None);
        assert_eq!(
            scopes.insert(root, Symbol(1), second, &mut entities, blank),
            Some(first)
        );
    }

    #[test]
    fn blank_name_never_enters_the_map() {
        let mut scopes = ScopeArena::new();
        let mut entities = EntityArena::new();
        let blank = Symbol(0);
        let root = scopes.open(None);
        let a = var(&mut entities, blank);
        let b = var(&mut entities, blank);

        assert_eq!(scopes.insert(root, blank, a, &mut entities, blank), None);
        assert_eq!(scopes.insert(root, blank, b, &mut entities, blank), None);
        assert_eq!(scopes.lookup(root, blank), None);
        // the entity still records its scope for diagnostics
        assert_eq!(entities.get(a).scope, Some(root));
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let mut scopes = ScopeArena::new();
        let mut entities = EntityArena::new();
        let blank = Symbol(999);
        let root = scopes.open(None);
        let child = scopes.open(Some(root));
        let grandchild = scopes.open(Some(child));

        let e = var(&mut entities, Symbol(1));
        scopes.insert(root, Symbol(1), e, &mut entities, blank);

        assert_eq!(scopes.lookup(grandchild, Symbol(1)), Some((root, e)));
        assert_eq!(scopes.lookup_current(grandchild, Symbol(1)), None);
    }

    #[test]
    fn shadowing_resolves_to_nearest() {
        let mut scopes = ScopeArena::new();
        let mut entities = EntityArena::new();
        let blank = Symbol(999);
        let root = scopes.open(None);
        let child = scopes.open(Some(root));

        let outer = var(&mut entities, Symbol(1));
        let inner = var(&mut entities, Symbol(1));
        scopes.insert(root, Symbol(1), outer, &mut entities, blank);
        scopes.insert(child, Symbol(1), inner, &mut entities, blank);

        assert_eq!(scopes.lookup(child, Symbol(1)), Some((child, inner)));
        assert_eq!(scopes.lookup(root, Symbol(1)), Some((root, outer)));
    }

    #[test]
    fn ancestry() {
        let mut scopes = ScopeArena::new();
        let root = scopes.open(None);
        let child = scopes.open(Some(root));
        let sibling = scopes.open(Some(root));
        assert!(scopes.is_ancestor(root, child));
        assert!(scopes.is_ancestor(child, child));
        assert!(!scopes.is_ancestor(child, sibling));
    }
}
