//! The program side of the documentation model: entities and their arena.
//!
//! Entities form a strict tree under the root namespace. Parents own their
//! children as ordered id sequences; the only upward edges are non-owning
//! parent ids, so the structure is acyclic and trivially destructible.

use super::document::Document;

/// Index-based handle to an [Entity] in its [EntityArena].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(usize);

impl EntityId {
    pub fn to_usize(self) -> usize {
        self.0
    }
}

/// Owns every entity in a model.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityArena {
    entities: Vec<Entity>,
}

impl EntityArena {
    pub fn alloc(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len());
        self.entities.push(entity);
        id
    }

    pub fn get(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn get_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i), e))
    }

    /// The nearest enclosing namespace of `id`, following parent ids; the
    /// root namespace if nothing closer is found.
    pub fn enclosing_namespace(&self, id: EntityId, root: EntityId) -> EntityId {
        let mut cursor = self.get(id).parent;
        while let Some(current) = cursor {
            if matches!(self.get(current).kind, EntityKind::Namespace { .. }) {
                return current;
            }
            cursor = self.get(current).parent;
        }
        root
    }
}

/// A documented program entity.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub brief: Option<String>,
    pub since: Option<String>,
    pub description: Option<Document>,
    /// Non-owning back-reference; `None` only for the root namespace and
    /// top-level macros.
    pub parent: Option<EntityId>,
}

impl Entity {
    pub fn new<S: Into<String>>(name: S, kind: EntityKind) -> Entity {
        Entity {
            name: name.into(),
            kind,
            brief: None,
            since: None,
            description: None,
            parent: None,
        }
    }

    /// The ordered child ids, for the kinds that own children.
    pub fn children(&self) -> &[EntityId] {
        match &self.kind {
            EntityKind::Namespace { entities } => entities,
            EntityKind::Class { members } => members,
            EntityKind::Enum { values, .. } => values,
            EntityKind::Function(function) => &function.parameters,
            _ => &[],
        }
    }
}

/// A declaration that parsed into structure, or the raw text it came from.
///
/// The declaration parser only understands the subset of C++ that appears
/// in documented declarations; losing structure is preferable to losing
/// the documentation block, so failures fall back to the raw variant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Declaration<T> {
    Parsed(T),
    Raw(String),
}

impl<T: std::fmt::Display> std::fmt::Display for Declaration<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Declaration::Parsed(decl) => write!(f, "{decl}"),
            Declaration::Raw(text) => write!(f, "{text}"),
        }
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    Namespace {
        entities: Vec<EntityId>,
    },
    Class {
        members: Vec<EntityId>,
    },
    Enum {
        values: Vec<EntityId>,
    },
    EnumValue,
    Function(Function),
    /// A parameter of the enclosing function, created by `\param`.
    FunctionParameter,
    Variable {
        declaration: Declaration<cppdecl::Variable>,
    },
    Typedef {
        declaration: Declaration<cppdecl::Typedef>,
    },
    Macro {
        declaration: Declaration<cppdecl::MacroDecl>,
    },
}

#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    pub declaration: Declaration<cppdecl::Signature>,
    /// `\param` entities, in documentation order.
    pub parameters: Vec<EntityId>,
    /// Text of the `\returns` command.
    pub returns: Option<String>,
}

impl Function {
    pub fn from_declaration(text: &str) -> Function {
        Function {
            declaration: match cppdecl::parse_function(text) {
                Ok(signature) => Declaration::Parsed(signature),
                Err(_) => Declaration::Raw(text.to_string()),
            },
            parameters: Vec::new(),
            returns: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosing_namespace_walks_past_classes() {
        let mut arena = EntityArena::default();
        let root = arena.alloc(Entity::new(
            "",
            EntityKind::Namespace {
                entities: Vec::new(),
            },
        ));
        let ns = arena.alloc(Entity::new(
            "std",
            EntityKind::Namespace {
                entities: Vec::new(),
            },
        ));
        arena.get_mut(ns).parent = Some(root);
        let class = arena.alloc(Entity::new(
            "vector",
            EntityKind::Class {
                members: Vec::new(),
            },
        ));
        arena.get_mut(class).parent = Some(ns);
        let function = arena.alloc(Entity::new(
            "size",
            EntityKind::Function(Function::from_declaration("int size() const")),
        ));
        arena.get_mut(function).parent = Some(class);
        assert_eq!(arena.enclosing_namespace(function, root), ns);
        assert_eq!(arena.enclosing_namespace(ns, root), root);
    }

    #[test]
    fn unparsable_function_declaration_falls_back_to_raw() {
        let function = Function::from_declaration("not ++ a declaration");
        assert_eq!(
            function.declaration,
            Declaration::Raw("not ++ a declaration".to_string())
        );
    }
}
