//! The documentation model produced by the parser.
//!
//! A [Model] owns the entity arena, at most one [Program], the standalone
//! documents (manuals and pages), and the topic group registry. It is the
//! hand-off point to the export layer: the parser only ever creates nodes,
//! never deletes them, and looking up the same namespace or class twice
//! yields the same node so documentation accumulated in separate blocks
//! attaches in one place.

mod document;
mod entity;

pub use document::{
    Document, DocumentNode, List, ListItem, MathBlock, MathNode, Paragraph, SectionLevel, Span,
    SpanKind,
};
pub use entity::{Declaration, Entity, EntityArena, EntityId, EntityKind, Function};

/// The documented program: the entity tree plus top-level macros and the
/// related-non-members index.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    /// The single global namespace at the root of the entity tree.
    pub root: EntityId,
    /// Top-level `\macro` declarations, in documentation order.
    pub macros: Vec<EntityId>,
    /// Free functions documented as relating to a class.
    pub related: Vec<RelatedNonMember>,
}

/// One entry of the related-non-members index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelatedNonMember {
    pub class: EntityId,
    pub function: EntityId,
}

/// A named, user-declared collection of entities and documents, populated
/// by `\ingroup`. Unrelated to lexical macro-scoping groups.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopicGroup {
    pub name: String,
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupMember {
    Entity(EntityId),
    /// Index into [Model::documents].
    Document(usize),
}

/// The complete model.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Model {
    pub arena: EntityArena,
    pub program: Option<Program>,
    /// Standalone manuals and pages, in parse order.
    pub documents: Vec<Document>,
    /// Topic groups in declaration order.
    pub groups: Vec<TopicGroup>,
}

impl Model {
    /// The program, created on first use with a fresh root namespace.
    pub fn program_mut(&mut self) -> &mut Program {
        if self.program.is_none() {
            let root = self.arena.alloc(Entity::new(
                "",
                EntityKind::Namespace {
                    entities: Vec::new(),
                },
            ));
            self.program = Some(Program {
                root,
                macros: Vec::new(),
                related: Vec::new(),
            });
        }
        self.program.as_mut().unwrap()
    }

    /// Registers `member` in the named topic group, creating the group on
    /// first use.
    pub fn add_to_group(&mut self, name: &str, member: GroupMember) {
        let group = match self.groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group,
            None => {
                self.groups.push(TopicGroup {
                    name: name.to_string(),
                    members: Vec::new(),
                });
                self.groups.last_mut().unwrap()
            }
        };
        if !group.members.contains(&member) {
            group.members.push(member);
        }
    }

    /// Looks up an entity by name and kind among the children of `parent`.
    pub fn find_child(
        &self,
        parent: EntityId,
        name: &str,
        kind_matches: fn(&EntityKind) -> bool,
    ) -> Option<EntityId> {
        self.arena
            .get(parent)
            .children()
            .iter()
            .copied()
            .find(|&id| {
                let entity = self.arena.get(id);
                entity.name == name && kind_matches(&entity.kind)
            })
    }

    /// Total number of entities, excluding the implicit root namespace.
    pub fn entity_count(&self) -> usize {
        match &self.program {
            Some(_) => self.arena.len() - 1,
            None => self.arena.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_is_created_once() {
        let mut model = Model::default();
        let root = model.program_mut().root;
        assert_eq!(model.program_mut().root, root);
        assert_eq!(model.arena.len(), 1);
        assert_eq!(model.entity_count(), 0);
    }

    #[test]
    fn groups_are_ordered_and_deduplicated() {
        let mut model = Model::default();
        let root = model.program_mut().root;
        model.add_to_group("containers", GroupMember::Entity(root));
        model.add_to_group("algorithms", GroupMember::Document(0));
        model.add_to_group("containers", GroupMember::Entity(root));
        assert_eq!(model.groups.len(), 2);
        assert_eq!(model.groups[0].name, "containers");
        assert_eq!(model.groups[0].members.len(), 1);
        assert_eq!(model.groups[1].name, "algorithms");
    }
}
