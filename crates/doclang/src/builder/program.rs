//! The program model builder: a frame-stack machine that turns dispatched
//! commands and prose into the entity tree.
//!
//! Each opening command validates that the current frame permits nesting
//! the construct, creates (or, for namespaces and classes, gets-or-creates)
//! the entity, and pushes a frame holding it together with a lazily created
//! prose builder for its description. The matching closing command
//! finalizes the description and pops.
//!
//! Frames for functions, variables, typedefs, macros and enum values never
//! span documentation blocks and are popped automatically when a block
//! ends. An enum frame left open at the end of a block becomes a ghost: a
//! later block may resume adding values to it or close it, and any other
//! opening command silently discards it. Closing an enum from a different
//! block than the one that opened it triggers enumerator recovery over the
//! raw source between the two blocks.

use crate::builder::prose::ProseBuilder;
use crate::error::{ErrorKind, ParseError, Result};
use crate::gatherer::FunctionCall;
use crate::model::{
    Declaration, Entity, EntityId, EntityKind, Function, GroupMember, Model, RelatedNonMember,
};
use crate::vocabulary::names;

/// What the driver knows about the block being parsed, for commands that
/// need to see raw source.
#[derive(Debug, Clone, Copy)]
pub struct BlockContext<'a> {
    /// Byte offset of the current block's start delimiter in the file.
    pub block_offset: usize,
    /// The entire file content.
    pub file_source: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Idle,
    Class,
    Namespace,
    Function,
    Enum,
    EnumValue,
    Variable,
    Typedef,
    Macro,
}

impl FrameKind {
    /// Terminal frames cannot span multiple documentation blocks.
    fn is_terminal(self) -> bool {
        matches!(
            self,
            FrameKind::EnumValue
                | FrameKind::Function
                | FrameKind::Variable
                | FrameKind::Typedef
                | FrameKind::Macro
        )
    }
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// `None` only for the bottom idle frame.
    entity: Option<EntityId>,
    content: Option<ProseBuilder>,
    /// Offset of the block in which the frame was opened.
    block_offset: usize,
    ghost: bool,
}

/// The program model builder. See the module documentation.
#[derive(Debug)]
pub struct ProgramBuilder {
    frames: Vec<Frame>,
    current_block_offset: usize,
}

impl Default for ProgramBuilder {
    fn default() -> ProgramBuilder {
        ProgramBuilder {
            frames: vec![Frame {
                kind: FrameKind::Idle,
                entity: None,
                content: None,
                block_offset: 0,
                ghost: false,
            }],
            current_block_offset: 0,
        }
    }
}

impl ProgramBuilder {
    fn top(&self) -> &Frame {
        self.frames.last().unwrap()
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().unwrap()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The prose builder of the open frame, if an entity is open.
    fn prose(&mut self) -> Option<&mut ProseBuilder> {
        let frame = self.frames.last_mut().unwrap();
        if frame.kind == FrameKind::Idle {
            return None;
        }
        Some(frame.content.get_or_insert_with(Default::default))
    }

    pub fn is_idle(&self) -> bool {
        let frame = self.top();
        frame.kind == FrameKind::Idle
            || frame.content.as_ref().map(|p| p.is_idle()).unwrap_or(true)
    }

    // ----- character input, forwarded to the open description -----

    pub fn write_char(&mut self, c: char) -> Result<()> {
        if self.top().kind == FrameKind::Idle {
            return Ok(());
        }
        if c == ' ' && self.top().content.is_none() {
            return Ok(());
        }
        self.prose().unwrap().write_char(c)
    }

    pub fn superscript(&mut self) -> Result<()> {
        match self.prose() {
            Some(prose) => prose.superscript(),
            None => Ok(()),
        }
    }

    pub fn subscript(&mut self) -> Result<()> {
        match self.prose() {
            Some(prose) => prose.subscript(),
            None => Ok(()),
        }
    }

    pub fn alignment_tab(&mut self) -> Result<()> {
        match self.prose() {
            Some(prose) => prose.alignment_tab(),
            None => Ok(()),
        }
    }

    pub fn math_shift(&mut self) -> Result<()> {
        match self.prose() {
            Some(prose) => prose.math_shift(),
            None => Ok(()),
        }
    }

    pub fn group_begin(&mut self) {
        if let Some(prose) = self.prose() {
            prose.group_begin();
        }
    }

    pub fn group_end(&mut self) -> Result<()> {
        match self.prose() {
            Some(prose) => prose.group_end(),
            None => Ok(()),
        }
    }

    pub fn add_code_block(&mut self, text: String) -> Result<()> {
        match self.prose() {
            Some(prose) => prose.add_code_block(text),
            None => Err(ParseError::bad_call("code", "no open entity")),
        }
    }

    // ----- block lifecycle -----

    pub fn begin_block(&mut self, offset: usize) {
        self.current_block_offset = offset;
    }

    /// Ends the current block: terminal frames are popped, and an enum left
    /// open becomes a ghost.
    pub fn end_block(&mut self, model: &mut Model) -> Result<()> {
        while self.top().kind.is_terminal() {
            self.pop_frame(model)?;
        }
        if self.top().kind == FrameKind::Enum {
            self.top_mut().ghost = true;
        }
        Ok(())
    }

    /// Ends the file: everything still open is finalized.
    pub fn end_file(&mut self, model: &mut Model) -> Result<()> {
        while self.frames.len() > 1 {
            self.pop_frame(model)?;
        }
        Ok(())
    }

    /// Unwinds the frame stack back to depth one, keeping whatever content
    /// can be kept. Used by error recovery.
    pub fn unwind(&mut self, model: &mut Model) {
        while self.frames.len() > 1 {
            let mut frame = self.frames.pop().unwrap();
            if let (Some(prose), Some(entity)) = (frame.content.as_mut(), frame.entity) {
                let nodes = prose.force_finish();
                if !nodes.is_empty() {
                    let description =
                        model.arena.get_mut(entity).description.get_or_insert_with(
                            Default::default,
                        );
                    description.nodes.extend(nodes);
                }
            }
        }
    }

    fn pop_frame(&mut self, model: &mut Model) -> Result<()> {
        debug_assert!(self.frames.len() > 1);
        let mut frame = self.frames.pop().unwrap();
        if let (Some(prose), Some(entity)) = (frame.content.as_mut(), frame.entity) {
            let nodes = prose.finish()?;
            if !nodes.is_empty() {
                let description = model
                    .arena
                    .get_mut(entity)
                    .description
                    .get_or_insert_with(Default::default);
                description.nodes.extend(nodes);
            }
        }
        Ok(())
    }

    // ----- commands -----

    pub fn handle_call(
        &mut self,
        call: &FunctionCall,
        context: BlockContext<'_>,
        model: &mut Model,
    ) -> Result<()> {
        match call.name.as_str() {
            names::CLASS => self.open(FrameKind::Class, call, model),
            names::NAMESPACE => self.open(FrameKind::Namespace, call, model),
            names::ENUM => self.open(FrameKind::Enum, call, model),
            names::FN => self.open(FrameKind::Function, call, model),
            names::VARIABLE => self.open(FrameKind::Variable, call, model),
            names::TYPEDEF => self.open(FrameKind::Typedef, call, model),
            names::MACRO => self.open(FrameKind::Macro, call, model),
            names::VALUE => self.open(FrameKind::EnumValue, call, model),
            names::END_CLASS => self.close(FrameKind::Class, "endclass", context, model),
            names::END_NAMESPACE => {
                self.close(FrameKind::Namespace, "endnamespace", context, model)
            }
            names::END_ENUM => self.close(FrameKind::Enum, "endenum", context, model),
            names::END_FN => self.close(FrameKind::Function, "endfn", context, model),
            names::END_VARIABLE => {
                self.close(FrameKind::Variable, "endvariable", context, model)
            }
            names::END_TYPEDEF => self.close(FrameKind::Typedef, "endtypedef", context, model),
            names::END_MACRO => self.close(FrameKind::Macro, "endmacro", context, model),
            names::END_VALUE => self.close(FrameKind::EnumValue, "endvalue", context, model),
            names::BRIEF => {
                let text = required_arg(call, 0, "brief")?.to_string();
                self.entity_mut(model, "brief")?.brief = Some(text);
                Ok(())
            }
            names::SINCE => {
                let version = required_arg(call, 0, "since")?.to_string();
                self.entity_mut(model, "since")?.since = Some(version);
                Ok(())
            }
            names::RETURNS => {
                let text = required_arg(call, 0, "returns")?.to_string();
                match &mut self.entity_mut(model, "returns")?.kind {
                    EntityKind::Function(function) => {
                        function.returns = Some(text);
                        Ok(())
                    }
                    _ => Err(ParseError::bad_call(
                        "returns",
                        "only functions have a return value",
                    )),
                }
            }
            names::PARAM => self.add_parameter(call, model),
            names::NONMEMBER => self.relate_nonmember(None, model),
            names::RELATES => {
                let class = required_arg(call, 0, "relates")?.to_string();
                self.relate_nonmember(Some(&class), model)
            }
            names::INGROUP => {
                let list = required_arg(call, 0, "ingroup")?.to_string();
                let entity = self.current_entity("ingroup")?;
                for name in list.split(',') {
                    let name = name.trim();
                    if !name.is_empty() {
                        model.add_to_group(name, GroupMember::Entity(entity));
                    }
                }
                Ok(())
            }
            names::PAR if self.top().kind == FrameKind::Idle => {
                // A blank line between blocks of commands; nothing is open.
                Ok(())
            }
            _ => match self.prose() {
                Some(prose) => {
                    if prose.handle_call(call)? {
                        Ok(())
                    } else {
                        Err(ParseError::new(ErrorKind::BadControlSequence {
                            name: display_name(&call.name),
                        }))
                    }
                }
                None => Err(ParseError::bad_call(
                    display_name(&call.name),
                    "no open entity",
                )),
            },
        }
    }

    fn current_entity(&self, command: &str) -> Result<EntityId> {
        self.top()
            .entity
            .ok_or_else(|| ParseError::bad_call(command, "no open entity"))
    }

    fn entity_mut<'m>(&self, model: &'m mut Model, command: &str) -> Result<&'m mut Entity> {
        let id = self.current_entity(command)?;
        Ok(model.arena.get_mut(id))
    }

    fn open(&mut self, kind: FrameKind, call: &FunctionCall, model: &mut Model) -> Result<()> {
        // A ghost enum frame is waiting for more values or its closing
        // command; any other opening command discards it silently.
        if self.top().ghost {
            if kind == FrameKind::EnumValue {
                self.top_mut().ghost = false;
            } else {
                self.pop_frame(model)?;
            }
        }
        // `\value` closes the previous value implicitly; enum values are
        // conventionally listed without `\endvalue`.
        if kind == FrameKind::EnumValue && self.top().kind == FrameKind::EnumValue {
            self.pop_frame(model)?;
        }
        let command = open_command_name(kind);
        let allowed = match kind {
            FrameKind::Namespace => matches!(
                self.top().kind,
                FrameKind::Idle | FrameKind::Namespace
            ),
            FrameKind::Class => matches!(
                self.top().kind,
                FrameKind::Idle | FrameKind::Namespace | FrameKind::Class
            ),
            FrameKind::Enum
            | FrameKind::Function
            | FrameKind::Variable
            | FrameKind::Typedef => matches!(
                self.top().kind,
                FrameKind::Idle | FrameKind::Namespace | FrameKind::Class
            ),
            FrameKind::Macro => self.top().kind == FrameKind::Idle,
            FrameKind::EnumValue => self.top().kind == FrameKind::Enum,
            FrameKind::Idle => false,
        };
        if !allowed {
            return Err(ParseError::bad_call(
                command,
                "cannot be nested in the current frame",
            ));
        }
        let argument = required_arg(call, 0, command)?.to_string();
        let parent = match self.top().entity {
            Some(entity) => entity,
            None => model.program_mut().root,
        };
        let entity = match kind {
            FrameKind::Namespace => get_or_create(model, parent, &argument, true),
            FrameKind::Class => get_or_create(model, parent, &argument, false),
            FrameKind::Enum => {
                attach_new(model, parent, Entity::new(&argument, EntityKind::Enum {
                    values: Vec::new(),
                }))
            }
            FrameKind::EnumValue => {
                attach_new(model, parent, Entity::new(&argument, EntityKind::EnumValue))
            }
            FrameKind::Function => {
                let function = Function::from_declaration(&argument);
                let name = function_name(&function, &argument);
                attach_new(model, parent, Entity::new(name, EntityKind::Function(function)))
            }
            FrameKind::Variable => {
                let declaration = match cppdecl::parse_variable(&argument) {
                    Ok(variable) => Declaration::Parsed(variable),
                    Err(_) => Declaration::Raw(argument.clone()),
                };
                let name = match &declaration {
                    Declaration::Parsed(variable) => variable.name.unqualified().to_string(),
                    Declaration::Raw(text) => fallback_name(text, false),
                };
                attach_new(model, parent, Entity::new(name, EntityKind::Variable {
                    declaration,
                }))
            }
            FrameKind::Typedef => {
                let declaration = match cppdecl::parse_typedef(&argument) {
                    Ok(typedef) => Declaration::Parsed(typedef),
                    Err(_) => Declaration::Raw(argument.clone()),
                };
                let name = match &declaration {
                    Declaration::Parsed(typedef) => typedef.name.unqualified().to_string(),
                    Declaration::Raw(text) => fallback_name(text, false),
                };
                attach_new(model, parent, Entity::new(name, EntityKind::Typedef {
                    declaration,
                }))
            }
            FrameKind::Macro => {
                let declaration = match cppdecl::parse_macro(&argument) {
                    Ok(macro_decl) => Declaration::Parsed(macro_decl),
                    Err(_) => Declaration::Raw(argument.clone()),
                };
                let name = match &declaration {
                    Declaration::Parsed(macro_decl) => macro_decl.name.clone(),
                    Declaration::Raw(text) => fallback_name(text, true),
                };
                // Top-level macros live in the program's macro list, not
                // under the root namespace.
                let id = model.arena.alloc(Entity::new(name, EntityKind::Macro {
                    declaration,
                }));
                model.program_mut().macros.push(id);
                id
            }
            FrameKind::Idle => unreachable!("idle frames are never opened by a command"),
        };
        self.frames.push(Frame {
            kind,
            entity: Some(entity),
            content: None,
            block_offset: self.current_block_offset,
            ghost: false,
        });
        Ok(())
    }

    fn close(
        &mut self,
        kind: FrameKind,
        command: &str,
        context: BlockContext<'_>,
        model: &mut Model,
    ) -> Result<()> {
        if kind == FrameKind::Enum {
            // An open value frame is closed implicitly by the enum's end.
            while self.top().kind == FrameKind::EnumValue {
                self.pop_frame(model)?;
            }
            if self.top().ghost {
                self.top_mut().ghost = false;
            }
        }
        if self.top().kind != kind {
            return Err(ParseError::new(ErrorKind::UnexpectedControlSequence {
                name: command.to_string(),
            }));
        }
        if kind == FrameKind::Enum {
            let frame = self.top();
            if frame.block_offset != self.current_block_offset {
                // The enum was opened in an earlier block; recover the
                // enumerators declared in the raw source between the two
                // blocks.
                let start = frame.block_offset.min(context.file_source.len());
                let end = self.current_block_offset.min(context.file_source.len());
                if start < end {
                    let gap = &context.file_source[start..end];
                    let recovered = cppdecl::recover_enumerators(gap);
                    let enum_id = frame.entity.unwrap();
                    merge_enumerators(model, enum_id, &recovered);
                }
            }
        }
        self.pop_frame(model)
    }

    fn add_parameter(&mut self, call: &FunctionCall, model: &mut Model) -> Result<()> {
        let name = required_arg(call, 0, "param")?.to_string();
        let brief = call.string_arg(1).unwrap_or("").trim().to_string();
        let function_id = self.current_entity("param")?;
        if !matches!(
            model.arena.get(function_id).kind,
            EntityKind::Function(_)
        ) {
            return Err(ParseError::bad_call(
                "param",
                "parameters can only be documented inside \\fn",
            ));
        }
        let mut parameter = Entity::new(name, EntityKind::FunctionParameter);
        if !brief.is_empty() {
            parameter.brief = Some(brief);
        }
        parameter.parent = Some(function_id);
        let id = model.arena.alloc(parameter);
        match &mut model.arena.get_mut(function_id).kind {
            EntityKind::Function(function) => function.parameters.push(id),
            _ => unreachable!("checked above"),
        }
        Ok(())
    }

    /// `\nonmember` and `\relates`: re-parent a function documented inside
    /// a class to the enclosing namespace and record the association.
    fn relate_nonmember(&mut self, relates_to: Option<&str>, model: &mut Model) -> Result<()> {
        let command = if relates_to.is_some() {
            "relates"
        } else {
            "nonmember"
        };
        let function_id = self.current_entity(command)?;
        if !matches!(model.arena.get(function_id).kind, EntityKind::Function(_)) {
            return Err(ParseError::bad_call(
                command,
                "only functions can be non-members",
            ));
        }
        let root = model.program_mut().root;
        let enclosing_class = match model.arena.get(function_id).parent {
            Some(parent) if matches!(model.arena.get(parent).kind, EntityKind::Class { .. }) => {
                Some(parent)
            }
            _ => None,
        };
        if let Some(class_id) = enclosing_class {
            let namespace = model.arena.enclosing_namespace(class_id, root);
            detach_child(model, class_id, function_id);
            append_child(model, namespace, function_id);
            model.arena.get_mut(function_id).parent = Some(namespace);
        }
        let target_class = match relates_to {
            None => enclosing_class.ok_or_else(|| {
                ParseError::bad_call("nonmember", "the function is not inside a class")
            })?,
            Some(name) => match find_class(model, root, name) {
                Some(id) => id,
                // The class may be documented later; a stub under the root
                // namespace unifies with it through get-or-create.
                None => get_or_create(model, root, name, false),
            },
        };
        model.program_mut().related.push(RelatedNonMember {
            class: target_class,
            function: function_id,
        });
        Ok(())
    }
}

fn display_name(target: &str) -> String {
    target.trim_end_matches('@').to_string()
}

fn open_command_name(kind: FrameKind) -> &'static str {
    match kind {
        FrameKind::Class => "class",
        FrameKind::Namespace => "namespace",
        FrameKind::Enum => "enum",
        FrameKind::EnumValue => "value",
        FrameKind::Function => "fn",
        FrameKind::Variable => "variable",
        FrameKind::Typedef => "typedef",
        FrameKind::Macro => "macro",
        FrameKind::Idle => "",
    }
}

fn required_arg<'a>(call: &'a FunctionCall, index: usize, command: &str) -> Result<&'a str> {
    call.string_arg(index)
        .ok_or_else(|| ParseError::bad_call(command, "missing argument"))
}

fn function_name(function: &Function, declaration: &str) -> String {
    match &function.declaration {
        Declaration::Parsed(signature) => signature.display_name(),
        Declaration::Raw(_) => fallback_name(declaration, true),
    }
}

/// Best-effort name for a declaration that did not parse: the last
/// identifier before the parameter list (or in the whole text).
fn fallback_name(declaration: &str, before_parens: bool) -> String {
    let mut text = declaration.trim().trim_end_matches(';').trim_end();
    if before_parens {
        if let Some(i) = text.find('(') {
            text = &text[..i];
        }
    }
    text.rsplit(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| declaration.trim().to_string())
}

fn attach_new(model: &mut Model, parent: EntityId, mut entity: Entity) -> EntityId {
    entity.parent = Some(parent);
    let id = model.arena.alloc(entity);
    append_child(model, parent, id);
    id
}

fn append_child(model: &mut Model, parent: EntityId, child: EntityId) {
    match &mut model.arena.get_mut(parent).kind {
        EntityKind::Namespace { entities } => entities.push(child),
        EntityKind::Class { members } => members.push(child),
        EntityKind::Enum { values } => values.push(child),
        EntityKind::Function(function) => function.parameters.push(child),
        _ => {}
    }
}

fn detach_child(model: &mut Model, parent: EntityId, child: EntityId) {
    match &mut model.arena.get_mut(parent).kind {
        EntityKind::Namespace { entities } => entities.retain(|&id| id != child),
        EntityKind::Class { members } => members.retain(|&id| id != child),
        EntityKind::Enum { values } => values.retain(|&id| id != child),
        EntityKind::Function(function) => function.parameters.retain(|&id| id != child),
        _ => {}
    }
}

fn get_or_create(model: &mut Model, parent: EntityId, name: &str, namespace: bool) -> EntityId {
    let matcher: fn(&EntityKind) -> bool = if namespace {
        |kind| matches!(kind, EntityKind::Namespace { .. })
    } else {
        |kind| matches!(kind, EntityKind::Class { .. })
    };
    if let Some(existing) = model.find_child(parent, name, matcher) {
        return existing;
    }
    let kind = if namespace {
        EntityKind::Namespace {
            entities: Vec::new(),
        }
    } else {
        EntityKind::Class {
            members: Vec::new(),
        }
    };
    attach_new(model, parent, Entity::new(name, kind))
}

fn find_class(model: &Model, root: EntityId, name: &str) -> Option<EntityId> {
    let mut queue = vec![root];
    while let Some(id) = queue.pop() {
        let entity = model.arena.get(id);
        if entity.name == name && matches!(entity.kind, EntityKind::Class { .. }) {
            return Some(id);
        }
        queue.extend_from_slice(entity.children());
    }
    None
}

/// Merges recovered enumerator names with the explicitly documented values:
/// the raw declaration order wins, documented values keep their identity,
/// and nothing is duplicated by name.
fn merge_enumerators(model: &mut Model, enum_id: EntityId, recovered: &[String]) {
    let existing: Vec<EntityId> = match &model.arena.get(enum_id).kind {
        EntityKind::Enum { values } => values.clone(),
        _ => return,
    };
    let mut merged: Vec<EntityId> = Vec::new();
    for name in recovered {
        let found = existing.iter().copied().find(|&id| {
            model.arena.get(id).name == *name
        });
        match found {
            Some(id) => {
                if !merged.contains(&id) {
                    merged.push(id);
                }
            }
            None => {
                let mut value = Entity::new(name, EntityKind::EnumValue);
                value.parent = Some(enum_id);
                let id = model.arena.alloc(value);
                merged.push(id);
            }
        }
    }
    for id in existing {
        if !merged.contains(&id) {
            merged.push(id);
        }
    }
    match &mut model.arena.get_mut(enum_id).kind {
        EntityKind::Enum { values } => *values = merged,
        _ => {}
    }
}
