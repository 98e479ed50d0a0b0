//! The structured declaration model.
//!
//! Every type here re-stringifies to the literal source form via its
//! [Display](std::fmt::Display) implementation. The display output is
//! canonical (single spaces, `*` attached to the type), which matches the
//! way declarations are conventionally written in documentation blocks.

use std::fmt;

/// A possibly `::`-qualified name, e.g. `std::vector<int>::iterator`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Name {
    pub segments: Vec<Segment>,
}

impl Name {
    pub(crate) fn from_ident<S: Into<String>>(ident: S) -> Name {
        Name {
            segments: vec![Segment {
                ident: ident.into(),
                template_args: None,
            }],
        }
    }

    /// The final, unqualified segment of the name.
    ///
    /// This is the name an entity is registered under: `std::getenv`
    /// documents a function called `getenv`.
    pub fn unqualified(&self) -> &str {
        &self
            .segments
            .last()
            .expect("a parsed name has at least one segment")
            .ident
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "::")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// One segment of a [Name]: an identifier with optional template arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub ident: String,
    pub template_args: Option<Vec<TemplateArg>>,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ident)?;
        if let Some(args) = &self.template_args {
            write!(f, "<")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// A template argument: a type, or a non-type argument kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TemplateArg {
    Type(Type),
    Literal(String),
}

impl fmt::Display for TemplateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateArg::Type(t) => write!(f, "{t}"),
            TemplateArg::Literal(s) => write!(f, "{s}"),
        }
    }
}

/// One `*` in a pointer chain, possibly `const`-qualified (`* const`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pointer {
    pub is_const: bool,
}

/// The reference qualifier at the end of a type, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefQualifier {
    #[default]
    None,
    LValue,
    RValue,
}

/// A parsed type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Type {
    pub is_const: bool,
    pub kind: TypeKind,
    pub trailing_const: bool,
    pub pointers: Vec<Pointer>,
    pub reference: RefQualifier,
}

impl Type {
    pub(crate) fn named(name: Name) -> Type {
        Type {
            is_const: false,
            kind: TypeKind::Named(name),
            trailing_const: false,
            pointers: Vec::new(),
            reference: RefQualifier::None,
        }
    }
}

/// The core of a [Type]: a named type or a function pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeKind {
    Named(Name),
    FunctionPointer {
        return_type: Box<Type>,
        parameters: Vec<Parameter>,
    },
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        match &self.kind {
            TypeKind::Named(name) => write!(f, "{name}")?,
            TypeKind::FunctionPointer {
                return_type,
                parameters,
            } => {
                write!(f, "{return_type} (*)(")?;
                for (i, p) in parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")?;
            }
        }
        if self.trailing_const {
            write!(f, " const")?;
        }
        for pointer in &self.pointers {
            write!(f, "*")?;
            if pointer.is_const {
                write!(f, " const")?;
            }
        }
        match self.reference {
            RefQualifier::None => Ok(()),
            RefQualifier::LValue => write!(f, "&"),
            RefQualifier::RValue => write!(f, "&&"),
        }
    }
}

/// A function parameter: a type with an optional name and default value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    pub ty: Type,
    pub name: Option<String>,
    pub default: Option<String>,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)?;
        if let Some(name) = &self.name {
            write!(f, " {name}")?;
        }
        if let Some(default) = &self.default {
            write!(f, " = {default}")?;
        }
        Ok(())
    }
}

/// The leading declaration specifiers the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Specifiers {
    pub is_virtual: bool,
    pub is_static: bool,
    pub is_inline: bool,
    pub is_constexpr: bool,
    pub is_explicit: bool,
}

impl Specifiers {
    pub fn any(&self) -> bool {
        self.is_virtual || self.is_static || self.is_inline || self.is_constexpr || self.is_explicit
    }
}

impl fmt::Display for Specifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_virtual {
            names.push("virtual");
        }
        if self.is_static {
            names.push("static");
        }
        if self.is_inline {
            names.push("inline");
        }
        if self.is_constexpr {
            names.push("constexpr");
        }
        if self.is_explicit {
            names.push("explicit");
        }
        write!(f, "{}", names.join(" "))
    }
}

/// Which form of function declaration was parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignatureKind {
    Function,
    Constructor,
    Destructor,
    /// A conversion function; the payload is the target type.
    Conversion(Type),
}

/// A parsed function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signature {
    pub specifiers: Specifiers,
    pub kind: SignatureKind,
    /// Absent for constructors, destructors and conversion functions.
    pub return_type: Option<Type>,
    pub name: Name,
    pub parameters: Vec<Parameter>,
    /// A trailing `...` in the parameter list.
    pub is_variadic: bool,
    pub const_qualified: bool,
    pub noexcept: bool,
    pub override_qualified: bool,
    pub final_qualified: bool,
    pub pure_virtual: bool,
    pub deleted: bool,
    pub defaulted: bool,
}

impl Signature {
    /// The name an entity documenting this signature is registered under.
    pub fn display_name(&self) -> String {
        match &self.kind {
            SignatureKind::Destructor => format!("~{}", self.name),
            SignatureKind::Conversion(target) => format!("operator {target}"),
            _ => self.name.unqualified().to_string(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.specifiers.any() {
            write!(f, "{} ", self.specifiers)?;
        }
        match &self.kind {
            SignatureKind::Function => {
                if let Some(return_type) = &self.return_type {
                    write!(f, "{return_type} ")?;
                }
                write!(f, "{}", self.name)?;
            }
            SignatureKind::Constructor => write!(f, "{}", self.name)?,
            SignatureKind::Destructor => write!(f, "~{}", self.name)?,
            SignatureKind::Conversion(target) => write!(f, "operator {target}")?,
        }
        write!(f, "(")?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        if self.is_variadic {
            if !self.parameters.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")?;
        if self.const_qualified {
            write!(f, " const")?;
        }
        if self.noexcept {
            write!(f, " noexcept")?;
        }
        if self.override_qualified {
            write!(f, " override")?;
        }
        if self.final_qualified {
            write!(f, " final")?;
        }
        if self.pure_virtual {
            write!(f, " = 0")?;
        }
        if self.deleted {
            write!(f, " = delete")?;
        }
        if self.defaulted {
            write!(f, " = default")?;
        }
        Ok(())
    }
}

/// A parsed variable declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    pub specifiers: Specifiers,
    pub ty: Type,
    pub name: Name,
    pub initializer: Option<String>,
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.specifiers.any() {
            write!(f, "{} ", self.specifiers)?;
        }
        write!(f, "{} {}", self.ty, self.name)?;
        if let Some(init) = &self.initializer {
            write!(f, " = {init}")?;
        }
        Ok(())
    }
}

/// A parsed typedef; both `typedef T name` and `using name = T` normalize to this.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Typedef {
    pub ty: Type,
    pub name: Name,
}

impl fmt::Display for Typedef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "typedef {} {}", self.ty, self.name)
    }
}

/// A parsed preprocessor macro prototype.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacroDecl {
    pub name: String,
    /// `None` for a bare object-like macro; `Some` for a function-like macro,
    /// possibly with an empty parameter list.
    pub parameters: Option<Vec<String>>,
    pub is_variadic: bool,
}

impl fmt::Display for MacroDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(parameters) = &self.parameters {
            write!(f, "(")?;
            for (i, p) in parameters.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{p}")?;
            }
            if self.is_variadic {
                if !parameters.is_empty() {
                    write!(f, ", ")?;
                }
                write!(f, "...")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
