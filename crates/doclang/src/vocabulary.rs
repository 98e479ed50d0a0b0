//! The built-in command vocabulary.
//!
//! Every user-facing command is a macro over the gatherer's meta
//! primitives. `\class`, for instance, expands to
//! `\parseword@ \call@ \class@`: gather one word, then call the builder
//! function `class@` with it. The internal `@`-suffixed names cannot be
//! written in a document: `@` lexes with the other category, so
//! `\class@` in markup produces the control sequence `class` followed by
//! a stray `@` character, keeping the meta layer out of reach of
//! documentation authors.
//!
//! The vocabulary is fixed at initialization; scoped user redefinition of
//! the user-facing names inside `{ }` groups is possible and harmless,
//! since leaving the group restores the built-in meaning.

use crate::gatherer;
use crate::texmacro::{Macro, Preprocessor};
use crate::token::{CsNameInterner, Token};

/// The builder-facing function names carried by call tasks.
pub mod names {
    pub const CLASS: &str = "class@";
    pub const END_CLASS: &str = "endclass@";
    pub const FN: &str = "fn@";
    pub const END_FN: &str = "endfn@";
    pub const NAMESPACE: &str = "namespace@";
    pub const END_NAMESPACE: &str = "endnamespace@";
    pub const ENUM: &str = "enum@";
    pub const END_ENUM: &str = "endenum@";
    pub const VALUE: &str = "value@";
    pub const END_VALUE: &str = "endvalue@";
    pub const VARIABLE: &str = "variable@";
    pub const END_VARIABLE: &str = "endvariable@";
    pub const TYPEDEF: &str = "typedef@";
    pub const END_TYPEDEF: &str = "endtypedef@";
    pub const MACRO: &str = "macro@";
    pub const END_MACRO: &str = "endmacro@";

    pub const BRIEF: &str = "brief@";
    pub const SINCE: &str = "since@";
    pub const PARAM: &str = "param@";
    pub const RETURNS: &str = "returns@";
    pub const NONMEMBER: &str = "nonmember@";
    pub const RELATES: &str = "relates@";
    pub const INGROUP: &str = "ingroup@";

    pub const PAR: &str = "par@";
    pub const BOLD_WORD: &str = "b@";
    pub const ITALIC_WORD: &str = "e@";
    pub const CODE_WORD: &str = "c@";
    pub const BOLD: &str = "bold@";
    pub const END_BOLD: &str = "endbold@";
    pub const EMPH: &str = "emph@";
    pub const END_EMPH: &str = "endemph@";
    pub const TT: &str = "tt@";
    pub const END_TT: &str = "endtt@";
    pub const HREF: &str = "href@";
    pub const IMAGE: &str = "image@";
    pub const LIST: &str = "list@";
    pub const LIST_ITEM: &str = "li@";
    pub const END_LIST: &str = "endlist@";
    pub const CODE: &str = "code@";
    pub const END_CODE: &str = "endcode@";
    pub const INDEX: &str = "index@";
    pub const SINCE_BEGIN: &str = "beginsince@";
    pub const SINCE_END: &str = "endsince@";
    pub const DISPLAY_MATH: &str = "displaymath@";
    pub const END_DISPLAY_MATH: &str = "enddisplaymath@";
    pub const SECTION: &str = "section@";

    pub const MANUAL: &str = "manual@";
    pub const PART: &str = "part@";
    pub const CHAPTER: &str = "chapter@";
    pub const FRONT_MATTER: &str = "frontmatter@";
    pub const MAIN_MATTER: &str = "mainmatter@";
    pub const BACK_MATTER: &str = "backmatter@";
    pub const TABLE_OF_CONTENTS: &str = "tableofcontents@";
    pub const PRINT_INDEX: &str = "printindex@";
    pub const GROUP_TABLE: &str = "grouptable@";
    pub const INPUT: &str = "input@";
}

#[derive(Clone, Copy)]
enum Arg {
    Word,
    LongWord,
    Options,
}

impl Arg {
    fn primitive(self) -> &'static str {
        match self {
            Arg::Word => gatherer::PARSE_WORD,
            Arg::LongWord => gatherer::PARSE_LONG_WORD,
            Arg::Options => gatherer::PARSE_OPTIONS,
        }
    }
}

fn define(
    preprocessor: &mut Preprocessor,
    interner: &mut CsNameInterner,
    user_name: &str,
    arguments: &[Arg],
    target: &str,
) {
    let mut replacement = Vec::with_capacity(arguments.len() + 2);
    for argument in arguments {
        replacement.push(Token::ControlSequence(
            interner.get_or_intern(argument.primitive()),
        ));
    }
    replacement.push(Token::ControlSequence(
        interner.get_or_intern(gatherer::CALL),
    ));
    replacement.push(Token::ControlSequence(interner.get_or_intern(target)));
    preprocessor.define(
        interner.get_or_intern(user_name),
        Macro::expansion_of(replacement),
    );
}

/// Installs the built-in vocabulary into the preprocessor's outermost scope.
pub fn install(preprocessor: &mut Preprocessor, interner: &mut CsNameInterner) {
    use names::*;
    // Entities.
    define(preprocessor, interner, "class", &[Arg::Word], CLASS);
    define(preprocessor, interner, "endclass", &[], END_CLASS);
    define(preprocessor, interner, "fn", &[Arg::LongWord], FN);
    define(preprocessor, interner, "endfn", &[], END_FN);
    define(preprocessor, interner, "namespace", &[Arg::Word], NAMESPACE);
    define(preprocessor, interner, "endnamespace", &[], END_NAMESPACE);
    define(preprocessor, interner, "enum", &[Arg::Word], ENUM);
    define(preprocessor, interner, "endenum", &[], END_ENUM);
    define(preprocessor, interner, "value", &[Arg::Word], VALUE);
    define(preprocessor, interner, "endvalue", &[], END_VALUE);
    define(preprocessor, interner, "variable", &[Arg::LongWord], VARIABLE);
    define(preprocessor, interner, "endvariable", &[], END_VARIABLE);
    define(preprocessor, interner, "typedef", &[Arg::LongWord], TYPEDEF);
    define(preprocessor, interner, "endtypedef", &[], END_TYPEDEF);
    define(preprocessor, interner, "macro", &[Arg::LongWord], MACRO);
    define(preprocessor, interner, "endmacro", &[], END_MACRO);
    // Metadata.
    define(preprocessor, interner, "brief", &[Arg::LongWord], BRIEF);
    define(preprocessor, interner, "since", &[Arg::LongWord], SINCE);
    define(
        preprocessor,
        interner,
        "param",
        &[Arg::Word, Arg::LongWord],
        PARAM,
    );
    define(preprocessor, interner, "returns", &[Arg::LongWord], RETURNS);
    define(preprocessor, interner, "nonmember", &[], NONMEMBER);
    define(preprocessor, interner, "relates", &[Arg::Word], RELATES);
    define(preprocessor, interner, "ingroup", &[Arg::LongWord], INGROUP);
    // Prose.
    define(preprocessor, interner, "par", &[], PAR);
    define(preprocessor, interner, "b", &[], BOLD_WORD);
    define(preprocessor, interner, "e", &[], ITALIC_WORD);
    define(preprocessor, interner, "c", &[], CODE_WORD);
    define(preprocessor, interner, "bold", &[], BOLD);
    define(preprocessor, interner, "endbold", &[], END_BOLD);
    define(preprocessor, interner, "emph", &[], EMPH);
    define(preprocessor, interner, "endemph", &[], END_EMPH);
    define(preprocessor, interner, "tt", &[], TT);
    define(preprocessor, interner, "endtt", &[], END_TT);
    define(
        preprocessor,
        interner,
        "href",
        &[Arg::Options, Arg::Word],
        HREF,
    );
    // The image path runs to the end of the line: file names contain dots,
    // which end a word argument.
    define(
        preprocessor,
        interner,
        "image",
        &[Arg::Options, Arg::LongWord],
        IMAGE,
    );
    define(preprocessor, interner, "list", &[], LIST);
    define(preprocessor, interner, "li", &[], LIST_ITEM);
    define(preprocessor, interner, "endlist", &[], END_LIST);
    define(preprocessor, interner, "code", &[], CODE);
    define(preprocessor, interner, "endcode", &[], END_CODE);
    define(preprocessor, interner, "index", &[Arg::Word], INDEX);
    define(
        preprocessor,
        interner,
        "beginsince",
        &[Arg::Options],
        SINCE_BEGIN,
    );
    define(preprocessor, interner, "endsince", &[], SINCE_END);
    define(preprocessor, interner, "[", &[], DISPLAY_MATH);
    define(preprocessor, interner, "]", &[], END_DISPLAY_MATH);
    define(preprocessor, interner, "section", &[Arg::LongWord], SECTION);
    // Documents.
    define(preprocessor, interner, "manual", &[Arg::LongWord], MANUAL);
    define(preprocessor, interner, "part", &[Arg::LongWord], PART);
    define(preprocessor, interner, "chapter", &[Arg::LongWord], CHAPTER);
    define(preprocessor, interner, "frontmatter", &[], FRONT_MATTER);
    define(preprocessor, interner, "mainmatter", &[], MAIN_MATTER);
    define(preprocessor, interner, "backmatter", &[], BACK_MATTER);
    define(
        preprocessor,
        interner,
        "tableofcontents",
        &[],
        TABLE_OF_CONTENTS,
    );
    define(preprocessor, interner, "printindex", &[], PRINT_INDEX);
    define(
        preprocessor,
        interner,
        "grouptable",
        &[Arg::Word],
        GROUP_TABLE,
    );
    define(preprocessor, interner, "input", &[Arg::LongWord], INPUT);
}
