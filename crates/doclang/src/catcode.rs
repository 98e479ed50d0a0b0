//! Category codes, which drive the lexer.
//!
//! Every character the lexer reads is first assigned a category by the
//! active [CategoryTable]. The table is mutable at runtime: the command
//! gatherer, for instance, temporarily reclassifies the newline character
//! so a rest-of-line argument can use it as its own terminator.

use std::collections::HashMap;

/// The lexical class assigned to a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    Escape,
    BeginGroup,
    EndGroup,
    MathShift,
    AlignmentTab,
    EndOfLine,
    Superscript,
    Subscript,
    Ignored,
    Space,
    Letter,
    #[default]
    Other,
    Active,
    Comment,
    Invalid,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Escape => "escape",
            Category::BeginGroup => "begin group",
            Category::EndGroup => "end group",
            Category::MathShift => "math shift",
            Category::AlignmentTab => "alignment tab",
            Category::EndOfLine => "end of line",
            Category::Superscript => "superscript",
            Category::Subscript => "subscript",
            Category::Ignored => "ignored",
            Category::Space => "space",
            Category::Letter => "letter",
            Category::Other => "other",
            Category::Active => "active",
            Category::Comment => "comment",
            Category::Invalid => "invalid",
        };
        write!(f, "{name}")
    }
}

/// The per-character category assignment.
///
/// ASCII lives in a dense array; everything else goes through an overflow
/// map with an alphabetic-or-other fallback.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategoryTable {
    #[cfg_attr(feature = "serde", serde(with = "serde_ascii"))]
    ascii: [Category; 128],
    overflow: HashMap<char, Category>,
}

impl CategoryTable {
    pub fn get(&self, c: char) -> Category {
        if (c as u32) < 128 {
            self.ascii[c as usize]
        } else if let Some(&category) = self.overflow.get(&c) {
            category
        } else if c.is_alphabetic() {
            Category::Letter
        } else {
            Category::Other
        }
    }

    /// Overrides the category of a character, returning the previous value.
    pub fn set(&mut self, c: char, category: Category) -> Category {
        if (c as u32) < 128 {
            std::mem::replace(&mut self.ascii[c as usize], category)
        } else {
            let previous = self.get(c);
            self.overflow.insert(c, category);
            previous
        }
    }
}

impl Default for CategoryTable {
    /// The table used for documentation markup.
    ///
    /// `\` escapes, `{`/`}` delimit groups, `$` shifts in and out of math,
    /// `&` is the alignment tab, `^`/`_` are superscript and subscript,
    /// letters are letters and everything else is other. No character is
    /// assigned the active, comment or invalid categories; those exist for
    /// embedders that override the table.
    fn default() -> CategoryTable {
        let mut ascii = [Category::Other; 128];
        for c in 'a'..='z' {
            ascii[c as usize] = Category::Letter;
        }
        for c in 'A'..='Z' {
            ascii[c as usize] = Category::Letter;
        }
        ascii[b'\\' as usize] = Category::Escape;
        ascii[b'{' as usize] = Category::BeginGroup;
        ascii[b'}' as usize] = Category::EndGroup;
        ascii[b'$' as usize] = Category::MathShift;
        ascii[b'&' as usize] = Category::AlignmentTab;
        ascii[b'\n' as usize] = Category::EndOfLine;
        // A carriage return is plain whitespace so CRLF line endings count
        // as one line end.
        ascii[b'\r' as usize] = Category::Space;
        ascii[b'^' as usize] = Category::Superscript;
        ascii[b'_' as usize] = Category::Subscript;
        ascii[b' ' as usize] = Category::Space;
        ascii[b'\t' as usize] = Category::Space;
        ascii[0] = Category::Ignored;
        CategoryTable {
            ascii,
            overflow: HashMap::new(),
        }
    }
}

#[cfg(feature = "serde")]
mod serde_ascii {
    use super::Category;

    pub fn serialize<S: serde::Serializer>(
        value: &[Category; 128],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&value[..], serializer)
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[Category; 128], D::Error> {
        let values: Vec<Category> = serde::Deserialize::deserialize(deserializer)?;
        values
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 128 categories"))
    }
}
