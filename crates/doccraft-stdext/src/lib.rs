//! # Doccraft standard library extensions
//!
//! This crate contains data structures and algorithms used in the Doccraft
//! project that are not specific to documentation extraction.

pub mod algorithms {
    pub mod spellcheck;
}

pub mod collections {
    pub mod scopedmap;
}

pub mod color;
