//! Corpus sources: where sample text comes from.
//!
//! Text files, word dictionaries (optionally with inserted digits and
//! symbols), random character sequences, blank strings and strings drawn
//! from a font's own glyph profile.

pub mod strings;

pub use strings::{
    CharClasses, load_dict, random_space_strings, strings_from_dict,
    strings_from_dict_with_random_chars, strings_from_file, strings_from_profile,
    strings_randomly,
};
