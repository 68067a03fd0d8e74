use libloading::{Library, Symbol};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, PoisonError};
use tree_sitter::{Language, Parser, Tree};

use crate::error::{ParserError, ParserLoadError};

/// The external parser, reached only through incremental parse requests.
///
/// `old_tree`, when given, must already carry every edit made to the text
/// since it was produced.
pub trait IncrementalParser: Send + Sync {
    fn parse(&mut self, text: &str, old_tree: Option<&Tree>) -> Option<Tree>;
}

/// [`IncrementalParser`] backed by a tree-sitter parser for one language
pub struct TreeSitterParser {
    // Only ever reached through `&mut self`; the mutex makes the parser shareable
    parser: Mutex<Parser>,
}

impl TreeSitterParser {
    pub fn new(language: &Language) -> Result<Self, ParserError> {
        let mut parser = Parser::new();
        parser.set_language(language)?;
        Ok(Self {
            parser: Mutex::new(parser),
        })
    }
}

impl std::fmt::Debug for TreeSitterParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeSitterParser").finish_non_exhaustive()
    }
}

impl IncrementalParser for TreeSitterParser {
    fn parse(&mut self, text: &str, old_tree: Option<&Tree>) -> Option<Tree> {
        self.parser
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .parse(text, old_tree)
    }
}

/// A wrapper around dynamic library loading for Tree-sitter language parsers
///
/// Loaded libraries are kept for the loader's lifetime; a `Language` obtained
/// from it must not outlive the loader.
#[derive(Default)]
pub struct ParserLoader {
    /// Loaded libraries by path; each stays open while languages from it are in use
    loaded_libraries: HashMap<String, Library>,
}

impl ParserLoader {
    /// Create a new ParserLoader instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a Tree-sitter language from a dynamic library
    ///
    /// # Arguments
    /// * `path` - Path to the dynamic library file
    /// * `lang_name` - Name of the language (e.g., "rust", "javascript")
    /// * `symbol` - Exported constructor; defaults to `tree_sitter_{lang_name}`
    pub fn load_language(
        &mut self,
        path: &str,
        lang_name: &str,
        symbol: Option<&str>,
    ) -> Result<Language, ParserLoadError> {
        let func_name = symbol
            .map(str::to_string)
            .unwrap_or_else(|| format!("tree_sitter_{lang_name}"));

        let library = match self.loaded_libraries.entry(path.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            // SAFETY: loading a grammar library runs its initializers; the
            // caller vouches for the configured path.
            Entry::Vacant(entry) => entry.insert(unsafe { Library::new(path)? }),
        };

        // SAFETY: tree-sitter grammars export `const TSLanguage *tree_sitter_<name>(void)`.
        let language_fn: Symbol<unsafe extern "C" fn() -> Language> = unsafe {
            library
                .get(func_name.as_bytes())
                .map_err(|_| ParserLoadError::SymbolNotFound(func_name.clone()))?
        };

        // SAFETY: see above; the library stays loaded in `loaded_libraries`.
        Ok(unsafe { language_fn() })
    }

    /// Whether the library at `path` is already open
    pub fn is_loaded(&self, path: &str) -> bool {
        self.loaded_libraries.contains_key(path)
    }
}
