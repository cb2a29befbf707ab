//! The per-language frontends and their registry.
//!
//! Every adapter is a configuration of the engine: a constructor that
//! builds a [`Lowerer`] with the grammar's node types mapped onto engine or
//! adapter handlers and the differing profile constants overridden.
//! Derived grammars share by table copying: `cpp` runs `c::install` and
//! then overwrites entries, and `typescript` does the same over `javascript`
//! rather than inheritance.
//!
//! Construction is cheap and every factory call returns a fresh adapter, so
//! callers lowering files in parallel simply construct one per worker.

mod c;
mod cpp;
mod csharp;
mod go;
mod java;
mod javascript;
mod kotlin;
mod lua;
mod pascal;
mod php;
mod python;
mod ruby;
mod rust;
mod scala;
mod typescript;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    engine::Lowerer,
    error::LowerError,
    ir::Instruction,
    tracer::{LowerTracer, NoopTracer},
    tree::{SourceParser, SourceTree, TreeNode},
};

/// Language tag selecting an adapter.
///
/// Parses from the lowercase tag (`"python"`, `"javascript"`, ...) with the
/// usual short aliases accepted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    Python,
    #[strum(serialize = "javascript", serialize = "js")]
    JavaScript,
    #[strum(serialize = "typescript", serialize = "ts")]
    TypeScript,
    Java,
    Kotlin,
    Scala,
    C,
    #[strum(serialize = "cpp", serialize = "c++")]
    Cpp,
    #[strum(serialize = "csharp", serialize = "c#")]
    CSharp,
    Go,
    Ruby,
    Lua,
    Php,
    Pascal,
    Rust,
}

impl Language {
    /// Builds a fresh adapter for this language with the zero-cost tracer.
    #[must_use]
    pub fn lowerer<N: TreeNode>(self) -> Lowerer<N> {
        self.lowerer_with(NoopTracer)
    }

    /// Builds a fresh adapter with an explicit tracer.
    #[must_use]
    pub fn lowerer_with<N: TreeNode, T: LowerTracer>(self, tracer: T) -> Lowerer<N, T> {
        match self {
            Self::Python => python::lowerer(tracer),
            Self::JavaScript => javascript::lowerer(tracer),
            Self::TypeScript => typescript::lowerer(tracer),
            Self::Java => java::lowerer(tracer),
            Self::Kotlin => kotlin::lowerer(tracer),
            Self::Scala => scala::lowerer(tracer),
            Self::C => c::lowerer(tracer),
            Self::Cpp => cpp::lowerer(tracer),
            Self::CSharp => csharp::lowerer(tracer),
            Self::Go => go::lowerer(tracer),
            Self::Ruby => ruby::lowerer(tracer),
            Self::Lua => lua::lowerer(tracer),
            Self::Php => php::lowerer(tracer),
            Self::Pascal => pascal::lowerer(tracer),
            Self::Rust => rust::lowerer(tracer),
        }
    }
}

/// Convenience entry point: parse `source` with the supplied parser
/// collaborator and lower the resulting tree.
pub fn lower_source<P: SourceParser>(
    parser: &mut P,
    source: &[u8],
    language: Language,
) -> Result<Vec<Instruction>, LowerError> {
    let tree = parser.parse(source, language)?;
    let mut lowerer = language.lowerer::<<P::Tree as SourceTree>::Node>();
    Ok(lowerer.lower(&tree, source)?)
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn tags_parse_with_aliases() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("js".parse::<Language>().unwrap(), Language::JavaScript);
        assert_eq!("c++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("c#".parse::<Language>().unwrap(), Language::CSharp);
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn fifteen_languages_registered() {
        assert_eq!(Language::iter().count(), 15);
    }
}
