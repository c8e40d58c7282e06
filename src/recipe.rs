//! Recipes
//!
//! Recipes and primitives are plain-text sources. [`RecipeCompiler`] expands a
//! recipe into a flat [`CompiledRecipe`]; [`RecipeExecutor`] runs it against a
//! frame, turning failures into a [`crate::status::Status`].

pub mod actions;
pub mod compiler;
pub mod executor;
pub mod inject;
pub mod interpolate;
pub mod link;
pub mod source;
pub mod step;

pub use actions::{ActionError, ActionFn, ActionRegistry};
pub use compiler::RecipeCompiler;
pub use executor::{ExecContext, RecipeExecutor};
pub use source::{SearchPath, SourceFile, SourceKind};
pub use step::{CompiledRecipe, Origin, StatusCheck, Step, SyntaxFault};
