//! Recipe compiler.
//!
//! Expands a recipe into a flat step sequence: primitive invocations are replaced
//! by their bodies, recursively, each body wrapped in its own scope; status
//! checks are injected last.

use super::actions::ActionRegistry;
use super::inject::inject_status_checks;
use super::source::{classify, SearchPath, SourceFile, SourceKind, SourceLine};
use super::step::{CompiledRecipe, Origin, Step, SyntaxFault};
use crate::error::RecipeError;
use crate::report::RunReporter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct RecipeCompiler {
    recipes: SearchPath,
    primitives: SearchPath,
    actions: Arc<ActionRegistry>,
    cache_enabled: bool,
    cache: HashMap<String, Arc<CompiledRecipe>>,
    primitive_sources: HashMap<String, Arc<SourceFile>>,
}

struct Expansion {
    steps: Vec<Step>,
    faults: Vec<SyntaxFault>,
    sources: Vec<std::path::PathBuf>,
    /// Primitives currently being expanded, outermost first
    stack: Vec<String>,
}

impl RecipeCompiler {
    pub fn new(recipes: SearchPath, primitives: SearchPath, actions: Arc<ActionRegistry>) -> Self {
        Self {
            recipes,
            primitives,
            actions,
            cache_enabled: true,
            cache: HashMap::new(),
            primitive_sources: HashMap::new(),
        }
    }

    /// Turn recipe caching on or off. Disabling clears the cache.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        if !enabled {
            self.clear_cache();
        }
        self
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.primitive_sources.clear();
    }

    pub fn is_cached(&self, recipe: &str) -> bool {
        self.cache.contains_key(recipe)
    }

    /// Compile `recipe`, or return the cached compilation.
    pub fn compile(
        &mut self,
        recipe: &str,
        reporter: &RunReporter,
    ) -> Result<Arc<CompiledRecipe>, RecipeError> {
        if let Some(compiled) = self.cache.get(recipe) {
            debug!(run = %reporter.run_id(), recipe, "Using cached recipe");
            return Ok(Arc::clone(compiled));
        }

        let source = SourceFile::load(SourceKind::Recipe, recipe, &self.recipes)?;
        let mut expansion = Expansion {
            steps: Vec::new(),
            faults: Vec::new(),
            sources: vec![source.path.clone()],
            stack: vec![recipe.to_string()],
        };
        self.expand(&source, &mut expansion)?;

        let compiled = Arc::new(CompiledRecipe {
            name: recipe.to_string(),
            steps: inject_status_checks(expansion.steps),
            faults: expansion.faults,
            sources: expansion.sources,
        });
        info!(
            run = %reporter.run_id(),
            recipe,
            steps = compiled.steps.len(),
            faults = compiled.faults.len(),
            fingerprint = %compiled.fingerprint(),
            "Compiled recipe"
        );
        if self.cache_enabled {
            self.cache.insert(recipe.to_string(), Arc::clone(&compiled));
        }
        Ok(compiled)
    }

    fn primitive(&mut self, name: &str) -> Result<Arc<SourceFile>, RecipeError> {
        if let Some(source) = self.primitive_sources.get(name) {
            return Ok(Arc::clone(source));
        }
        let source = Arc::new(SourceFile::load(SourceKind::Primitive, name, &self.primitives)?);
        if self.cache_enabled {
            self.primitive_sources
                .insert(name.to_string(), Arc::clone(&source));
        }
        Ok(source)
    }

    fn expand(&mut self, source: &SourceFile, out: &mut Expansion) -> Result<(), RecipeError> {
        for (index, text) in source.lines.iter().enumerate() {
            let line = index + 1;
            let origin = || Origin {
                source: source.name.clone(),
                line,
            };
            let fault = |message: String| SyntaxFault {
                source: source.name.clone(),
                path: source.path.clone(),
                line,
                message,
                window: source.window(line),
            };
            match classify(text) {
                SourceLine::Blank => {}
                SourceLine::Malformed(message) => out.faults.push(fault(message)),
                SourceLine::Primitive { name, args } => {
                    if out.stack.contains(&name) {
                        let mut path = out.stack.clone();
                        path.push(name);
                        return Err(RecipeError::Cycle {
                            path: path.join(" -> "),
                        });
                    }
                    let body = self.primitive(&name)?;
                    if !out.sources.contains(&body.path) {
                        out.sources.push(body.path.clone());
                    }
                    out.steps.push(Step::ScopeEnter {
                        primitive: name.clone(),
                    });
                    out.steps.push(Step::ArgBind {
                        scope: name.clone(),
                        args,
                    });
                    out.stack.push(name.clone());
                    self.expand(&body, out)?;
                    out.stack.pop();
                    out.steps.push(Step::ScopeExit { primitive: name });
                }
                SourceLine::EngineCall {
                    engine,
                    operation,
                    args,
                    explicit,
                } => out.steps.push(Step::EngineCall {
                    engine,
                    operation,
                    args,
                    record: explicit,
                    origin: origin(),
                }),
                SourceLine::Action {
                    name,
                    text,
                    explicit,
                } => {
                    if self.actions.contains(&name) {
                        out.steps.push(Step::Raw {
                            action: name,
                            text,
                            record: explicit,
                            origin: origin(),
                        });
                    } else {
                        out.faults.push(fault(format!("unknown action {:?}", name)));
                    }
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RecipeCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeCompiler")
            .field("recipes", &self.recipes)
            .field("primitives", &self.primitives)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
