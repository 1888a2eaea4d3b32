//! Public entry point.

use jsonreflect_core::Document;
use tracing::debug;

use crate::descriptor::{Reflect, TypeDescriptor, TypeRef};
use crate::error::Result;
use crate::naming::NameResolver;
use crate::options::ReflectOptions;
use crate::registry::{DefinitionRegistry, ROOT_SITE};
use crate::walker::TypeWalker;

/// Reflects types into schema documents.
///
/// A `Reflector` holds only immutable options, so one value can serve
/// concurrent calls; each `reflect*` call walks with its own registry. Use
/// [`Reflector::reflect_into`] to deduplicate across calls with a registry
/// the caller owns (and synchronises).
#[derive(Debug, Clone)]
pub struct Reflector {
    options: ReflectOptions,
    names: NameResolver,
}

impl Reflector {
    #[must_use]
    pub fn new(options: ReflectOptions) -> Self {
        let names = NameResolver::new(
            options.config.prefixes_to_strip.iter().cloned(),
            options.config.qualify_names,
        );
        Self { options, names }
    }

    #[must_use]
    pub const fn options(&self) -> &ReflectOptions {
        &self.options
    }

    /// Reflect the type of `value`
    pub fn reflect<T: Reflect + ?Sized + 'static>(&self, _value: &T) -> Result<Document> {
        self.reflect_type::<T>()
    }

    pub fn reflect_type<T: Reflect + ?Sized + 'static>(&self) -> Result<Document> {
        self.reflect_many(&[TypeRef::of::<T>()])
    }

    /// Reflect a hand-built descriptor
    pub fn reflect_descriptor(&self, descriptor: TypeDescriptor) -> Result<Document> {
        self.reflect_many(&[TypeRef::from_descriptor(descriptor)])
    }

    /// Reflect several roots into one document sharing a definitions table
    pub fn reflect_many(&self, roots: &[TypeRef]) -> Result<Document> {
        let mut registry = DefinitionRegistry::new(self.options.config.hoist_policy);
        self.run(&mut registry, roots)
    }

    /// Reflect with a caller-owned registry, so definitions are shared with
    /// earlier calls. On error the registry is left as it was before the call.
    pub fn reflect_into(
        &self,
        registry: &mut DefinitionRegistry,
        roots: &[TypeRef],
    ) -> Result<Document> {
        let snapshot = registry.clone();
        let result = self.run(registry, roots);
        if result.is_err() {
            *registry = snapshot;
        }
        result
    }

    fn run(&self, registry: &mut DefinitionRegistry, roots: &[TypeRef]) -> Result<Document> {
        let mut placeholders = Vec::with_capacity(roots.len());
        {
            let mut walker = TypeWalker::new(&self.options, registry);
            for (i, root) in roots.iter().enumerate() {
                placeholders.push(walker.walk_root(root, &format!("{ROOT_SITE}{i}"))?);
            }
        }

        registry.assign_names(&self.names)?;
        let roots = placeholders
            .iter()
            .map(|node| registry.resolve(node))
            .collect::<Result<Vec<_>>>()?;
        let definitions = registry.definitions()?;
        debug!(
            roots = roots.len(),
            definitions = definitions.len(),
            "reflected document"
        );

        let mut document = Document::new(roots, definitions);
        document
            .definitions_prefix
            .clone_from(&self.options.config.definitions_prefix);
        Ok(document)
    }
}

impl Default for Reflector {
    fn default() -> Self {
        Self::new(ReflectOptions::default())
    }
}
