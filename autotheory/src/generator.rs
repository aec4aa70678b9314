//! Core generator infrastructure and the type-keyed builder registry.

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use rand::distributions::uniform::SampleUniform;

use crate::config::FixtureConfig;
use crate::error::ResolveError;
use crate::fixture::{Request, Specimen, SpecimenContext, TypeKey};

/// Core generator trait for creating random values of one type
pub trait Generator<T> {
    /// Generate a random value of type T using the provided RNG and configuration
    fn generate(&self, rng: &mut dyn rand::RngCore, config: &FixtureConfig) -> T;
}

impl<T, F> Generator<T> for F
where
    F: Fn(&mut dyn rand::RngCore, &FixtureConfig) -> T,
{
    fn generate(&self, rng: &mut dyn rand::RngCore, config: &FixtureConfig) -> T {
        self(rng, config)
    }
}

/// Type-erased producer of specimens, registered on a fixture per type
pub trait SpecimenBuilder: Send + Sync {
    /// Build a value answering `request`, resolving any nested values through `context`
    fn build(
        &self,
        request: &Request,
        context: &mut SpecimenContext<'_>,
    ) -> Result<Specimen, ResolveError>;
}

/// Adapts a [`Generator`] into a [`SpecimenBuilder`]
pub struct GeneratorBuilder<T, G> {
    generator: G,
    _marker: PhantomData<fn() -> T>,
}

impl<T, G: Generator<T>> GeneratorBuilder<T, G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            _marker: PhantomData,
        }
    }
}

impl<T, G> SpecimenBuilder for GeneratorBuilder<T, G>
where
    T: Send + 'static,
    G: Generator<T> + Send + Sync,
{
    fn build(
        &self,
        _request: &Request,
        context: &mut SpecimenContext<'_>,
    ) -> Result<Specimen, ResolveError> {
        let config = context.config().clone();
        let value = self.generator.generate(context.rng(), &config);
        Ok(Box::new(value))
    }
}

/// Adapts a closure over the specimen context into a [`SpecimenBuilder`]
pub struct FnBuilder<T, F> {
    factory: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> FnBuilder<T, F>
where
    F: Fn(&mut SpecimenContext<'_>) -> Result<T, ResolveError>,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            _marker: PhantomData,
        }
    }
}

impl<T, F> SpecimenBuilder for FnBuilder<T, F>
where
    T: Send + 'static,
    F: Fn(&mut SpecimenContext<'_>) -> Result<T, ResolveError> + Send + Sync,
{
    fn build(
        &self,
        _request: &Request,
        context: &mut SpecimenContext<'_>,
    ) -> Result<Specimen, ResolveError> {
        (self.factory)(context).map(|value| Box::new(value) as Specimen)
    }
}

/// Type-keyed registry of specimen builders
#[derive(Default, Clone)]
pub struct SpecimenRegistry {
    builders: HashMap<TypeId, Arc<dyn SpecimenBuilder>>,
}

impl SpecimenRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder for a type, replacing any earlier one
    pub fn register(&mut self, key: TypeKey, builder: Arc<dyn SpecimenBuilder>) {
        self.builders.insert(key.id(), builder);
    }

    /// Register a generator for a specific type
    pub fn register_generator<T, G>(&mut self, generator: G)
    where
        T: Send + 'static,
        G: Generator<T> + Send + Sync + 'static,
    {
        self.register(
            TypeKey::of::<T>(),
            Arc::new(GeneratorBuilder::<T, G>::new(generator)),
        );
    }

    /// Get the builder registered for a type
    pub fn get(&self, key: TypeKey) -> Option<Arc<dyn SpecimenBuilder>> {
        self.builders.get(&key.id()).cloned()
    }

    /// Check if a builder is registered for a type
    pub fn contains(&self, key: TypeKey) -> bool {
        self.builders.contains_key(&key.id())
    }

    /// Remove the builder for a type
    pub fn remove(&mut self, key: TypeKey) -> bool {
        self.builders.remove(&key.id()).is_some()
    }

    /// Get the number of registered builders
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl std::fmt::Debug for SpecimenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecimenRegistry")
            .field("builders", &self.builders.len())
            .finish()
    }
}

/// A simple generator that always produces the same value
#[derive(Debug, Clone)]
pub struct ConstantGenerator<T> {
    value: T,
}

impl<T: Clone> ConstantGenerator<T> {
    /// Create a new constant generator
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + 'static> Generator<T> for ConstantGenerator<T> {
    fn generate(&self, _rng: &mut dyn rand::RngCore, _config: &FixtureConfig) -> T {
        self.value.clone()
    }
}

/// A generator that chooses randomly from a collection of values
#[derive(Debug, Clone)]
pub struct OneOfGenerator<T> {
    values: Vec<T>,
}

impl<T: Clone> OneOfGenerator<T> {
    /// Create a new one-of generator, or `None` when there is nothing to choose from
    pub fn new(values: Vec<T>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self { values })
    }
}

impl<T: Clone + 'static> Generator<T> for OneOfGenerator<T> {
    fn generate(&self, rng: &mut dyn rand::RngCore, _config: &FixtureConfig) -> T {
        use rand::Rng;
        let index = rng.gen_range(0..self.values.len());
        self.values[index].clone()
    }
}

/// Uniform generator over an inclusive range
#[derive(Debug, Clone)]
pub struct RangeGenerator<T> {
    min: T,
    max: T,
}

impl<T> RangeGenerator<T>
where
    T: SampleUniform + PartialOrd + Copy,
{
    /// Create a range generator, or `None` unless `min <= max`.
    ///
    /// Unordered bounds such as a NaN are rejected as well.
    pub fn new(min: T, max: T) -> Option<Self> {
        match min.partial_cmp(&max) {
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal) => Some(Self { min, max }),
            _ => None,
        }
    }
}

impl<T> Generator<T> for RangeGenerator<T>
where
    T: SampleUniform + PartialOrd + Copy,
{
    fn generate(&self, rng: &mut dyn rand::RngCore, _config: &FixtureConfig) -> T {
        use rand::Rng;
        rng.gen_range(self.min..=self.max)
    }
}
