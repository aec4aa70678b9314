//! The generator context: requests, the `Fixture` capability and the default engine.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, trace};

use crate::config::{ConfigError, FixtureConfig};
use crate::customization::Customization;
use crate::error::ResolveError;
use crate::generator::{FnBuilder, Generator, GeneratorBuilder, SpecimenBuilder, SpecimenRegistry};
use crate::primitives::Anonymous;
use crate::rng::{DefaultRngProvider, RngProvider};

/// A type-erased value produced by a fixture
pub type Specimen = Box<dyn Any + Send>;

/// Identity of a requested type, with its name kept for diagnostics
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

struct AnonymousBuilder<T>(std::marker::PhantomData<fn() -> T>);

impl<T: Anonymous> SpecimenBuilder for AnonymousBuilder<T> {
    fn build(
        &self,
        request: &Request,
        context: &mut SpecimenContext<'_>,
    ) -> Result<Specimen, ResolveError> {
        T::anonymous(request, context).map(|value| Box::new(value) as Specimen)
    }
}

/// A request for one value: the wanted type, an optional name, and how to
/// build it when the fixture has nothing registered for that type.
#[derive(Clone)]
pub struct Request {
    key: TypeKey,
    name: Option<String>,
    fallback: Option<Arc<dyn SpecimenBuilder>>,
}

impl Request {
    /// Request a type that knows how to build an anonymous instance of itself
    pub fn of<T: Anonymous>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            name: None,
            fallback: Some(Arc::new(AnonymousBuilder::<T>(std::marker::PhantomData))),
        }
    }

    /// Request a type the fixture must have been customized to build
    pub fn opaque<T: Send + 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            name: None,
            fallback: None,
        }
    }

    /// Attach a name, usually the parameter name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fallback(&self) -> Option<&Arc<dyn SpecimenBuilder>> {
        self.fallback.as_ref()
    }

    fn describe(&self) -> Option<String> {
        self.name.clone()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

/// The generator-context capability: something that can be customized and
/// asked for values.
pub trait Fixture: Send {
    /// Configuration used for anonymous values
    fn config(&self) -> &FixtureConfig;

    /// Random source shared by every builder
    fn rng(&mut self) -> &mut dyn rand::RngCore;

    /// Register a builder for a type, replacing any earlier one
    fn register(&mut self, key: TypeKey, builder: Arc<dyn SpecimenBuilder>);

    /// Produce a value for a request
    fn resolve(&mut self, request: &Request) -> Result<Specimen, ResolveError>;

    /// Name of the concrete fixture type
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl dyn Fixture + '_ {
    /// Apply a customization to this fixture
    pub fn customize(&mut self, customization: &dyn Customization) -> Result<(), ResolveError> {
        customization.customize(self)
    }
}

/// Typed helpers available on every [`Fixture`]
pub trait FixtureExt: Fixture {
    /// Create an anonymous value of `T`
    fn create<T: Anonymous>(&mut self) -> Result<T, ResolveError> {
        self.create_from(&Request::of::<T>())
    }

    /// Resolve a request and downcast the result
    fn create_from<T: 'static>(&mut self, request: &Request) -> Result<T, ResolveError> {
        let specimen = self.resolve(request)?;
        specimen
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ResolveError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                request: request.describe(),
            })
    }

    /// Always answer requests for `T` with a clone of `value`
    fn inject<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        self.register(
            TypeKey::of::<T>(),
            Arc::new(FnBuilder::new(move |_: &mut SpecimenContext<'_>| Ok(value.clone()))),
        );
    }

    /// Answer requests for `T` with a generator
    fn register_generator<T, G>(&mut self, generator: G)
    where
        T: Send + 'static,
        G: Generator<T> + Send + Sync + 'static,
    {
        self.register(
            TypeKey::of::<T>(),
            Arc::new(GeneratorBuilder::<T, G>::new(generator)),
        );
    }

    /// Answer requests for `T` with a closure that may resolve nested values
    fn register_with<T, F>(&mut self, factory: F)
    where
        T: Send + 'static,
        F: Fn(&mut SpecimenContext<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.register(TypeKey::of::<T>(), Arc::new(FnBuilder::new(factory)));
    }

    /// Create one value of `T` and return it for every later request of `T`
    fn freeze<T: Anonymous + Clone + Sync>(&mut self) -> Result<T, ResolveError> {
        let value: T = self.create()?;
        self.inject(value.clone());
        Ok(value)
    }
}

impl<F: Fixture + ?Sized> FixtureExt for F {}

/// View of a fixture handed to builders so they can resolve nested values
pub struct SpecimenContext<'a> {
    fixture: &'a mut dyn Fixture,
}

impl<'a> SpecimenContext<'a> {
    pub fn new(fixture: &'a mut dyn Fixture) -> Self {
        Self { fixture }
    }

    pub fn config(&self) -> &FixtureConfig {
        self.fixture.config()
    }

    pub fn rng(&mut self) -> &mut dyn rand::RngCore {
        self.fixture.rng()
    }

    /// Resolve a nested request through the owning fixture
    pub fn resolve(&mut self, request: &Request) -> Result<Specimen, ResolveError> {
        self.fixture.resolve(request)
    }

    /// Create a nested anonymous value
    pub fn create<T: Anonymous>(&mut self) -> Result<T, ResolveError> {
        self.fixture.create()
    }
}

/// Default fixture: registered builders first, then each type's anonymous builder
pub struct DefaultFixture {
    config: FixtureConfig,
    rng: Box<dyn rand::RngCore + Send>,
    registry: SpecimenRegistry,
    depth: Arc<AtomicUsize>,
}

/// Holds one level of nesting; released on drop, including during unwinding
struct DepthGuard(Arc<AtomicUsize>);

impl DepthGuard {
    fn enter(depth: &Arc<AtomicUsize>) -> Self {
        depth.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(depth))
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl DefaultFixture {
    /// Fixture configured from the environment
    pub fn new() -> Self {
        Self::from_valid_config(FixtureConfig::load(), &DefaultRngProvider)
    }

    /// Fixture with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self::from_valid_config(FixtureConfig::seeded(seed), &DefaultRngProvider)
    }

    /// Fixture with an explicit configuration
    pub fn try_with_config(config: FixtureConfig) -> Result<Self, ConfigError> {
        Self::try_with_rng_provider(config, &DefaultRngProvider)
    }

    /// Fixture with an explicit configuration and RNG provider
    pub fn try_with_rng_provider<P: RngProvider>(
        config: FixtureConfig,
        provider: &P,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config, provider))
    }

    fn from_valid_config<P: RngProvider>(config: FixtureConfig, provider: &P) -> Self {
        debug!(seed = ?config.seed, "creating default fixture");
        Self {
            rng: Box::new(provider.create_rng(config.seed)),
            config,
            registry: SpecimenRegistry::new(),
            depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Apply a customization to this fixture
    pub fn customize(&mut self, customization: &dyn Customization) -> Result<(), ResolveError> {
        customization.customize(self)
    }

    /// Builders registered through customizations so far
    pub fn registry(&self) -> &SpecimenRegistry {
        &self.registry
    }
}

impl Default for DefaultFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultFixture")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

impl Fixture for DefaultFixture {
    fn config(&self) -> &FixtureConfig {
        &self.config
    }

    fn rng(&mut self) -> &mut dyn rand::RngCore {
        self.rng.as_mut()
    }

    fn register(&mut self, key: TypeKey, builder: Arc<dyn SpecimenBuilder>) {
        trace!(type_name = key.name(), "registering specimen builder");
        self.registry.register(key, builder);
    }

    fn resolve(&mut self, request: &Request) -> Result<Specimen, ResolveError> {
        let key = request.key();
        let depth = self.depth.load(Ordering::Relaxed);
        if depth >= self.config.max_depth {
            return Err(ResolveError::RecursionDepthExceeded {
                type_name: key.name(),
                depth,
            });
        }

        let builder = self
            .registry
            .get(key)
            .or_else(|| request.fallback().cloned())
            .ok_or_else(|| ResolveError::NoSpecimen {
                type_name: key.name(),
                request: request.describe(),
            })?;

        trace!(type_name = key.name(), name = ?request.name(), depth, "resolving");

        let guard = DepthGuard::enter(&self.depth);
        let result = builder.build(request, &mut SpecimenContext::new(self));
        drop(guard);

        let specimen = result?;
        if (*specimen).type_id() != key.id() {
            return Err(ResolveError::TypeMismatch {
                expected: key.name(),
                request: request.describe(),
            });
        }
        Ok(specimen)
    }
}
