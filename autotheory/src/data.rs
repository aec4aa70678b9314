//! Theory data providers backed by a fixture.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::customization::{CustomizationOrder, FreezeLast, ParameterCustomizationSource};
use crate::error::AutoDataError;
use crate::fixture::{DefaultFixture, Fixture, Specimen, TypeKey};
use crate::method::{Parameter, TestMethod};

/// How a test framework may discover the rows of a data attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// Rows are stable and may be enumerated ahead of execution
    PreEnumerate,
    /// Rows must be requested at execution time
    NoPreDiscovery,
}

/// Source of theory data: rows of arguments for a test method
pub trait DataAttribute {
    /// Produce the rows for `method`; an absent descriptor is an error
    fn get_data(&self, method: Option<&TestMethod>) -> Result<Vec<DataRow>, AutoDataError>;

    fn discovery(&self) -> Discovery {
        Discovery::PreEnumerate
    }
}

/// One row of arguments, positionally aligned with the method's parameters
pub struct DataRow {
    values: Vec<Option<Specimen>>,
}

impl DataRow {
    pub fn new(values: Vec<Specimen>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the value at `index` if it is still present and of type `T`
    pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
        self.values
            .get(index)
            .and_then(|value| value.as_ref())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Move the value at `index` out of the row
    pub fn take<T: 'static>(&mut self, index: usize) -> Result<T, AutoDataError> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or_else(|| AutoDataError::RowArgument {
                index,
                message: "index is past the end of the row".to_string(),
            })?;

        match slot.take() {
            None => Err(AutoDataError::RowArgument {
                index,
                message: "value was already taken".to_string(),
            }),
            Some(value) => match value.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(value) => {
                    *slot = Some(value);
                    Err(AutoDataError::RowArgument {
                        index,
                        message: format!("value is not a {}", std::any::type_name::<T>()),
                    })
                }
            },
        }
    }
}

impl fmt::Debug for DataRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataRow")
            .field("len", &self.values.len())
            .finish()
    }
}

type FixtureFactory = Box<dyn Fn() -> Box<dyn Fixture> + Send + Sync>;

type SharedFixture = Mutex<Box<dyn Fixture>>;

/// Where a provider's fixture comes from
enum FixtureSlot {
    /// Built by the factory on first use
    Lazy {
        factory: FixtureFactory,
        cell: OnceCell<SharedFixture>,
    },
    /// Supplied already built
    Ready(SharedFixture),
}

/// Describes a fixture type for reflective construction: whether it has the
/// fixture capability and how to default-construct it.
pub struct FixtureType<T> {
    constructor: Option<fn() -> T>,
    as_fixture: Option<fn(T) -> Box<dyn Fixture>>,
}

impl<T: 'static> FixtureType<T> {
    /// A type with neither capability nor constructor declared
    pub fn new() -> Self {
        Self {
            constructor: None,
            as_fixture: None,
        }
    }

    pub fn with_default_constructor(mut self, constructor: fn() -> T) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T: Fixture + 'static> FixtureType<T> {
    /// Declare that `T` implements [`Fixture`]
    pub fn implementing_fixture(mut self) -> Self {
        self.as_fixture = Some(|fixture: T| Box::new(fixture) as Box<dyn Fixture>);
        self
    }
}

impl<T: Fixture + Default + 'static> FixtureType<T> {
    /// A default-constructible fixture type
    pub fn of() -> Self {
        Self::new()
            .with_default_constructor(T::default)
            .implementing_fixture()
    }
}

impl<T: 'static> Default for FixtureType<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> FixtureType<T> {
    fn instantiate(&self) -> Result<Box<dyn Fixture>, AutoDataError> {
        let as_fixture = self.as_fixture.ok_or_else(|| {
            AutoDataError::invalid_argument(
                "fixture_type",
                format!(
                    "{} is not compatible with Fixture. Please supply a type which implements Fixture.",
                    self.name()
                ),
            )
        })?;
        let constructor = self.constructor.ok_or_else(|| {
            AutoDataError::invalid_argument(
                "fixture_type",
                format!(
                    "{} has no default constructor. Please supply a type that implements Fixture and has a default constructor. Alternatively supply a Fixture instance through AutoData::new.",
                    self.name()
                ),
            )
        })?;
        Ok(as_fixture(constructor()))
    }
}

/// Provides auto-generated theory data from a lazily created fixture.
///
/// The fixture is built on first use, at most once per provider, and kept
/// for the provider's lifetime. Customizations applied while generating a
/// row stay on the fixture.
pub struct AutoData {
    fixture: FixtureSlot,
    order: Arc<dyn CustomizationOrder>,
}

impl AutoData {
    /// Provider whose fixture is created on demand by `factory`
    pub fn new<F, X>(factory: F) -> Self
    where
        F: Fn() -> X + Send + Sync + 'static,
        X: Fixture + 'static,
    {
        Self {
            fixture: FixtureSlot::Lazy {
                factory: Box::new(move || Box::new(factory()) as Box<dyn Fixture>),
                cell: OnceCell::new(),
            },
            order: Arc::new(FreezeLast),
        }
    }

    /// Like [`AutoData::new`], failing when no factory is given
    pub fn try_new<F, X>(factory: Option<F>) -> Result<Self, AutoDataError>
    where
        F: Fn() -> X + Send + Sync + 'static,
        X: Fixture + 'static,
    {
        factory
            .map(Self::new)
            .ok_or_else(|| AutoDataError::invalid_argument("fixture_factory", "a fixture factory is required"))
    }

    /// Provider around an already built fixture
    #[deprecated(note = "building the fixture eagerly is wasteful; use AutoData::new with a factory")]
    pub fn with_fixture(fixture: Option<Box<dyn Fixture>>) -> Result<Self, AutoDataError> {
        fixture
            .map(Self::from_instance)
            .ok_or_else(|| AutoDataError::invalid_argument("fixture", "a fixture instance is required"))
    }

    /// Provider around a default-constructed instance of a described fixture type
    #[deprecated(note = "pass a factory building the customized fixture to AutoData::new instead")]
    pub fn from_type<T: 'static>(fixture_type: FixtureType<T>) -> Result<Self, AutoDataError> {
        fixture_type.instantiate().map(Self::from_instance)
    }

    fn from_instance(fixture: Box<dyn Fixture>) -> Self {
        Self {
            fixture: FixtureSlot::Ready(Mutex::new(fixture)),
            order: Arc::new(FreezeLast),
        }
    }

    /// Replace the policy ordering customizations on one parameter
    pub fn with_order(mut self, order: impl CustomizationOrder + 'static) -> Self {
        self.order = Arc::new(order);
        self
    }

    /// Whether the fixture has been created yet
    pub fn is_fixture_created(&self) -> bool {
        match &self.fixture {
            FixtureSlot::Lazy { cell, .. } => cell.get().is_some(),
            FixtureSlot::Ready(_) => true,
        }
    }

    /// Run `f` against the fixture, creating it first if needed
    pub fn with_fixture_mut<R>(&self, f: impl FnOnce(&mut dyn Fixture) -> R) -> R {
        let mut fixture = self.lock_fixture();
        f(fixture.as_mut())
    }

    /// Type name of the fixture in use, creating it first if needed
    #[deprecated(note = "inspect the fixture through AutoData::with_fixture_mut instead")]
    pub fn fixture_type_name(&self) -> &'static str {
        self.lock_fixture().type_name()
    }

    fn lock_fixture(&self) -> MutexGuard<'_, Box<dyn Fixture>> {
        let fixture = match &self.fixture {
            FixtureSlot::Ready(fixture) => fixture,
            FixtureSlot::Lazy { factory, cell } => cell.get_or_init(|| {
                debug!("creating fixture");
                Mutex::new(factory())
            }),
        };
        fixture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build one row; the first `preset.len()` parameters take preset values
    fn build_row(
        &self,
        method: &TestMethod,
        preset: &[InlineValue],
    ) -> Result<DataRow, AutoDataError> {
        let mut fixture = self.lock_fixture();
        let mut specimens = Vec::with_capacity(method.arity());

        for (index, parameter) in method.parameters().iter().enumerate() {
            self.customize_fixture(fixture.as_mut(), parameter)?;

            let specimen = match preset.get(index) {
                Some(value) => (value.make)(),
                None => {
                    trace!(
                        method = method.name(),
                        parameter = parameter.name(),
                        type_name = parameter.type_key().name(),
                        "resolving parameter"
                    );
                    fixture.resolve(parameter.request())?
                }
            };
            specimens.push(specimen);
        }

        Ok(DataRow::new(specimens))
    }

    fn customize_fixture(
        &self,
        fixture: &mut dyn Fixture,
        parameter: &Parameter,
    ) -> Result<(), AutoDataError> {
        let mut sources: Vec<&dyn ParameterCustomizationSource> =
            parameter.customization_sources().collect();
        sources.sort_by(|left, right| self.order.compare(*left, *right));

        for source in sources {
            debug!(
                parameter = parameter.name(),
                precedence = ?source.precedence(),
                "applying customization"
            );
            let customization = source.customization(parameter);
            fixture.customize(customization.as_ref())?;
        }
        Ok(())
    }
}

impl Default for AutoData {
    fn default() -> Self {
        Self::new(DefaultFixture::new)
    }
}

impl fmt::Debug for AutoData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoData")
            .field("fixture_created", &self.is_fixture_created())
            .finish_non_exhaustive()
    }
}

impl DataAttribute for AutoData {
    fn get_data(&self, method: Option<&TestMethod>) -> Result<Vec<DataRow>, AutoDataError> {
        let method = method.ok_or_else(|| {
            AutoDataError::invalid_argument("test_method", "a test method descriptor is required")
        })?;
        Ok(vec![self.build_row(method, &[])?])
    }

    fn discovery(&self) -> Discovery {
        Discovery::NoPreDiscovery
    }
}

struct InlineValue {
    key: TypeKey,
    make: Arc<dyn Fn() -> Specimen + Send + Sync>,
}

/// Theory data whose leading arguments are fixed and the rest auto-generated
pub struct InlineAutoData {
    auto: AutoData,
    values: Vec<InlineValue>,
}

impl InlineAutoData {
    pub fn new(auto: AutoData) -> Self {
        Self {
            auto,
            values: Vec::new(),
        }
    }

    /// Append the next fixed argument
    pub fn value<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.push(InlineValue {
            key: TypeKey::of::<T>(),
            make: Arc::new(move || Box::new(value.clone()) as Specimen),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn auto_data(&self) -> &AutoData {
        &self.auto
    }

    fn check_values(&self, method: &TestMethod) -> Result<(), AutoDataError> {
        if self.values.len() > method.arity() {
            return Err(AutoDataError::invalid_argument(
                "values",
                format!(
                    "{} inline values supplied for `{}`, which takes {} parameters",
                    self.values.len(),
                    method.name(),
                    method.arity()
                ),
            ));
        }

        for (index, (value, parameter)) in self.values.iter().zip(method.parameters()).enumerate() {
            if value.key != parameter.type_key() {
                return Err(AutoDataError::invalid_argument(
                    "values",
                    format!(
                        "inline value {} is a {} but parameter `{}` expects {}",
                        index,
                        value.key,
                        parameter.name(),
                        parameter.type_key()
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl Default for InlineAutoData {
    fn default() -> Self {
        Self::new(AutoData::default())
    }
}

impl fmt::Debug for InlineAutoData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<_> = self.values.iter().map(|value| value.key).collect();
        f.debug_struct("InlineAutoData")
            .field("auto", &self.auto)
            .field("values", &keys)
            .finish()
    }
}

impl DataAttribute for InlineAutoData {
    fn get_data(&self, method: Option<&TestMethod>) -> Result<Vec<DataRow>, AutoDataError> {
        let method = method.ok_or_else(|| {
            AutoDataError::invalid_argument("test_method", "a test method descriptor is required")
        })?;
        self.check_values(method)?;
        Ok(vec![self.auto.build_row(method, &self.values)?])
    }

    fn discovery(&self) -> Discovery {
        Discovery::NoPreDiscovery
    }
}
