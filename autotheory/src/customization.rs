//! Customizations, the parameter attributes that produce them, and the
//! policy ordering several of them on one parameter.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use rand::distributions::uniform::SampleUniform;
use tracing::debug;

use crate::error::ResolveError;
use crate::fixture::{Fixture, FixtureExt, Request};
use crate::generator::{Generator, OneOfGenerator, RangeGenerator};
use crate::method::{Parameter, ParameterAttribute};

/// A change to how a fixture resolves later requests
pub trait Customization: Send + Sync {
    fn customize(&self, fixture: &mut dyn Fixture) -> Result<(), ResolveError>;
}

impl<F> Customization for F
where
    F: Fn(&mut dyn Fixture) -> Result<(), ResolveError> + Send + Sync,
{
    fn customize(&self, fixture: &mut dyn Fixture) -> Result<(), ResolveError> {
        self(fixture)
    }
}

fn boxed<F>(customization: F) -> Box<dyn Customization>
where
    F: Fn(&mut dyn Fixture) -> Result<(), ResolveError> + Send + Sync + 'static,
{
    Box::new(customization)
}

/// Precedence class of a customization source; lower classes are applied first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    /// Registers builders or constraints
    #[default]
    Customize,
    /// Pins a value; applied after everything else on the same parameter
    Freeze,
}

/// Something attached to a parameter that yields a customization for it
pub trait ParameterCustomizationSource: Send + Sync {
    fn customization(&self, parameter: &Parameter) -> Box<dyn Customization>;

    fn precedence(&self) -> Precedence {
        Precedence::Customize
    }
}

/// Ordering policy for customization sources attached to one parameter.
///
/// Providers sort with a stable sort, so sources the policy considers equal
/// keep their declaration order.
pub trait CustomizationOrder: Send + Sync {
    fn compare(
        &self,
        left: &dyn ParameterCustomizationSource,
        right: &dyn ParameterCustomizationSource,
    ) -> Ordering;
}

impl<F> CustomizationOrder for F
where
    F: Fn(&dyn ParameterCustomizationSource, &dyn ParameterCustomizationSource) -> Ordering
        + Send
        + Sync,
{
    fn compare(
        &self,
        left: &dyn ParameterCustomizationSource,
        right: &dyn ParameterCustomizationSource,
    ) -> Ordering {
        self(left, right)
    }
}

/// Orders by [`Precedence`], so freezing sources run last
#[derive(Debug, Clone, Copy, Default)]
pub struct FreezeLast;

impl CustomizationOrder for FreezeLast {
    fn compare(
        &self,
        left: &dyn ParameterCustomizationSource,
        right: &dyn ParameterCustomizationSource,
    ) -> Ordering {
        left.precedence().cmp(&right.precedence())
    }
}

/// Applies sources exactly in declaration order
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationOrder;

impl CustomizationOrder for DeclarationOrder {
    fn compare(
        &self,
        _left: &dyn ParameterCustomizationSource,
        _right: &dyn ParameterCustomizationSource,
    ) -> Ordering {
        Ordering::Equal
    }
}

/// Resolves the parameter once and reuses that value for every later request of its type
pub struct Frozen<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Frozen<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Frozen<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Frozen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frozen<{}>", std::any::type_name::<T>())
    }
}

struct FreezeRequest<T> {
    request: Request,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone + Send + Sync + 'static> Customization for FreezeRequest<T> {
    fn customize(&self, fixture: &mut dyn Fixture) -> Result<(), ResolveError> {
        let value: T = fixture.create_from(&self.request)?;
        debug!(
            type_name = self.request.key().name(),
            name = ?self.request.name(),
            "freezing value"
        );
        fixture.inject(value);
        Ok(())
    }
}

impl<T: Clone + Send + Sync + 'static> ParameterCustomizationSource for Frozen<T> {
    fn customization(&self, parameter: &Parameter) -> Box<dyn Customization> {
        Box::new(FreezeRequest::<T> {
            request: parameter.request().clone(),
            _marker: PhantomData,
        })
    }

    fn precedence(&self) -> Precedence {
        Precedence::Freeze
    }
}

impl<T: Clone + Send + Sync + 'static> ParameterAttribute for Frozen<T> {
    fn customization_source(&self) -> Option<&dyn ParameterCustomizationSource> {
        Some(self)
    }
}

/// Answers every request for `T` with a fixed value
#[derive(Debug, Clone)]
pub struct Inject<T> {
    value: T,
}

impl<T> Inject<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + Send + Sync + 'static> ParameterCustomizationSource for Inject<T> {
    fn customization(&self, _parameter: &Parameter) -> Box<dyn Customization> {
        let value = self.value.clone();
        boxed(move |fixture: &mut dyn Fixture| {
            fixture.inject(value.clone());
            Ok(())
        })
    }
}

impl<T: Clone + Send + Sync + 'static> ParameterAttribute for Inject<T> {
    fn customization_source(&self) -> Option<&dyn ParameterCustomizationSource> {
        Some(self)
    }
}

/// Constrains `T` to a uniform draw from `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct InRange<T> {
    min: T,
    max: T,
}

impl<T> InRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T> ParameterCustomizationSource for InRange<T>
where
    T: SampleUniform + PartialOrd + Copy + fmt::Debug + Send + Sync + 'static,
{
    fn customization(&self, _parameter: &Parameter) -> Box<dyn Customization> {
        let (min, max) = (self.min, self.max);
        boxed(move |fixture: &mut dyn Fixture| {
            let generator = RangeGenerator::new(min, max).ok_or_else(|| {
                ResolveError::invalid_customization(format!(
                    "range minimum {:?} must not exceed maximum {:?}",
                    min, max
                ))
            })?;
            fixture.register_generator::<T, _>(generator);
            Ok(())
        })
    }
}

impl<T> ParameterAttribute for InRange<T>
where
    T: SampleUniform + PartialOrd + Copy + fmt::Debug + Send + Sync + 'static,
{
    fn customization_source(&self) -> Option<&dyn ParameterCustomizationSource> {
        Some(self)
    }
}

/// Draws `T` from a fixed set of candidates
#[derive(Debug, Clone)]
pub struct OneOf<T> {
    values: Vec<T>,
}

impl<T> OneOf<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self { values }
    }
}

impl<T> ParameterCustomizationSource for OneOf<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn customization(&self, parameter: &Parameter) -> Box<dyn Customization> {
        let values = self.values.clone();
        let name = parameter.name().to_string();
        boxed(move |fixture: &mut dyn Fixture| {
            let generator = OneOfGenerator::new(values.clone()).ok_or_else(|| {
                ResolveError::invalid_customization(format!(
                    "one_of on `{}` needs at least one candidate",
                    name
                ))
            })?;
            fixture.register_generator::<T, _>(generator);
            Ok(())
        })
    }
}

impl<T> ParameterAttribute for OneOf<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn customization_source(&self) -> Option<&dyn ParameterCustomizationSource> {
        Some(self)
    }
}

/// Registers a generator for `T`
pub struct WithGenerator<T, G> {
    generator: G,
    _marker: PhantomData<fn() -> T>,
}

impl<T, G> WithGenerator<T, G>
where
    G: Generator<T>,
{
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            _marker: PhantomData,
        }
    }
}

impl<T, G> ParameterCustomizationSource for WithGenerator<T, G>
where
    T: Send + 'static,
    G: Generator<T> + Clone + Send + Sync + 'static,
{
    fn customization(&self, _parameter: &Parameter) -> Box<dyn Customization> {
        let generator = self.generator.clone();
        boxed(move |fixture: &mut dyn Fixture| {
            fixture.register_generator::<T, _>(generator.clone());
            Ok(())
        })
    }
}

impl<T, G> ParameterAttribute for WithGenerator<T, G>
where
    T: Send + 'static,
    G: Generator<T> + Clone + Send + Sync + 'static,
{
    fn customization_source(&self) -> Option<&dyn ParameterCustomizationSource> {
        Some(self)
    }
}

/// Wraps an arbitrary customization as a parameter attribute
#[derive(Clone)]
pub struct CustomizeWith {
    customization: Arc<dyn Customization>,
    precedence: Precedence,
}

impl CustomizeWith {
    pub fn new(customization: impl Customization + 'static) -> Self {
        Self {
            customization: Arc::new(customization),
            precedence: Precedence::Customize,
        }
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }
}

impl fmt::Debug for CustomizeWith {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomizeWith")
            .field("precedence", &self.precedence)
            .finish_non_exhaustive()
    }
}

struct Shared(Arc<dyn Customization>);

impl Customization for Shared {
    fn customize(&self, fixture: &mut dyn Fixture) -> Result<(), ResolveError> {
        self.0.customize(fixture)
    }
}

impl ParameterCustomizationSource for CustomizeWith {
    fn customization(&self, _parameter: &Parameter) -> Box<dyn Customization> {
        Box::new(Shared(Arc::clone(&self.customization)))
    }

    fn precedence(&self) -> Precedence {
        self.precedence
    }
}

impl ParameterAttribute for CustomizeWith {
    fn customization_source(&self) -> Option<&dyn ParameterCustomizationSource> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::DefaultFixture;
    use crate::generator::ConstantGenerator;

    fn apply(source: &dyn ParameterCustomizationSource, parameter: &Parameter, fixture: &mut DefaultFixture) {
        let customization = source.customization(parameter);
        fixture.customize(customization.as_ref()).unwrap();
    }

    #[test]
    fn test_frozen_pins_the_parameter_value() {
        let mut fixture = DefaultFixture::seeded(20);
        let parameter = Parameter::new::<String>("name");

        apply(&Frozen::<String>::new(), &parameter, &mut fixture);

        let first: String = fixture.create_from(parameter.request()).unwrap();
        let second: String = fixture.create().unwrap();
        assert!(first.starts_with("name"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_frozen_on_mismatched_type_fails() {
        let mut fixture = DefaultFixture::seeded(21);
        let parameter = Parameter::new::<u8>("byte");
        let customization = Frozen::<String>::new().customization(&parameter);

        let error = fixture.customize(customization.as_ref()).unwrap_err();
        assert!(matches!(error, ResolveError::TypeMismatch { .. }));
    }

    #[test]
    fn test_inject_and_generator_sources() {
        let mut fixture = DefaultFixture::seeded(22);
        let parameter = Parameter::new::<i32>("n");

        apply(&Inject::new(-5i32), &parameter, &mut fixture);
        assert_eq!(fixture.create::<i32>().unwrap(), -5);

        apply(
            &WithGenerator::<i32, _>::new(ConstantGenerator::new(17i32)),
            &parameter,
            &mut fixture,
        );
        assert_eq!(fixture.create::<i32>().unwrap(), 17);
    }

    #[test]
    fn test_in_range_constrains_values() {
        let mut fixture = DefaultFixture::seeded(23);
        let parameter = Parameter::new::<i64>("n");

        apply(&InRange::new(-10i64, -5), &parameter, &mut fixture);
        for _ in 0..50 {
            let value = fixture.create::<i64>().unwrap();
            assert!((-10..=-5).contains(&value));
        }
    }

    #[test]
    fn test_in_range_rejects_inverted_bounds() {
        let mut fixture = DefaultFixture::seeded(24);
        let parameter = Parameter::new::<u8>("n");
        let customization = InRange::new(9u8, 3).customization(&parameter);

        let error = fixture.customize(customization.as_ref()).unwrap_err();
        assert_eq!(
            error,
            ResolveError::invalid_customization("range minimum 9 must not exceed maximum 3")
        );

        let parameter = Parameter::new::<f64>("x");
        for (min, max) in [(f64::NAN, 1.0), (0.0, f64::NAN)] {
            let customization = InRange::new(min, max).customization(&parameter);
            let error = fixture.customize(customization.as_ref()).unwrap_err();
            assert!(matches!(error, ResolveError::InvalidCustomization { .. }));
        }
    }

    #[test]
    fn test_one_of_picks_from_candidates() {
        let mut fixture = DefaultFixture::seeded(25);
        let parameter = Parameter::new::<String>("color");
        let candidates = vec!["red".to_string(), "green".to_string()];

        apply(&OneOf::new(candidates.clone()), &parameter, &mut fixture);
        for _ in 0..20 {
            assert!(candidates.contains(&fixture.create::<String>().unwrap()));
        }
    }

    #[test]
    fn test_one_of_without_candidates_fails() {
        let mut fixture = DefaultFixture::seeded(26);
        let parameter = Parameter::new::<u8>("level");
        let customization = OneOf::<u8>::new(Vec::new()).customization(&parameter);

        let error = fixture.customize(customization.as_ref()).unwrap_err();
        assert_eq!(
            error,
            ResolveError::invalid_customization("one_of on `level` needs at least one candidate")
        );
    }

    #[test]
    fn test_freeze_last_orders_by_precedence() {
        let frozen = Frozen::<u8>::new();
        let inject = Inject::new(1u8);

        assert_eq!(FreezeLast.compare(&frozen, &inject), Ordering::Greater);
        assert_eq!(FreezeLast.compare(&inject, &frozen), Ordering::Less);
        assert_eq!(FreezeLast.compare(&inject, &inject), Ordering::Equal);
        assert_eq!(DeclarationOrder.compare(&frozen, &inject), Ordering::Equal);
    }

    #[test]
    fn test_closure_order_policy() {
        let reversed = |left: &dyn ParameterCustomizationSource,
                        right: &dyn ParameterCustomizationSource| {
            right.precedence().cmp(&left.precedence())
        };
        let frozen = Frozen::<u8>::new();
        let inject = Inject::new(1u8);

        assert_eq!(reversed.compare(&frozen, &inject), Ordering::Less);
    }

    #[test]
    fn test_customize_with_shares_the_closure() {
        let source = CustomizeWith::new(|fixture: &mut dyn Fixture| -> Result<(), ResolveError> {
            fixture.inject('x');
            Ok(())
        })
        .with_precedence(Precedence::Freeze);
        assert_eq!(source.precedence(), Precedence::Freeze);

        let mut fixture = DefaultFixture::seeded(25);
        apply(&source, &Parameter::new::<char>("c"), &mut fixture);
        assert_eq!(fixture.create::<char>().unwrap(), 'x');
    }
}
