//! Integration tests for AutoData: row shape, construction errors,
//! customization accumulation and lazy fixture creation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use autotheory::{
    AutoData, AutoDataError, DataAttribute, DefaultFixture, Fixture, FixtureConfig, FixtureExt,
    FixtureType, Frozen, InRange, Inject, Parameter, Request, ResolveError, Specimen,
    SpecimenBuilder, SpecimenContext, TestMethod, TypeKey,
};

// Fixtures that delegate to the default engine
macro_rules! delegating_fixture {
    ($name:ident) => {
        impl Fixture for $name {
            fn config(&self) -> &FixtureConfig {
                self.0.config()
            }

            fn rng(&mut self) -> &mut dyn rand::RngCore {
                self.0.rng()
            }

            fn register(&mut self, key: TypeKey, builder: Arc<dyn SpecimenBuilder>) {
                self.0.register(key, builder)
            }

            fn resolve(&mut self, request: &Request) -> Result<Specimen, ResolveError> {
                self.0.resolve(request)
            }
        }
    };
}

/// No default constructor
struct WrappedFixture(DefaultFixture);

delegating_fixture!(WrappedFixture);

struct SeededFixture(DefaultFixture);

impl Default for SeededFixture {
    fn default() -> Self {
        Self(DefaultFixture::seeded(5))
    }
}

delegating_fixture!(SeededFixture);

struct NotAFixture;

struct Account {
    id: u32,
}

fn seeded(seed: u64) -> AutoData {
    AutoData::new(move || DefaultFixture::seeded(seed))
}

#[test]
fn test_one_row_with_one_value_per_parameter() {
    let method = TestMethod::new("shape")
        .parameter(Parameter::new::<u8>("a"))
        .parameter(Parameter::new::<String>("b"))
        .parameter(Parameter::new::<bool>("c"))
        .parameter(Parameter::new::<Vec<i32>>("d"));

    let rows = seeded(1).get_data(Some(&method)).unwrap();

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.len(), 4);
    assert!(row.get::<u8>(0).is_some());
    assert!(row.get::<String>(1).unwrap().starts_with('b'));
    assert!(row.get::<bool>(2).is_some());
    assert_eq!(row.get::<Vec<i32>>(3).unwrap().len(), 3);
}

#[test]
fn test_zero_parameters_yield_one_empty_row() {
    let method = TestMethod::new("nothing");
    let rows = seeded(2).get_data(Some(&method)).unwrap();

    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_empty());
}

#[test]
fn test_missing_factory_is_invalid_argument() {
    let error = AutoData::try_new(None::<fn() -> DefaultFixture>).unwrap_err();
    assert!(matches!(
        error,
        AutoDataError::InvalidArgument {
            argument: "fixture_factory",
            ..
        }
    ));

    assert!(AutoData::try_new(Some(DefaultFixture::new)).is_ok());
}

#[test]
fn test_missing_method_is_invalid_argument() {
    let error = seeded(3).get_data(None).unwrap_err();
    assert!(matches!(
        error,
        AutoDataError::InvalidArgument {
            argument: "test_method",
            ..
        }
    ));
}

#[test]
fn test_customization_carries_over_to_later_parameters() {
    for seed in 0..20 {
        let method = TestMethod::new("carry")
            .parameter(Parameter::new::<i32>("constrained").with_attribute(InRange::new(40i32, 42)))
            .parameter(Parameter::new::<i32>("plain"));

        let rows = seeded(seed).get_data(Some(&method)).unwrap();
        let plain = *rows[0].get::<i32>(1).unwrap();
        assert!((40..=42).contains(&plain), "seed {} produced {}", seed, plain);
    }
}

#[test]
fn test_customization_does_not_reach_earlier_parameters() {
    let method = TestMethod::new("earlier")
        .parameter(Parameter::new::<i32>("first"))
        .parameter(Parameter::new::<i32>("second").with_attribute(Inject::new(-1i32)));

    let rows = seeded(4).get_data(Some(&method)).unwrap();
    assert!(*rows[0].get::<i32>(0).unwrap() >= 1);
    assert_eq!(rows[0].get::<i32>(1), Some(&-1));
}

#[test]
fn test_frozen_value_is_shared_by_later_parameters() {
    let method = TestMethod::new("frozen")
        .parameter(Parameter::new::<String>("id").with_attribute(Frozen::<String>::new()))
        .parameter(Parameter::new::<String>("again"))
        .parameter(Parameter::new::<Option<String>>("maybe"));

    let rows = seeded(6).get_data(Some(&method)).unwrap();
    let id = rows[0].get::<String>(0).unwrap();
    assert!(id.starts_with("id"));
    assert_eq!(rows[0].get::<String>(1), Some(id));
    assert_eq!(rows[0].get::<Option<String>>(2), Some(&Some(id.clone())));
}

#[test]
fn test_customizations_persist_across_calls() {
    let data = seeded(7);
    let frozen = TestMethod::new("first")
        .parameter(Parameter::new::<u64>("n").with_attribute(Frozen::<u64>::new()));
    let plain = TestMethod::new("second").parameter(Parameter::new::<u64>("n"));

    let first = data.get_data(Some(&frozen)).unwrap();
    let second = data.get_data(Some(&plain)).unwrap();
    assert_eq!(first[0].get::<u64>(0), second[0].get::<u64>(0));
}

#[test]
fn test_factory_runs_at_most_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let data = AutoData::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        DefaultFixture::seeded(8)
    });
    let method = TestMethod::new("m").parameter(Parameter::new::<u8>("a"));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    for _ in 0..3 {
        data.get_data(Some(&method)).unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_factory_runs_once_under_concurrent_first_access() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let data = AutoData::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        DefaultFixture::seeded(9)
    });
    let method = TestMethod::new("m").parameter(Parameter::new::<u16>("a"));

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let rows = data.get_data(Some(&method)).unwrap();
                assert_eq!(rows[0].len(), 1);
            });
        }
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_seeded_providers_produce_identical_rows() {
    let method = TestMethod::new("m")
        .parameter(Parameter::new::<i64>("a"))
        .parameter(Parameter::new::<String>("b"))
        .parameter(Parameter::new::<(u8, char)>("c"));

    let first = seeded(10).get_data(Some(&method)).unwrap();
    let second = seeded(10).get_data(Some(&method)).unwrap();

    assert_eq!(first[0].get::<i64>(0), second[0].get::<i64>(0));
    assert_eq!(first[0].get::<String>(1), second[0].get::<String>(1));
    assert_eq!(first[0].get::<(u8, char)>(2), second[0].get::<(u8, char)>(2));
}

#[test]
fn test_resolution_failure_propagates_unchanged() {
    let method = TestMethod::new("m")
        .parameter(Parameter::new::<u8>("ok"))
        .parameter(Parameter::opaque::<Account>("account"));

    let error = seeded(11).get_data(Some(&method)).unwrap_err();
    assert_eq!(
        error,
        AutoDataError::Resolve(ResolveError::NoSpecimen {
            type_name: std::any::type_name::<Account>(),
            request: Some("account".to_string()),
        })
    );
}

#[test]
fn test_builder_failure_propagates_unchanged() {
    let data = AutoData::new(|| {
        let mut fixture = DefaultFixture::seeded(12);
        fixture.register_with(|_: &mut SpecimenContext<'_>| -> Result<Account, ResolveError> {
            Err(ResolveError::generation("account service unavailable"))
        });
        fixture
    });
    let method = TestMethod::new("m").parameter(Parameter::opaque::<Account>("account"));

    let error = data.get_data(Some(&method)).unwrap_err();
    assert_eq!(
        error,
        AutoDataError::Resolve(ResolveError::generation("account service unavailable"))
    );
}

#[test]
fn test_opaque_parameter_built_by_fixture() {
    let data = AutoData::new(|| {
        let mut fixture = DefaultFixture::seeded(13);
        fixture.register_with(|context: &mut SpecimenContext<'_>| {
            Ok(Account {
                id: context.create()?,
            })
        });
        fixture
    });
    let method = TestMethod::new("m").parameter(Parameter::opaque::<Account>("account"));

    let mut rows = data.get_data(Some(&method)).unwrap();
    let account: Account = rows[0].take(0).unwrap();
    assert!(account.id >= 1);
}

#[test]
#[allow(deprecated)]
fn test_prebuilt_fixture_path() {
    let error = AutoData::with_fixture(None).unwrap_err();
    assert!(matches!(
        error,
        AutoDataError::InvalidArgument {
            argument: "fixture",
            ..
        }
    ));

    let data = AutoData::with_fixture(Some(Box::new(DefaultFixture::seeded(14)))).unwrap();
    assert!(data.is_fixture_created());

    let method = TestMethod::new("m").parameter(Parameter::new::<bool>("flag"));
    assert_eq!(data.get_data(Some(&method)).unwrap()[0].len(), 1);
}

#[test]
#[allow(deprecated)]
fn test_fixture_type_without_default_constructor() {
    let error = AutoData::from_type(FixtureType::<WrappedFixture>::new().implementing_fixture())
        .unwrap_err();

    match error {
        AutoDataError::InvalidArgument { argument, message } => {
            assert_eq!(argument, "fixture_type");
            assert!(message.contains("WrappedFixture"));
            assert!(message.contains("has no default constructor"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
#[allow(deprecated)]
fn test_fixture_type_without_fixture_capability() {
    let error = AutoData::from_type(
        FixtureType::<NotAFixture>::new().with_default_constructor(|| NotAFixture),
    )
    .unwrap_err();

    match error {
        AutoDataError::InvalidArgument { argument, message } => {
            assert_eq!(argument, "fixture_type");
            assert!(message.contains("NotAFixture"));
            assert!(message.contains("is not compatible with Fixture"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
#[allow(deprecated)]
fn test_fixture_type_instantiated_reflectively() {
    let data = AutoData::from_type(FixtureType::<SeededFixture>::of()).unwrap();
    let method = TestMethod::new("m").parameter(Parameter::new::<u32>("n"));

    let rows = data.get_data(Some(&method)).unwrap();
    assert!(*rows[0].get::<u32>(0).unwrap() >= 1);
}

#[test]
fn test_with_fixture_mut_shares_the_lazy_fixture() {
    let data = seeded(15);
    data.with_fixture_mut(|fixture| fixture.inject(99u8));

    let method = TestMethod::new("m").parameter(Parameter::new::<u8>("n"));
    let rows = data.get_data(Some(&method)).unwrap();
    assert_eq!(rows[0].get::<u8>(0), Some(&99));
}

#[test]
fn test_panicking_generator_leaves_provider_usable() {
    let data = AutoData::new(|| {
        let config = FixtureConfig {
            max_depth: 2,
            ..FixtureConfig::seeded(16)
        };
        let mut fixture = DefaultFixture::try_with_config(config).unwrap();
        fixture.register_generator::<u16, _>(|_: &mut dyn rand::RngCore, _: &FixtureConfig| -> u16 {
            panic!("generator failed")
        });
        fixture
    });
    let failing = TestMethod::new("failing").parameter(Parameter::new::<u16>("n"));

    for _ in 0..3 {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            data.get_data(Some(&failing))
        }));
        assert!(outcome.is_err());
    }

    let plain = TestMethod::new("plain").parameter(Parameter::new::<u8>("n"));
    let rows = data.get_data(Some(&plain)).unwrap();
    assert!(*rows[0].get::<u8>(0).unwrap() >= 1);
}

#[test]
fn test_nan_range_bound_is_invalid_customization() {
    let method = TestMethod::new("m")
        .parameter(Parameter::new::<f64>("x").with_attribute(InRange::new(f64::NAN, 1.0)));

    let error = seeded(17).get_data(Some(&method)).unwrap_err();
    assert!(matches!(
        error,
        AutoDataError::Resolve(ResolveError::InvalidCustomization { .. })
    ));
}
