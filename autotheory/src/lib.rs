//! # Autotheory - Auto-generated Theory Data
//!
//! Autotheory feeds parameterized ("theory") tests with anonymous values. A
//! test method is described by its parameters; [`AutoData`] applies each
//! parameter's customizations to a shared [`Fixture`] and resolves one value
//! per parameter, in declaration order.
//!
//! ## Quick Start
//!
//! ```rust
//! use autotheory::{AutoData, DataAttribute, DefaultFixture, Frozen, Parameter, TestMethod};
//!
//! let method = TestMethod::new("greets_user")
//!     .parameter(Parameter::new::<String>("name").with_attribute(Frozen::<String>::new()))
//!     .parameter(Parameter::new::<String>("other"))
//!     .parameter(Parameter::new::<u32>("visits"));
//!
//! let data = AutoData::new(|| DefaultFixture::seeded(7));
//! let mut rows = data.get_data(Some(&method)).unwrap();
//! let row = &mut rows[0];
//!
//! let name: String = row.take(0).unwrap();
//! let other: String = row.take(1).unwrap();
//! assert_eq!(name, other);
//! assert!(row.take::<u32>(2).unwrap() >= 1);
//! ```
//!
//! With the `derive` feature the same thing reads as a plain function:
//!
//! ```rust,ignore
//! use autotheory::auto_data;
//!
//! #[auto_data]
//! fn greets_user(#[frozen] name: String, other: String, visits: u32) {
//!     assert_eq!(name, other);
//! }
//! ```

pub mod config;
pub mod customization;
pub mod data;
pub mod error;
pub mod fixture;
pub mod generator;
pub mod method;
pub mod primitives;
pub mod rng;

pub use config::{ConfigError, FixtureConfig};
pub use customization::{
    Customization, CustomizationOrder, CustomizeWith, DeclarationOrder, FreezeLast, Frozen,
    InRange, Inject, OneOf, ParameterCustomizationSource, Precedence, WithGenerator,
};
pub use data::{AutoData, DataAttribute, DataRow, Discovery, FixtureType, InlineAutoData};
pub use error::{AutoDataError, ResolveError};
pub use fixture::{
    DefaultFixture, Fixture, FixtureExt, Request, Specimen, SpecimenContext, TypeKey,
};
pub use generator::{
    ConstantGenerator, FnBuilder, Generator, GeneratorBuilder, OneOfGenerator, RangeGenerator,
    SpecimenBuilder, SpecimenRegistry,
};
pub use method::{Parameter, ParameterAttribute, TestMethod};
pub use primitives::Anonymous;
pub use rng::{DefaultRngProvider, RngProvider, create_rng};

// Re-export the attribute macro when the derive feature is enabled
#[cfg(feature = "derive")]
pub use autotheory_derive::auto_data;
