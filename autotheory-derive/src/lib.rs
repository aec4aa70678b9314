//! Attribute macro for the autotheory crate
//!
//! `#[auto_data]` turns a function with parameters into a `#[test]` whose
//! arguments come from `autotheory::AutoData`.

use proc_macro::TokenStream;

mod auto_data;

/// Attribute macro for theory tests fed with auto-generated data
///
/// # Basic Usage
///
/// ```rust
/// use autotheory::auto_data;
///
/// #[auto_data]
/// fn name_is_never_empty(name: String, count: u32) {
///     assert!(!name.is_empty());
///     assert!(count >= 1);
/// }
/// ```
///
/// # Configuration
///
/// ```rust
/// use autotheory::{auto_data, DefaultFixture};
///
/// fn my_fixture() -> DefaultFixture {
///     DefaultFixture::seeded(7)
/// }
///
/// #[auto_data(fixture = my_fixture)]
/// fn with_factory(value: i64) {}
///
/// #[auto_data(seed = 42)]
/// fn with_seed(value: i64) {}
///
/// #[auto_data(inline("fixed", 3usize))]
/// fn with_inline_values(label: String, count: usize, extra: bool) {}
/// ```
///
/// - `fixture = path`: a function returning a fixture, called once per test
/// - `seed = N`: use a `DefaultFixture` seeded with `N`
/// - `inline(values...)`: fix the leading arguments, generate the rest
///
/// # Parameter Attributes
///
/// ```rust
/// use autotheory::auto_data;
///
/// #[auto_data]
/// fn customized(
///     #[range(1, 10)] small: u8,
///     other_small: u8,
///     #[frozen] id: String,
///     same_id: String,
///     #[inject("fixed")] label: String,
///     #[one_of('a', 'b')] grade: char,
/// ) {
///     assert!(small <= 10 && other_small <= 10);
/// }
/// ```
///
/// - `#[frozen]`: the value is reused for every later parameter of the same type
/// - `#[range(min, max)]`: numbers of this type are drawn from `min..=max`
/// - `#[one_of(a, b, ...)]`: values of this type are picked from the listed candidates
/// - `#[inject(expr)]`: values of this type are always `expr`
/// - `#[customize(expr)]`: attach any `ParameterAttribute`
/// - `#[opaque]`: the type has no `Anonymous` impl; a customization must build it
#[proc_macro_attribute]
pub fn auto_data(args: TokenStream, input: TokenStream) -> TokenStream {
    auto_data::auto_data_impl(args, input)
}
