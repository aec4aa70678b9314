//! Anonymous values for primitive types and basic collections.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use num_traits::NumCast;
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::error::ResolveError;
use crate::fixture::{Request, SpecimenContext};

/// Types that can produce an anonymous instance of themselves.
///
/// The fixture falls back to this when nothing was registered for the
/// requested type. Nested values should go through `context` so that
/// customizations apply to them too.
pub trait Anonymous: Sized + Send + 'static {
    fn anonymous(request: &Request, context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError>;
}

impl Anonymous for bool {
    fn anonymous(_request: &Request, context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError> {
        Ok(context.rng().r#gen())
    }
}

impl Anonymous for () {
    fn anonymous(_request: &Request, _context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError> {
        Ok(())
    }
}

// Numbers start at 1 and stop at `max_number`, or the type's own maximum if that is lower.
macro_rules! impl_anonymous_int {
    ($($t:ty),*) => {
        $(
            impl Anonymous for $t {
                fn anonymous(
                    _request: &Request,
                    context: &mut SpecimenContext<'_>,
                ) -> Result<Self, ResolveError> {
                    let max = <$t as NumCast>::from(context.config().max_number).unwrap_or(<$t>::MAX);
                    Ok(context.rng().gen_range(1..=max))
                }
            }
        )*
    };
}

impl_anonymous_int!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize
);

macro_rules! impl_anonymous_float {
    ($($t:ty),*) => {
        $(
            impl Anonymous for $t {
                fn anonymous(
                    _request: &Request,
                    context: &mut SpecimenContext<'_>,
                ) -> Result<Self, ResolveError> {
                    let max = <$t as NumCast>::from(context.config().max_number).unwrap_or(<$t>::MAX);
                    Ok(context.rng().gen_range(1.0..=max))
                }
            }
        )*
    };
}

impl_anonymous_float!(f32, f64);

impl Anonymous for char {
    fn anonymous(_request: &Request, context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError> {
        Ok(char::from(context.rng().sample(Alphanumeric)))
    }
}

/// Strings carry the request name as a prefix so failures point at the parameter
impl Anonymous for String {
    fn anonymous(request: &Request, context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError> {
        let length = context.config().string_length;
        let mut value = request.name().unwrap_or_default().to_string();
        value.reserve(length);
        for _ in 0..length {
            value.push(char::from(context.rng().sample(Alphanumeric)));
        }
        Ok(value)
    }
}

impl<T: Anonymous> Anonymous for Option<T> {
    fn anonymous(_request: &Request, context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError> {
        context.create().map(Some)
    }
}

impl<T: Anonymous> Anonymous for Vec<T> {
    fn anonymous(_request: &Request, context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError> {
        let count = context.config().repeat_count;
        (0..count).map(|_| context.create()).collect()
    }
}

impl<T: Anonymous + Eq + Hash> Anonymous for HashSet<T> {
    fn anonymous(_request: &Request, context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError> {
        let count = context.config().repeat_count;
        (0..count).map(|_| context.create()).collect()
    }
}

impl<K: Anonymous + Eq + Hash, V: Anonymous> Anonymous for HashMap<K, V> {
    fn anonymous(_request: &Request, context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError> {
        let count = context.config().repeat_count;
        (0..count)
            .map(|_| -> Result<(K, V), ResolveError> { Ok((context.create()?, context.create()?)) })
            .collect()
    }
}

impl<A: Anonymous, B: Anonymous> Anonymous for (A, B) {
    fn anonymous(_request: &Request, context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError> {
        Ok((context.create()?, context.create()?))
    }
}

impl<A: Anonymous, B: Anonymous, C: Anonymous> Anonymous for (A, B, C) {
    fn anonymous(_request: &Request, context: &mut SpecimenContext<'_>) -> Result<Self, ResolveError> {
        Ok((context.create()?, context.create()?, context.create()?))
    }
}
