//! Descriptors for test methods and their parameters.
//!
//! These stand in for runtime reflection: the `#[auto_data]` macro (or a
//! hand-written harness) describes each parameter's type and attaches its
//! attributes explicitly.

use std::fmt;
use std::sync::Arc;

use crate::customization::ParameterCustomizationSource;
use crate::fixture::{Request, TypeKey};
use crate::primitives::Anonymous;

/// Metadata attached to a test method parameter.
///
/// Only attributes that expose a customization source take part in data
/// generation; everything else is carried along untouched.
pub trait ParameterAttribute: Send + Sync {
    /// The customization this attribute contributes, if any
    fn customization_source(&self) -> Option<&dyn ParameterCustomizationSource> {
        None
    }

    /// Name used in diagnostics
    fn attribute_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// One formal parameter of a test method
#[derive(Clone)]
pub struct Parameter {
    name: String,
    request: Request,
    attributes: Vec<Arc<dyn ParameterAttribute>>,
}

impl Parameter {
    /// Parameter of a type the fixture can always build
    pub fn new<T: Anonymous>(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            request: Request::of::<T>().named(name.clone()),
            name,
            attributes: Vec::new(),
        }
    }

    /// Parameter of a type only a customization can build
    pub fn opaque<T: Send + 'static>(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            request: Request::opaque::<T>().named(name.clone()),
            name,
            attributes: Vec::new(),
        }
    }

    /// Attach an attribute; declaration order is kept
    pub fn with_attribute(mut self, attribute: impl ParameterAttribute + 'static) -> Self {
        self.attributes.push(Arc::new(attribute));
        self
    }

    /// Attach an attribute shared with other parameters
    pub fn with_shared_attribute(mut self, attribute: Arc<dyn ParameterAttribute>) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_key(&self) -> TypeKey {
        self.request.key()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn attributes(&self) -> &[Arc<dyn ParameterAttribute>] {
        &self.attributes
    }

    /// Attributes that are customization sources, in declaration order
    pub fn customization_sources(&self) -> impl Iterator<Item = &dyn ParameterCustomizationSource> {
        self.attributes
            .iter()
            .filter_map(|attribute| attribute.customization_source())
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes: Vec<_> = self
            .attributes
            .iter()
            .map(|attribute| attribute.attribute_name())
            .collect();
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("type", &self.type_key())
            .field("attributes", &attributes)
            .finish()
    }
}

/// A test method: its name and ordered parameters
#[derive(Debug, Clone, Default)]
pub struct TestMethod {
    name: String,
    parameters: Vec<Parameter>,
}

impl TestMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Append several parameters
    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}
