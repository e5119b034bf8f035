// Copyright 2025 Oxide Computer Company

//! Describes the callable surface of a handler type: its methods, their
//! parameters, and their documentation.
//!
//! Descriptions are normally generated by the `#[restive::resource]`
//! attribute, but they can also be assembled by hand:
//!
//! ```
//! use restive::HandlerDescription;
//! use restive::MethodSpec;
//! use restive::ParameterSpec;
//!
//! let description = HandlerDescription::new("Members of the crew.")
//!     .constructor(vec![ParameterSpec::required("data")])
//!     .method(
//!         MethodSpec::builder("getFromPlanet")
//!             .doc("Get members by planet.\n@param string $planet Planet")
//!             .param(ParameterSpec::optional("planet", "Earth".into()))
//!             .returns("Vec<String>")
//!             .build(),
//!     );
//! let method = description.method_spec("getfromplanet").unwrap();
//! assert_eq!(method.name, "getfromplanet");
//! assert_eq!(method.parameters[0].type_name, "string");
//! ```

use crate::doc::ExtractedDoc;
use crate::doc::UNKNOWN_TYPE;
use crate::params::BoundParams;
use crate::params::Value;
use crate::params::ValueMap;
use indexmap::IndexMap;

/// Methods whose names start with this prefix are never exposed.
pub const RESERVED_METHOD_PREFIX: &str = "__";

/// One declared parameter of a method or constructor.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    /// zero-based declaration order
    pub position: usize,
    pub type_name: String,
    pub is_optional: bool,
    pub default_value: Option<Value>,
    pub description: String,
}

impl ParameterSpec {
    /// A parameter that must be supplied by the caller.
    pub fn required<S: Into<String>>(name: S) -> ParameterSpec {
        ParameterSpec {
            name: name.into(),
            position: 0,
            type_name: String::new(),
            is_optional: false,
            default_value: None,
            description: String::new(),
        }
    }

    /// A parameter that takes `default` when the caller omits it.
    pub fn optional<S: Into<String>>(name: S, default: Value) -> ParameterSpec {
        ParameterSpec {
            is_optional: true,
            default_value: Some(default),
            ..ParameterSpec::required(name)
        }
    }

    /// Records the declared type, used when the documentation has none.
    pub fn with_type<S: Into<String>>(mut self, type_name: S) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    fn apply_doc(&mut self, doc: &ExtractedDoc) {
        let tag = doc.param(&self.name);
        if let Some(doc_type) = tag.and_then(|t| t.type_name.as_ref()) {
            self.type_name = doc_type.clone();
        } else if self.type_name.is_empty() {
            self.type_name = UNKNOWN_TYPE.to_string();
        }
        if self.description.is_empty() {
            if let Some(tag) = tag {
                self.description = tag.description.clone();
            }
        }
    }
}

/// Describes a method exposed by a resource.  Built once when the resource
/// is registered and never modified afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodSpec {
    /// lowercase name used for addressing
    pub name: String,
    pub parameters: Vec<ParameterSpec>,
    pub description: String,
    pub purpose: String,
    pub return_type: String,
    pub return_description: String,
}

impl MethodSpec {
    pub fn builder<S: Into<String>>(name: S) -> MethodSpecBuilder {
        MethodSpecBuilder {
            name: name.into(),
            doc: String::new(),
            declared_return: None,
            parameters: Vec::new(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Binds `input` to this method's parameters.  See [`bind_parameters`].
    pub fn bind(&self, input: &ValueMap) -> Result<BoundParams, String> {
        bind_parameters(&self.parameters, input)
    }
}

/// Incrementally builds a [`MethodSpec`].
#[derive(Debug)]
pub struct MethodSpecBuilder {
    name: String,
    doc: String,
    declared_return: Option<String>,
    parameters: Vec<ParameterSpec>,
}

impl MethodSpecBuilder {
    /// Sets the doc comment text.  Its first sentence is the description, the
    /// rest the purpose, and `@param`/`@return` tags document the parameters
    /// and the result.
    pub fn doc<S: AsRef<str>>(mut self, doc: S) -> Self {
        self.doc = doc.as_ref().to_string();
        self
    }

    /// Records the declared return type, used when the documentation has no
    /// `@return` type.
    pub fn returns<S: Into<String>>(mut self, type_name: S) -> Self {
        self.declared_return = Some(type_name.into());
        self
    }

    pub fn param(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn build(self) -> MethodSpec {
        let doc = ExtractedDoc::parse(&self.doc);
        let parameters = finish_parameters(self.parameters, &doc);
        let (doc_return_type, return_description) = match &doc.returns {
            Some(tag) => (tag.type_name.clone(), tag.description.clone()),
            None => (None, String::new()),
        };
        let return_type = doc_return_type
            .or(self.declared_return)
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string());

        MethodSpec {
            name: self.name.to_lowercase(),
            parameters,
            description: doc.description,
            purpose: doc.purpose,
            return_type,
            return_description,
        }
    }
}

fn finish_parameters(
    parameters: Vec<ParameterSpec>,
    doc: &ExtractedDoc,
) -> Vec<ParameterSpec> {
    parameters
        .into_iter()
        .enumerate()
        .map(|(position, mut parameter)| {
            parameter.position = position;
            parameter.apply_doc(doc);
            parameter
        })
        .collect()
}

/// Binds an input map to a list of declared parameters.
///
/// Input keys are matched case-insensitively.  Each declared parameter takes
/// the matching input as is, or its default if it is optional.  If any
/// required parameter has no input, the whole binding fails and the name of
/// the first such parameter is returned.  Unrecognized input keys are
/// ignored.
pub fn bind_parameters(
    parameters: &[ParameterSpec],
    input: &ValueMap,
) -> Result<BoundParams, String> {
    let folded: IndexMap<String, &Value> =
        input.iter().map(|(k, v)| (k.to_lowercase(), v)).collect();

    let mut bound = BoundParams::new();
    for parameter in parameters {
        let value = match folded.get(&parameter.name.to_lowercase()) {
            Some(value) => (*value).clone(),
            None => match &parameter.default_value {
                Some(default) => default.clone(),
                None => return Err(parameter.name.clone()),
            },
        };
        bound.insert(parameter.name.clone(), value);
    }
    Ok(bound)
}

/// The description of a handler type, produced by [`crate::Handler::describe`].
#[derive(Clone, Debug, Default)]
pub struct HandlerDescription {
    pub description: String,
    pub purpose: String,
    constructor: Vec<ParameterSpec>,
    methods: IndexMap<String, MethodSpec>,
    duplicates: Vec<String>,
}

impl HandlerDescription {
    /// Creates a description from the type-level doc comment.
    pub fn new<S: AsRef<str>>(doc: S) -> HandlerDescription {
        let doc = ExtractedDoc::parse(doc.as_ref());
        HandlerDescription {
            description: doc.description,
            purpose: doc.purpose,
            ..Default::default()
        }
    }

    /// Sets the constructor's parameters.
    pub fn constructor(mut self, parameters: Vec<ParameterSpec>) -> Self {
        self.constructor =
            finish_parameters(parameters, &ExtractedDoc::default());
        self
    }

    /// Adds an exposed method.  Methods with reserved names are skipped.
    pub fn method(mut self, method: MethodSpec) -> Self {
        if method.name.starts_with(RESERVED_METHOD_PREFIX) {
            return self;
        }
        if self.methods.contains_key(&method.name) {
            self.duplicates.push(method.name.clone());
        }
        self.methods.insert(method.name.clone(), method);
        self
    }

    pub fn constructor_parameters(&self) -> &[ParameterSpec] {
        &self.constructor
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodSpec> {
        self.methods.values()
    }

    /// Looks up a method by name, ignoring case.
    pub fn method_spec(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.get(&name.to_lowercase())
    }

    /// Checks the invariants a description must satisfy before a resource
    /// can be built from it: method names are unique ignoring case, and so
    /// are the parameter names of each method.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = self.duplicates.first() {
            return Err(format!("method \"{}\" is described twice", name));
        }
        let lists = std::iter::once(("constructor", &self.constructor)).chain(
            self.methods.values().map(|m| (m.name.as_str(), &m.parameters)),
        );
        for (owner, parameters) in lists {
            let mut seen = std::collections::BTreeSet::new();
            for parameter in parameters {
                if !seen.insert(parameter.name.to_lowercase()) {
                    return Err(format!(
                        "parameter \"{}\" of \"{}\" is declared twice",
                        parameter.name, owner
                    ));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn into_parts(
        self,
    ) -> (Vec<ParameterSpec>, IndexMap<String, MethodSpec>) {
        (self.constructor, self.methods)
    }
}
