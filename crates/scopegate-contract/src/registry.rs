//! The contract registry: operations, their security requirements, and
//! request matching.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::document::{
    ContractDocument, OperationObject, Parameter, ParameterLocation, PathItem, RequestBody,
    SecurityRequirementObject,
};
use crate::error::{ContractError, ContractMismatch, FieldViolation, Result};
use crate::path::PathTemplate;
use crate::schema::{Schema, SchemaChecker};

const EMBEDDED_CONTRACT: &str = include_str!("../api/openapi.json");

/// HTTP methods an operation can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl Method {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            "HEAD" => Ok(Self::Head),
            "PATCH" => Ok(Self::Patch),
            _ => Err(()),
        }
    }
}

/// One security scheme and the scopes it must grant.
///
/// Scope order is preserved from the contract for deterministic messages; it
/// carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequirement {
    /// Security scheme name, e.g. `BearerAuth`.
    pub scheme: String,
    /// Required scopes.
    pub scopes: Vec<String>,
}

/// One OpenAPI security requirement object: every entry must be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    /// Requirements combined with AND.
    pub requirements: Vec<OperationRequirement>,
}

/// A declared operation, keyed by `(template, method)`.
#[derive(Debug, Clone)]
pub struct Operation {
    /// `operationId`, if declared.
    pub operation_id: Option<String>,
    /// Path template the operation is declared under.
    pub template: String,
    /// HTTP method.
    pub method: Method,
    /// Alternatives combined with OR. Empty means no security at all.
    pub security: Vec<SecurityRequirement>,
    /// Effective parameters (path-level merged with operation-level).
    pub parameters: Vec<Parameter>,
    /// Declared request body.
    pub request_body: Option<RequestBody>,
}

impl Operation {
    /// Returns `true` if the operation declares any security requirement.
    #[must_use]
    pub fn requires_authorization(&self) -> bool {
        !self.security.is_empty()
    }

    /// A label for logs: the `operationId`, or `METHOD template`.
    #[must_use]
    pub fn label(&self) -> String {
        self.operation_id
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.method, self.template))
    }
}

/// An operation resolved for a concrete request.
#[derive(Debug, Clone)]
pub struct OperationMatch<'a> {
    /// The matched operation.
    pub operation: &'a Operation,
    /// Captured path parameters.
    pub path_params: Vec<(String, String)>,
}

/// The parts of a request that structural checks look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParts<'a> {
    /// Decoded query pairs.
    pub query: &'a [(String, String)],
    /// Header `(name, value)` pairs; names compared case-insensitively.
    pub headers: &'a [(String, String)],
    /// `Content-Type` header value.
    pub content_type: Option<&'a str>,
    /// Raw body bytes.
    pub body: &'a [u8],
}

/// Operations declared by the API contract.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug)]
pub struct ContractRegistry {
    title: String,
    version: String,
    templates: Vec<PathTemplate>,
    operations: HashMap<(String, Method), Operation>,
    schemas: BTreeMap<String, Schema>,
}

impl ContractRegistry {
    /// Load the contract compiled into this crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded document is invalid.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_CONTRACT)
    }

    /// Load a contract from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid contract.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ContractError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load a contract from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the contract is inconsistent.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: ContractDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// Build a registry from a parsed document.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed or ambiguous path templates, undeclared
    /// security schemes, or unresolved schema references.
    pub fn from_document(document: ContractDocument) -> Result<Self> {
        let ContractDocument {
            info,
            security: default_security,
            paths,
            components,
            ..
        } = document;

        let declared_schemes: BTreeSet<&str> = components
            .security_schemes
            .keys()
            .map(String::as_str)
            .collect();
        let checker = SchemaChecker::new(&components.schemas);

        for schema in components.schemas.values() {
            for reference in schema.references() {
                checker.ensure_resolvable(reference)?;
            }
        }

        let mut templates: Vec<PathTemplate> = Vec::with_capacity(paths.len());
        let mut operations = HashMap::new();

        for (raw, item) in &paths {
            let template = PathTemplate::parse(raw)?;
            if let Some(existing) = templates.iter().find(|t| t.overlaps_exactly(&template)) {
                return Err(ContractError::AmbiguousPath(
                    existing.as_str().to_string(),
                    raw.clone(),
                ));
            }

            for (method, object) in declared_operations(item) {
                let operation = build_operation(
                    raw,
                    method,
                    item,
                    object,
                    default_security.as_deref(),
                )?;

                for requirement in operation.security.iter().flat_map(|s| &s.requirements) {
                    if !declared_schemes.contains(requirement.scheme.as_str()) {
                        return Err(ContractError::UndeclaredSecurityScheme {
                            operation: operation.label(),
                            scheme: requirement.scheme.clone(),
                        });
                    }
                }

                for schema in operation_schemas(&operation) {
                    for reference in schema.references() {
                        checker.ensure_resolvable(reference)?;
                    }
                }

                tracing::debug!(
                    operation = %operation.label(),
                    method = %method,
                    template = %raw,
                    secured = operation.requires_authorization(),
                    "Registered contract operation"
                );
                operations.insert((raw.clone(), method), operation);
            }

            templates.push(template);
        }

        Ok(Self {
            title: info.title,
            version: info.version,
            templates,
            operations,
            schemas: components.schemas,
        })
    }

    /// The contract's `info.title`.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The contract's `info.version`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Look up an operation by its exact `(template, method)` key.
    #[must_use]
    pub fn operation(&self, template: &str, method: Method) -> Option<&Operation> {
        self.operations.get(&(template.to_string(), method))
    }

    /// Iterate over all declared operations.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Resolve a request to exactly one declared operation.
    ///
    /// The most specific template (most literal segments) wins.
    ///
    /// # Errors
    ///
    /// Returns `ContractMismatch` if no template matches the path or the
    /// method is not declared for the matched template.
    pub fn resolve(
        &self,
        method: &str,
        path: &str,
    ) -> std::result::Result<OperationMatch<'_>, ContractMismatch> {
        let (template, matched) = self
            .templates
            .iter()
            .filter_map(|t| t.matches(path).map(|m| (t, m)))
            .max_by_key(|(_, m)| m.specificity)
            .ok_or_else(|| ContractMismatch::NoMatchingPath(path.to_string()))?;

        let operation = method
            .parse::<Method>()
            .ok()
            .and_then(|m| self.operation(template.as_str(), m))
            .ok_or_else(|| ContractMismatch::MethodNotAllowed {
                method: method.to_string(),
                template: template.as_str().to_string(),
                allowed: self.allowed_methods(template.as_str()),
            })?;

        Ok(OperationMatch {
            operation,
            path_params: matched.params,
        })
    }

    fn allowed_methods(&self, template: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = self
            .operations
            .keys()
            .filter(|(t, _)| t == template)
            .map(|(_, m)| *m)
            .collect();
        allowed.sort_unstable();
        allowed
    }

    /// Check parameters and body of a matched request against the contract.
    ///
    /// Returns every violation found; an empty vector means the request is
    /// structurally valid.
    #[must_use]
    pub fn check_request(
        &self,
        matched: &OperationMatch<'_>,
        request: RequestParts<'_>,
    ) -> Vec<FieldViolation> {
        let mut violations = self.check_parameters(matched, request);
        violations.extend(self.check_body(matched.operation, request));
        violations
    }

    fn check_parameters(
        &self,
        matched: &OperationMatch<'_>,
        request: RequestParts<'_>,
    ) -> Vec<FieldViolation> {
        let checker = SchemaChecker::new(&self.schemas);
        let mut violations = Vec::new();

        for parameter in &matched.operation.parameters {
            let location = format!("{}.{}", parameter.location.as_str(), parameter.name);
            let value = match parameter.location {
                ParameterLocation::Query => lookup(request.query, &parameter.name, false),
                ParameterLocation::Header => lookup(request.headers, &parameter.name, true),
                ParameterLocation::Path => lookup(&matched.path_params, &parameter.name, false),
                ParameterLocation::Cookie => continue,
            };

            match (value, &parameter.schema) {
                (None, _) if parameter.required => {
                    violations.push(FieldViolation::new(location, "is required"));
                }
                (Some(raw), Some(schema)) => {
                    violations.extend(checker.check_raw(schema, raw, &location));
                }
                _ => {}
            }
        }

        violations
    }

    fn check_body(&self, operation: &Operation, request: RequestParts<'_>) -> Vec<FieldViolation> {
        let Some(declared) = &operation.request_body else {
            return Vec::new();
        };

        if request.body.is_empty() {
            if declared.required {
                return vec![FieldViolation::new("body", "request body is required")];
            }
            return Vec::new();
        }

        let media_type = request
            .content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let Some((_, content)) = declared
            .content
            .iter()
            .find(|(declared, _)| declared.eq_ignore_ascii_case(&media_type))
        else {
            let expected: Vec<&str> = declared.content.keys().map(String::as_str).collect();
            return vec![FieldViolation::new(
                "header.content-type",
                format!(
                    "unsupported content type {media_type:?}; expected one of [{}]",
                    expected.join(", ")
                ),
            )];
        };

        if !is_json(&media_type) {
            return Vec::new();
        }

        let value: serde_json::Value = match serde_json::from_slice(request.body) {
            Ok(value) => value,
            Err(e) => return vec![FieldViolation::new("body", format!("invalid JSON: {e}"))],
        };

        match &content.schema {
            Some(schema) => SchemaChecker::new(&self.schemas).check(schema, &value, "body"),
            None => Vec::new(),
        }
    }
}

fn is_json(media_type: &str) -> bool {
    media_type == "application/json" || media_type.ends_with("+json")
}

fn lookup<'a>(pairs: &'a [(String, String)], name: &str, ignore_case: bool) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| {
            if ignore_case {
                k.eq_ignore_ascii_case(name)
            } else {
                k == name
            }
        })
        .map(|(_, v)| v.as_str())
}

fn declared_operations(item: &PathItem) -> Vec<(Method, &OperationObject)> {
    [
        (Method::Get, &item.get),
        (Method::Put, &item.put),
        (Method::Post, &item.post),
        (Method::Delete, &item.delete),
        (Method::Options, &item.options),
        (Method::Head, &item.head),
        (Method::Patch, &item.patch),
    ]
    .into_iter()
    .filter_map(|(method, object)| object.as_ref().map(|o| (method, o)))
    .collect()
}

fn build_operation(
    template: &str,
    method: Method,
    item: &PathItem,
    object: &OperationObject,
    default_security: Option<&[SecurityRequirementObject]>,
) -> Result<Operation> {
    let declared = object.security.as_deref().or(default_security).unwrap_or(&[]);

    // `{}` among the alternatives makes authentication optional.
    let security = if declared.iter().any(BTreeMap::is_empty) {
        Vec::new()
    } else {
        declared
            .iter()
            .map(|alternative| SecurityRequirement {
                requirements: alternative
                    .iter()
                    .map(|(scheme, scopes)| OperationRequirement {
                        scheme: scheme.clone(),
                        scopes: scopes.clone(),
                    })
                    .collect(),
            })
            .collect()
    };

    let mut parameters: Vec<Parameter> = object.parameters.clone();
    for inherited in &item.parameters {
        let overridden = parameters
            .iter()
            .any(|p| p.name == inherited.name && p.location == inherited.location);
        if !overridden {
            parameters.push(inherited.clone());
        }
    }

    let path_params: Vec<&str> = template
        .split('/')
        .filter_map(|s| s.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .collect();
    if let Some(p) = parameters
        .iter()
        .find(|p| p.location == ParameterLocation::Path && !path_params.contains(&p.name.as_str()))
    {
        return Err(ContractError::InvalidPathTemplate(format!(
            "{template} (path parameter {:?} not in template)",
            p.name
        )));
    }

    Ok(Operation {
        operation_id: object.operation_id.clone(),
        template: template.to_string(),
        method,
        security,
        parameters,
        request_body: object.request_body.clone(),
    })
}

fn operation_schemas(operation: &Operation) -> impl Iterator<Item = &Schema> {
    let parameter_schemas = operation.parameters.iter().filter_map(|p| p.schema.as_ref());
    let body_schemas = operation
        .request_body
        .iter()
        .flat_map(|body| body.content.values())
        .filter_map(|media| media.schema.as_ref());
    parameter_schemas.chain(body_schemas)
}
