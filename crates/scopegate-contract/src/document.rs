//! Serde model of the OpenAPI 3 subset the gate reads.
//!
//! Unknown fields (responses, descriptions, examples, ...) are ignored.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::schema::Schema;

/// One OpenAPI security requirement object: scheme name to required scopes.
pub type SecurityRequirementObject = BTreeMap<String, Vec<String>>;

/// Top-level contract document.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractDocument {
    /// OpenAPI version string.
    pub openapi: String,
    /// Document metadata.
    pub info: Info,
    /// Server entries. Parsed but never used for matching.
    #[serde(default)]
    pub servers: Vec<serde_json::Value>,
    /// Default security applied to operations that declare none.
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirementObject>>,
    /// Path templates and their operations.
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    /// Reusable components.
    #[serde(default)]
    pub components: Components,
}

/// Document metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// API version.
    pub version: String,
}

/// Operations declared under one path template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    /// Parameters shared by every operation on this path.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[allow(missing_docs)]
    pub get: Option<OperationObject>,
    #[allow(missing_docs)]
    pub put: Option<OperationObject>,
    #[allow(missing_docs)]
    pub post: Option<OperationObject>,
    #[allow(missing_docs)]
    pub delete: Option<OperationObject>,
    #[allow(missing_docs)]
    pub options: Option<OperationObject>,
    #[allow(missing_docs)]
    pub head: Option<OperationObject>,
    #[allow(missing_docs)]
    pub patch: Option<OperationObject>,
}

/// A single declared operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationObject {
    /// Unique operation identifier.
    pub operation_id: Option<String>,
    /// Operation parameters; override path-level ones with the same name and location.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Request body declaration.
    pub request_body: Option<RequestBody>,
    /// Security override. `Some(vec![])` disables security.
    pub security: Option<Vec<SecurityRequirementObject>>,
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// URL query string.
    Query,
    /// Path template segment.
    Path,
    /// Request header.
    Header,
    /// Cookie. Not checked.
    Cookie,
}

impl ParameterLocation {
    /// Prefix used in violation locations.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Path => "path",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

/// A declared parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter location.
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Whether the parameter must be present.
    #[serde(default)]
    pub required: bool,
    /// Value schema.
    pub schema: Option<Schema>,
}

/// A declared request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    /// Whether a body must be sent.
    #[serde(default)]
    pub required: bool,
    /// Accepted media types.
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

/// Schema for one media type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    /// Body schema.
    pub schema: Option<Schema>,
}

/// Reusable components.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    /// Named schemas, targets of `#/components/schemas/<name>`.
    #[serde(default)]
    pub schemas: BTreeMap<String, Schema>,
    /// Named security schemes.
    #[serde(default)]
    pub security_schemes: BTreeMap<String, SecurityScheme>,
}

/// A declared security scheme.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    /// Scheme type, e.g. `http` or `oauth2`.
    #[serde(rename = "type")]
    pub kind: String,
    /// HTTP auth scheme, e.g. `bearer`.
    pub scheme: Option<String>,
    /// Token format hint.
    pub bearer_format: Option<String>,
}
