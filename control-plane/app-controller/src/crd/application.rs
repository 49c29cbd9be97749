use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const API_GROUP: &str = "app.k8s.io";
pub const API_VERSION: &str = "app.k8s.io/v1beta1";
pub const KIND: &str = "Application";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "app.k8s.io",
    version = "v1beta1",
    kind = "Application",
    plural = "applications",
    shortname = "app",
    namespaced,
    status = "ApplicationStatus",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.descriptor.type"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.componentsReady"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    /// Kinds of the Application's components (Deployments, Services, CRDs...).
    /// Used together with `selector` to list the components.
    #[serde(default)]
    pub component_kinds: Vec<GroupKind>,
    /// Label query over the component objects. An absent selector selects
    /// nothing; a present but empty selector selects every object of the
    /// listed kinds in the Application's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    /// Attach an owner reference to every component so they are garbage
    /// collected together with the Application.
    #[serde(default)]
    pub add_owner_ref: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<Descriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info: Vec<InfoItem>,
    /// Empty is equivalent to `Succeeded`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_phase: Option<AssemblyPhase>,
}

/// A resource type to search for, e.g. `{group: "apps", kind: "Deployment"}`.
/// The core group is the empty string.
#[derive(
    Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct GroupKind {
    #[serde(default)]
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

impl LabelSelector {
    pub fn from_labels<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            match_labels: Some(
                labels
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            match_expressions: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
pub struct LabelSelectorRequirement {
    pub key: String,
    /// In | NotIn | Exists | DoesNotExist
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Type of the application (e.g. WordPress, MySQL, Cassandra).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<ContactData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<ContactData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    /// Human readable quick start snippet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct ContactData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct InfoItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum AssemblyPhase {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Rebuilt from scratch on every reconcile. Always serialized so a
    /// merge patch clears components that disappeared.
    #[serde(default)]
    pub components: Vec<ObjectStatus>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// "<ready>/<total>"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components_ready: Option<String>,
}

/// Projection of one component into the Application status.
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
pub struct ObjectStatus {
    /// group/version, e.g. "apps/v1" or "v1"
    pub group: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
    pub status: ComponentStatus,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq, Hash)]
pub enum ComponentStatus {
    Ready,
    #[default]
    InProgress,
    Disabled,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentStatus::Ready => write!(f, "Ready"),
            ComponentStatus::InProgress => write!(f, "InProgress"),
            ComponentStatus::Disabled => write!(f, "Disabled"),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Condition types this controller manages. Types written by other tools
/// (`Qualified`, `Cleanup`, ...) are kept verbatim in `Other`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum ConditionType {
    Ready,
    Error,
    Settled,
    Other(String),
}

impl ConditionType {
    pub fn as_str(&self) -> &str {
        match self {
            ConditionType::Ready => "Ready",
            ConditionType::Error => "Error",
            ConditionType::Settled => "Settled",
            ConditionType::Other(s) => s,
        }
    }
}

impl From<String> for ConditionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Ready" => ConditionType::Ready,
            "Error" => ConditionType::Error,
            "Settled" => ConditionType::Settled,
            _ => ConditionType::Other(s),
        }
    }
}

impl From<ConditionType> for String {
    fn from(t: ConditionType) -> Self {
        match t {
            ConditionType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JsonSchema for ConditionType {
    fn schema_name() -> String {
        "ConditionType".to_string()
    }

    fn is_referenceable() -> bool {
        false
    }

    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(generator)
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}
