// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record kinds in their three tiers: plain requests, secured payloads, and
//! the non-secret info DTOs handed back to callers.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use coffer_core::{CofferError, DataStorageBackend, KeyScope, RecordKind};
use schemars::JsonSchema;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kdf::{self, KeyDerivation};
use crate::secret::{PasswordDigest, hex_bytes};

/// Longest accepted record or user name, in characters.
pub const MAX_NAME_LEN: usize = 128;

/// Longest accepted free-text description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 1024;

// --- Routing and secured envelope ---

/// Cleartext identifiers stored beside the ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub visibility_group_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
}

impl Routing {
    pub fn scope(&self) -> KeyScope {
        KeyScope::from(self.visibility_group_id)
    }
}

/// A record after its own secrets were hashed, before encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secured<P> {
    pub routing: Routing,
    pub payload: P,
}

/// The private part of a record kind: serialized to JSON and sealed.
pub trait Payload:
    Serialize + DeserializeOwned + JsonSchema + Clone + Send + Sync + 'static
{
    const KIND: RecordKind;

    /// Compiled JSON schema every decrypted payload is checked against.
    fn validator() -> &'static jsonschema::Validator;
}

fn compile_validator<P: JsonSchema>() -> jsonschema::Validator {
    let schema = schemars::schema_for!(P);
    jsonschema::validator_for(schema.as_value()).expect("generated payload schema is valid")
}

macro_rules! payload_kind {
    ($payload:ty, $kind:expr) => {
        impl Payload for $payload {
            const KIND: RecordKind = $kind;

            fn validator() -> &'static jsonschema::Validator {
                static VALIDATOR: LazyLock<jsonschema::Validator> =
                    LazyLock::new(compile_validator::<$payload>);
                &VALIDATOR
            }
        }
    };
}

/// A plain request that can be converted to its secured payload.
pub trait Securable {
    type Payload: Payload;

    /// Id the secured record will be stored under.
    fn id(&self) -> Uuid;

    /// Shape checks, run before any key derivation or storage call.
    fn validate(&self) -> Result<(), CofferError>;

    /// Hash any embedded passwords under fresh salts.
    fn secure(self, kdf: &dyn KeyDerivation, salt_len: usize)
    -> Result<Self::Payload, CofferError>;
}

pub(crate) fn validate_name(field: &str, value: &str) -> Result<(), CofferError> {
    if value.trim().is_empty() {
        return Err(CofferError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(CofferError::Validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_id(field: &str, id: Uuid) -> Result<(), CofferError> {
    if id.is_nil() {
        return Err(CofferError::Validation(format!("{field} must not be nil")));
    }
    Ok(())
}

fn validate_description(value: &str) -> Result<(), CofferError> {
    if value.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CofferError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_password(field: &str, password: &SecretString) -> Result<(), CofferError> {
    if password.expose_secret().is_empty() {
        return Err(CofferError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn secure_optional(
    kdf: &dyn KeyDerivation,
    password: Option<SecretString>,
    salt_len: usize,
) -> Result<Option<PasswordDigest>, CofferError> {
    password
        .map(|pw| kdf::digest_password(kdf, &pw, salt_len))
        .transpose()
}

// --- Account ---

/// Sign-up request.
#[derive(Debug)]
pub struct SignUp {
    pub username: String,
    pub password: SecretString,
}

impl SignUp {
    pub fn validate(&self) -> Result<(), CofferError> {
        validate_name("username", &self.username)?;
        validate_password("password", &self.password)
    }
}

/// Sign-in request.
#[derive(Debug)]
pub struct SignIn {
    pub username: String,
    pub password: SecretString,
}

/// Non-secret view of the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub user_id: Uuid,
    pub username: String,
}

// --- Visibility groups ---

/// Request to create a visibility group.
#[derive(Debug)]
pub struct NewVisibilityGroup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub password: SecretString,
}

impl NewVisibilityGroup {
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        description: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            description: description.into(),
            password,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VisibilityGroupPayload {
    pub name: String,
    pub description: String,
    pub password: PasswordDigest,
    /// Salt the group key is derived with.
    #[serde(with = "hex_bytes")]
    #[schemars(with = "String")]
    pub key_salt: Vec<u8>,
}

impl std::fmt::Debug for VisibilityGroupPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityGroupPayload")
            .field("name", &self.name)
            .field("password", &self.password)
            .field("key_salt", &"[REDACTED]")
            .finish()
    }
}

payload_kind!(VisibilityGroupPayload, RecordKind::VisibilityGroup);

impl Securable for NewVisibilityGroup {
    type Payload = VisibilityGroupPayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), CofferError> {
        validate_id("visibility group id", self.id)?;
        validate_id("user id", self.user_id)?;
        validate_name("visibility group name", &self.name)?;
        validate_description(&self.description)?;
        validate_password("visibility group password", &self.password)
    }

    fn secure(
        self,
        kdf: &dyn KeyDerivation,
        salt_len: usize,
    ) -> Result<VisibilityGroupPayload, CofferError> {
        Ok(VisibilityGroupPayload {
            password: kdf::digest_password(kdf, &self.password, salt_len)?,
            key_salt: kdf::generate_salt(salt_len)?,
            name: self.name,
            description: self.description,
        })
    }
}

/// Public view of an open visibility group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibilityGroupInfo {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<&Secured<VisibilityGroupPayload>> for VisibilityGroupInfo {
    fn from(group: &Secured<VisibilityGroupPayload>) -> Self {
        Self {
            id: group.routing.id,
            name: group.payload.name.clone(),
            description: group.payload.description.clone(),
        }
    }
}

/// Request to unlock visibility groups.
#[derive(Debug)]
pub struct OpenVisibilityGroups {
    pub user_id: Uuid,
    pub password: SecretString,
}

// --- Data storage configs ---

/// Request to add a data storage config.
#[derive(Debug)]
pub struct NewDataStorageConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    pub visibility_group_id: Option<Uuid>,
    pub name: String,
    pub backend: DataStorageBackend,
    pub access_password: Option<SecretString>,
}

impl NewDataStorageConfig {
    pub fn new(
        user_id: Uuid,
        visibility_group_id: Option<Uuid>,
        name: impl Into<String>,
        backend: DataStorageBackend,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            visibility_group_id,
            name: name.into(),
            backend,
            access_password: None,
        }
    }

    pub fn with_access_password(mut self, password: SecretString) -> Self {
        self.access_password = Some(password);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DataStorageConfigPayload {
    pub name: String,
    pub backend: DataStorageBackend,
    pub access_password: Option<PasswordDigest>,
}

payload_kind!(DataStorageConfigPayload, RecordKind::DataStorageConfig);

impl Securable for NewDataStorageConfig {
    type Payload = DataStorageConfigPayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), CofferError> {
        validate_id("data storage config id", self.id)?;
        validate_id("user id", self.user_id)?;
        if let Some(group) = self.visibility_group_id {
            validate_id("visibility group id", group)?;
        }
        validate_name("data storage config name", &self.name)?;
        if let DataStorageBackend::Sqlite { path } = &self.backend
            && path.trim().is_empty()
        {
            return Err(CofferError::Validation(
                "sqlite backend path must not be empty".to_string(),
            ));
        }
        if let Some(password) = &self.access_password {
            validate_password("access password", password)?;
        }
        Ok(())
    }

    fn secure(
        self,
        kdf: &dyn KeyDerivation,
        salt_len: usize,
    ) -> Result<DataStorageConfigPayload, CofferError> {
        Ok(DataStorageConfigPayload {
            access_password: secure_optional(kdf, self.access_password, salt_len)?,
            name: self.name,
            backend: self.backend,
        })
    }
}

/// Public view of an available data storage config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataStorageConfigInfo {
    pub id: Uuid,
    pub visibility_group_id: Option<Uuid>,
    pub name: String,
    pub backend: DataStorageBackend,
    pub has_access_password: bool,
}

impl From<&Secured<DataStorageConfigPayload>> for DataStorageConfigInfo {
    fn from(config: &Secured<DataStorageConfigPayload>) -> Self {
        Self {
            id: config.routing.id,
            visibility_group_id: config.routing.visibility_group_id,
            name: config.payload.name.clone(),
            backend: config.payload.backend.clone(),
            has_access_password: config.payload.access_password.is_some(),
        }
    }
}

/// Listing filter for data storage configs.
///
/// When `visibility_groups.ids` is unset the listing covers the primary scope
/// and every open group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigListFilter {
    pub ids: Option<Vec<Uuid>>,
    pub exclude_ids: Vec<Uuid>,
    pub visibility_groups: coffer_core::ScopeFilter,
}

/// Public view of an initialised data storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataStorageInfo {
    pub id: Uuid,
    pub visibility_group_id: Option<Uuid>,
    pub name: String,
    pub open: bool,
}

// --- Boxes ---

/// Request to add a box to an open data storage.
#[derive(Debug)]
pub struct NewBox {
    pub id: Uuid,
    pub storage_id: Uuid,
    pub name: String,
    pub description: String,
    pub access_password: Option<SecretString>,
}

impl NewBox {
    pub fn new(storage_id: Uuid, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            storage_id,
            name: name.into(),
            description: description.into(),
            access_password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BoxPayload {
    pub name: String,
    pub description: String,
    pub access_password: Option<PasswordDigest>,
}

payload_kind!(BoxPayload, RecordKind::Box);

impl Securable for NewBox {
    type Payload = BoxPayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), CofferError> {
        validate_id("box id", self.id)?;
        validate_id("data storage id", self.storage_id)?;
        validate_name("box name", &self.name)?;
        validate_description(&self.description)?;
        if let Some(password) = &self.access_password {
            validate_password("access password", password)?;
        }
        Ok(())
    }

    fn secure(self, kdf: &dyn KeyDerivation, salt_len: usize) -> Result<BoxPayload, CofferError> {
        Ok(BoxPayload {
            access_password: secure_optional(kdf, self.access_password, salt_len)?,
            name: self.name,
            description: self.description,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxInfo {
    pub id: Uuid,
    pub storage_id: Uuid,
    pub visibility_group_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub has_access_password: bool,
}

// --- Templates ---

/// Value type of a template field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Secret,
    Number,
    Url,
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TemplateField {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl TemplateField {
    pub fn new(name: impl Into<String>, kind: FieldKind, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
        }
    }
}

/// Request to add an entry template to an open data storage.
#[derive(Debug)]
pub struct NewTemplate {
    pub id: Uuid,
    pub storage_id: Uuid,
    pub name: String,
    pub fields: Vec<TemplateField>,
}

impl NewTemplate {
    pub fn new(storage_id: Uuid, name: impl Into<String>, fields: Vec<TemplateField>) -> Self {
        Self {
            id: Uuid::new_v4(),
            storage_id,
            name: name.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TemplatePayload {
    pub name: String,
    pub fields: Vec<TemplateField>,
}

payload_kind!(TemplatePayload, RecordKind::Template);

impl Securable for NewTemplate {
    type Payload = TemplatePayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), CofferError> {
        validate_id("template id", self.id)?;
        validate_id("data storage id", self.storage_id)?;
        validate_name("template name", &self.name)?;
        if self.fields.is_empty() {
            return Err(CofferError::Validation(
                "template must declare at least one field".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            validate_name("template field name", &field.name)?;
            if !seen.insert(field.name.as_str()) {
                return Err(CofferError::Validation(format!(
                    "duplicate template field `{}`",
                    field.name
                )));
            }
        }
        Ok(())
    }

    fn secure(self, _kdf: &dyn KeyDerivation, _salt_len: usize) -> Result<TemplatePayload, CofferError> {
        Ok(TemplatePayload {
            name: self.name,
            fields: self.fields,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateInfo {
    pub id: Uuid,
    pub storage_id: Uuid,
    pub visibility_group_id: Option<Uuid>,
    pub name: String,
    pub fields: Vec<TemplateField>,
}

// --- Entries ---

/// Request to add an entry to a box.
pub struct NewEntry {
    pub id: Uuid,
    pub box_id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub values: BTreeMap<String, String>,
}

impl NewEntry {
    pub fn new(
        box_id: Uuid,
        template_id: Uuid,
        name: impl Into<String>,
        values: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            box_id,
            template_id,
            name: name.into(),
            values,
        }
    }

    /// Check the values against the template's declared fields.
    pub fn check_against(&self, template: &TemplatePayload) -> Result<(), CofferError> {
        for key in self.values.keys() {
            if !template.fields.iter().any(|f| &f.name == key) {
                return Err(CofferError::Validation(format!(
                    "field `{key}` is not declared by template `{}`",
                    template.name
                )));
            }
        }
        for field in template.fields.iter().filter(|f| f.required) {
            match self.values.get(&field.name) {
                Some(value) if !value.is_empty() => {}
                _ => {
                    return Err(CofferError::Validation(format!(
                        "required field `{}` is missing",
                        field.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for NewEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewEntry")
            .field("id", &self.id)
            .field("box_id", &self.box_id)
            .field("template_id", &self.template_id)
            .field("name", &self.name)
            .field("values", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EntryPayload {
    pub name: String,
    pub template_id: Uuid,
    pub values: BTreeMap<String, String>,
}

impl std::fmt::Debug for EntryPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPayload")
            .field("name", &self.name)
            .field("template_id", &self.template_id)
            .field("fields", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

payload_kind!(EntryPayload, RecordKind::Entry);

impl Securable for NewEntry {
    type Payload = EntryPayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), CofferError> {
        validate_id("entry id", self.id)?;
        validate_id("box id", self.box_id)?;
        validate_id("template id", self.template_id)?;
        validate_name("entry name", &self.name)
    }

    fn secure(self, _kdf: &dyn KeyDerivation, _salt_len: usize) -> Result<EntryPayload, CofferError> {
        Ok(EntryPayload {
            name: self.name,
            template_id: self.template_id,
            values: self.values,
        })
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub id: Uuid,
    pub storage_id: Uuid,
    pub box_id: Uuid,
    pub template_id: Uuid,
    pub visibility_group_id: Option<Uuid>,
    pub name: String,
    pub values: BTreeMap<String, String>,
}

impl std::fmt::Debug for EntryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryInfo")
            .field("id", &self.id)
            .field("box_id", &self.box_id)
            .field("name", &self.name)
            .field("values", &"[REDACTED]")
            .finish()
    }
}
