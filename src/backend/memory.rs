//! In-process backend used in development mode and by the test suite.
//!
//! Mirrors the managed service's conventions closely enough that the
//! service code cannot tell the difference: sign-up creates a pending
//! `house_owners` row, every table read and write is restricted to the
//! caller's rows, storage objects live under a `{user_id}/` folder, and
//! the error strings match what the real service returns.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{
    AuthApi, BackendError, Credentials, ProfileFields, Session, SignUpOutcome, StorageApi,
    StoredObject, TableApi, User,
};
use crate::auth::{generate_jwt, Claims};
use crate::filter::Filter;
use crate::models::{Table, VerificationStatus};

const INVALID_CREDENTIALS: &str = "Invalid login credentials";
const INVALID_JWT: &str = "invalid JWT: unable to parse or verify signature";
const MIN_PASSWORD_LEN: usize = 6;
/// Rows a single select returns at most, like PostgREST's `db-max-rows`
pub const MAX_ROWS: usize = 1000;

/// Backend operations, as recorded in the operation log and targeted by failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    SignIn,
    SignUp,
    SignOut,
    Select(Table),
    Insert(Table),
    Delete(Table),
    Upload,
    Download,
    Remove,
    List,
}

struct Account {
    user: User,
    password: String,
}

struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, Uuid>,
    tables: HashMap<Table, Vec<Value>>,
    objects: BTreeMap<String, StoredBlob>,
    last_timestamp: Option<DateTime<Utc>>,
    failures: HashMap<BackendOp, String>,
    log: Vec<BackendOp>,
}

impl State {
    /// Strictly increasing wall clock so `order=created_at.desc` is deterministic
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next
    }

    fn timestamp(&mut self) -> Value {
        Value::String(self.tick().to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Record the call, then fail it if a failure was queued for it
    fn enter(&mut self, op: BackendOp) -> Result<(), BackendError> {
        self.log.push(op);
        match self.failures.remove(&op) {
            Some(message) => Err(BackendError::new(message)),
            None => Ok(()),
        }
    }

    fn user_for(&self, access_token: &str) -> Result<Uuid, BackendError> {
        self.tokens
            .get(access_token)
            .copied()
            .ok_or_else(|| BackendError::new(INVALID_JWT))
    }

    fn rows(&self, table: Table) -> &[Value] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn owned_by(row: &Value, table: Table, user_id: Uuid) -> bool {
        row.get(table.owner_column()).and_then(Value::as_str) == Some(user_id.to_string().as_str())
    }
}

pub struct MemoryBackend {
    state: Mutex<State>,
    jwt_secret: String,
    jwt_expiry_hours: u64,
    require_confirmation: bool,
}

impl MemoryBackend {
    pub fn new(jwt_secret: String, jwt_expiry_hours: u64) -> Self {
        Self {
            state: Mutex::new(State::default()),
            jwt_secret,
            jwt_expiry_hours,
            require_confirmation: false,
        }
    }

    /// Sign-up returns no session until the address is confirmed
    pub fn with_email_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn issue_session(&self, state: &mut State, user: &User) -> Result<Session, BackendError> {
        let claims = Claims::new(user.id, user.email.clone(), self.jwt_expiry_hours);
        let access_token = if self.jwt_secret.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            generate_jwt(&claims, &self.jwt_secret).map_err(|e| BackendError::new(e.to_string()))?
        };
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);

        state.tokens.insert(access_token.clone(), user.id);
        Ok(Session {
            access_token,
            refresh_token: Some(Uuid::new_v4().to_string()),
            expires_at,
            user: user.clone(),
        })
    }

    /// Queue a one-shot failure for the next call of `op`
    pub fn fail_next(&self, op: BackendOp, message: impl Into<String>) {
        self.lock().failures.insert(op, message.into());
    }

    /// Every call made so far, in order
    pub fn operations(&self) -> Vec<BackendOp> {
        self.lock().log.clone()
    }

    pub fn clear_operations(&self) {
        self.lock().log.clear();
    }

    /// All rows of a table, bypassing the access policy
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.lock().rows(table).to_vec()
    }

    pub fn object_paths(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    pub fn object_content_type(&self, path: &str) -> Option<String> {
        self.lock().objects.get(path).map(|o| o.content_type.clone())
    }

    /// Move every stored object's creation time into the past
    pub fn age_objects(&self, by: chrono::Duration) {
        for blob in self.lock().objects.values_mut() {
            blob.created_at -= by;
        }
    }

    /// Stands in for the out-of-band verification workflow
    pub fn set_verification_status(&self, user_id: Uuid, status: VerificationStatus) {
        let mut state = self.lock();
        let updated_at = state.timestamp();
        if let Some(rows) = state.tables.get_mut(&Table::HouseOwners) {
            for row in rows.iter_mut().filter(|r| Self::row_id(r) == Some(user_id)) {
                row["verification_status"] = json!(status);
                row["updated_at"] = updated_at.clone();
            }
        }
    }

    fn row_id(row: &Value) -> Option<Uuid> {
        row.get("id").and_then(Value::as_str).and_then(|s| s.parse().ok())
    }

    fn policy_violation(table: Table) -> BackendError {
        BackendError::new(format!("new row violates row-level security policy for table \"{}\"", table))
    }

    fn check_required(table: Table, row: &Map<String, Value>) -> Result<(), BackendError> {
        let required: &[&str] = match table {
            Table::HouseOwners => &["id", "full_name"],
            Table::Properties => &["owner_id", "property_name", "address", "property_type"],
            Table::Documents => &["owner_id", "document_type", "file_name", "file_path", "file_size", "mime_type"],
        };
        for column in required {
            if row.get(*column).map_or(true, Value::is_null) {
                return Err(BackendError::new(format!(
                    "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                    column, table
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AuthApi for MemoryBackend {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, BackendError> {
        let mut state = self.lock();
        state.enter(BackendOp::SignIn)?;

        let email = credentials.email.trim().to_ascii_lowercase();
        let user = match state.accounts.get(&email) {
            Some(account) if account.password == credentials.password => account.user.clone(),
            _ => return Err(BackendError::new(INVALID_CREDENTIALS)),
        };
        self.issue_session(&mut state, &user)
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        profile: &ProfileFields,
    ) -> Result<SignUpOutcome, BackendError> {
        let mut state = self.lock();
        state.enter(BackendOp::SignUp)?;

        let email = credentials.email.trim().to_ascii_lowercase();
        if !email.contains('@') {
            return Err(BackendError::new("Unable to validate email address: invalid format"));
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BackendError::new("Password should be at least 6 characters."));
        }
        if state.accounts.contains_key(&email) {
            return Err(BackendError::new("User already registered"));
        }

        let user = User { id: Uuid::new_v4(), email: Some(email.clone()) };
        state.accounts.insert(
            email,
            Account { user: user.clone(), password: credentials.password.clone() },
        );

        // The backend's sign-up trigger creates the owner profile
        let now = state.timestamp();
        state.tables.entry(Table::HouseOwners).or_default().push(json!({
            "id": user.id,
            "full_name": profile.full_name,
            "phone": profile.phone,
            "verification_status": VerificationStatus::Pending,
            "created_at": now,
            "updated_at": now,
        }));

        if self.require_confirmation {
            return Ok(SignUpOutcome::ConfirmationPending(user));
        }
        Ok(SignUpOutcome::SignedIn(self.issue_session(&mut state, &user)?))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.enter(BackendOp::SignOut)?;
        state
            .tokens
            .remove(access_token)
            .map(|_| ())
            .ok_or_else(|| BackendError::new(INVALID_JWT))
    }
}

#[async_trait]
impl TableApi for MemoryBackend {
    async fn select(&self, access_token: &str, table: Table, filter: &Filter) -> Result<Vec<Value>, BackendError> {
        let mut state = self.lock();
        state.enter(BackendOp::Select(table))?;
        let user_id = state.user_for(access_token)?;

        let visible = state
            .rows(table)
            .iter()
            .filter(|row| State::owned_by(row, table, user_id))
            .cloned();
        let mut rows = filter.apply(visible);
        rows.truncate(MAX_ROWS);
        Ok(rows)
    }

    async fn insert(&self, access_token: &str, table: Table, row: Value) -> Result<Value, BackendError> {
        let mut state = self.lock();
        state.enter(BackendOp::Insert(table))?;
        let user_id = state.user_for(access_token)?;

        let Value::Object(mut row) = row else {
            return Err(BackendError::new("Insert payload must be a JSON object"));
        };
        let id = if table == Table::HouseOwners { user_id } else { Uuid::new_v4() };
        row.insert("id".to_string(), json!(id));
        Self::check_required(table, &row)?;

        let owner = row.get(table.owner_column()).and_then(Value::as_str);
        if owner != Some(user_id.to_string().as_str()) {
            return Err(Self::policy_violation(table));
        }

        if table == Table::Documents {
            if let Some(property_id) = row.get("property_id").and_then(Value::as_str) {
                let exists = state.rows(Table::Properties).iter().any(|p| {
                    p.get("id").and_then(Value::as_str) == Some(property_id)
                        && State::owned_by(p, Table::Properties, user_id)
                });
                if !exists {
                    return Err(BackendError::new(
                        "insert or update on table \"documents\" violates foreign key constraint \"documents_property_id_fkey\"",
                    ));
                }
            }
        }

        let now = state.timestamp();
        match table {
            Table::Documents => {
                row.insert("uploaded_at".to_string(), now);
            }
            Table::Properties | Table::HouseOwners => {
                row.insert("created_at".to_string(), now.clone());
                row.insert("updated_at".to_string(), now);
            }
        }

        let stored = Value::Object(row);
        state.tables.entry(table).or_default().push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, access_token: &str, table: Table, id: Uuid) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.enter(BackendOp::Delete(table))?;
        let user_id = state.user_for(access_token)?;

        // Rows hidden by the policy are silently left alone, as the real service does
        if let Some(rows) = state.tables.get_mut(&table) {
            rows.retain(|row| !(Self::row_id(row) == Some(id) && State::owned_by(row, table, user_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageApi for MemoryBackend {
    async fn upload(
        &self,
        access_token: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.enter(BackendOp::Upload)?;
        let user_id = state.user_for(access_token)?;

        if !path.starts_with(&format!("{}/", user_id)) {
            return Err(BackendError::new("new row violates row-level security policy"));
        }
        if state.objects.contains_key(path) {
            return Err(BackendError::new("The resource already exists"));
        }

        let created_at = state.tick();
        state.objects.insert(
            path.to_string(),
            StoredBlob { bytes, content_type: content_type.to_string(), created_at },
        );
        Ok(())
    }

    async fn download(&self, access_token: &str, path: &str) -> Result<Vec<u8>, BackendError> {
        let mut state = self.lock();
        state.enter(BackendOp::Download)?;
        let user_id = state.user_for(access_token)?;

        if !path.starts_with(&format!("{}/", user_id)) {
            return Err(BackendError::new("Object not found"));
        }
        state
            .objects
            .get(path)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| BackendError::new("Object not found"))
    }

    async fn remove(&self, access_token: &str, paths: &[String]) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.enter(BackendOp::Remove)?;
        let user_id = state.user_for(access_token)?;

        let folder = format!("{}/", user_id);
        for path in paths.iter().filter(|p| p.starts_with(&folder)) {
            state.objects.remove(path);
        }
        Ok(())
    }

    async fn list(&self, access_token: &str, prefix: &str) -> Result<Vec<StoredObject>, BackendError> {
        let mut state = self.lock();
        state.enter(BackendOp::List)?;
        let user_id = state.user_for(access_token)?;

        let folder = format!("{}/", user_id);
        Ok(state
            .objects
            .iter()
            .filter(|(path, _)| path.starts_with(&folder) && path.starts_with(prefix))
            .map(|(path, blob)| StoredObject {
                path: path.clone(),
                size: Some(blob.bytes.len() as u64),
                created_at: Some(blob.created_at),
            })
            .collect())
    }
}
