//! Module: acl
//! Responsibility: derive the stored permission fields (`_rperm`, `_wperm`
//! and the legacy `_acl` map) from one permission set.
//! Does not own: evaluating access; nothing here decides who may read or write.

use crate::error::{ErrorOrigin, TransformError};
use bson::{Bson, Document};
use serde_json::{Map, Value};

///
/// CONSTANTS
///

pub const ACL_KEY: &str = "ACL";
pub const READ_PERM_KEY: &str = "_rperm";
pub const WRITE_PERM_KEY: &str = "_wperm";
pub const LEGACY_ACL_KEY: &str = "_acl";

///
/// PermissionEntry
///
/// Grants for one user/role id. Each grant records the position the id had
/// in its declared list so projections reproduce the caller's order.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PermissionEntry {
    pub id: String,
    read: Option<usize>,
    write: Option<usize>,
}

impl PermissionEntry {
    #[must_use]
    pub const fn can_read(&self) -> bool {
        self.read.is_some()
    }

    #[must_use]
    pub const fn can_write(&self) -> bool {
        self.write.is_some()
    }
}

///
/// PermissionSet
///
/// Single source of truth for an object's permissions. The read list, the
/// write list and the legacy map are all projections of it and cannot
/// disagree. A list that was never declared projects to `None`, which is
/// distinct from an empty list.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PermissionSet {
    entries: Vec<PermissionEntry>,
    read_declared: bool,
    write_declared: bool,
}

impl PermissionSet {
    /// Build from separate id lists. Write grants are recorded first and read
    /// grants merge into them.
    #[must_use]
    pub fn from_lists(read: Option<&[String]>, write: Option<&[String]>) -> Self {
        let mut set = Self {
            read_declared: read.is_some(),
            write_declared: write.is_some(),
            ..Self::default()
        };

        for (rank, id) in write.unwrap_or_default().iter().enumerate() {
            let entry = set.entry_mut(id);
            entry.write = entry.write.or(Some(rank));
        }
        for (rank, id) in read.unwrap_or_default().iter().enumerate() {
            let entry = set.entry_mut(id);
            entry.read = entry.read.or(Some(rank));
        }

        set
    }

    /// Build from a REST `ACL` map of `{id: {read?: bool, write?: bool}}`.
    pub fn from_acl(acl: &Map<String, Value>) -> Result<Self, TransformError> {
        let mut set = Self {
            read_declared: true,
            write_declared: true,
            ..Self::default()
        };
        let (mut reads, mut writes) = (0, 0);

        for (id, grant) in acl {
            let Value::Object(grant) = grant else {
                return Err(TransformError::invalid_json(
                    ErrorOrigin::Acl,
                    format!("invalid ACL entry for '{id}'"),
                ));
            };

            let flag = |key: &str| match grant.get(key) {
                None | Some(Value::Null) => Ok(false),
                Some(Value::Bool(flag)) => Ok(*flag),
                Some(_) => Err(TransformError::invalid_json(
                    ErrorOrigin::Acl,
                    format!("ACL {key} permission for '{id}' must be a boolean"),
                )),
            };
            let (read, write) = (flag("read")?, flag("write")?);

            let entry = set.entry_mut(id);
            if read {
                entry.read = Some(reads);
                reads += 1;
            }
            if write {
                entry.write = Some(writes);
                writes += 1;
            }
        }

        Ok(set)
    }

    /// Permissions carried by a REST object: its `ACL` map when present,
    /// otherwise its `_rperm`/`_wperm` lists. `None` when it carries neither.
    pub fn from_rest_object(object: &Map<String, Value>) -> Result<Option<Self>, TransformError> {
        if let Some(acl) = object.get(ACL_KEY) {
            let Value::Object(acl) = acl else {
                return Err(TransformError::invalid_json(
                    ErrorOrigin::Acl,
                    "ACL must be an object",
                ));
            };

            return Self::from_acl(acl).map(Some);
        }

        let read = id_list(object, READ_PERM_KEY)?;
        let write = id_list(object, WRITE_PERM_KEY)?;
        if read.is_none() && write.is_none() {
            return Ok(None);
        }

        Ok(Some(Self::from_lists(read.as_deref(), write.as_deref())))
    }

    #[must_use]
    pub fn entries(&self) -> &[PermissionEntry] {
        &self.entries
    }

    /// `_rperm` projection.
    #[must_use]
    pub fn read_ids(&self) -> Option<Vec<&str>> {
        self.read_declared
            .then(|| self.project(|entry| entry.read))
    }

    /// `_wperm` projection.
    #[must_use]
    pub fn write_ids(&self) -> Option<Vec<&str>> {
        self.write_declared
            .then(|| self.project(|entry| entry.write))
    }

    /// Legacy `_acl` projection: `{id: {w: true, r: true}}`.
    #[must_use]
    pub fn legacy_acl(&self) -> Document {
        let mut acl = Document::new();
        for entry in &self.entries {
            let mut grant = Document::new();
            if entry.can_write() {
                grant.insert("w", true);
            }
            if entry.can_read() {
                grant.insert("r", true);
            }
            if !grant.is_empty() {
                acl.insert(entry.id.clone(), grant);
            }
        }

        acl
    }

    /// Write every declared projection into a native document.
    pub fn write_native(&self, document: &mut Document) {
        let list = |ids: Vec<&str>| Bson::Array(ids.into_iter().map(Bson::from).collect());

        if let Some(ids) = self.read_ids() {
            document.insert(READ_PERM_KEY, list(ids));
        }
        if let Some(ids) = self.write_ids() {
            document.insert(WRITE_PERM_KEY, list(ids));
        }
        document.insert(LEGACY_ACL_KEY, self.legacy_acl());
    }

    fn project(&self, rank: impl Fn(&PermissionEntry) -> Option<usize>) -> Vec<&str> {
        let mut ranked: Vec<(usize, &str)> = self
            .entries
            .iter()
            .filter_map(|entry| rank(entry).map(|rank| (rank, entry.id.as_str())))
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);

        ranked.into_iter().map(|(_, id)| id).collect()
    }

    fn entry_mut(&mut self, id: &str) -> &mut PermissionEntry {
        let index = match self.entries.iter().position(|entry| entry.id == id) {
            Some(index) => index,
            None => {
                self.entries.push(PermissionEntry {
                    id: id.to_string(),
                    read: None,
                    write: None,
                });
                self.entries.len() - 1
            }
        };

        &mut self.entries[index]
    }
}

/// Return a copy of `object` carrying the redundant legacy permission map.
///
/// An `ACL` map is replaced by its `_rperm`/`_wperm` projections; objects
/// without permission data are returned unchanged.
pub fn add_legacy_acl(object: &Map<String, Value>) -> Result<Map<String, Value>, TransformError> {
    let mut copy = object.clone();
    let Some(permissions) = PermissionSet::from_rest_object(object)? else {
        return Ok(copy);
    };

    let list = |ids: Vec<&str>| Value::Array(ids.into_iter().map(Value::from).collect());

    copy.remove(ACL_KEY);
    if let Some(ids) = permissions.read_ids() {
        copy.insert(READ_PERM_KEY.to_string(), list(ids));
    }
    if let Some(ids) = permissions.write_ids() {
        copy.insert(WRITE_PERM_KEY.to_string(), list(ids));
    }
    copy.insert(
        LEGACY_ACL_KEY.to_string(),
        Bson::Document(permissions.legacy_acl()).into_relaxed_extjson(),
    );

    Ok(copy)
}

fn id_list(object: &Map<String, Value>, key: &str) -> Result<Option<Vec<String>>, TransformError> {
    let Some(value) = object.get(key) else {
        return Ok(None);
    };
    let invalid = || {
        TransformError::invalid_json(ErrorOrigin::Acl, format!("{key} must be an array of strings"))
    };

    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|id| id.as_str().map(str::to_string).ok_or_else(invalid))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

///
/// TESTS
///
