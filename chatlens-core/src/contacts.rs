//! Contact resolution against the optional contacts database.
//!
//! Resolution runs once over the distinct participant identifiers of a
//! [`Dataset`]. Identifiers that cannot be resolved keep their raw form as
//! display name; nothing downstream treats that as an error.

use crate::error::{Error, Result};
use crate::ingest::strategies::{jid_expr, text_cell};
use crate::ingest::{column_exists, table_exists};
use crate::types::{Chat, ChatKind, Dataset, Sender};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display name used for the database owner.
pub const ME_LABEL: &str = "Me";

/// A participant resolved from the contacts database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Identifier as it appears in the message database
    pub identifier: String,
    pub display_name: String,
    /// LID paired with this identifier, if any
    pub lid: Option<String>,
    /// Profile "about" text
    pub status: Option<String>,
}

/// Result of a directory lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactRef<'a> {
    Resolved(&'a Contact),
    /// No contact; the raw identifier stands in for a name
    Unresolved(&'a str),
}

impl<'a> ContactRef<'a> {
    pub fn display_name(&self) -> &'a str {
        match self {
            ContactRef::Resolved(contact) => &contact.display_name,
            ContactRef::Unresolved(id) => id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ContactRef::Resolved(_))
    }
}

/// How the contacts database contributed to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContactsStatus {
    /// Contacts database read
    Loaded { contacts: usize },
    /// No contacts database was given
    Absent,
    /// A contacts database was given but could not be used
    Unreadable { reason: String },
}

/// Identifier → [`Contact`] mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactDirectory {
    contacts: BTreeMap<String, Contact>,
}

impl ContactDirectory {
    /// Directory with no contacts. Every lookup is unresolved.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        Self {
            contacts: contacts
                .into_iter()
                .map(|c| (c.identifier.clone(), c))
                .collect(),
        }
    }

    pub fn lookup<'a>(&'a self, identifier: &'a str) -> ContactRef<'a> {
        match self.contacts.get(identifier) {
            Some(contact) => ContactRef::Resolved(contact),
            None => ContactRef::Unresolved(identifier),
        }
    }

    pub fn display_name<'a>(&'a self, identifier: &'a str) -> &'a str {
        self.lookup(identifier).display_name()
    }

    /// Display name of a message sender.
    pub fn sender_name<'a>(&'a self, sender: &'a Sender) -> &'a str {
        match sender {
            Sender::Me => ME_LABEL,
            Sender::Participant(id) => self.display_name(id),
        }
    }

    /// Display name of a chat. Group subjects win over contact names.
    pub fn chat_name<'a>(&'a self, chat: &'a Chat) -> &'a str {
        match (&chat.kind, &chat.subject) {
            (ChatKind::Group, Some(subject)) => subject,
            _ => self.display_name(&chat.id),
        }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

/// One `wa_contacts` row.
#[derive(Debug, Clone)]
struct ContactRow {
    display_name: Option<String>,
    given_name: Option<String>,
    wa_name: Option<String>,
    status: Option<String>,
}

impl ContactRow {
    /// First non-blank of display name, given name, WhatsApp name.
    fn best_name(&self) -> Option<&str> {
        [&self.display_name, &self.given_name, &self.wa_name]
            .into_iter()
            .filter_map(|n| n.as_deref())
            .map(str::trim)
            .find(|n| !n.is_empty())
    }
}

/// Resolve the participants of `dataset`.
///
/// `conn` is the contacts database, if one is available. Without it the
/// directory is empty. A database without a `wa_contacts` table fails with
/// [`Error::MissingAuxiliaryData`] so the caller can record why it degraded.
pub fn resolve(dataset: &Dataset, conn: Option<&Connection>) -> Result<ContactDirectory> {
    let Some(conn) = conn else {
        tracing::info!("No contacts database, using raw identifiers");
        return Ok(ContactDirectory::empty());
    };

    if !table_exists(conn, "wa_contacts")? || !column_exists(conn, "wa_contacts", "jid")? {
        return Err(Error::MissingAuxiliaryData(
            "contacts database has no wa_contacts(jid) table".to_string(),
        ));
    }

    let rows = read_contact_rows(conn)?;

    // LID → identifier, message database links first
    let mut links = dataset.identifier_links.clone();
    for (lid, jid) in read_contact_links(conn)? {
        links.entry(lid).or_insert(jid);
    }
    let lid_for: BTreeMap<&str, &str> = links
        .iter()
        .map(|(lid, jid)| (jid.as_str(), lid.as_str()))
        .collect();

    let identifiers = dataset.participant_identifiers();
    let mut contacts = Vec::new();
    let mut via_lid = 0usize;

    for identifier in &identifiers {
        let (row, lid) = match rows.get(*identifier) {
            Some(row) => (row, lid_for.get(identifier).map(|l| l.to_string())),
            None => match links.get(*identifier).and_then(|jid| rows.get(jid)) {
                Some(row) => {
                    via_lid += 1;
                    (row, Some(identifier.to_string()))
                }
                None => continue,
            },
        };

        if let Some(name) = row.best_name() {
            contacts.push(Contact {
                identifier: identifier.to_string(),
                display_name: name.to_string(),
                lid,
                status: row.status.clone().filter(|s| !s.trim().is_empty()),
            });
        }
    }

    tracing::info!(
        identifiers = identifiers.len(),
        resolved = contacts.len(),
        via_lid,
        "Resolved contacts"
    );

    Ok(ContactDirectory::from_contacts(contacts))
}

fn read_contact_rows(conn: &Connection) -> Result<BTreeMap<String, ContactRow>> {
    let optional = |col: &str| -> Result<String> {
        Ok(if column_exists(conn, "wa_contacts", col)? {
            col.to_string()
        } else {
            "NULL".to_string()
        })
    };

    let sql = format!(
        "SELECT jid, {}, {}, {}, {} FROM wa_contacts WHERE jid IS NOT NULL",
        optional("display_name")?,
        optional("given_name")?,
        optional("wa_name")?,
        optional("status")?,
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = BTreeMap::new();
    let mapped = stmt.query_map([], |row| {
        Ok((
            text_cell(row, 0)?,
            ContactRow {
                display_name: text_cell(row, 1)?,
                given_name: text_cell(row, 2)?,
                wa_name: text_cell(row, 3)?,
                status: text_cell(row, 4)?,
            },
        ))
    })?;
    for row in mapped {
        let (Some(jid), contact) = row? else {
            continue;
        };
        // keep the first row that carries a usable name
        let keep_existing = rows
            .get(&jid)
            .map(|existing: &ContactRow| existing.best_name().is_some())
            .unwrap_or(false);
        if !keep_existing {
            rows.insert(jid, contact);
        }
    }

    Ok(rows)
}

/// LID links stored in the contacts database itself, if it has them.
fn read_contact_links(conn: &Connection) -> Result<BTreeMap<String, String>> {
    if !table_exists(conn, "jid_map")?
        || !table_exists(conn, "jid")?
        || !column_exists(conn, "jid_map", "lid_row_id")?
        || !column_exists(conn, "jid_map", "jid_row_id")?
    {
        return Ok(BTreeMap::new());
    }

    let has_raw = column_exists(conn, "jid", "raw_string")?;
    let has_parts = column_exists(conn, "jid", "user")? && column_exists(conn, "jid", "server")?;
    let (Some(lid), Some(jid)) = (
        jid_expr("l", has_raw, has_parts),
        jid_expr("j", has_raw, has_parts),
    ) else {
        return Ok(BTreeMap::new());
    };

    let sql = format!(
        "SELECT {lid}, {jid} FROM jid_map jm
         JOIN jid l ON jm.lid_row_id = l._id
         JOIN jid j ON jm.jid_row_id = j._id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut links = BTreeMap::new();
    let rows = stmt.query_map([], |row| Ok((text_cell(row, 0)?, text_cell(row, 1)?)))?;
    for row in rows {
        if let (Some(lid), Some(jid)) = row? {
            links.insert(lid, jid);
        }
    }

    Ok(links)
}
