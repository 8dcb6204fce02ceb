// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vendor-neutral view of a remote contact.

/// Identity fields of a contact as reported by a remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteContact {
    /// The remote service's contact id.
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl RemoteContact {
    /// Best available display name: name, email local part, phone, "Unknown".
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if let Some(email) = &self.email {
            return email_local_part(email).to_string();
        }
        self.phone.clone().unwrap_or_else(|| "Unknown".to_string())
    }

    /// True if there is an email or phone to create a record from.
    pub fn is_reachable(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}

/// The part of an address before `@`, or the whole string without one.
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
