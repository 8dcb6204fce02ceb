// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record names for locally created Customers, Leads, Issues, and Comments.

use uuid::Uuid;

pub const CUSTOMER_PREFIX: &str = "CUST";
pub const LEAD_PREFIX: &str = "CRM-LEAD";
pub const ISSUE_PREFIX: &str = "ISS";
pub const COMMENT_PREFIX: &str = "CMT";

/// A fresh `PREFIX-XXXXXXXXXX` name.
pub fn new_record_name(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", id[..10].to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_prefixed_and_distinct() {
        let a = new_record_name(LEAD_PREFIX);
        let b = new_record_name(LEAD_PREFIX);
        assert!(a.starts_with("CRM-LEAD-"));
        assert_eq!(a.len(), "CRM-LEAD-".len() + 10);
        assert_ne!(a, b);
    }
}
