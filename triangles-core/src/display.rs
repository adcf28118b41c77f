//! Display implementation for Record

use crate::Record;
use std::fmt;

/// Compact wire JSON, the form relays and media hosts expect
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "<invalid Record>"),
        }
    }
}
