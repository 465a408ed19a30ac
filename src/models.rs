use serde::{Deserialize, Deserializer, Serialize};

/// The two transaction/category tags stored verbatim in the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
    #[serde(rename = "Pengeluaran")]
    Expense,
    #[serde(rename = "Pemasukan")]
    Income,
}

impl TxKind {
    pub const ALL: [TxKind; 2] = [TxKind::Expense, TxKind::Income];

    pub fn as_str(self) -> &'static str {
        match self {
            TxKind::Expense => "Pengeluaran",
            TxKind::Income => "Pemasukan",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Pengeluaran" => Some(TxKind::Expense),
            "Pemasukan" => Some(TxKind::Income),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub date: String,
    pub category: String,
    pub amount: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "id_string")]
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    #[serde(default, rename = "bukti_url")]
    pub receipt_url: Option<String>,
}

/// Row payload for inserting a transaction; the store assigns the id.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub date: String,
    pub category: String,
    pub amount: i64,
    pub description: Option<String>,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    #[serde(rename = "bukti_url", skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
}

/// Columns rewritten by the in-place edit on the dashboard table.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionEdit {
    pub date: String,
    pub category: String,
    pub amount: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    #[serde(deserialize_with = "id_string")]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "nama", default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// A signed-in user together with the token the auth service issued.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: AuthUser,
}

/// Result of a sign-up. Hosted auth only returns a token when email
/// confirmation is disabled.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: AuthUser,
    pub access_token: Option<String>,
}

// Hosted tables may use bigint identity columns instead of uuids.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(value) => value,
        RawId::Number(value) => value.to_string(),
    })
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
