//! Cache key generation using SHA-256 hashes

use sha2::{Digest, Sha256};

use crate::models::EntityKind;

/// Hex characters of the credential digest kept in keys
const CREDENTIAL_HASH_LEN: usize = 12;

/// Short, deterministic digest of a credential.
///
/// Keys never contain the credential itself; distinct credentials land in
/// distinct key spaces.
pub fn credential_hash(credential: &str) -> String {
    let digest = Sha256::digest(credential.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(CREDENTIAL_HASH_LEN);
    hex
}

/// Key addressing one entity of one case: `<cred>:<case>:<entity>`
pub fn entity_key(credential_hash: &str, case_id: i64, entity: EntityKind) -> String {
    format!("{}{}", case_prefix(credential_hash, case_id), entity.as_str())
}

/// Prefix shared by every entity key of a case
pub fn case_prefix(credential_hash: &str, case_id: i64) -> String {
    format!("{}:{}:", credential_hash, case_id)
}

/// Key addressing the case listing of a credential
pub fn cases_list_key(credential_hash: &str) -> String {
    format!("{}:cases_list", credential_hash)
}
