//! Column role classification
//!
//! Maps raw column/key names onto canonical roles with an ordered list of
//! (role, keyword set) pairs. Roles are resolved in list order and a column
//! claimed by one role is not offered to later roles, so the specific roles
//! (hashes, MIME, kind, timestamps with a qualifier) come before the broad
//! ones (content, sender, timestamp, name).
//!
//! Within a role, keywords are tried in priority order over three passes of
//! decreasing strictness:
//! 1. exact column name
//! 2. keyword equals one token of the column (split on `_`, `-`, `.`, space, camelCase)
//! 3. substring containment, only for keywords of 4+ characters
//!
//! So `body` beats `metadata` for the content role, and `to` never matches
//! `photo`. Keywords starting with `_` only ever match exactly.

use std::collections::BTreeMap;

/// Canonical semantic role of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnRole {
    HashMd5,
    HashSha256,
    Mime,
    /// Message type for chats, call direction for calls
    Kind,
    Deleted,
    Duration,
    Created,
    Modified,
    Size,
    Filename,
    Path,
    AppName,
    Email,
    Content,
    Sender,
    Receiver,
    Timestamp,
    Name,
    Phone,
}

/// Resolution order and keyword priority per role
pub const ROLE_KEYWORDS: &[(ColumnRole, &[&str])] = &[
    (ColumnRole::HashMd5, &["md5", "hash_md5"]),
    (ColumnRole::HashSha256, &["sha256", "hash_sha256", "sha_256"]),
    (ColumnRole::Mime, &["mime_type", "mimetype", "mime", "content_type", "file_type"]),
    (ColumnRole::Kind, &["message_type", "msg_type", "call_type", "direction", "type"]),
    (ColumnRole::Deleted, &["is_deleted", "deleted"]),
    (ColumnRole::Duration, &["duration", "call_duration"]),
    (ColumnRole::Created, &["created", "date_added", "creation", "ctime", "birth"]),
    (ColumnRole::Modified, &["modified", "date_modified", "last_modified", "mtime", "updated"]),
    (ColumnRole::Size, &["file_size", "size", "bytes", "length"]),
    (ColumnRole::Filename, &["filename", "file_name", "media_name", "fname"]),
    (ColumnRole::Path, &["file_path", "local_path", "path", "_data", "uri"]),
    (ColumnRole::AppName, &["app_name", "application", "package", "app", "service"]),
    (ColumnRole::Email, &["email"]),
    (ColumnRole::Content, &["data", "message", "body", "text", "content"]),
    (ColumnRole::Sender, &["sender", "from", "author", "address", "src", "caller"]),
    (ColumnRole::Receiver, &["receiver", "to", "dest", "remote", "chat", "recipient", "callee"]),
    (ColumnRole::Timestamp, &["time", "date", "timestamp"]),
    (ColumnRole::Name, &["display_name", "name", "given_name"]),
    (ColumnRole::Phone, &["phone", "number", "msisdn"]),
];

/// Keywords shorter than this only match exactly or as a whole token
const MIN_SUBSTRING_KEYWORD: usize = 4;

/// Result of classifying one table's (or object's) columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    /// Role -> index into the original column list
    assignments: BTreeMap<ColumnRole, usize>,
    columns: Vec<String>,
}

impl ColumnRoles {
    /// Column index assigned to `role`
    pub fn index(&self, role: ColumnRole) -> Option<usize> {
        self.assignments.get(&role).copied()
    }

    /// Original column name assigned to `role`
    pub fn column(&self, role: ColumnRole) -> Option<&str> {
        self.index(role).map(|i| self.columns[i].as_str())
    }

    pub fn has(&self, role: ColumnRole) -> bool {
        self.assignments.contains_key(&role)
    }

    /// Role/column-index pairs in role order
    pub fn assignments(&self) -> impl Iterator<Item = (ColumnRole, usize)> + '_ {
        self.assignments.iter().map(|(role, idx)| (*role, *idx))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Chat gate: a content column
    pub fn is_chat_candidate(&self) -> bool {
        self.has(ColumnRole::Content)
    }

    /// Call gate: a duration column plus a caller/receiver-like column
    pub fn is_call_candidate(&self) -> bool {
        self.has(ColumnRole::Duration)
            && (self.has(ColumnRole::Sender) || self.has(ColumnRole::Receiver) || self.has(ColumnRole::Phone))
    }

    /// Contact gate: a name column
    pub fn is_contact_candidate(&self) -> bool {
        self.has(ColumnRole::Name)
    }

    /// Media gate: a filename or path column
    pub fn is_media_candidate(&self) -> bool {
        self.has(ColumnRole::Filename) || self.has(ColumnRole::Path)
    }

    /// Distinct column indices used by any role, ascending
    pub fn used_indices(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = self.assignments.values().copied().collect();
        idx.sort_unstable();
        idx.dedup();
        idx
    }
}

/// Classify column names into canonical roles (case-insensitive)
pub fn classify_columns<S: AsRef<str>>(columns: &[S]) -> ColumnRoles {
    let originals: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
    let lowered: Vec<String> = originals.iter().map(|c| c.to_lowercase()).collect();
    let tokens: Vec<Vec<String>> = originals.iter().map(|c| tokenize(c)).collect();

    let mut claimed = vec![false; originals.len()];
    let mut assignments = BTreeMap::new();

    for (role, keywords) in ROLE_KEYWORDS {
        if let Some(idx) = find_column(keywords, &lowered, &tokens, &claimed) {
            claimed[idx] = true;
            assignments.insert(*role, idx);
        }
    }

    ColumnRoles { assignments, columns: originals }
}

fn find_column(
    keywords: &[&str],
    lowered: &[String],
    tokens: &[Vec<String>],
    claimed: &[bool],
) -> Option<usize> {
    let free = |i: &usize| !claimed[*i];

    for kw in keywords {
        if let Some(i) = (0..lowered.len()).filter(free).find(|&i| lowered[i] == *kw) {
            return Some(i);
        }
    }
    for kw in keywords.iter().filter(|kw| !is_exact_only(kw)) {
        let kw_tokens = tokenize(kw);
        if let Some(i) = (0..lowered.len())
            .filter(free)
            .find(|&i| contains_token_run(&tokens[i], &kw_tokens))
        {
            return Some(i);
        }
    }
    for kw in keywords.iter().filter(|kw| kw.len() >= MIN_SUBSTRING_KEYWORD && !is_exact_only(kw)) {
        if let Some(i) = (0..lowered.len()).filter(free).find(|&i| lowered[i].contains(kw)) {
            return Some(i);
        }
    }
    None
}

/// Underscore-prefixed keywords (`_data`) name a single well-known column
fn is_exact_only(keyword: &str) -> bool {
    keyword.starts_with('_')
}

/// Whether `needle` appears as a contiguous run inside `haystack`
fn contains_token_run(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Split a column name into lowercase tokens
///
/// `key_remote_jid` -> [key, remote, jid]; `senderNumber` -> [sender, number]
pub fn tokenize(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c == '_' || c == '-' || c == '.' || c == ' ' || c == '/' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_android_sms_table() {
        let roles = classify_columns(&["_id", "address", "body", "date", "type", "read"]);
        assert_eq!(roles.column(ColumnRole::Content), Some("body"));
        assert_eq!(roles.column(ColumnRole::Sender), Some("address"));
        assert_eq!(roles.column(ColumnRole::Timestamp), Some("date"));
        assert_eq!(roles.column(ColumnRole::Kind), Some("type"));
        assert_eq!(roles.column(ColumnRole::Receiver), None);
        assert!(roles.is_chat_candidate());
        assert!(!roles.is_call_candidate());
        assert!(!roles.is_contact_candidate());
        assert!(!roles.is_media_candidate());
    }

    #[test]
    fn test_android_call_log() {
        let roles = classify_columns(&["number", "date", "duration", "type", "name"]);
        assert!(roles.is_call_candidate());
        assert_eq!(roles.column(ColumnRole::Phone), Some("number"));
        assert_eq!(roles.column(ColumnRole::Duration), Some("duration"));
        // The name column also opens the contact gate; one table may feed several categories
        assert!(roles.is_contact_candidate());
        assert!(!roles.is_chat_candidate());
    }

    #[test]
    fn test_whatsapp_messages() {
        let roles = classify_columns(&["key_remote_jid", "key_from_me", "data", "timestamp", "media_mime_type"]);
        assert_eq!(roles.column(ColumnRole::Content), Some("data"));
        assert_eq!(roles.column(ColumnRole::Receiver), Some("key_remote_jid"));
        assert_eq!(roles.column(ColumnRole::Timestamp), Some("timestamp"));
        assert_eq!(roles.column(ColumnRole::Mime), Some("media_mime_type"));
    }

    #[test]
    fn test_exact_match_beats_substring() {
        let roles = classify_columns(&["metadata", "body"]);
        assert_eq!(roles.column(ColumnRole::Content), Some("body"));
    }

    #[test]
    fn test_short_keywords_need_token() {
        let roles = classify_columns(&["photo", "caption_text"]);
        assert_eq!(roles.column(ColumnRole::Receiver), None);
        let roles = classify_columns(&["msg_to", "msg_body"]);
        assert_eq!(roles.column(ColumnRole::Receiver), Some("msg_to"));
    }

    #[test]
    fn test_specific_roles_claim_first() {
        let roles = classify_columns(&["content_type", "message_type", "text"]);
        assert_eq!(roles.column(ColumnRole::Mime), Some("content_type"));
        assert_eq!(roles.column(ColumnRole::Kind), Some("message_type"));
        assert_eq!(roles.column(ColumnRole::Content), Some("text"));
    }

    #[test]
    fn test_contacts_table() {
        let roles = classify_columns(&["display_name", "phone", "email_address"]);
        assert_eq!(roles.column(ColumnRole::Name), Some("display_name"));
        assert_eq!(roles.column(ColumnRole::Phone), Some("phone"));
        assert_eq!(roles.column(ColumnRole::Email), Some("email_address"));
        assert_eq!(roles.column(ColumnRole::Sender), None);
    }

    #[test]
    fn test_media_table() {
        let roles = classify_columns(&["_display_name", "_data", "mime_type", "_size", "date_added", "date_modified"]);
        assert!(roles.is_media_candidate());
        assert_eq!(roles.column(ColumnRole::Path), Some("_data"));
        assert_eq!(roles.column(ColumnRole::Size), Some("_size"));
        assert_eq!(roles.column(ColumnRole::Created), Some("date_added"));
        assert_eq!(roles.column(ColumnRole::Modified), Some("date_modified"));
        assert_eq!(roles.column(ColumnRole::Content), None);
    }

    #[test]
    fn test_case_insensitive() {
        let roles = classify_columns(&["ADDRESS", "Body", "DATE"]);
        assert_eq!(roles.column(ColumnRole::Content), Some("Body"));
        assert_eq!(roles.column(ColumnRole::Sender), Some("ADDRESS"));
    }

    #[test]
    fn test_unrelated_table_opens_no_gate() {
        let roles = classify_columns(&["id", "key", "value", "flags"]);
        assert!(!roles.is_chat_candidate());
        assert!(!roles.is_call_candidate());
        assert!(!roles.is_contact_candidate());
        assert!(!roles.is_media_candidate());
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("key_remote_jid"), vec!["key", "remote", "jid"]);
        assert_eq!(tokenize("senderNumber"), vec!["sender", "number"]);
        assert_eq!(tokenize("_data"), vec!["data"]);
    }
}
