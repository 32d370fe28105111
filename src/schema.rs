//! Store schema and typed entities (C8).
//!
//! A tagged union for credential variants (not an inheritance hierarchy)
//! and optional, present-with-value fields throughout — a sentinel zero
//! would be indistinguishable from "never failed", which the eligibility
//! oracle (C5) must not confuse.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type ProfileId = String;
pub type AgentId = String;
pub type ModelId = String;
pub type RoutingKey = String;

/// A single stored credential, tagged by `type`. An unrecognized tag is
/// preserved as its full original JSON object (see `Unknown`) rather than
/// collapsed into a dataless marker, so a read-modify-write cycle elsewhere
/// in the store never drops its fields — it is still skipped for routing
/// purposes, just never mutilated on write.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialVariant {
    ApiKey {
        provider: String,
        key: Option<String>,
        email: Option<String>,
        metadata: Option<serde_json::Value>,
    },
    /// A static bearer token. Not refreshable by this crate; refresh, if
    /// any, is the embedding application's concern.
    Token {
        provider: String,
        expires: Option<i64>,
    },
    /// An OAuth credential. Refresh, discovery, and the provider catalog
    /// are external collaborators this crate never calls into.
    Oauth {
        provider: String,
        oauth_payload: serde_json::Value,
        client_id: Option<String>,
        email: Option<String>,
    },
    /// A `type` tag this version of the crate doesn't recognize, holding
    /// the complete original JSON object. Never eligible for selection
    /// and never reached into for a `provider` — but re-emitted verbatim
    /// on the next write.
    Unknown(serde_json::Value),
}

/// The subset of `CredentialVariant` this crate knows how to interpret.
/// Exists only so serde's internally-tagged derive can do the tag dispatch;
/// `CredentialVariant` itself (de)serializes by hand (below) so a tag this
/// maps to none of these can fall back to `Unknown` with its raw JSON
/// intact instead of losing its other fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownCredential {
    ApiKey {
        provider: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    Token {
        provider: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        expires: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    Oauth {
        provider: String,
        oauth_payload: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
}

impl From<KnownCredential> for CredentialVariant {
    fn from(known: KnownCredential) -> Self {
        match known {
            KnownCredential::ApiKey { provider, key, email, metadata } => {
                CredentialVariant::ApiKey { provider, key, email, metadata }
            }
            KnownCredential::Token { provider, expires } => {
                CredentialVariant::Token { provider, expires }
            }
            KnownCredential::Oauth { provider, oauth_payload, client_id, email } => {
                CredentialVariant::Oauth { provider, oauth_payload, client_id, email }
            }
        }
    }
}

impl Serialize for CredentialVariant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CredentialVariant::ApiKey { provider, key, email, metadata } => KnownCredential::ApiKey {
                provider: provider.clone(),
                key: key.clone(),
                email: email.clone(),
                metadata: metadata.clone(),
            }
            .serialize(serializer),
            CredentialVariant::Token { provider, expires } => KnownCredential::Token {
                provider: provider.clone(),
                expires: *expires,
            }
            .serialize(serializer),
            CredentialVariant::Oauth { provider, oauth_payload, client_id, email } => {
                KnownCredential::Oauth {
                    provider: provider.clone(),
                    oauth_payload: oauth_payload.clone(),
                    client_id: client_id.clone(),
                    email: email.clone(),
                }
                .serialize(serializer)
            }
            // Re-emit the original object verbatim, tag and all — never
            // rewritten to a synthetic `"type": "unknown"`.
            CredentialVariant::Unknown(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CredentialVariant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match serde_json::from_value::<KnownCredential>(value.clone()) {
            Ok(known) => Ok(known.into()),
            Err(_) => Ok(CredentialVariant::Unknown(value)),
        }
    }
}

impl CredentialVariant {
    /// The `provider` field every known variant carries. `None` for an
    /// unrecognized variant, which is never eligible for selection.
    pub fn provider(&self) -> Option<&str> {
        match self {
            CredentialVariant::ApiKey { provider, .. }
            | CredentialVariant::Token { provider, .. }
            | CredentialVariant::Oauth { provider, .. } => Some(provider.as_str()),
            CredentialVariant::Unknown(_) => None,
        }
    }
}

/// Per-model penalty state, scoped beneath a profile's `model_stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsageStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<i64>,

    /// Fields this version of the crate doesn't know about, preserved
    /// across a read-modify-write cycle per spec §6 forward compatibility.
    #[serde(flatten)]
    pub unknown_fields: serde_json::Map<String, serde_json::Value>,
}

/// Profile-wide usage and penalty state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUsageStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_until: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_counts: Option<HashMap<String, u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_stats: Option<HashMap<ModelId, ModelUsageStats>>,

    #[serde(flatten)]
    pub unknown_fields: serde_json::Map<String, serde_json::Value>,
}

/// The on-disk/in-memory store. `profiles`/`usage_stats`/`order`/
/// `last_good` may reference each other's keys loosely: a stale id in one
/// map that is missing from `profiles` is tolerated and skipped, never an
/// error (invariant 1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthProfileStore {
    pub version: u32,
    #[serde(default)]
    pub profiles: HashMap<ProfileId, CredentialVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<HashMap<AgentId, Vec<ProfileId>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_good: Option<HashMap<RoutingKey, ProfileId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_stats: Option<HashMap<ProfileId, ProfileUsageStats>>,
}

impl Default for AuthProfileStore {
    fn default() -> Self {
        Self {
            version: 1,
            profiles: HashMap::new(),
            order: None,
            last_good: None,
            usage_stats: None,
        }
    }
}

impl AuthProfileStore {
    /// The usage stats for `profile_id`, defaulting to empty if the
    /// `usage_stats` map is absent or doesn't mention this profile yet —
    /// callers must survive an absent/malformed field per spec §7.
    pub fn stats_for(&self, profile_id: &str) -> ProfileUsageStats {
        self.usage_stats
            .as_ref()
            .and_then(|m| m.get(profile_id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_stats_for(&mut self, profile_id: &str, stats: ProfileUsageStats) {
        self.usage_stats
            .get_or_insert_with(HashMap::new)
            .insert(profile_id.to_string(), stats);
    }

    pub fn has_profile(&self, profile_id: &str) -> bool {
        self.profiles.contains_key(profile_id)
    }
}

/// A positive, finite timestamp, or `None` — invariant 2 applied at a
/// single call site so every reader gets the same treatment of malformed
/// timestamps.
pub fn sanitize_timestamp(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_variant_tagged_roundtrip() {
        let cred = CredentialVariant::ApiKey {
            provider: "anthropic".into(),
            key: Some("sk-...".into()),
            email: None,
            metadata: None,
        };
        let json = serde_json::to_string(&cred).unwrap();
        assert!(json.contains("\"type\":\"api_key\""));
        let back: CredentialVariant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cred);
    }

    #[test]
    fn unknown_tag_is_preserved_but_unroutable() {
        let json = r#"{"type":"future_variant","provider":"x","secret":"keep me"}"#;
        let cred: CredentialVariant = serde_json::from_str(json).unwrap();
        let expected: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(cred, CredentialVariant::Unknown(expected));
        assert_eq!(cred.provider(), None);

        // A read-modify-write cycle must not drop any of the original
        // object's fields, only the ones this crate doesn't recognize.
        let out = serde_json::to_string(&cred).unwrap();
        let roundtripped: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(roundtripped["type"], "future_variant");
        assert_eq!(roundtripped["provider"], "x");
        assert_eq!(roundtripped["secret"], "keep me");
    }

    #[test]
    fn stale_ids_in_usage_stats_are_tolerated() {
        let mut store = AuthProfileStore::default();
        store.set_stats_for("ghost-profile", ProfileUsageStats::default());
        assert!(!store.has_profile("ghost-profile"));
        // Reading stats for an id absent from `profiles` never panics or errors.
        let stats = store.stats_for("ghost-profile");
        assert_eq!(stats.error_count, None);
    }

    #[test]
    fn unknown_fields_survive_roundtrip() {
        let json = r#"{"lastUsed":1,"futureField":"keep me"}"#;
        let stats: ProfileUsageStats = serde_json::from_str(json).unwrap();
        assert_eq!(
            stats.unknown_fields.get("futureField"),
            Some(&serde_json::Value::String("keep me".into()))
        );
        let out = serde_json::to_string(&stats).unwrap();
        assert!(out.contains("futureField"));
    }

    #[test]
    fn sanitize_timestamp_rejects_nonpositive() {
        assert_eq!(sanitize_timestamp(Some(5)), Some(5));
        assert_eq!(sanitize_timestamp(Some(0)), None);
        assert_eq!(sanitize_timestamp(Some(-1)), None);
        assert_eq!(sanitize_timestamp(None), None);
    }

    #[test]
    fn store_defaults_to_version_one_and_empty_profiles() {
        let store = AuthProfileStore::default();
        assert_eq!(store.version, 1);
        assert!(store.profiles.is_empty());
    }
}
