//! Client-side key pairs distributed to operators

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{KeyCodec, PrivateKeyMaterial, PublicKeyMaterial};
use crate::error::{CoreError, Result};

/// A key pair owned by a site and addressed by its subscription id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSideKeypair {
    subscription_id: String,
    public_key: PublicKeyMaterial,
    private_key: PrivateKeyMaterial,
    site_id: i32,
    contact: String,
    created: DateTime<Utc>,
    disabled: bool,
}

impl ClientSideKeypair {
    pub fn new(
        subscription_id: impl Into<String>,
        public_key: PublicKeyMaterial,
        private_key: PrivateKeyMaterial,
        site_id: i32,
        contact: impl Into<String>,
        created: DateTime<Utc>,
        disabled: bool,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            public_key,
            private_key,
            site_id,
            contact: contact.into(),
            created,
            disabled,
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn public_key(&self) -> &PublicKeyMaterial {
        &self.public_key
    }

    pub fn private_key(&self) -> &PrivateKeyMaterial {
        &self.private_key
    }

    pub fn site_id(&self) -> i32 {
        self.site_id
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn encode_public_key(&self, codec: &dyn KeyCodec) -> String {
        codec.encode_public(&self.public_key)
    }

    pub fn encode_private_key(&self, codec: &dyn KeyCodec) -> String {
        codec.encode_private(&self.private_key)
    }
}

/// Persisted form of a key pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeypairRecord {
    pub subscription_id: String,
    pub public_key: String,
    pub private_key: String,
    pub site_id: i32,
    pub contact: String,
    /// Epoch seconds
    pub created: i64,
    #[serde(default)]
    pub disabled: bool,
}

impl KeypairRecord {
    /// Decode key material and build the key pair
    pub fn decode(&self, codec: &dyn KeyCodec) -> Result<ClientSideKeypair> {
        let public_key = codec.decode_public(&self.public_key).map_err(|e| {
            CoreError::KeyDecode(format!("subscription '{}': {}", self.subscription_id, e))
        })?;
        let private_key = codec.decode_private(&self.private_key).map_err(|e| {
            CoreError::KeyDecode(format!("subscription '{}': {}", self.subscription_id, e))
        })?;
        let created = Utc
            .timestamp_opt(self.created, 0)
            .single()
            .ok_or(CoreError::InvalidTimestamp(self.created))?;

        Ok(ClientSideKeypair::new(
            self.subscription_id.clone(),
            public_key,
            private_key,
            self.site_id,
            self.contact.clone(),
            created,
            self.disabled,
        ))
    }

    /// Encode a key pair back into its persisted form
    pub fn from_keypair(keypair: &ClientSideKeypair, codec: &dyn KeyCodec) -> Self {
        Self {
            subscription_id: keypair.subscription_id.clone(),
            public_key: keypair.encode_public_key(codec),
            private_key: keypair.encode_private_key(codec),
            site_id: keypair.site_id,
            contact: keypair.contact.clone(),
            created: keypair.created.timestamp(),
            disabled: keypair.disabled,
        }
    }
}
