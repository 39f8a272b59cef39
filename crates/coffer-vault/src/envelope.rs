// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Envelope codec: plain request -> secured record -> ciphertext record, and back.
//!
//! Routing fields stay in cleartext and are bound to the ciphertext as
//! associated data, so a sealed payload cannot be moved to another record,
//! user, scope or parent without failing authentication.

use coffer_core::{CiphertextRecord, CofferError};
use zeroize::Zeroizing;

use crate::crypto;
use crate::kdf::KeyDerivation;
use crate::model::{Payload, Routing, Securable, Secured};
use crate::secret::SecretKey;

fn associated_data<P: Payload>(routing: &Routing) -> Vec<u8> {
    let optional = |id: Option<uuid::Uuid>| id.map_or_else(|| "-".to_string(), |id| id.to_string());
    format!(
        "coffer:{}:{}:{}:{}:{}",
        P::KIND,
        routing.id,
        routing.user_id,
        optional(routing.visibility_group_id),
        optional(routing.parent_id),
    )
    .into_bytes()
}

/// Validate a plain request and hash any passwords it carries.
pub fn to_secured<T: Securable>(
    plain: T,
    routing: Routing,
    kdf: &dyn KeyDerivation,
    salt_len: usize,
) -> Result<Secured<T::Payload>, CofferError> {
    plain.validate()?;
    Ok(Secured {
        routing,
        payload: plain.secure(kdf, salt_len)?,
    })
}

/// Serialize and seal the private part of a secured record under `key`.
pub fn to_storage_secured<P: Payload>(
    secured: &Secured<P>,
    key: &SecretKey,
) -> Result<CiphertextRecord, CofferError> {
    let json = Zeroizing::new(
        serde_json::to_vec(&secured.payload)
            .map_err(|e| CofferError::Internal(format!("failed to serialize {}: {e}", P::KIND)))?,
    );
    let ciphertext = crypto::seal(key.expose(), &associated_data::<P>(&secured.routing), &json)?;

    Ok(CiphertextRecord {
        kind: P::KIND,
        id: secured.routing.id,
        user_id: secured.routing.user_id,
        visibility_group_id: secured.routing.visibility_group_id,
        parent_id: secured.routing.parent_id,
        ciphertext,
    })
}

/// Decrypt a ciphertext record and validate its payload against the kind's schema.
///
/// Any failure is [`CofferError::Corruption`]; no partially decoded payload is
/// ever returned.
pub fn from_storage_secured<P: Payload>(
    record: &CiphertextRecord,
    key: &SecretKey,
) -> Result<Secured<P>, CofferError> {
    if record.kind != P::KIND {
        return Err(CofferError::Corruption(format!(
            "record {} is a {}, expected {}",
            record.id,
            record.kind,
            P::KIND
        )));
    }

    let routing = Routing {
        id: record.id,
        user_id: record.user_id,
        visibility_group_id: record.visibility_group_id,
        parent_id: record.parent_id,
    };
    let plaintext = Zeroizing::new(crypto::open(
        key.expose(),
        &associated_data::<P>(&routing),
        &record.ciphertext,
    )?);

    let value: serde_json::Value = serde_json::from_slice(&plaintext).map_err(|_| {
        CofferError::Corruption(format!("{} {} is not valid JSON", P::KIND, record.id))
    })?;
    if let Err(e) = P::validator().validate(&value) {
        return Err(CofferError::Corruption(format!(
            "{} {} failed schema validation at `{}`",
            P::KIND,
            record.id,
            e.instance_path
        )));
    }
    let payload = serde_json::from_value(value).map_err(|_| {
        CofferError::Corruption(format!("{} {} could not be decoded", P::KIND, record.id))
    })?;

    Ok(Secured { routing, payload })
}
