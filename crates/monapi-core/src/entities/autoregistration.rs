//! Global autoregistration TLS settings: a single row, secrets write-only.

use crate::catalog::{EntityDescriptor, FieldDef};
use crate::security::{AccessRules, UserRole};

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("autoregistration", "Autoregistration", "config_autoreg_tls", "c")
        .with_pk("autoreg_tlsid")
        .with_hidden("autoreg_tlsid")
        .with_field(FieldDef::int("tls_accept").writable().allowed(&[1, 2, 3]))
        .with_field(FieldDef::string("tls_psk_identity").write_only().max_len(128))
        .with_field(FieldDef::string("tls_psk").write_only().max_len(512))
        .with_access(AccessRules {
            get: Some(UserRole::SuperAdmin),
            update: Some(UserRole::SuperAdmin),
            ..AccessRules::default()
        })
        .singleton()
}
