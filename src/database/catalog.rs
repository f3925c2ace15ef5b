//! Entity catalog
//!
//! The fixed list of persisted entities and their column shapes. Every
//! entity is keyed by `(owner, name)` and carries a `createdTime` column,
//! which is the default sort column of query sessions.
//!
//! Columns marked `secret()` hold credentials or key material. They are
//! created like any other column but can never be used as a filter target.

use crate::database::core::{ColumnDef, ColumnType, EntityDescriptor};

const fn key(field: &'static str) -> ColumnDef {
    ColumnDef::new(field, ColumnType::Varchar(100)).primary_key()
}

const fn varchar(field: &'static str, len: u16) -> ColumnDef {
    ColumnDef::new(field, ColumnType::Varchar(len))
}

const fn text(field: &'static str) -> ColumnDef {
    ColumnDef::new(field, ColumnType::Text)
}

const fn int(field: &'static str) -> ColumnDef {
    ColumnDef::new(field, ColumnType::Integer)
}

const fn real(field: &'static str) -> ColumnDef {
    ColumnDef::new(field, ColumnType::Real)
}

const fn flag(field: &'static str) -> ColumnDef {
    ColumnDef::new(field, ColumnType::Boolean)
}

const ORGANIZATION: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("displayName", 100),
    varchar("websiteUrl", 100),
    varchar("favicon", 100),
    varchar("passwordType", 100),
    varchar("passwordSalt", 100).secret(),
    varchar("phonePrefix", 10),
    varchar("defaultAvatar", 100),
    varchar("masterPassword", 100).secret(),
    flag("enableSoftDeletion"),
];

const USER: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100).indexed(),
    varchar("updatedTime", 100),
    varchar("id", 100).indexed(),
    varchar("type", 100),
    varchar("password", 100).secret(),
    varchar("passwordSalt", 100).secret(),
    varchar("displayName", 100),
    text("avatar"),
    varchar("email", 100).indexed(),
    varchar("phone", 100).indexed(),
    varchar("location", 100),
    text("address"),
    varchar("affiliation", 100),
    varchar("title", 100),
    varchar("idCardType", 100),
    varchar("idCard", 100).secret(),
    varchar("region", 100),
    varchar("language", 100),
    int("score"),
    int("ranking"),
    flag("isOnline"),
    flag("isAdmin"),
    flag("isGlobalAdmin"),
    flag("isForbidden"),
    flag("isDeleted"),
    varchar("signupApplication", 100),
    varchar("hash", 100).secret(),
    varchar("preHash", 100).secret(),
];

const ROLE: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("displayName", 100),
    text("users"),
    text("roles"),
    flag("isEnabled"),
];

const PERMISSION: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("displayName", 100),
    text("users"),
    text("roles"),
    varchar("model", 100),
    varchar("resourceType", 100),
    text("resources"),
    text("actions"),
    varchar("effect", 100),
    flag("isEnabled"),
];

const MODEL: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("displayName", 100),
    text("modelText"),
    flag("isEnabled"),
];

const PROVIDER: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("displayName", 100),
    varchar("category", 100),
    varchar("type", 100),
    varchar("subType", 100),
    varchar("method", 100),
    varchar("clientId", 100),
    varchar("clientSecret", 2000).secret(),
    varchar("clientId2", 100),
    varchar("clientSecret2", 100).secret(),
    varchar("host", 100),
    int("port"),
    varchar("title", 100),
    text("content"),
    varchar("regionId", 100),
    varchar("signName", 100),
    varchar("templateCode", 100),
    varchar("appId", 100),
    varchar("endpoint", 1000),
    varchar("domain", 100),
    varchar("bucket", 100),
    varchar("providerUrl", 200),
];

const APPLICATION: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("displayName", 100),
    varchar("logo", 100),
    varchar("homepageUrl", 100),
    varchar("description", 100),
    varchar("organization", 100),
    varchar("cert", 100),
    flag("enablePassword"),
    flag("enableSignUp"),
    varchar("clientId", 100).indexed(),
    varchar("clientSecret", 100).secret(),
    text("redirectUris"),
    varchar("tokenFormat", 100),
    int("expireInHours"),
    int("refreshExpireInHours"),
    varchar("signupUrl", 200),
    varchar("signinUrl", 200),
    varchar("forgetUrl", 200),
    varchar("affiliationUrl", 100),
];

const RESOURCE: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("user", 100),
    varchar("provider", 100),
    varchar("application", 100),
    varchar("tag", 100),
    varchar("parent", 100),
    varchar("fileName", 1000),
    varchar("fileType", 100),
    varchar("fileFormat", 100),
    int("fileSize"),
    varchar("url", 1000),
    varchar("description", 1000),
];

const TOKEN: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("application", 100),
    varchar("organization", 100),
    varchar("user", 100),
    varchar("code", 100).indexed().secret(),
    text("accessToken").secret(),
    text("refreshToken").secret(),
    int("expiresIn"),
    varchar("scope", 100),
    varchar("tokenType", 100),
];

const VERIFICATION_RECORD: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("remoteAddr", 100),
    varchar("type", 10),
    varchar("user", 100),
    varchar("provider", 100),
    varchar("receiver", 100),
    varchar("code", 10).secret(),
    int("time"),
    flag("isUsed"),
];

const RECORD: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("organization", 100),
    varchar("clientIp", 100),
    varchar("user", 100),
    varchar("method", 100),
    varchar("requestUri", 1000),
    varchar("action", 1000),
    flag("isTriggered"),
];

const WEBHOOK: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("organization", 100).indexed(),
    varchar("url", 100),
    varchar("method", 100),
    varchar("contentType", 100),
    text("events"),
    flag("isUserExtended"),
    flag("isEnabled"),
];

const SYNCER: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("organization", 100),
    varchar("type", 100),
    varchar("host", 100),
    int("port"),
    varchar("user", 100),
    varchar("password", 100).secret(),
    varchar("databaseType", 100),
    varchar("database", 100),
    varchar("table", 100),
    varchar("tablePrimaryKey", 100),
    text("tableColumns"),
    varchar("affiliationTable", 100),
    varchar("avatarBaseUrl", 100),
    text("errorText"),
    int("syncInterval"),
    flag("isEnabled"),
];

const CERT: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("displayName", 100),
    varchar("scope", 100),
    varchar("type", 100),
    varchar("cryptoAlgorithm", 100),
    int("bitSize"),
    int("expireInYears"),
    text("certificate"),
    text("privateKey").secret(),
    text("authorityPublicKey"),
    text("authorityRootPublicKey"),
];

const PRODUCT: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("displayName", 100),
    varchar("image", 100),
    text("detail"),
    varchar("description", 100),
    varchar("tag", 100),
    varchar("currency", 100),
    real("price"),
    int("quantity"),
    int("sold"),
    text("providers"),
    varchar("returnUrl", 1000),
    varchar("state", 100),
];

const PAYMENT: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("displayName", 100),
    varchar("provider", 100),
    varchar("type", 100),
    varchar("organization", 100),
    varchar("user", 100),
    varchar("productName", 100),
    varchar("productDisplayName", 100),
    varchar("detail", 100),
    varchar("tag", 100),
    varchar("currency", 100),
    real("price"),
    varchar("payUrl", 2000),
    varchar("returnUrl", 1000),
    varchar("state", 100),
    varchar("message", 1000),
];

const LDAP: &[ColumnDef] = &[
    key("owner"),
    key("name"),
    varchar("createdTime", 100),
    varchar("serverName", 100),
    varchar("host", 100),
    int("port"),
    flag("enableSsl"),
    varchar("username", 100),
    varchar("password", 100).secret(),
    varchar("baseDn", 100),
    varchar("filter", 200),
    text("filterFields"),
    int("autoSync"),
    varchar("lastSync", 100),
];

/// All persisted entities, in migration order
pub const ENTITY_CATALOG: &[EntityDescriptor] = &[
    EntityDescriptor {
        name: "Organization",
        columns: ORGANIZATION,
    },
    EntityDescriptor {
        name: "User",
        columns: USER,
    },
    EntityDescriptor {
        name: "Role",
        columns: ROLE,
    },
    EntityDescriptor {
        name: "Permission",
        columns: PERMISSION,
    },
    EntityDescriptor {
        name: "Model",
        columns: MODEL,
    },
    EntityDescriptor {
        name: "Provider",
        columns: PROVIDER,
    },
    EntityDescriptor {
        name: "Application",
        columns: APPLICATION,
    },
    EntityDescriptor {
        name: "Resource",
        columns: RESOURCE,
    },
    EntityDescriptor {
        name: "Token",
        columns: TOKEN,
    },
    EntityDescriptor {
        name: "VerificationRecord",
        columns: VERIFICATION_RECORD,
    },
    EntityDescriptor {
        name: "Record",
        columns: RECORD,
    },
    EntityDescriptor {
        name: "Webhook",
        columns: WEBHOOK,
    },
    EntityDescriptor {
        name: "Syncer",
        columns: SYNCER,
    },
    EntityDescriptor {
        name: "Cert",
        columns: CERT,
    },
    EntityDescriptor {
        name: "Product",
        columns: PRODUCT,
    },
    EntityDescriptor {
        name: "Payment",
        columns: PAYMENT,
    },
    EntityDescriptor {
        name: "Ldap",
        columns: LDAP,
    },
];

/// Look up an entity by name or by its unprefixed table name
///
/// `VerificationRecord`, `verificationrecord` and `verification_record` all
/// resolve to the same descriptor.
pub fn find_entity(name: &str) -> Option<&'static EntityDescriptor> {
    let wanted = name.to_lowercase();
    ENTITY_CATALOG.iter().find(|e| {
        e.name.to_lowercase() == wanted
            || crate::database::core::snake_string(e.name) == wanted
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_entities() {
        assert_eq!(ENTITY_CATALOG.len(), 17);
        let names: HashSet<_> = ENTITY_CATALOG.iter().map(|e| e.name).collect();
        assert_eq!(names.len(), ENTITY_CATALOG.len());
        assert_eq!(ENTITY_CATALOG[0].name, "Organization");
        assert_eq!(ENTITY_CATALOG[16].name, "Ldap");
    }

    #[test]
    fn test_every_entity_has_key_and_created_time() {
        for entity in ENTITY_CATALOG {
            let keys: Vec<_> = entity
                .columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.field)
                .collect();
            assert_eq!(keys, vec!["owner", "name"], "{}", entity.name);
            assert!(
                entity.column("createdTime").is_some(),
                "{} has no created_time",
                entity.name
            );
        }
    }

    #[test]
    fn test_column_names_are_unique() {
        for entity in ENTITY_CATALOG {
            let columns: HashSet<_> = entity.columns.iter().map(|c| c.column_name()).collect();
            assert_eq!(columns.len(), entity.columns.len(), "{}", entity.name);
        }
    }

    #[test]
    fn test_credentials_are_not_queryable() {
        let user = find_entity("User").unwrap();
        assert!(!user.column("password").unwrap().queryable);
        assert!(user.column("displayName").unwrap().queryable);

        let token = find_entity("token").unwrap();
        assert!(!token.column("accessToken").unwrap().queryable);
    }

    #[test]
    fn test_find_entity() {
        assert_eq!(
            find_entity("verification_record").unwrap().name,
            "VerificationRecord"
        );
        assert_eq!(
            find_entity("VerificationRecord").unwrap().name,
            "VerificationRecord"
        );
        assert!(find_entity("invoice").is_none());
    }
}
