use crate::error::{DeploymentsError, DeploymentsResult};
use serde::Deserialize;
use std::collections::BTreeMap;

/// The few metadata fields read from untyped OpenShift objects
#[derive(Debug, Default, Deserialize)]
pub struct ObjectMeta {
    pub name: Option<String>,
    pub uid: Option<String>,
    pub labels: Option<BTreeMap<String, String>>,
}

impl ObjectMeta {
    pub fn name(&self, object: &'static str) -> DeploymentsResult<&str> {
        self.name
            .as_deref()
            .ok_or_else(|| DeploymentsError::malformed(object, "name"))
    }

    pub fn uid(&self, object: &'static str) -> DeploymentsResult<&str> {
        self.uid
            .as_deref()
            .ok_or_else(|| DeploymentsError::malformed(object, "uid"))
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.as_ref()?.get(key).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
pub struct RawObject {
    pub kind: Option<String>,
    pub metadata: Option<ObjectMeta>,
}

impl RawObject {
    pub fn expect_kind(&self, expected: &'static str) -> DeploymentsResult<()> {
        check_kind(self.kind.as_deref(), expected)
    }

    pub fn metadata(&self, object: &'static str) -> DeploymentsResult<&ObjectMeta> {
        self.metadata
            .as_ref()
            .ok_or_else(|| DeploymentsError::malformed(object, "metadata"))
    }
}

#[derive(Debug, Deserialize)]
pub struct ObjectList {
    pub kind: Option<String>,
    pub items: Option<Vec<RawObject>>,
}

impl ObjectList {
    pub fn expect_kind(&self, expected: &'static str) -> DeploymentsResult<()> {
        check_kind(self.kind.as_deref(), expected)
    }

    pub fn items(&self, object: &'static str) -> DeploymentsResult<&[RawObject]> {
        self.items
            .as_deref()
            .ok_or_else(|| DeploymentsError::malformed(object, "items"))
    }
}

fn check_kind(kind: Option<&str>, expected: &'static str) -> DeploymentsResult<()> {
    match kind {
        Some(kind) if kind == expected => Ok(()),
        Some(kind) => Err(DeploymentsError::UnexpectedKind {
            expected,
            actual: kind.to_owned(),
        }),
        None => Err(DeploymentsError::UnexpectedKind {
            expected,
            actual: "<none>".to_owned(),
        }),
    }
}
