//! Registration of cached methods
//!
//! Hosts declare each cacheable method of a type once, with its parameter
//! types, optional alias and ttl, and obtain [`CacheProxy`] values by accessor
//! name. The registry enforces that accessor names and derived identities are
//! unique per owning type; overloaded methods therefore need an alias.

use crate::engine::CacheEngine;
use crate::error::{Result, ValidationError};
use crate::handle::CacheHandle;
use crate::naming::{md5_hex, method_identity, simple_type_name};
use crate::proxy::CacheProxy;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Declaration of one cached method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    owner: String,
    name: String,
    alias: Option<String>,
    param_types: Vec<String>,
    ttl_ms: u64,
}

impl MethodSignature {
    /// Declare `name` on `owner`; qualified owner names are reduced to the simple name
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: simple_type_name(owner).to_string(),
            name: name.trim().to_string(),
            alias: None,
            param_types: Vec::new(),
            ttl_ms: 0,
        }
    }

    /// Append a parameter type, e.g. `java.lang.String` or `alloc::string::String`
    pub fn with_param(mut self, param_type: impl Into<String>) -> Self {
        self.param_types.push(param_type.into());
        self
    }

    pub fn with_params<I, S>(mut self, param_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param_types.extend(param_types.into_iter().map(Into::into));
        self
    }

    /// Replace the method name in the identity; a blank alias is ignored
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let alias = alias.trim();
        self.alias = (!alias.is_empty()).then(|| alias.to_string());
        self
    }

    /// Time-to-live in milliseconds; 0 means unlimited
    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    /// Signed ttl as found in host annotations; negative values mean unlimited
    pub fn with_signed_ttl_ms(self, ttl_ms: i64) -> Self {
        if ttl_ms < 0 {
            log::warn!(
                "Negative ttl {ttl_ms} ms for {}::{} treated as unlimited",
                self.owner,
                self.name
            );
        }
        self.with_ttl_ms(ttl_ms.max(0) as u64)
    }

    pub fn with_ttl(self, ttl: Duration) -> Self {
        self.with_ttl_ms(ttl.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn param_types(&self) -> &[String] {
        &self.param_types
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// The alias if set, otherwise the method name
    pub fn accessor_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// `"<Owner>_<NameOrAlias>-<Param1>-..."`
    pub fn identity(&self) -> String {
        method_identity(&self.owner, self.accessor_name(), &self.param_types)
    }

    /// MD5 of the identity
    pub fn base_name(&self) -> String {
        md5_hex(&self.identity())
    }

    /// A fresh handle for this method in `cache_dir`
    pub fn handle(&self, cache_dir: impl Into<PathBuf>) -> Result<CacheHandle> {
        CacheHandle::new(cache_dir, self.base_name(), self.ttl_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.owner.is_empty() {
            return Err(ValidationError::invalid_parameter("owner", "must not be empty").into());
        }
        if self.name.is_empty() {
            return Err(ValidationError::invalid_parameter("name", "must not be empty").into());
        }
        if let Some(param) = self.param_types.iter().find(|p| p.trim().is_empty()) {
            return Err(ValidationError::invalid_parameter(
                "param_types",
                &format!("blank parameter type {param:?}"),
            )
            .into());
        }
        Ok(())
    }
}

/// Cached methods of one owning type
#[derive(Debug, Clone)]
pub struct CacheRegistry {
    engine: CacheEngine,
    owner: String,
    methods: Vec<MethodSignature>,
    by_accessor: HashMap<String, usize>,
}

impl CacheRegistry {
    pub fn new(engine: CacheEngine, owner: &str) -> Self {
        Self {
            engine,
            owner: simple_type_name(owner).to_string(),
            methods: Vec::new(),
            by_accessor: HashMap::new(),
        }
    }

    /// Registry named after the Rust type `T`
    pub fn for_type<T: ?Sized>(engine: CacheEngine) -> Self {
        Self::new(engine, std::any::type_name::<T>())
    }

    /// Registry on the process-wide engine
    pub fn global(owner: &str) -> Self {
        Self::new(CacheEngine::global().clone(), owner)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Start a declaration owned by this registry's type
    pub fn declare(&self, name: &str) -> MethodSignature {
        MethodSignature::new(&self.owner, name)
    }

    /// Register a method
    ///
    /// Rejects a second method with the same accessor name or the same
    /// derived identity.
    pub fn register(&mut self, signature: MethodSignature) -> Result<&mut Self> {
        signature.validate()?;
        if signature.owner() != self.owner {
            return Err(ValidationError::invalid_parameter(
                "owner",
                &format!(
                    "method {} belongs to {}, not {}",
                    signature.name(),
                    signature.owner(),
                    self.owner
                ),
            )
            .into());
        }

        let accessor = signature.accessor_name().to_string();
        if self.by_accessor.contains_key(&accessor) {
            return Err(ValidationError::duplicate_method(&self.owner, &accessor).into());
        }

        let identity = signature.identity();
        if self.methods.iter().any(|m| m.identity() == identity) {
            return Err(
                ValidationError::duplicate_identity(&self.owner, signature.name(), &identity)
                    .into(),
            );
        }

        log::debug!("Registered cached method {}::{accessor} as {identity}", self.owner);
        self.by_accessor.insert(accessor, self.methods.len());
        self.methods.push(signature);
        Ok(self)
    }

    pub fn signature(&self, accessor: &str) -> Option<&MethodSignature> {
        self.by_accessor.get(accessor).map(|&index| &self.methods[index])
    }

    /// Registered methods in registration order
    pub fn methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.methods.iter()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Proxy for `accessor` with its files in `cache_dir`
    pub fn proxy(&self, accessor: &str, cache_dir: impl Into<PathBuf>) -> Result<CacheProxy> {
        let signature = self
            .signature(accessor)
            .ok_or_else(|| ValidationError::unknown_method(&self.owner, accessor))?;
        let handle = signature.handle(cache_dir)?;
        Ok(CacheProxy::new(self.engine.clone(), handle))
    }

    /// Proxy for `accessor` in the engine's configured cache directory
    pub fn proxy_in_default_dir(&self, accessor: &str) -> Result<CacheProxy> {
        let cache_dir = self.engine.config().cache_dir.clone();
        self.proxy(accessor, cache_dir)
    }
}
